pub mod connection;
pub mod provisioner;

pub use connection::*;
pub use provisioner::*;
