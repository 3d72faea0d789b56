pub mod decoder;
pub mod error;
pub mod loader;

pub use decoder::*;
pub use error::*;
pub use loader::*;
