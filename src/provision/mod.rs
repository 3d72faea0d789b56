//! Ansible bootstrap and playbook execution against one target host.

pub mod artifacts;
pub mod command;
pub mod error;
pub mod executor;
pub mod layout;
pub mod output;
pub mod relay;
pub mod retry;
pub mod workflow;

pub use artifacts::*;
pub use command::*;
pub use error::*;
pub use executor::*;
pub use layout::*;
pub use output::*;
pub use relay::*;
pub use retry::*;
pub use workflow::*;
