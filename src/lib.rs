//! Rustle Provision - Ansible bootstrap over a remote command channel
//!
//! This crate connects to a target host, optionally installs Ansible, uploads
//! a playbook tree together with a generated inventory, runs
//! `ansible-playbook` there and relays its output back to an observer.

pub mod cli;
pub mod communicator;
pub mod config;
pub mod paths;
pub mod provision;
pub mod types;

pub use communicator::{Communicator, Connection, TransportError};
pub use config::{decode_provisioner, ConfigError, ProvisionFile};
pub use provision::{run_provision, Output, Phase, ProvisionError, ProvisionWorkflow};
pub use types::*;
