//! Drover stack adapters
//!
//! One adapter per project type translates a typed stack config into
//! engine settings and drives the provisioning lifecycle. All adapters
//! share the same trait so the control plane never has to know which
//! project type it is reconciling.

pub mod adapter;
pub mod error;
pub mod esxi;
pub mod example;
pub mod openstack;
pub mod vcf;
mod wire;

pub use adapter::{init_adapter, StackAdapter, StackState};
pub use error::{Result, StackError};
