//! Drover control plane
//!
//! The reconciliation layer: one [`controller::Controller`] per stack
//! config drives the deployment loop, the [`manager::Manager`] keeps the
//! controller registry in sync with the config directory, and the HTTP
//! API exposes both.

pub mod controller;
pub mod error;
pub mod http;
pub mod manager;

pub use controller::{Controller, DEFAULT_OP_TIMEOUT, DEFAULT_PERIOD};
pub use error::{ControlError, Result};
pub use manager::{Manager, ReloadReport};
