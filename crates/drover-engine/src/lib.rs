//! Drover engine wrapper
//!
//! Boundary to the external Pulumi provisioning engine: stack
//! select/create, config pushes, refresh/up/destroy runs via the `pulumi`
//! CLI, plus a read-only view of the engine's checkpoint store for
//! rendering deployed resource trees.

pub mod checkpoint;
pub mod cli;
pub mod error;

pub use checkpoint::{log_resource_tree, read_checkpoint, render_tree, Resource};
pub use cli::{ConfigMap, ConfigValue, EngineStack, OutputMap, UpResult};
pub use error::{EngineError, Result};
