//! Drover stack configuration
//!
//! Typed, versioned configuration for one (project type, stack name) pair,
//! persisted as one YAML file per stack. The project-specific payload is a
//! tagged variant decoded eagerly at load time, and configs can layer
//! shared base properties from other configs via `dependsOn`.

pub mod error;
pub mod keypair;
pub mod model;
pub mod props;
pub mod store;

pub use error::{ConfigError, Result};
pub use keypair::Keypair;
pub use model::{Config, OpenstackProps, ProjectType, Props};
pub use props::{merge_stack_props, EsxiProps, Node, Share, StackProps, VcfProps};
pub use store::{list_config_files, read_config, write_config};
