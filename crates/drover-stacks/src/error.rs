//! Stack adapter error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("ssh keypair not set")]
    KeypairNotSet,

    #[error("env variable {0} not configured")]
    MissingCredential(&'static str),

    #[error("openstack property {0} not set")]
    OpenstackPropertyNotSet(&'static str),

    #[error("stack property {0} not set")]
    PropertyNotSet(&'static str),

    #[error("stack props do not match project type {0}")]
    PropsMismatch(String),

    #[error(transparent)]
    Engine(#[from] drover_engine::EngineError),

    #[error(transparent)]
    Config(#[from] drover_config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StackError>;
