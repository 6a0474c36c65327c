//! Engine wrapper error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("pulumi CLI not found. Please install pulumi and put it on PATH")]
    PulumiNotFound,

    #[error("pulumi command failed: {0}")]
    CommandFailed(String),

    #[error("env variable PULUMI_BACKEND_URL not set")]
    BackendUrlNotSet,

    #[error("unsupported checkpoint version: {0}")]
    UnsupportedCheckpoint(u64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
