//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("unknown project type: {0}")]
    UnknownProject(String),

    #[error("stack name not set")]
    StackNotSet,

    #[error("dependency config not found: {0}")]
    DependencyNotFound(PathBuf),

    #[error("circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("merging configuration not supported for project type {0}")]
    MergeUnsupported(String),

    #[error("stack properties do not match project type {0}")]
    PropsMismatch(String),

    #[error("keypair file missing: {0}")]
    KeypairFileMissing(PathBuf),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
