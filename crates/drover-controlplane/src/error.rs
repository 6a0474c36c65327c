//! Control plane error types

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("stack uninitialized")]
    StackUninitialized,

    #[error("unmatched project")]
    UnmatchedProject,

    #[error("unmatched stack")]
    UnmatchedStack,

    #[error("controller already registered: {0}")]
    AlreadyRegistered(String),

    #[error("controller not found: {0}")]
    NotFound(String),

    #[error("operation exceeded deadline of {0:?}")]
    Deadline(Duration),

    #[error(transparent)]
    Stack(#[from] drover_stacks::StackError),

    #[error(transparent)]
    Config(#[from] drover_config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ControlError>;
