//! Error types for compact-devices.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] compact_core::Error),

    #[error("bad parameter {key}: {reason}")]
    BadParameter { key: u32, reason: String },

    #[error("unknown instance: {0}")]
    UnknownInstance(String),

    #[error("unknown model kind: {0}")]
    UnknownModel(String),

    #[error("{instance} expects {expected} terminals, got {actual}")]
    TerminalCount {
        instance: String,
        expected: usize,
        actual: usize,
    },

    #[error("{0} has not been set up")]
    NotSetUp(String),

    #[error("{instance} has no operating point; load it first")]
    NotLoaded { instance: String },

    #[error("{instance} has no distortion kernels; run distortion setup first")]
    NoDistortionSetup { instance: String },

    #[error("distortion case needs the {0} excitation")]
    MissingExcitation(&'static str),

    #[error("{instance} has no backup to restore")]
    NoBackup { instance: String },
}

pub type Result<T> = std::result::Result<T, Error>;
