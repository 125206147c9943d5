//! Error types for compact-core.

use thiserror::Error;

use crate::NodeId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("matrix element ({row}, {col}) exceeds the element limit of {limit}")]
    ElementLimit { row: NodeId, col: NodeId, limit: usize },

    #[error("node {0} is not part of the system")]
    NodeOutOfRange(NodeId),

    #[error("{method} integration does not support order {order}")]
    InvalidOrder { method: &'static str, order: usize },

    #[error("state store needs at least {required} generations, got {actual}")]
    TooFewGenerations { required: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
