use thiserror::Error;

use crate::codec::DecodeError;
use crate::types::{ContainerId, ContainerKind};

/// Errors returned by [`Document`](crate::Document) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocError {
    /// The update or state vector could not be decoded. Nothing was applied.
    #[error("malformed buffer: {0}")]
    MalformedBuffer(#[from] DecodeError),
    /// Items or delete ranges are still waiting for ids that never arrived.
    #[error("{items} items and {ranges} delete ranges wait on missing dependencies")]
    UnresolvableDependency { items: usize, ranges: usize },
    #[error("container {container} is a {actual}, not a {expected}")]
    TypeMismatch {
        container: ContainerId,
        expected: ContainerKind,
        actual: ContainerKind,
    },
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("unknown container {0}")]
    UnknownContainer(ContainerId),
}
