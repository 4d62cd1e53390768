//! Error types for sparsegrb

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using sparsegrb's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sparsegrb operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Operand and destination types have no implicit cast
    #[error("Domain mismatch in '{op}': {from} cannot be cast to {to}")]
    DomainMismatch {
        /// The operator or operation that rejected the types
        op: String,
        /// Source type
        from: DType,
        /// Destination type
        to: DType,
    },

    /// Nonconforming shapes for the requested operation
    #[error("Dimension mismatch in '{op}': expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        /// The operation name
        op: &'static str,
        /// Expected shape [nrows, ncols]
        expected: [usize; 2],
        /// Actual shape [nrows, ncols]
        got: [usize; 2],
    },

    /// An object is malformed or was built from inconsistent parts
    #[error("Invalid {what}: {reason}")]
    InvalidHandle {
        /// The kind of object
        what: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Workspace or output allocation failure
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// A typed fast path declined; the generic worker must run instead
    #[error("No fast path for '{op}' on {dtype}")]
    UnsupportedOperatorPath {
        /// Operator name
        op: String,
        /// The type the fast path was asked to handle
        dtype: DType,
    },

    /// Index out of bounds
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// Size of the dimension
        size: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Operator name could not be resolved
    #[error("Unknown operator '{name}'")]
    UnknownOperator {
        /// The name as given
        name: String,
    },

    /// Type name could not be resolved
    #[error("Unknown type '{name}'")]
    UnknownType {
        /// The name as given
        name: String,
    },
}

impl Error {
    /// Create a domain mismatch error
    pub fn domain(op: impl Into<String>, from: DType, to: DType) -> Self {
        Self::DomainMismatch {
            op: op.into(),
            from,
            to,
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension(op: &'static str, expected: [usize; 2], got: [usize; 2]) -> Self {
        Self::DimensionMismatch { op, expected, got }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create an invalid handle error
    pub fn invalid_handle(what: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidHandle {
            what,
            reason: reason.into(),
        }
    }

    /// Create an unsupported fast-path error
    pub fn unsupported_path(op: impl Into<String>, dtype: DType) -> Self {
        Self::UnsupportedOperatorPath {
            op: op.into(),
            dtype,
        }
    }
}

/// Allocate a `len`-element vector filled with `fill`, mapping allocation
/// failure to [`Error::OutOfMemory`].
pub(crate) fn try_alloc<T: Clone>(len: usize, fill: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| Error::OutOfMemory {
        size: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    v.resize(len, fill);
    Ok(v)
}
