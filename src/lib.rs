//! # sparsegrb
//!
//! **Typed sparse matrix algebra over arbitrary semirings.**
//!
//! sparsegrb implements the GraphBLAS model of computation: sparse matrices
//! of a runtime element type, combined by element-wise operations, semiring
//! products and reductions, each writing its result through an optional
//! mask and accumulator.
//!
//! ## Features
//!
//! - **Types**: `bool`, signed and unsigned integers, `f32`, `f64`, and
//!   opaque user-defined types, with C-style casts between built-ins
//! - **Operators**: built-in unary and binary operators, monoids with
//!   identity and terminal values, semirings, and user callables
//! - **Storage**: compressed by row or by column, hypersparse when few
//!   vectors are occupied, with deferred insertion and deletion
//! - **Operations**: `ewise_add`, `ewise_mult`, `mxm` (three algorithms),
//!   `reduce`, `apply`, `select`, `transpose`
//! - **Parallel**: count-then-write task slicing, deterministic for a
//!   given configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use sparsegrb::prelude::*;
//!
//! // edge weights of a small directed graph
//! let a = Matrix::from_triplets(3, 3, &[0, 0, 1], &[1, 2, 2], &[1.0f64, 5.0, 1.0])?;
//!
//! // two-hop shortest paths: (min, +) product of A with itself
//! let ctx = Context::default();
//! let mut paths = Matrix::new(DType::F64, 3, 3)?;
//! ctx.mxm(&mut paths, None, None, &Semiring::min_plus(DType::F64)?, &a, &a, &Descriptor::new())?;
//! assert_eq!(paths.get_element::<f64>(0, 2)?, Some(2.0));
//! # Ok::<(), sparsegrb::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded execution of the operation phases

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algebra;
pub mod config;
pub mod dtype;
pub mod engine;
pub mod error;
pub mod sparse;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algebra::{BinaryOp, BinaryOpcode, Monoid, Semiring, UnaryOp, UnaryOpcode};
    pub use crate::config::{AxbMethod, Config, Descriptor};
    pub use crate::dtype::{DType, Element, Scalar, UserType};
    pub use crate::engine::{Context, SelectOp};
    pub use crate::error::{Error, Result};
    pub use crate::sparse::{Matrix, Orientation};
}
