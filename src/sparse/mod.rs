//! Sparse matrix storage for sparsegrb
//!
//! A [`Matrix`] stores its entries as a list of compressed sparse vectors:
//!
//! - **By row** (CSR): each vector is a row, minor indices are columns.
//!   O(nnz + nrows) storage.
//!
//! - **By column** (CSC): each vector is a column, minor indices are rows.
//!   O(nnz + ncols) storage.
//!
//! - **Hypersparse**: either form, storing only the non-empty vectors plus
//!   a list of their ids. O(nnz) storage however large the dimension; used
//!   when few vectors are occupied (see [`Config::with_hyper_ratio`]).
//!
//! Only one orientation is ever held. Operations that want the other one
//! read the arrays as the transpose, and copy into the other orientation
//! only when they cannot avoid it.
//!
//! Single-entry mutation is deferred. Insertions queue as pending tuples
//! and deletions mark entries in place; [`Matrix::wait`] folds both into
//! the compressed arrays, and every operation that reads a matrix runs it
//! implicitly.
//!
//! [`Config::with_hyper_ratio`]: crate::config::Config::with_hyper_ratio

mod assemble;
mod build;
pub(crate) mod compressed;
mod format;
mod matrix;
mod pending;
mod transpose;

pub(crate) use compressed::{Compressed, CsView};
pub use format::Orientation;
pub use matrix::Matrix;
pub(crate) use matrix::Store;
pub(crate) use pending::{Deferred, PendingTuples};
pub(crate) use transpose::{reorient, Conformed};
