//! Operator algebra: unary and binary operators, monoids, semirings
//!
//! Built-in operators come from a dispatch table keyed by opcode and type;
//! every operator, built-in or user-defined, is ultimately a byte-level
//! callable so the engines can run any combination through one generic
//! worker. Typed fast paths look up the typed kernel by opcode instead.

mod binary;
mod bound;
pub(crate) mod kernels;
mod monoid;
mod names;
mod semiring;
mod unary;

pub use binary::{BinaryFn, BinaryOp, BinaryOpcode};
pub(crate) use bound::BoundBinary;
pub use monoid::Monoid;
pub use semiring::Semiring;
pub use unary::{UnaryFn, UnaryOp, UnaryOpcode};
