//! Semirings for generalized matrix multiplication
//!
//! A semiring pairs a multiply operator ⊗ with an add monoid ⊕:
//! `C[i,j] = ⊕_k (A[i,k] ⊗ B[k,j])`. The conventional (+, ×) product is one
//! instance; others express graph algorithms:
//!
//! - `min.plus`: shortest paths
//! - `max.plus`: longest paths, scheduling
//! - `max.min`: bottleneck capacity
//! - `lor.land`: reachability over boolean matrices

use super::{names, BinaryOp, BinaryOpcode, Monoid};
use crate::dtype::{promote, DType};
use crate::error::{Error, Result};

/// A multiply operator paired with an add monoid
#[derive(Clone, Debug)]
pub struct Semiring {
    add: Monoid,
    multiply: BinaryOp,
}

impl Semiring {
    /// Create a semiring; the multiply result type must be the monoid type
    pub fn new(add: Monoid, multiply: BinaryOp) -> Result<Self> {
        if multiply.ztype() != add.dtype() {
            return Err(Error::domain(
                multiply.name().to_string(),
                multiply.ztype(),
                add.dtype(),
            ));
        }
        Ok(Self { add, multiply })
    }

    /// Resolve a built-in semiring: multiply `mult` over `dtype`, added
    /// with the built-in monoid `add` over the multiply result type
    pub fn builtin(add: BinaryOpcode, mult: BinaryOpcode, dtype: DType) -> Result<Self> {
        let multiply = BinaryOp::builtin(mult, dtype)?;
        let add = Monoid::builtin(add, multiply.ztype())?;
        Self::new(add, multiply)
    }

    /// The conventional (+, ×) semiring
    pub fn plus_times(dtype: DType) -> Result<Self> {
        Self::builtin(BinaryOpcode::Plus, BinaryOpcode::Times, dtype)
    }

    /// (min, +): shortest paths
    pub fn min_plus(dtype: DType) -> Result<Self> {
        Self::builtin(BinaryOpcode::Min, BinaryOpcode::Plus, dtype)
    }

    /// (max, +): longest paths
    pub fn max_plus(dtype: DType) -> Result<Self> {
        Self::builtin(BinaryOpcode::Max, BinaryOpcode::Plus, dtype)
    }

    /// (OR, AND) over bool: reachability
    pub fn lor_land() -> Result<Self> {
        Self::builtin(BinaryOpcode::Lor, BinaryOpcode::Land, DType::Bool)
    }

    /// Resolve a semiring name such as `"min.plus.fp64"` or `"+.*"`
    ///
    /// Without a type suffix the multiply type is promoted from the operand
    /// types `atype` and `btype`.
    pub fn from_name(name: &str, atype: DType, btype: DType) -> Result<Self> {
        let unknown = || Error::UnknownOperator {
            name: name.to_string(),
        };
        let (ops, ty) = names::split_type(name);
        let (add, mult) = names::split_semiring(ops).ok_or_else(unknown)?;
        let add = names::binary_opcode(add).ok_or_else(unknown)?;
        let mult = names::binary_opcode(mult).ok_or_else(unknown)?;
        Self::builtin(add, mult, ty.unwrap_or_else(|| promote(atype, btype)))
    }

    /// The add monoid ⊕
    #[inline]
    pub fn add(&self) -> &Monoid {
        &self.add
    }

    /// The multiply operator ⊗
    #[inline]
    pub fn multiply(&self) -> &BinaryOp {
        &self.multiply
    }

    /// Result type of the product
    #[inline]
    pub fn dtype(&self) -> DType {
        self.add.dtype()
    }
}
