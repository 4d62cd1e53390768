//! Monoids: an associative, commutative operator with an identity

use super::{names, BinaryOp, BinaryOpcode};
use crate::dtype::{DType, Element, Scalar};
use crate::error::{Error, Result};

/// A binary operator with an identity and an optional terminal value
///
/// Once an accumulation reaches the terminal value, further accumulation
/// cannot change it, so reductions may stop early.
#[derive(Clone, Debug)]
pub struct Monoid {
    op: BinaryOp,
    identity: Scalar,
    terminal: Option<Scalar>,
}

/// Identity and terminal for a built-in monoid over `T`
fn builtin_values<T: Element>(opcode: BinaryOpcode) -> Option<(T, Option<T>)> {
    let is_bool = T::DTYPE.is_bool();
    let values = match opcode {
        BinaryOpcode::Plus => (T::zero(), None),
        BinaryOpcode::Times if T::DTYPE.is_int() => (T::one(), Some(T::zero())),
        BinaryOpcode::Times => (T::one(), None),
        BinaryOpcode::Min => (T::highest(), Some(T::lowest())),
        BinaryOpcode::Max => (T::lowest(), Some(T::highest())),
        BinaryOpcode::Lor if is_bool => (T::from_bool(false), Some(T::from_bool(true))),
        BinaryOpcode::Land if is_bool => (T::from_bool(true), Some(T::from_bool(false))),
        BinaryOpcode::Lxor if is_bool => (T::from_bool(false), None),
        BinaryOpcode::Eq if is_bool => (T::from_bool(true), None),
        _ => return None,
    };
    Some(values)
}

fn builtin_scalars(opcode: BinaryOpcode, dtype: DType) -> Result<Option<(Scalar, Option<Scalar>)>> {
    crate::dispatch_dtype!(dtype, T => {
        Ok(builtin_values::<T>(opcode)
            .map(|(id, term)| (Scalar::new(id), term.map(Scalar::new))))
    }, "monoid")
}

impl Monoid {
    /// Create a monoid from an operator, its identity, and an optional
    /// terminal value
    ///
    /// The operator must have identical `x`, `y` and `z` types. The identity
    /// and terminal are cast to that type.
    pub fn new(op: BinaryOp, identity: Scalar, terminal: Option<Scalar>) -> Result<Self> {
        let z = op.ztype();
        if op.xtype() != z {
            return Err(Error::domain(op.name().to_string(), op.xtype(), z));
        }
        if op.ytype() != z {
            return Err(Error::domain(op.name().to_string(), op.ytype(), z));
        }
        let identity = identity.cast(z)?;
        let terminal = terminal.map(|t| t.cast(z)).transpose()?;
        Ok(Self {
            op,
            identity,
            terminal,
        })
    }

    /// Resolve a built-in monoid
    ///
    /// Supported opcodes are `plus`, `times`, `min` and `max` on every
    /// built-in type, and `lor`, `land`, `lxor` and `eq` on `bool`. On `bool`
    /// the arithmetic opcodes name their logical equivalents (`plus` and
    /// `max` are `lor`, `times` and `min` are `land`, `minus` and `ne` are
    /// `lxor`).
    pub fn builtin(opcode: BinaryOpcode, dtype: DType) -> Result<Self> {
        let opcode = if dtype.is_bool() {
            match opcode {
                BinaryOpcode::Plus | BinaryOpcode::Max => BinaryOpcode::Lor,
                BinaryOpcode::Times | BinaryOpcode::Min => BinaryOpcode::Land,
                BinaryOpcode::Minus | BinaryOpcode::Ne => BinaryOpcode::Lxor,
                other => other,
            }
        } else {
            opcode
        };
        let unsupported = || {
            Error::invalid_argument(
                "opcode",
                format!("'{}' is not a built-in monoid on {}", opcode, dtype),
            )
        };
        if dtype.is_udt() {
            return Err(unsupported());
        }
        let (identity, terminal) = builtin_scalars(opcode, dtype)
            .ok()
            .flatten()
            .ok_or_else(unsupported)?;
        let op = BinaryOp::builtin(opcode, dtype)?;
        Ok(Self {
            op,
            identity,
            terminal,
        })
    }

    /// Resolve a monoid name such as `"min"` or `"plus.fp64"`
    ///
    /// Without a type suffix the monoid is over `dtype`.
    pub fn from_name(name: &str, dtype: DType) -> Result<Self> {
        let (op, ty) = names::split_type(name);
        let opcode = names::binary_opcode(op).ok_or_else(|| Error::UnknownOperator {
            name: name.to_string(),
        })?;
        Self::builtin(opcode, ty.unwrap_or(dtype))
    }

    /// The underlying operator
    #[inline]
    pub fn op(&self) -> &BinaryOp {
        &self.op
    }

    /// Value type of the monoid
    #[inline]
    pub fn dtype(&self) -> DType {
        self.op.ztype()
    }

    /// Identity value
    #[inline]
    pub fn identity(&self) -> &Scalar {
        &self.identity
    }

    /// Terminal value, if any
    #[inline]
    pub fn terminal(&self) -> Option<&Scalar> {
        self.terminal.as_ref()
    }

    /// Returns true if `z` equals the terminal value
    #[inline]
    pub fn is_terminal(&self, z: &[u8]) -> bool {
        match &self.terminal {
            Some(t) => t.as_bytes() == z,
            None => false,
        }
    }
}
