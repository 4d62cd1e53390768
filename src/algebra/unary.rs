//! Unary operators `z = f(x)`

use super::kernels::{typed_unary, Arith};
use super::names;
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Byte-level unary callable: `f(z, x)` writes `z`
pub type UnaryFn = Arc<dyn Fn(&mut [u8], &[u8]) + Send + Sync>;

/// Built-in unary operator codes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOpcode {
    /// `z = x`
    Identity,
    /// `z = -x`
    Ainv,
    /// `z = 1 / x`
    Minv,
    /// `z = |x|`
    Abs,
    /// `z = !(x != 0)`
    Lnot,
    /// `z = 1`
    One,
    /// User-defined callable
    User,
}

impl UnaryOpcode {
    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Ainv => "ainv",
            Self::Minv => "minv",
            Self::Abs => "abs",
            Self::Lnot => "lnot",
            Self::One => "one",
            Self::User => "user",
        }
    }
}

/// A typed unary operator
#[derive(Clone)]
pub struct UnaryOp {
    name: String,
    opcode: UnaryOpcode,
    xtype: DType,
    ztype: DType,
    func: UnaryFn,
}

fn wrap_unary<T: Arith>(opcode: UnaryOpcode) -> Option<UnaryFn> {
    let f = typed_unary::<T>(opcode)?;
    Some(Arc::new(move |z: &mut [u8], x: &[u8]| f(T::read(x)).write(z)))
}

fn builtin_fn(opcode: UnaryOpcode, dtype: DType) -> Result<Option<UnaryFn>> {
    crate::dispatch_dtype!(dtype, T => {
        Ok(wrap_unary::<T>(opcode))
    }, opcode.name())
}

impl UnaryOp {
    /// Resolve the built-in operator `opcode` over `dtype`
    ///
    /// On user-defined types only `identity` is built in.
    pub fn builtin(opcode: UnaryOpcode, dtype: DType) -> Result<Self> {
        let func: UnaryFn = match (dtype, opcode) {
            (DType::Udt(_), UnaryOpcode::Identity) => {
                Arc::new(|z: &mut [u8], x: &[u8]| z.copy_from_slice(x))
            }
            _ => builtin_fn(opcode, dtype)
                .ok()
                .flatten()
                .ok_or_else(|| {
                    Error::invalid_argument(
                        "dtype",
                        format!("operator '{}' is not defined for {}", opcode.name(), dtype),
                    )
                })?,
        };
        Ok(Self {
            name: format!("{}_{}", opcode.name(), dtype),
            opcode,
            xtype: dtype,
            ztype: dtype,
            func,
        })
    }

    /// Create a user operator over raw value bytes
    pub fn new_user<F>(name: &str, xtype: DType, ztype: DType, f: F) -> Self
    where
        F: Fn(&mut [u8], &[u8]) + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            opcode: UnaryOpcode::User,
            xtype,
            ztype,
            func: Arc::new(f),
        }
    }

    /// Create a user operator from a typed closure
    pub fn from_fn<X, Z, F>(name: &str, f: F) -> Self
    where
        X: Element,
        Z: Element,
        F: Fn(X) -> Z + Send + Sync + 'static,
    {
        Self::new_user(name, X::DTYPE, Z::DTYPE, move |z: &mut [u8], x: &[u8]| {
            f(X::read(x)).write(z)
        })
    }

    /// Resolve an operator name such as `"abs"` or `"ainv.fp32"`
    ///
    /// Without a type suffix the operator takes the operand type `atype`.
    pub fn from_name(name: &str, atype: DType) -> Result<Self> {
        let (op, dtype) = names::split_type(name);
        let opcode = names::unary_opcode(op).ok_or_else(|| Error::UnknownOperator {
            name: name.to_string(),
        })?;
        Self::builtin(opcode, dtype.unwrap_or(atype))
    }

    /// Operator name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Built-in opcode, or `User`
    pub fn opcode(&self) -> UnaryOpcode {
        self.opcode
    }

    /// Type of `x`
    #[inline]
    pub fn xtype(&self) -> DType {
        self.xtype
    }

    /// Type of `z`
    #[inline]
    pub fn ztype(&self) -> DType {
        self.ztype
    }

    /// Apply the operator to raw value bytes
    #[inline]
    pub fn apply_bytes(&self, z: &mut [u8], x: &[u8]) {
        (self.func)(z, x)
    }
}

impl fmt::Debug for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryOp")
            .field("name", &self.name)
            .field("opcode", &self.opcode)
            .field("xtype", &self.xtype)
            .field("ztype", &self.ztype)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply<T: Element>(op: &UnaryOp, x: T) -> T {
        let mut xb = [0u8; 8];
        let mut zb = [0u8; 8];
        x.write(&mut xb);
        let n = op.ztype().size_in_bytes();
        op.apply_bytes(&mut zb[..n], &xb[..op.xtype().size_in_bytes()]);
        T::read(&zb)
    }

    #[test]
    fn test_builtin_unary() {
        let ainv = UnaryOp::builtin(UnaryOpcode::Ainv, DType::I32).unwrap();
        assert_eq!(apply(&ainv, 5i32), -5);
        let minv = UnaryOp::builtin(UnaryOpcode::Minv, DType::F64).unwrap();
        assert_eq!(apply(&minv, 4.0f64), 0.25);
        let one = UnaryOp::builtin(UnaryOpcode::One, DType::U8).unwrap();
        assert_eq!(apply(&one, 9u8), 1);
        let lnot = UnaryOp::builtin(UnaryOpcode::Lnot, DType::Bool).unwrap();
        assert!(!apply(&lnot, true));
    }

    #[test]
    fn test_from_name_and_user() {
        let abs = UnaryOp::from_name("abs", DType::I8).unwrap();
        assert_eq!(abs.xtype(), DType::I8);
        assert_eq!(apply(&abs, -3i8), 3);
        assert!(UnaryOp::from_name("sqrt", DType::F64).is_err());

        let sq = UnaryOp::from_fn("square", |x: f32| x * x);
        assert_eq!(apply(&sq, 3.0f32), 9.0);
    }
}
