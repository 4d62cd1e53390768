//! Binary operators `z = f(x, y)`

use super::kernels::{typed_binary, typed_compare, Arith};
use super::names;
use crate::dtype::{promote, DType, Element};
use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Byte-level binary callable: `f(z, x, y)` writes `z`
pub type BinaryFn = Arc<dyn Fn(&mut [u8], &[u8], &[u8]) + Send + Sync>;

/// Built-in binary operator codes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOpcode {
    /// `z = x`
    First,
    /// `z = y`
    Second,
    /// `z = min(x, y)`
    Min,
    /// `z = max(x, y)`
    Max,
    /// `z = x + y`
    Plus,
    /// `z = x - y`
    Minus,
    /// `z = y - x`
    Rminus,
    /// `z = x * y`
    Times,
    /// `z = x / y`
    Div,
    /// `z = y / x`
    Rdiv,
    /// `z = (x == y)` in the operand type
    Iseq,
    /// `z = (x != y)` in the operand type
    Isne,
    /// `z = (x > y)` in the operand type
    Isgt,
    /// `z = (x < y)` in the operand type
    Islt,
    /// `z = (x >= y)` in the operand type
    Isge,
    /// `z = (x <= y)` in the operand type
    Isle,
    /// `z = (x == y)` as bool
    Eq,
    /// `z = (x != y)` as bool
    Ne,
    /// `z = (x > y)` as bool
    Gt,
    /// `z = (x < y)` as bool
    Lt,
    /// `z = (x >= y)` as bool
    Ge,
    /// `z = (x <= y)` as bool
    Le,
    /// `z = (x != 0) || (y != 0)`
    Lor,
    /// `z = (x != 0) && (y != 0)`
    Land,
    /// `z = (x != 0) != (y != 0)`
    Lxor,
    /// User-defined callable
    User,
}

impl BinaryOpcode {
    /// All built-in opcodes
    pub const BUILTIN: [BinaryOpcode; 25] = [
        Self::First,
        Self::Second,
        Self::Min,
        Self::Max,
        Self::Plus,
        Self::Minus,
        Self::Rminus,
        Self::Times,
        Self::Div,
        Self::Rdiv,
        Self::Iseq,
        Self::Isne,
        Self::Isgt,
        Self::Islt,
        Self::Isge,
        Self::Isle,
        Self::Eq,
        Self::Ne,
        Self::Gt,
        Self::Lt,
        Self::Ge,
        Self::Le,
        Self::Lor,
        Self::Land,
        Self::Lxor,
    ];

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
            Self::Min => "min",
            Self::Max => "max",
            Self::Plus => "plus",
            Self::Minus => "minus",
            Self::Rminus => "rminus",
            Self::Times => "times",
            Self::Div => "div",
            Self::Rdiv => "rdiv",
            Self::Iseq => "iseq",
            Self::Isne => "isne",
            Self::Isgt => "isgt",
            Self::Islt => "islt",
            Self::Isge => "isge",
            Self::Isle => "isle",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Ge => "ge",
            Self::Le => "le",
            Self::Lor => "lor",
            Self::Land => "land",
            Self::Lxor => "lxor",
            Self::User => "user",
        }
    }

    /// True for the comparisons whose result is always `bool`
    #[inline]
    pub fn returns_bool(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Gt | Self::Lt | Self::Ge | Self::Le
        )
    }

    /// Opcode computing `f(y, x)` when this one computes `f(x, y)`
    pub fn flipped(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
            Self::Minus => Self::Rminus,
            Self::Rminus => Self::Minus,
            Self::Div => Self::Rdiv,
            Self::Rdiv => Self::Div,
            Self::Isgt => Self::Islt,
            Self::Islt => Self::Isgt,
            Self::Isge => Self::Isle,
            Self::Isle => Self::Isge,
            Self::Gt => Self::Lt,
            Self::Lt => Self::Gt,
            Self::Ge => Self::Le,
            Self::Le => Self::Ge,
            other => other,
        }
    }
}

impl fmt::Display for BinaryOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed binary operator
///
/// Built-in operators are resolved from an opcode and a type through the
/// dispatch table; user operators wrap an arbitrary callable. Either way the
/// operator is applied through its byte-level function, and the opcode lets
/// typed fast paths find the matching typed kernel.
#[derive(Clone)]
pub struct BinaryOp {
    name: String,
    opcode: BinaryOpcode,
    xtype: DType,
    ytype: DType,
    ztype: DType,
    func: BinaryFn,
}

fn wrap_binary<T: Arith>(opcode: BinaryOpcode) -> Option<BinaryFn> {
    if let Some(f) = typed_binary::<T>(opcode) {
        return Some(Arc::new(move |z: &mut [u8], x: &[u8], y: &[u8]| {
            f(T::read(x), T::read(y)).write(z)
        }));
    }
    let f = typed_compare::<T>(opcode)?;
    Some(Arc::new(move |z: &mut [u8], x: &[u8], y: &[u8]| {
        f(T::read(x), T::read(y)).write(z)
    }))
}

fn builtin_fn(opcode: BinaryOpcode, dtype: DType) -> Result<Option<BinaryFn>> {
    crate::dispatch_dtype!(dtype, T => {
        Ok(wrap_binary::<T>(opcode))
    }, opcode.name())
}

impl BinaryOp {
    /// Resolve the built-in operator `opcode` over `dtype`
    ///
    /// Comparisons (`eq`, `ne`, `gt`, `lt`, `ge`, `le`) produce `bool`; all
    /// other built-ins produce `dtype`. On user-defined types only `first`
    /// and `second` are built in.
    pub fn builtin(opcode: BinaryOpcode, dtype: DType) -> Result<Self> {
        let ztype = if opcode.returns_bool() {
            DType::Bool
        } else {
            dtype
        };
        let func: BinaryFn = match (dtype, opcode) {
            (_, BinaryOpcode::User) => {
                return Err(Error::invalid_argument(
                    "opcode",
                    "user operators are created with BinaryOp::new_user",
                ));
            }
            (DType::Udt(_), BinaryOpcode::First) => {
                Arc::new(|z: &mut [u8], x: &[u8], _: &[u8]| z.copy_from_slice(x))
            }
            (DType::Udt(_), BinaryOpcode::Second) => {
                Arc::new(|z: &mut [u8], _: &[u8], y: &[u8]| z.copy_from_slice(y))
            }
            _ => builtin_fn(opcode, dtype)
                .ok()
                .flatten()
                .ok_or_else(|| {
                    Error::invalid_argument(
                        "dtype",
                        format!("operator '{}' is not defined for {}", opcode, dtype),
                    )
                })?,
        };
        Ok(Self {
            name: format!("{}_{}", opcode.name(), dtype),
            opcode,
            xtype: dtype,
            ytype: dtype,
            ztype,
            func,
        })
    }

    /// Create a user operator over raw value bytes
    ///
    /// `f(z, x, y)` receives slices of exactly the declared type sizes.
    pub fn new_user<F>(name: &str, xtype: DType, ytype: DType, ztype: DType, f: F) -> Self
    where
        F: Fn(&mut [u8], &[u8], &[u8]) + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            opcode: BinaryOpcode::User,
            xtype,
            ytype,
            ztype,
            func: Arc::new(f),
        }
    }

    /// Create a user operator from a typed closure
    pub fn from_fn<X, Y, Z, F>(name: &str, f: F) -> Self
    where
        X: Element,
        Y: Element,
        Z: Element,
        F: Fn(X, Y) -> Z + Send + Sync + 'static,
    {
        Self::new_user(
            name,
            X::DTYPE,
            Y::DTYPE,
            Z::DTYPE,
            move |z: &mut [u8], x: &[u8], y: &[u8]| f(X::read(x), Y::read(y)).write(z),
        )
    }

    /// Resolve an operator name such as `"plus"`, `"plus.int32"` or `"+"`
    ///
    /// Without a type suffix the operator type is promoted from the operand
    /// types `atype` and `btype`.
    pub fn from_name(name: &str, atype: DType, btype: DType) -> Result<Self> {
        let (op, dtype) = names::split_type(name);
        let opcode = names::binary_opcode(op).ok_or_else(|| Error::UnknownOperator {
            name: name.to_string(),
        })?;
        Self::builtin(opcode, dtype.unwrap_or_else(|| promote(atype, btype)))
    }

    /// Operator name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Built-in opcode, or `User`
    #[inline]
    pub fn opcode(&self) -> BinaryOpcode {
        self.opcode
    }

    /// Type of `x`
    #[inline]
    pub fn xtype(&self) -> DType {
        self.xtype
    }

    /// Type of `y`
    #[inline]
    pub fn ytype(&self) -> DType {
        self.ytype
    }

    /// Type of `z`
    #[inline]
    pub fn ztype(&self) -> DType {
        self.ztype
    }

    /// Apply the operator to raw value bytes
    #[inline]
    pub fn apply_bytes(&self, z: &mut [u8], x: &[u8], y: &[u8]) {
        (self.func)(z, x, y)
    }

    /// Apply the operator to typed values; the types must match exactly
    pub fn call<X: Element, Y: Element, Z: Element>(&self, x: X, y: Y) -> Result<Z> {
        if X::DTYPE != self.xtype {
            return Err(Error::domain(self.name.clone(), X::DTYPE, self.xtype));
        }
        if Y::DTYPE != self.ytype {
            return Err(Error::domain(self.name.clone(), Y::DTYPE, self.ytype));
        }
        if Z::DTYPE != self.ztype {
            return Err(Error::domain(self.name.clone(), self.ztype, Z::DTYPE));
        }
        let mut xb = [0u8; 8];
        let mut yb = [0u8; 8];
        let mut zb = [0u8; 8];
        x.write(&mut xb);
        y.write(&mut yb);
        self.apply_bytes(
            &mut zb[..self.ztype.size_in_bytes()],
            &xb[..self.xtype.size_in_bytes()],
            &yb[..self.ytype.size_in_bytes()],
        );
        Ok(Z::read(&zb))
    }

    /// The same operator with its arguments swapped: `g(y, x) = f(x, y)`
    pub(crate) fn flipped(&self) -> Self {
        let f = Arc::clone(&self.func);
        Self {
            name: self.name.clone(),
            opcode: self.opcode.flipped(),
            xtype: self.ytype,
            ytype: self.xtype,
            ztype: self.ztype,
            func: Arc::new(move |z: &mut [u8], x: &[u8], y: &[u8]| f(z, y, x)),
        }
    }
}

impl fmt::Debug for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryOp")
            .field("name", &self.name)
            .field("opcode", &self.opcode)
            .field("xtype", &self.xtype)
            .field("ytype", &self.ytype)
            .field("ztype", &self.ztype)
            .finish()
    }
}
