//! Typed scalar kernels behind the built-in operators
//!
//! Each built-in opcode maps to a plain `fn` over a concrete element type.
//! Byte-level operators wrap these, and the typed fast paths (reduce) call
//! them directly.

use super::{BinaryOpcode, UnaryOpcode};
use crate::dtype::Element;

/// Arithmetic every built-in element type supports
///
/// Integers wrap on overflow. Integer division by zero yields 0 for `0/0`,
/// otherwise the type's maximum (positive numerator) or minimum (negative
/// numerator). On `bool`, `plus` is OR, `minus` is XOR, `times` is AND,
/// `div` returns its first argument, `min` is AND and `max` is OR.
pub trait Arith: Element {
    /// `x + y`
    fn plus(self, y: Self) -> Self;
    /// `x - y`
    fn minus(self, y: Self) -> Self;
    /// `x * y`
    fn times(self, y: Self) -> Self;
    /// `x / y`
    fn div(self, y: Self) -> Self;
    /// Smaller of `x` and `y`; for floats a NaN loses to a number
    fn min_of(self, y: Self) -> Self;
    /// Larger of `x` and `y`; for floats a NaN loses to a number
    fn max_of(self, y: Self) -> Self;
    /// `-x`
    fn ainv(self) -> Self;
    /// `|x|`
    fn abs_of(self) -> Self;
    /// `1 / x`
    fn minv(self) -> Self;
}

macro_rules! impl_arith_signed {
    ($($t:ty),*) => {
        $(
            impl Arith for $t {
                #[inline]
                fn plus(self, y: Self) -> Self {
                    self.wrapping_add(y)
                }

                #[inline]
                fn minus(self, y: Self) -> Self {
                    self.wrapping_sub(y)
                }

                #[inline]
                fn times(self, y: Self) -> Self {
                    self.wrapping_mul(y)
                }

                #[inline]
                fn div(self, y: Self) -> Self {
                    if y == 0 {
                        match self {
                            0 => 0,
                            x if x > 0 => <$t>::MAX,
                            _ => <$t>::MIN,
                        }
                    } else {
                        // MIN / -1 wraps back to MIN
                        self.wrapping_div(y)
                    }
                }

                #[inline]
                fn min_of(self, y: Self) -> Self {
                    Ord::min(self, y)
                }

                #[inline]
                fn max_of(self, y: Self) -> Self {
                    Ord::max(self, y)
                }

                #[inline]
                fn ainv(self) -> Self {
                    self.wrapping_neg()
                }

                #[inline]
                fn abs_of(self) -> Self {
                    self.wrapping_abs()
                }

                #[inline]
                fn minv(self) -> Self {
                    Arith::div(1, self)
                }
            }
        )*
    };
}

macro_rules! impl_arith_unsigned {
    ($($t:ty),*) => {
        $(
            impl Arith for $t {
                #[inline]
                fn plus(self, y: Self) -> Self {
                    self.wrapping_add(y)
                }

                #[inline]
                fn minus(self, y: Self) -> Self {
                    self.wrapping_sub(y)
                }

                #[inline]
                fn times(self, y: Self) -> Self {
                    self.wrapping_mul(y)
                }

                #[inline]
                fn div(self, y: Self) -> Self {
                    if y == 0 {
                        if self == 0 { 0 } else { <$t>::MAX }
                    } else {
                        self / y
                    }
                }

                #[inline]
                fn min_of(self, y: Self) -> Self {
                    Ord::min(self, y)
                }

                #[inline]
                fn max_of(self, y: Self) -> Self {
                    Ord::max(self, y)
                }

                #[inline]
                fn ainv(self) -> Self {
                    self.wrapping_neg()
                }

                #[inline]
                fn abs_of(self) -> Self {
                    self
                }

                #[inline]
                fn minv(self) -> Self {
                    Arith::div(1, self)
                }
            }
        )*
    };
}

macro_rules! impl_arith_float {
    ($($t:ty),*) => {
        $(
            impl Arith for $t {
                #[inline]
                fn plus(self, y: Self) -> Self {
                    self + y
                }

                #[inline]
                fn minus(self, y: Self) -> Self {
                    self - y
                }

                #[inline]
                fn times(self, y: Self) -> Self {
                    self * y
                }

                #[inline]
                fn div(self, y: Self) -> Self {
                    self / y
                }

                #[inline]
                fn min_of(self, y: Self) -> Self {
                    self.min(y)
                }

                #[inline]
                fn max_of(self, y: Self) -> Self {
                    self.max(y)
                }

                #[inline]
                fn ainv(self) -> Self {
                    -self
                }

                #[inline]
                fn abs_of(self) -> Self {
                    self.abs()
                }

                #[inline]
                fn minv(self) -> Self {
                    1.0 / self
                }
            }
        )*
    };
}

impl_arith_signed!(i8, i16, i32, i64);
impl_arith_unsigned!(u8, u16, u32, u64);
impl_arith_float!(f32, f64);

impl Arith for bool {
    #[inline]
    fn plus(self, y: Self) -> Self {
        self || y
    }

    #[inline]
    fn minus(self, y: Self) -> Self {
        self != y
    }

    #[inline]
    fn times(self, y: Self) -> Self {
        self && y
    }

    #[inline]
    fn div(self, _y: Self) -> Self {
        self
    }

    #[inline]
    fn min_of(self, y: Self) -> Self {
        self && y
    }

    #[inline]
    fn max_of(self, y: Self) -> Self {
        self || y
    }

    #[inline]
    fn ainv(self) -> Self {
        self
    }

    #[inline]
    fn abs_of(self) -> Self {
        self
    }

    #[inline]
    fn minv(self) -> Self {
        true
    }
}

/// Typed kernel for an opcode whose result has the operand type
pub fn typed_binary<T: Arith>(opcode: BinaryOpcode) -> Option<fn(T, T) -> T> {
    use BinaryOpcode::*;
    let f: fn(T, T) -> T = match opcode {
        First => |x, _| x,
        Second => |_, y| y,
        Min => |x, y| x.min_of(y),
        Max => |x, y| x.max_of(y),
        Plus => |x, y| x.plus(y),
        Minus => |x, y| x.minus(y),
        Rminus => |x, y| y.minus(x),
        Times => |x, y| x.times(y),
        Div => |x, y| x.div(y),
        Rdiv => |x, y| y.div(x),
        Iseq => |x, y| T::from_bool(x == y),
        Isne => |x, y| T::from_bool(x != y),
        Isgt => |x, y| T::from_bool(x > y),
        Islt => |x, y| T::from_bool(x < y),
        Isge => |x, y| T::from_bool(x >= y),
        Isle => |x, y| T::from_bool(x <= y),
        Lor => |x, y| T::from_bool(x.is_nonzero() || y.is_nonzero()),
        Land => |x, y| T::from_bool(x.is_nonzero() && y.is_nonzero()),
        Lxor => |x, y| T::from_bool(x.is_nonzero() != y.is_nonzero()),
        Eq | Ne | Gt | Lt | Ge | Le | User => return None,
    };
    Some(f)
}

/// Typed kernel for a comparison opcode (result is always `bool`)
pub fn typed_compare<T: Element>(opcode: BinaryOpcode) -> Option<fn(T, T) -> bool> {
    use BinaryOpcode::*;
    let f: fn(T, T) -> bool = match opcode {
        Eq => |x, y| x == y,
        Ne => |x, y| x != y,
        Gt => |x, y| x > y,
        Lt => |x, y| x < y,
        Ge => |x, y| x >= y,
        Le => |x, y| x <= y,
        _ => return None,
    };
    Some(f)
}

/// Typed kernel for a unary opcode
pub fn typed_unary<T: Arith>(opcode: UnaryOpcode) -> Option<fn(T) -> T> {
    use UnaryOpcode::*;
    let f: fn(T) -> T = match opcode {
        Identity => |x| x,
        Ainv => |x| x.ainv(),
        Minv => |x| x.minv(),
        Abs => |x| x.abs_of(),
        Lnot => |x| T::from_bool(!x.is_nonzero()),
        One => |_| T::one(),
        User => return None,
    };
    Some(f)
}
