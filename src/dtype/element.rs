//! Element trait for mapping Rust types to DType

use super::DType;
use std::fmt::Debug;

/// Trait for Rust types that can be stored as matrix values
///
/// This trait connects Rust's type system to sparsegrb's runtime dtype
/// system. It is implemented for `bool` and all primitive integer and
/// floating point types.
///
/// Values live in untyped byte buffers, so every element knows how to read
/// itself from and write itself to a byte slice of exactly
/// `DTYPE.size_in_bytes()` bytes, without alignment requirements.
///
/// The conversion methods implement C cast semantics: integer to integer
/// truncates, float to integer saturates (NaN becomes 0), and anything to
/// bool is `x != 0`.
pub trait Element: Copy + Send + Sync + PartialEq + PartialOrd + Debug + 'static {
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Read a value from its byte representation
    fn read(bytes: &[u8]) -> Self;

    /// Write this value into `out`
    fn write(self, out: &mut [u8]);

    /// Convert to i64 with `as` semantics
    fn to_i64(self) -> i64;

    /// Convert to u64 with `as` semantics
    fn to_u64(self) -> u64;

    /// Convert to f64
    fn to_f64(self) -> f64;

    /// True unless the value equals zero
    fn is_nonzero(self) -> bool;

    /// Cast from i64
    fn from_i64(v: i64) -> Self;

    /// Cast from u64
    fn from_u64(v: u64) -> Self;

    /// Cast from f64
    fn from_f64(v: f64) -> Self;

    /// Cast from bool (0 or 1)
    fn from_bool(v: bool) -> Self;

    /// Zero value
    fn zero() -> Self;

    /// One value
    fn one() -> Self;

    /// Smallest value; negative infinity for floats
    fn lowest() -> Self;

    /// Largest value; positive infinity for floats
    fn highest() -> Self;
}

macro_rules! impl_element_int {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$dtype;

                #[inline]
                fn read(bytes: &[u8]) -> Self {
                    bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<$t>()])
                }

                #[inline]
                fn write(self, out: &mut [u8]) {
                    out[..std::mem::size_of::<$t>()].copy_from_slice(bytemuck::bytes_of(&self));
                }

                #[inline]
                fn to_i64(self) -> i64 {
                    self as i64
                }

                #[inline]
                fn to_u64(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn is_nonzero(self) -> bool {
                    self != 0
                }

                #[inline]
                fn from_i64(v: i64) -> Self {
                    v as $t
                }

                #[inline]
                fn from_u64(v: u64) -> Self {
                    v as $t
                }

                #[inline]
                fn from_f64(v: f64) -> Self {
                    v as $t
                }

                #[inline]
                fn from_bool(v: bool) -> Self {
                    v as $t
                }

                #[inline]
                fn zero() -> Self {
                    0
                }

                #[inline]
                fn one() -> Self {
                    1
                }

                #[inline]
                fn lowest() -> Self {
                    <$t>::MIN
                }

                #[inline]
                fn highest() -> Self {
                    <$t>::MAX
                }
            }
        )*
    };
}

macro_rules! impl_element_float {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$dtype;

                #[inline]
                fn read(bytes: &[u8]) -> Self {
                    bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<$t>()])
                }

                #[inline]
                fn write(self, out: &mut [u8]) {
                    out[..std::mem::size_of::<$t>()].copy_from_slice(bytemuck::bytes_of(&self));
                }

                #[inline]
                fn to_i64(self) -> i64 {
                    self as i64
                }

                #[inline]
                fn to_u64(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn is_nonzero(self) -> bool {
                    self != 0.0
                }

                #[inline]
                fn from_i64(v: i64) -> Self {
                    v as $t
                }

                #[inline]
                fn from_u64(v: u64) -> Self {
                    v as $t
                }

                #[inline]
                fn from_f64(v: f64) -> Self {
                    v as $t
                }

                #[inline]
                fn from_bool(v: bool) -> Self {
                    if v { 1.0 } else { 0.0 }
                }

                #[inline]
                fn zero() -> Self {
                    0.0
                }

                #[inline]
                fn one() -> Self {
                    1.0
                }

                #[inline]
                fn lowest() -> Self {
                    <$t>::NEG_INFINITY
                }

                #[inline]
                fn highest() -> Self {
                    <$t>::INFINITY
                }
            }
        )*
    };
}

impl_element_int!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
);

impl_element_float!(f32 => F32, f64 => F64);

// bool is not Pod: any nonzero byte reads as true, and true is written as 1.
impl Element for bool {
    const DTYPE: DType = DType::Bool;

    #[inline]
    fn read(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn write(self, out: &mut [u8]) {
        out[0] = self as u8;
    }

    #[inline]
    fn to_i64(self) -> i64 {
        self as i64
    }

    #[inline]
    fn to_u64(self) -> u64 {
        self as u64
    }

    #[inline]
    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }

    #[inline]
    fn is_nonzero(self) -> bool {
        self
    }

    #[inline]
    fn from_i64(v: i64) -> Self {
        v != 0
    }

    #[inline]
    fn from_u64(v: u64) -> Self {
        v != 0
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v != 0.0
    }

    #[inline]
    fn from_bool(v: bool) -> Self {
        v
    }

    #[inline]
    fn zero() -> Self {
        false
    }

    #[inline]
    fn one() -> Self {
        true
    }

    #[inline]
    fn lowest() -> Self {
        false
    }

    #[inline]
    fn highest() -> Self {
        true
    }
}
