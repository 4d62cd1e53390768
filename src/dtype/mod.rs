//! Data type system for sparsegrb matrices
//!
//! This module provides the `DType` enum representing all supported element
//! types (the built-in numeric types plus opaque user-defined types), along
//! with the cast table, type promotion, and a dtype-tagged `Scalar`.

mod cast;
mod dispatch;
mod element;
mod promotion;
mod scalar;

pub use cast::{cast_fn, cast_values, convert, is_compatible, CastFn};
pub use element::Element;
pub use promotion::promote;
pub use scalar::Scalar;

use crate::error::{Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

// ============================================================================
// User-defined types
// ============================================================================

/// An opaque fixed-size user type
///
/// Values are plain byte strings of `size` bytes. A user type is compatible
/// only with itself; operators over it are user callables.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserType {
    id: u32,
    size: usize,
    name: &'static str,
}

static NEXT_USER_TYPE: AtomicU32 = AtomicU32::new(1);

impl UserType {
    /// Register a new user type of `size` bytes
    ///
    /// Every call yields a distinct type, even for equal names and sizes.
    /// A size of zero is stored as one byte, so every value occupies a slot.
    pub fn new(name: &'static str, size: usize) -> Self {
        let id = NEXT_USER_TYPE.fetch_add(1, Ordering::Relaxed);
        Self {
            id,
            size: size.max(1),
            name,
        }
    }

    /// Size of one value in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Name given at registration
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Unique registration id
    pub fn id(&self) -> u32 {
        self.id
    }
}

// ============================================================================
// DType Enum
// ============================================================================

/// Data types supported by sparsegrb matrices
///
/// This enum represents the element type of a matrix at runtime. Using an
/// enum (rather than generics) allows operators, monoids and matrices of
/// different types to meet in one call, with casts resolved at runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    /// Boolean (stored as one byte, 0 or 1)
    Bool,
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 8-bit unsigned integer
    U8,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit unsigned integer
    U64,
    /// 32-bit floating point
    F32,
    /// 64-bit floating point
    F64,
    /// Opaque user-defined type
    Udt(UserType),
}

impl DType {
    /// All built-in types, in type-code order
    pub const BUILTIN: [DType; 11] = [
        DType::Bool,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F32,
        DType::F64,
    ];

    /// Size of one element in bytes
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
            Self::Udt(t) => t.size,
        }
    }

    /// Returns true if this is a floating point type
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Returns true if this is a signed integer type
    #[inline]
    pub const fn is_signed_int(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    /// Returns true if this is an unsigned integer type
    #[inline]
    pub const fn is_unsigned_int(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    /// Returns true if this is any integer type (signed or unsigned)
    #[inline]
    pub const fn is_int(self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    /// Returns true if this is the boolean type
    #[inline]
    pub const fn is_bool(self) -> bool {
        matches!(self, Self::Bool)
    }

    /// Returns true for user-defined types
    #[inline]
    pub const fn is_udt(self) -> bool {
        matches!(self, Self::Udt(_))
    }

    /// Short name for display (e.g., "f32", "i64")
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Udt(t) => t.name,
        }
    }

    /// Resolve a type name
    ///
    /// Accepts the short names (`i32`, `f64`, ...), the C-style names
    /// (`int32`, `uint8`, `fp64`, `float64`, ...) and the MATLAB names
    /// (`logical`, `double`, `single`).
    pub fn from_name(name: &str) -> Result<Self> {
        let dtype = match name.trim().to_ascii_lowercase().as_str() {
            "bool" | "logical" | "boolean" => Self::Bool,
            "i8" | "int8" => Self::I8,
            "i16" | "int16" => Self::I16,
            "i32" | "int32" => Self::I32,
            "i64" | "int64" => Self::I64,
            "u8" | "uint8" => Self::U8,
            "u16" | "uint16" => Self::U16,
            "u32" | "uint32" => Self::U32,
            "u64" | "uint64" => Self::U64,
            "f32" | "fp32" | "float32" | "single" | "float" => Self::F32,
            "f64" | "fp64" | "float64" | "double" => Self::F64,
            _ => {
                return Err(Error::UnknownType {
                    name: name.to_string(),
                });
            }
        };
        Ok(dtype)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}
