//! Dtype-tagged single value

use super::{cast_fn, DType, Element};
use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;

/// A single value of a runtime type
///
/// Used for monoid identities and terminals, reduction results, and the
/// `k` argument of select operators. Built-in values fit inline; larger
/// user-defined values spill to the heap.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Scalar {
    dtype: DType,
    bytes: SmallVec<[u8; 16]>,
}

impl Scalar {
    /// Create a scalar from a Rust value
    pub fn new<T: Element>(value: T) -> Self {
        let mut bytes = SmallVec::from_elem(0u8, T::DTYPE.size_in_bytes());
        value.write(&mut bytes);
        Self {
            dtype: T::DTYPE,
            bytes,
        }
    }

    /// Create a scalar from raw bytes of `dtype`
    ///
    /// This is the only way to make a scalar of a user-defined type.
    pub fn from_bytes(dtype: DType, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != dtype.size_in_bytes() {
            return Err(Error::invalid_handle(
                "scalar",
                format!(
                    "{} bytes given for type {} of size {}",
                    bytes.len(),
                    dtype,
                    dtype.size_in_bytes()
                ),
            ));
        }
        Ok(Self {
            dtype,
            bytes: SmallVec::from_slice(bytes),
        })
    }

    /// All-zero value of `dtype`
    pub fn zero(dtype: DType) -> Self {
        Self {
            dtype,
            bytes: SmallVec::from_elem(0u8, dtype.size_in_bytes()),
        }
    }

    /// Type of the value
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Raw value bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Raw value bytes, mutable
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Read the value as `T`; the scalar must be of type `T`
    pub fn get<T: Element>(&self) -> Result<T> {
        if self.dtype != T::DTYPE {
            return Err(Error::domain("scalar get", self.dtype, T::DTYPE));
        }
        Ok(T::read(&self.bytes))
    }

    /// Cast the value to another type
    pub fn cast(&self, to: DType) -> Result<Scalar> {
        let cast = cast_fn(self.dtype, to)?;
        let mut out = Scalar::zero(to);
        cast(&mut out.bytes, &self.bytes);
        Ok(out)
    }
}

impl<T: Element> From<T> for Scalar {
    fn from(value: T) -> Self {
        Scalar::new(value)
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: Option<String> = (|| -> Result<String> {
            crate::dispatch_dtype!(self.dtype, T => {
                Ok(format!("{:?}", T::read(&self.bytes)))
            }, "debug")
        })()
        .ok();
        match shown {
            Some(v) => write!(f, "Scalar({}: {})", self.dtype, v),
            None => write!(f, "Scalar({}: {:?})", self.dtype, self.bytes.as_slice()),
        }
    }
}
