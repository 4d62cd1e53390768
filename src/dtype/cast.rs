//! Cast table between element types
//!
//! Every pair of built-in types has an implicit cast; a user-defined type
//! only casts to itself. Casts operate on raw value bytes so they can be
//! applied to any value buffer without knowing its Rust type.

use super::{DType, Element};
use crate::error::{Error, Result};

/// Byte-level cast: `dst = (dst type) src`
pub type CastFn = fn(&mut [u8], &[u8]);

/// Returns true if values of type `from` can be implicitly cast to `to`
pub fn is_compatible(from: DType, to: DType) -> bool {
    match (from, to) {
        (DType::Udt(a), DType::Udt(b)) => a == b,
        (DType::Udt(_), _) | (_, DType::Udt(_)) => false,
        _ => true,
    }
}

/// Convert one value between element types with C cast semantics
#[inline]
pub fn convert<S: Element, D: Element>(s: S) -> D {
    let from = S::DTYPE;
    if from.is_bool() || D::DTYPE.is_bool() {
        D::from_bool(s.is_nonzero())
    } else if from.is_float() {
        D::from_f64(s.to_f64())
    } else if from.is_signed_int() {
        D::from_i64(s.to_i64())
    } else {
        D::from_u64(s.to_u64())
    }
}

fn cast_value<S: Element, D: Element>(dst: &mut [u8], src: &[u8]) {
    convert::<S, D>(S::read(src)).write(dst);
}

fn copy_value(dst: &mut [u8], src: &[u8]) {
    dst.copy_from_slice(src);
}

fn cast_from<S: Element>(to: DType) -> Result<CastFn> {
    crate::dispatch_dtype!(to, D => {
        Ok(cast_value::<S, D> as CastFn)
    }, "cast")
}

/// Look up the cast function from `from` to `to`
///
/// Returns `DomainMismatch` if the types are not compatible.
pub fn cast_fn(from: DType, to: DType) -> Result<CastFn> {
    if from == to {
        return Ok(copy_value);
    }
    if !is_compatible(from, to) {
        return Err(Error::domain("cast", from, to));
    }
    crate::dispatch_dtype!(from, S => {
        cast_from::<S>(to)
    }, "cast")
}

/// Cast a whole value buffer from `from` to `to`
pub fn cast_values(x: &[u8], from: DType, to: DType) -> Result<Vec<u8>> {
    if from == to {
        return Ok(x.to_vec());
    }
    let cast = cast_fn(from, to)?;
    let (asize, zsize) = (from.size_in_bytes(), to.size_in_bytes());
    let n = if asize == 0 { 0 } else { x.len() / asize };
    let mut out = crate::error::try_alloc(n * zsize, 0u8)?;
    for (dst, src) in out.chunks_exact_mut(zsize).zip(x.chunks_exact(asize)) {
        cast(dst, src);
    }
    Ok(out)
}
