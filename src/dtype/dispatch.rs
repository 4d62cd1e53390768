//! Runtime dtype to Rust type dispatch

/// Dispatch on a built-in dtype, binding the matching Rust type to `$T`
///
/// User-defined types have no Rust type; the macro returns
/// `Err(Error::UnsupportedOperatorPath)` from the enclosing function for them,
/// so callers can fall back to a byte-level worker.
///
/// # Example
///
/// ```ignore
/// dispatch_dtype!(dtype, T => {
///     reduce_typed::<T>(values, identity)
/// }, "reduce")
/// ```
#[macro_export]
macro_rules! dispatch_dtype {
    ($dtype:expr, $T:ident => $body:block, $error_op:expr) => {
        match $dtype {
            $crate::dtype::DType::Bool => {
                type $T = bool;
                $body
            }
            $crate::dtype::DType::I8 => {
                type $T = i8;
                $body
            }
            $crate::dtype::DType::I16 => {
                type $T = i16;
                $body
            }
            $crate::dtype::DType::I32 => {
                type $T = i32;
                $body
            }
            $crate::dtype::DType::I64 => {
                type $T = i64;
                $body
            }
            $crate::dtype::DType::U8 => {
                type $T = u8;
                $body
            }
            $crate::dtype::DType::U16 => {
                type $T = u16;
                $body
            }
            $crate::dtype::DType::U32 => {
                type $T = u32;
                $body
            }
            $crate::dtype::DType::U64 => {
                type $T = u64;
                $body
            }
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::dtype::DType::Udt(_) => {
                return Err($crate::error::Error::unsupported_path($error_op, $dtype));
            }
        }
    };
}
