//! Default-type promotion for operator resolution

use super::DType;

/// Promote two dtypes to a common dtype
///
/// Used when an operator is named without a type suffix and its type must be
/// derived from the operand types at the call site:
/// - Floats always win over integers and bool
/// - Larger types win over smaller types
/// - Mixing signed and unsigned integers promotes to a signed type wide
///   enough for both
/// - A user-defined type wins over everything, so the resulting lookup
///   fails with a domain error instead of silently picking a built-in
pub fn promote(lhs: DType, rhs: DType) -> DType {
    use DType::*;

    if lhs == rhs {
        return lhs;
    }
    if lhs.is_udt() {
        return lhs;
    }
    if rhs.is_udt() {
        return rhs;
    }

    // Promotion priority (higher = wins)
    let priority = |dt: DType| -> u8 {
        match dt {
            F64 => 100,
            F32 => 90,
            I64 => 65,
            U64 => 60,
            I32 => 55,
            U32 => 50,
            I16 => 45,
            U16 => 40,
            I8 => 35,
            U8 => 30,
            Bool => 25,
            Udt(_) => 0,
        }
    };

    if lhs.is_signed_int() && rhs.is_unsigned_int() {
        return match (lhs, rhs) {
            (I64, _) => I64,
            (I32, U64 | U32) => I64,
            (I32, _) => I32,
            (I16, U64) => I64,
            (I16, U32 | U16) => I32,
            (I16, _) => I16,
            (I8, U64) => I64,
            (I8, U32) => I64,
            (I8, U16) => I32,
            (I8, _) => I16,
            _ => I64,
        };
    }
    if rhs.is_signed_int() && lhs.is_unsigned_int() {
        return promote(rhs, lhs);
    }

    if priority(lhs) >= priority(rhs) {
        lhs
    } else {
        rhs
    }
}
