//! Operator-name resolution
//!
//! Names take the form `op` or `op.type`, and semirings `add.mult` or
//! `add.mult.type`. Operators accept their canonical names plus the MATLAB
//! spellings (`+`, `*`, `==`, `||`, `1st`, ...); types accept every alias
//! [`DType::from_name`] knows.

use super::{BinaryOpcode, UnaryOpcode};
use crate::dtype::DType;

/// Split a trailing type suffix off an operator name
///
/// Returns the name unchanged with `None` when there is no suffix or the
/// suffix is not a type name.
pub(crate) fn split_type(name: &str) -> (&str, Option<DType>) {
    let name = name.trim();
    match name.rsplit_once('.') {
        Some((op, ty)) if !op.is_empty() => match DType::from_name(ty) {
            Ok(dtype) => (op, Some(dtype)),
            Err(_) => (name, None),
        },
        _ => (name, None),
    }
}

/// Resolve a binary operator name
pub(crate) fn binary_opcode(name: &str) -> Option<BinaryOpcode> {
    use BinaryOpcode::*;
    let opcode = match name.trim().to_ascii_lowercase().as_str() {
        "first" | "1st" => First,
        "second" | "2nd" => Second,
        "min" => Min,
        "max" => Max,
        "plus" | "+" => Plus,
        "minus" | "-" => Minus,
        "rminus" => Rminus,
        "times" | "*" => Times,
        "div" | "/" => Div,
        "rdiv" | "\\" => Rdiv,
        "iseq" => Iseq,
        "isne" => Isne,
        "isgt" => Isgt,
        "islt" => Islt,
        "isge" => Isge,
        "isle" => Isle,
        "eq" | "==" => Eq,
        "ne" | "~=" | "!=" => Ne,
        "gt" | ">" => Gt,
        "lt" | "<" => Lt,
        "ge" | ">=" => Ge,
        "le" | "<=" => Le,
        "lor" | "or" | "||" | "|" => Lor,
        "land" | "and" | "&&" | "&" => Land,
        "lxor" | "xor" => Lxor,
        _ => return None,
    };
    Some(opcode)
}

/// Resolve a unary operator name
pub(crate) fn unary_opcode(name: &str) -> Option<UnaryOpcode> {
    use UnaryOpcode::*;
    let opcode = match name.trim().to_ascii_lowercase().as_str() {
        "identity" => Identity,
        "ainv" | "negate" | "-" => Ainv,
        "minv" => Minv,
        "abs" => Abs,
        "lnot" | "not" | "~" | "!" => Lnot,
        "one" => One,
        _ => return None,
    };
    Some(opcode)
}

/// Split a semiring name `add.mult` into its monoid and multiply parts
pub(crate) fn split_semiring(name: &str) -> Option<(&str, &str)> {
    let (add, mult) = name.split_once('.')?;
    if add.is_empty() || mult.is_empty() || mult.contains('.') {
        return None;
    }
    Some((add, mult))
}
