//! Operators bound to the types at a call site

use super::BinaryOp;
use crate::dtype::{cast_fn, CastFn, DType};
use crate::error::{Error, Result};
use smallvec::SmallVec;

type ValueBuf = SmallVec<[u8; 16]>;

/// A binary operator that reads operands of `atype`/`btype` and writes a
/// result of `ctype`, casting into and out of the operator's own types
pub(crate) struct BoundBinary<'a> {
    op: &'a BinaryOp,
    direct: bool,
    cast_x: CastFn,
    cast_y: CastFn,
    cast_z: CastFn,
}

fn bind_cast(op: &BinaryOp, from: DType, to: DType) -> Result<CastFn> {
    cast_fn(from, to).map_err(|_| Error::domain(op.name().to_string(), from, to))
}

impl<'a> BoundBinary<'a> {
    pub fn new(op: &'a BinaryOp, atype: DType, btype: DType, ctype: DType) -> Result<Self> {
        Ok(Self {
            op,
            direct: atype == op.xtype() && btype == op.ytype() && ctype == op.ztype(),
            cast_x: bind_cast(op, atype, op.xtype())?,
            cast_y: bind_cast(op, btype, op.ytype())?,
            cast_z: bind_cast(op, op.ztype(), ctype)?,
        })
    }

    /// `c = (ctype) op((xtype) a, (ytype) b)`
    #[inline]
    pub fn apply(&self, c: &mut [u8], a: &[u8], b: &[u8]) {
        if self.direct {
            self.op.apply_bytes(c, a, b);
            return;
        }
        let mut x = ValueBuf::from_elem(0, self.op.xtype().size_in_bytes());
        let mut y = ValueBuf::from_elem(0, self.op.ytype().size_in_bytes());
        let mut z = ValueBuf::from_elem(0, self.op.ztype().size_in_bytes());
        (self.cast_x)(&mut x, a);
        (self.cast_y)(&mut y, b);
        self.op.apply_bytes(&mut z, &x, &y);
        (self.cast_z)(c, &z);
    }
}
