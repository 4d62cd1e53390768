//! Selecting entries by position or value

use super::slice::{ntasks_for, slice_by_cost, two_phase, VectorIds, VectorKernel};
use super::{check_dims, check_mask, check_output, operand_view, quick_mask, write_output};
use crate::algebra::BinaryOp;
use crate::config::{Config, Descriptor};
use crate::dtype::{cast_fn, CastFn, DType};
use crate::error::{Error, Result};
use crate::sparse::{CsView, Matrix};
use std::fmt;

/// Which entries [`Context::select`](super::Context::select) keeps
///
/// Positional selectors compare the diagonal offset `col - row` of each
/// entry with the thunk `k`: `k = 0` is the main diagonal, `k > 0` above
/// it, `k < 0` below it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SelectOp {
    /// On or below diagonal `k`
    Tril,
    /// On or above diagonal `k`
    Triu,
    /// On diagonal `k`
    Diag,
    /// Off diagonal `k`
    Offdiag,
    /// Entries whose value is not zero; `k` is ignored
    Nonzero,
}

impl SelectOp {
    /// Look up a selector by its lowercase name
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "tril" => Ok(Self::Tril),
            "triu" => Ok(Self::Triu),
            "diag" => Ok(Self::Diag),
            "offdiag" => Ok(Self::Offdiag),
            "nonzero" => Ok(Self::Nonzero),
            _ => Err(Error::UnknownOperator {
                name: name.to_string(),
            }),
        }
    }

    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Self::Tril => "tril",
            Self::Triu => "triu",
            Self::Diag => "diag",
            Self::Offdiag => "offdiag",
            Self::Nonzero => "nonzero",
        }
    }

    #[inline]
    fn keeps_position(self, row: usize, col: usize, k: i64) -> bool {
        let offset = col as i64 - row as i64;
        match self {
            Self::Tril => offset <= k,
            Self::Triu => offset >= k,
            Self::Diag => offset == k,
            Self::Offdiag => offset != k,
            Self::Nonzero => true,
        }
    }
}

impl fmt::Display for SelectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct Select<'a> {
    a: CsView<'a>,
    op: SelectOp,
    k: i64,
    /// Value test for `Nonzero`: a cast to bool, or any nonzero byte for
    /// user types
    to_bool: Option<CastFn>,
}

impl Select<'_> {
    #[inline]
    fn keeps(&self, j: usize, pos: usize) -> bool {
        let (row, col) = self.a.orientation.to_row_col(j, self.a.index(pos));
        if !self.op.keeps_position(row, col, self.k) {
            return false;
        }
        if self.op != SelectOp::Nonzero {
            return true;
        }
        let value = self.a.value(pos);
        match self.to_bool {
            Some(cast) => {
                let mut b = [0u8];
                cast(&mut b, value);
                b[0] != 0
            }
            None => value.iter().any(|&b| b != 0),
        }
    }
}

impl VectorKernel for Select<'_> {
    type Workspace = ();

    fn workspace(&self) -> Result<()> {
        Ok(())
    }

    fn count(&self, _: &mut (), j: usize) -> usize {
        self.a.lookup(j).filter(|&pos| self.keeps(j, pos)).count()
    }

    fn fill(&self, _: &mut (), j: usize, i: &mut [i64], x: &mut [u8]) {
        let size = self.a.value_size();
        let kept = self.a.lookup(j).filter(|&pos| self.keeps(j, pos));
        for (slot, pos) in kept.enumerate() {
            i[slot] = self.a.index(pos) as i64;
            x[slot * size..(slot + 1) * size].copy_from_slice(self.a.value(pos));
        }
    }
}

/// `C<M> = accum(C, select(A, k))`, with `A` optionally transposed
#[allow(clippy::too_many_arguments)]
pub(crate) fn select(
    c: &mut Matrix,
    mask: Option<&Matrix>,
    accum: Option<&BinaryOp>,
    op: SelectOp,
    a: &Matrix,
    k: i64,
    desc: &Descriptor,
    config: &Config,
) -> Result<()> {
    let shape = c.shape();
    check_dims("select", shape, a, desc.transpose_a)?;
    check_mask("select", shape, mask, desc)?;
    check_output(c.dtype(), accum, a.dtype())?;
    if quick_mask(c, mask, desc)? {
        return Ok(());
    }

    let store = a.assembled()?;
    let av = operand_view(&store, desc.transpose_a);
    let to_bool = if av.dtype.is_udt() {
        None
    } else {
        Some(cast_fn(av.dtype, DType::Bool)?)
    };
    let kernel = Select {
        a: av,
        op,
        k,
        to_bool,
    };
    let ids = VectorIds::of(&av);
    let ntasks = ntasks_for(config, av.nvals(), ids.len());
    let ranges = slice_by_cost(ids.len(), ntasks, |k| av.lookup(ids.id(k)).len());
    let out = two_phase(&kernel, &ids, av.value_size(), &ranges)?;
    let t = out.into_compressed(av.dtype, av.vlen, av.vdim, av.orientation);
    write_output(c, mask, accum, t.view(), desc, config)
}
