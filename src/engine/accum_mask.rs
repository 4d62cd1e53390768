//! Writing a computed result into the output through accumulator and mask
//!
//! Every operation computes a temporary `T` and hands it here together with
//! the output `C`. For each position, with `Z = accum(C, T)` when an
//! accumulator is given and `Z = T` otherwise:
//!
//! ```text
//!                   mask allows          mask forbids
//! accum, C and T    accum(C, T)          C (deleted if replace)
//! accum, T only     T                    -
//! accum, C only     C                    C (deleted if replace)
//! no accum, T       T                    C (deleted if replace)
//! no accum, C only  deleted              C (deleted if replace)
//! ```
//!
//! `T` is cast to the type of `C` throughout. The new arrays are built
//! completely before `C` is touched.

use super::mask::Mask;
use super::slice::{ntasks_for, slice_by_cost, two_phase, VectorIds, VectorKernel};
use crate::algebra::{BinaryOp, BoundBinary};
use crate::config::{Config, Descriptor};
use crate::dtype::{cast_fn, cast_values, CastFn, DType};
use crate::error::{Error, Result};
use crate::sparse::{Conformed, CsView, Store};

/// Check that `T` of `ttype` can be written into `C` of `ctype`, through
/// `accum` if given
pub(crate) fn check_output(ctype: DType, accum: Option<&BinaryOp>, ttype: DType) -> Result<()> {
    match accum {
        Some(op) => BoundBinary::new(op, ctype, ttype, ctype).map(|_| ()),
        None => cast_fn(ttype, ctype)
            .map(|_| ())
            .map_err(|_| Error::domain("output", ttype, ctype)),
    }
}

struct AccumMask<'a> {
    c: CsView<'a>,
    t: CsView<'a>,
    mask: Option<Mask<'a>>,
    accum: Option<BoundBinary<'a>>,
    cast_t: CastFn,
    replace: bool,
}

/// What happens at one position
enum Out {
    Keep(usize),
    Cast(usize),
    Accum(usize, usize),
    Drop,
}

impl AccumMask<'_> {
    #[inline]
    fn decide(&self, allowed: bool, c: Option<usize>, t: Option<usize>) -> Out {
        if !allowed {
            return match c {
                Some(pc) if !self.replace => Out::Keep(pc),
                _ => Out::Drop,
            };
        }
        match (c, t, self.accum.is_some()) {
            (Some(pc), Some(pt), true) => Out::Accum(pc, pt),
            (_, Some(pt), _) => Out::Cast(pt),
            (Some(pc), None, true) => Out::Keep(pc),
            _ => Out::Drop,
        }
    }

    /// Merge vector `j` of C and T, calling `emit` for each surviving entry
    fn merge(&self, j: usize, mut emit: impl FnMut(usize, Out)) {
        let (cr, tr) = (self.c.lookup(j), self.t.lookup(j));
        let mut cursor = self.mask.as_ref().map(|m| m.cursor(j));
        let (mut pc, mut pt) = (cr.start, tr.start);
        while pc < cr.end || pt < tr.end {
            let ic = if pc < cr.end { self.c.index(pc) } else { usize::MAX };
            let it = if pt < tr.end { self.t.index(pt) } else { usize::MAX };
            let i = ic.min(it);
            let c = (ic == i).then_some(pc);
            let t = (it == i).then_some(pt);
            if c.is_some() {
                pc += 1;
            }
            if t.is_some() {
                pt += 1;
            }
            let allowed = cursor.as_mut().map_or(true, |m| m.allows(i));
            let out = self.decide(allowed, c, t);
            if !matches!(out, Out::Drop) {
                emit(i, out);
            }
        }
    }
}

impl VectorKernel for AccumMask<'_> {
    type Workspace = ();

    fn workspace(&self) -> Result<()> {
        Ok(())
    }

    fn count(&self, _: &mut (), j: usize) -> usize {
        let mut n = 0;
        self.merge(j, |_, _| n += 1);
        n
    }

    fn fill(&self, _: &mut (), j: usize, i: &mut [i64], x: &mut [u8]) {
        let size = self.c.value_size();
        let mut k = 0;
        self.merge(j, |idx, out| {
            i[k] = idx as i64;
            let z = &mut x[k * size..(k + 1) * size];
            match out {
                Out::Keep(pc) => z.copy_from_slice(self.c.value(pc)),
                Out::Cast(pt) => (self.cast_t)(z, self.t.value(pt)),
                Out::Accum(pc, pt) => {
                    if let Some(acc) = &self.accum {
                        acc.apply(z, self.c.value(pc), self.t.value(pt));
                    }
                }
                Out::Drop => {}
            }
            k += 1;
        });
    }
}

/// `C<M> = accum(C, T)` with the descriptor's replace flag
///
/// `c` must be assembled and `t` must have the shape of `C`. `mask` must
/// already be in `C`'s orientation.
pub(crate) fn accum_mask(
    c: &mut Store,
    mask: Option<Mask<'_>>,
    accum: Option<&BinaryOp>,
    t: CsView<'_>,
    desc: &Descriptor,
    config: &Config,
) -> Result<()> {
    let ctype = c.cs.dtype;
    let orientation = c.cs.orientation;
    debug_assert_eq!(t.shape(), c.cs.shape());

    let accum = accum
        .map(|op| BoundBinary::new(op, ctype, t.dtype, ctype))
        .transpose()?;
    let cast_t = cast_fn(t.dtype, ctype).map_err(|_| Error::domain("output", t.dtype, ctype))?;

    // no mask, no accumulator: C is T
    if mask.is_none() && accum.is_none() && t.orientation == orientation {
        let mut out = t.to_owned();
        if t.dtype != ctype {
            out.x = cast_values(t.x, t.dtype, ctype)?;
            out.dtype = ctype;
        }
        return c.replace(out);
    }

    let t = Conformed::new(t, orientation)?;
    let cv = c.view();
    let kernel = AccumMask {
        c: cv,
        t: t.view(),
        mask,
        accum,
        cast_t,
        replace: desc.replace,
    };
    // positions outside both C and T produce nothing
    let ids = VectorIds::union(&[cv, kernel.t])?;
    let work = cv.nvals() + kernel.t.nvals();
    let ntasks = ntasks_for(config, work, ids.len());
    let ranges = slice_by_cost(ids.len(), ntasks, |k| {
        let j = ids.id(k);
        cv.lookup(j).len() + kernel.t.lookup(j).len()
    });
    let out = two_phase(&kernel, &ids, ctype.size_in_bytes(), &ranges)?;
    let result = out.into_compressed(ctype, cv.vlen, cv.vdim, orientation);
    c.replace(result)
}
