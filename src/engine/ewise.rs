//! Element-wise union (eWiseAdd) and intersection (eWiseMult)

use super::slice::{ntasks_for, slice_by_cost, two_phase, VectorIds, VectorKernel};
use super::{check_dims, check_mask, check_output, operand_view, quick_mask, write_output};
use crate::algebra::{BinaryOp, BoundBinary};
use crate::config::{Config, Descriptor};
use crate::dtype::{cast_fn, CastFn};
use crate::error::{Error, Result};
use crate::sparse::{Conformed, CsView, Matrix};

/// Which positions the result covers
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Pattern {
    /// Positions in A or B; `op` applies only where both have an entry
    Union,
    /// Positions in both A and B
    Intersection,
}

impl Pattern {
    fn name(self) -> &'static str {
        match self {
            Pattern::Union => "ewise_add",
            Pattern::Intersection => "ewise_mult",
        }
    }
}

struct Ewise<'a> {
    a: CsView<'a>,
    b: CsView<'a>,
    op: BoundBinary<'a>,
    cast_a: CastFn,
    cast_b: CastFn,
    zsize: usize,
    pattern: Pattern,
}

enum Hit {
    A(usize),
    B(usize),
    Both(usize, usize),
}

impl Ewise<'_> {
    fn merge(&self, j: usize, mut emit: impl FnMut(usize, Hit)) {
        let (ar, br) = (self.a.lookup(j), self.b.lookup(j));
        let (mut pa, mut pb) = (ar.start, br.start);
        if self.pattern == Pattern::Intersection && (ar.is_empty() || br.is_empty()) {
            return;
        }
        while pa < ar.end && pb < br.end {
            let (ia, ib) = (self.a.index(pa), self.b.index(pb));
            if ia < ib {
                if self.pattern == Pattern::Union {
                    emit(ia, Hit::A(pa));
                }
                pa += 1;
            } else if ib < ia {
                if self.pattern == Pattern::Union {
                    emit(ib, Hit::B(pb));
                }
                pb += 1;
            } else {
                emit(ia, Hit::Both(pa, pb));
                pa += 1;
                pb += 1;
            }
        }
        if self.pattern == Pattern::Union {
            for pa in pa..ar.end {
                emit(self.a.index(pa), Hit::A(pa));
            }
            for pb in pb..br.end {
                emit(self.b.index(pb), Hit::B(pb));
            }
        }
    }
}

impl VectorKernel for Ewise<'_> {
    type Workspace = ();

    fn workspace(&self) -> Result<()> {
        Ok(())
    }

    fn count(&self, _: &mut (), j: usize) -> usize {
        let (ar, br) = (self.a.lookup(j), self.b.lookup(j));
        match self.pattern {
            Pattern::Union if ar.is_empty() || br.is_empty() => ar.len() + br.len(),
            _ => {
                let mut n = 0;
                self.merge(j, |_, _| n += 1);
                n
            }
        }
    }

    fn fill(&self, _: &mut (), j: usize, i: &mut [i64], x: &mut [u8]) {
        let size = self.zsize;
        let mut k = 0;
        self.merge(j, |idx, hit| {
            i[k] = idx as i64;
            let z = &mut x[k * size..(k + 1) * size];
            match hit {
                Hit::A(pa) => (self.cast_a)(z, self.a.value(pa)),
                Hit::B(pb) => (self.cast_b)(z, self.b.value(pb)),
                Hit::Both(pa, pb) => self.op.apply(z, self.a.value(pa), self.b.value(pb)),
            }
            k += 1;
        });
    }
}

/// `C<M> = accum(C, A op B)` over the union or intersection of patterns
#[allow(clippy::too_many_arguments)]
pub(crate) fn ewise(
    c: &mut Matrix,
    mask: Option<&Matrix>,
    accum: Option<&BinaryOp>,
    op: &BinaryOp,
    a: &Matrix,
    b: &Matrix,
    desc: &Descriptor,
    config: &Config,
    pattern: Pattern,
) -> Result<()> {
    let name = pattern.name();
    let shape = c.shape();
    check_dims(name, shape, a, desc.transpose_a)?;
    check_dims(name, shape, b, desc.transpose_b)?;
    check_mask(name, shape, mask, desc)?;

    // T is built in C's type unless an accumulator needs the operator's
    // result type; entries present in only one operand are cast straight
    // into it
    let ttype = if accum.is_some() { op.ztype() } else { c.dtype() };
    let domain = |from, to| Error::domain(op.name().to_string(), from, to);
    let bound_check = |from, to| cast_fn(from, to).map_err(|_| domain(from, to));
    bound_check(a.dtype(), op.xtype())?;
    bound_check(b.dtype(), op.ytype())?;
    check_output(c.dtype(), accum, op.ztype())?;
    let (cast_a, cast_b) = match pattern {
        Pattern::Union => (bound_check(a.dtype(), ttype)?, bound_check(b.dtype(), ttype)?),
        Pattern::Intersection => (cast_fn(ttype, ttype)?, cast_fn(ttype, ttype)?),
    };

    if quick_mask(c, mask, desc)? {
        return Ok(());
    }

    let a_store = a.assembled()?;
    let b_store = b.assembled()?;
    let av = operand_view(&a_store, desc.transpose_a);
    let bv = operand_view(&b_store, desc.transpose_b);

    // agree on one orientation, reorienting at most one operand
    let orientation = if av.orientation == bv.orientation {
        av.orientation
    } else {
        c.orientation()
    };
    let ac = Conformed::new(av, orientation)?;
    let bc = Conformed::new(bv, orientation)?;
    let (av, bv) = (ac.view(), bc.view());

    tracing::debug!(
        op = op.name(),
        ?pattern,
        a_nvals = av.nvals(),
        b_nvals = bv.nvals(),
        %orientation,
        "element-wise"
    );

    let kernel = Ewise {
        a: av,
        b: bv,
        op: BoundBinary::new(op, av.dtype, bv.dtype, ttype)?,
        cast_a,
        cast_b,
        zsize: ttype.size_in_bytes(),
        pattern,
    };
    // only vectors some operand stores can hold entries
    let ids = match pattern {
        Pattern::Union => VectorIds::union(&[av, bv])?,
        Pattern::Intersection => VectorIds::intersection(&[av, bv]),
    };
    let ntasks = ntasks_for(config, av.nvals() + bv.nvals(), ids.len());
    let ranges = slice_by_cost(ids.len(), ntasks, |k| {
        let j = ids.id(k);
        av.lookup(j).len() + bv.lookup(j).len()
    });
    let out = two_phase(&kernel, &ids, ttype.size_in_bytes(), &ranges)?;
    let t = out.into_compressed(ttype, av.vlen, av.vdim, orientation);
    write_output(c, mask, accum, t.view(), desc, config)
}
