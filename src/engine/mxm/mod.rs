//! Semiring matrix multiply: `C<M> = accum(C, A ⊕.⊗ B)`
//!
//! The product is built one output vector at a time in `C`'s orientation.
//! For a row-oriented `C`, output vector `j` is row `j` of `A·B`. For a
//! column-oriented `C` the same code computes the rows of `(A·B)ᵀ = Bᵀ·Aᵀ`,
//! with the multiply operator's arguments swapped, which are exactly the
//! columns of `A·B`.
//!
//! Three kernels produce the vectors:
//!
//! - **Gustavson**: scatter `L(j,k) ⊗ R(k,:)` into a dense workspace over
//!   the output vector, with generation marks instead of clearing
//! - **Dot**: each output entry is the ⊕-reduction over the sorted
//!   intersection of `L(j,:)` and a vector of the other operand, stopping
//!   at the monoid's terminal value
//! - **Heap**: k-way merge of the `R(k,:)` vectors keyed by output index
//!
//! All three combine contributions to an entry in ascending `k` order,
//! starting from the first contribution rather than the identity, so they
//! produce identical results.

mod dot;
mod gustavson;
mod heap;

use super::mask::Mask;
use super::slice::{ntasks_for, slice_by_cost, two_phase, VectorIds, VectorKernel};
use super::{check_mask, check_output, conform_mask, finish, operand_view, quick_mask};
use crate::algebra::{BinaryOp, Monoid, Semiring};
use crate::config::{AxbMethod, Config, Descriptor};
use crate::dtype::{cast_values, DType};
use crate::error::{Error, Result};
use crate::sparse::{Compressed, Conformed, CsView, Matrix};
use std::borrow::Cow;

/// Operators and operands shared by the kernels
///
/// `l` supplies the output vectors: vector `j` of `l` lists the `k` terms
/// of output vector `j`. Values are already in the multiply operator's
/// input types.
#[derive(Clone, Copy)]
pub(super) struct Product<'a> {
    pub l: CsView<'a>,
    pub mult: &'a BinaryOp,
    pub add: &'a Monoid,
    pub mask: Option<Mask<'a>>,
    pub zsize: usize,
}

impl Product<'_> {
    /// `acc = acc ⊕ t`
    #[inline]
    pub fn accumulate(&self, acc: &mut [u8], t: &[u8], tmp: &mut [u8]) {
        tmp.copy_from_slice(acc);
        self.add.op().apply_bytes(acc, tmp, t);
    }
}

fn cast_to(v: CsView<'_>, dtype: DType) -> Result<Cow<'_, [u8]>> {
    if v.dtype == dtype {
        Ok(Cow::Borrowed(v.x))
    } else {
        Ok(Cow::Owned(cast_values(v.x, v.dtype, dtype)?))
    }
}

/// Pick a kernel by estimated cost
///
/// `flops` estimates the number of multiplies, `vlen` is the output vector
/// length. `r_by_output` is true when the right-hand operand is already
/// stored by output index, as the dot kernel reads it.
fn select_method(
    desc: &Descriptor,
    mask: Option<&Mask<'_>>,
    flops: usize,
    vlen: usize,
    r_by_output: bool,
) -> AxbMethod {
    if desc.axb_method != AxbMethod::Auto {
        return desc.axb_method;
    }
    match mask {
        // few allowed positions: compute only those
        Some(m) if !m.is_complemented() && m.nvals().saturating_mul(8) <= flops => AxbMethod::Dot,
        None if desc.transpose_a && r_by_output && flops > vlen => AxbMethod::Dot,
        // a dense workspace would dwarf the work
        _ if vlen > flops.saturating_mul(16) => AxbMethod::Heap,
        _ => AxbMethod::Gustavson,
    }
}

fn run<K: VectorKernel>(
    kernel: &K,
    l: CsView<'_>,
    vlen: usize,
    ztype: DType,
    cost: impl Fn(usize) -> usize,
    flops: usize,
    config: &Config,
) -> Result<Compressed> {
    // output vector j is empty unless L(j,:) is stored
    let ids = VectorIds::of(&l);
    let ntasks = ntasks_for(config, flops, ids.len());
    let ranges = slice_by_cost(ids.len(), ntasks, |k| cost(ids.id(k)));
    let out = two_phase(kernel, &ids, ztype.size_in_bytes(), &ranges)?;
    Ok(out.into_compressed(ztype, vlen, l.vdim, l.orientation))
}

/// `C<M> = accum(C, A ⊕.⊗ B)`
#[allow(clippy::too_many_arguments)]
pub(crate) fn mxm(
    c: &mut Matrix,
    mask: Option<&Matrix>,
    accum: Option<&BinaryOp>,
    semiring: &Semiring,
    a: &Matrix,
    b: &Matrix,
    desc: &Descriptor,
    config: &Config,
) -> Result<()> {
    let shape = c.shape();
    let [am, ak] = transposed_shape(a.shape(), desc.transpose_a);
    let [bk, bn] = transposed_shape(b.shape(), desc.transpose_b);
    if ak != bk {
        return Err(Error::dimension("mxm", [ak, bn], [bk, bn]));
    }
    if shape != [am, bn] {
        return Err(Error::dimension("mxm", [am, bn], shape));
    }
    check_mask("mxm", shape, mask, desc)?;

    let mult = semiring.multiply();
    let ztype = semiring.dtype();
    let domain = |from, to| Error::domain(mult.name().to_string(), from, to);
    if !crate::dtype::is_compatible(a.dtype(), mult.xtype()) {
        return Err(domain(a.dtype(), mult.xtype()));
    }
    if !crate::dtype::is_compatible(b.dtype(), mult.ytype()) {
        return Err(domain(b.dtype(), mult.ytype()));
    }
    check_output(c.dtype(), accum, ztype)?;

    if quick_mask(c, mask, desc)? {
        return Ok(());
    }

    let a_store = a.assembled()?;
    let b_store = b.assembled()?;
    let av = operand_view(&a_store, desc.transpose_a);
    let bv = operand_view(&b_store, desc.transpose_b);

    // row-oriented C: rows of A times B; column-oriented C: columns of
    // Bᵀ·Aᵀ, i.e. B's columns against A, with the multiply flipped
    let orientation = c.orientation();
    let (l_src, r_src, op) = if orientation.is_by_row() {
        (av, bv, Cow::Borrowed(mult))
    } else {
        (bv, av, Cow::Owned(mult.flipped()))
    };
    let op: &BinaryOp = &op;
    let lx = cast_to(l_src, op.xtype())?;
    let rx = cast_to(r_src, op.ytype())?;
    let l_src = l_src.with_values(&lx, op.xtype());
    let r_src = r_src.with_values(&rx, op.ytype());

    let m_store = mask.map(Matrix::assembled).transpose()?;
    let m_conf = conform_mask(m_store.as_deref(), orientation)?;
    let m = m_conf
        .as_ref()
        .map(|v| Mask::new(v.view(), desc))
        .transpose()?;

    let inner = ak.max(1);
    let flops = l_src.nvals().saturating_mul(r_src.nvals().div_ceil(inner));
    let (vlen, _) = orientation.split(shape[0], shape[1]);
    let r_by_output = r_src.orientation == orientation.flip();
    let method = select_method(desc, m.as_ref(), flops, vlen, r_by_output);
    tracing::debug!(
        add = semiring.add().op().name(),
        multiply = mult.name(),
        ?method,
        flops,
        %orientation,
        "mxm"
    );

    let l = Conformed::new(l_src, orientation)?;
    let lv = l.view();
    let product = Product {
        l: lv,
        mult: op,
        add: semiring.add(),
        mask: m,
        zsize: ztype.size_in_bytes(),
    };

    let t = match method {
        AxbMethod::Dot => {
            let d = Conformed::new(r_src, orientation.flip())?;
            let kernel = dot::Dot::new(product, d.view());
            let cost = |j: usize| lv.lookup(j).len() * kernel.candidates(j);
            run(&kernel, lv, vlen, ztype, cost, flops, config)?
        }
        AxbMethod::Heap | AxbMethod::Gustavson | AxbMethod::Auto => {
            let r = Conformed::new(r_src, orientation)?;
            let rv = r.view();
            let cost = |j: usize| {
                lv.lookup(j)
                    .map(|pl| rv.lookup(lv.index(pl)).len())
                    .sum::<usize>()
            };
            if method == AxbMethod::Heap {
                let kernel = heap::Heap::new(product, rv);
                run(&kernel, lv, vlen, ztype, cost, flops, config)?
            } else {
                let kernel = gustavson::Gustavson::new(product, rv);
                run(&kernel, lv, vlen, ztype, cost, flops, config)?
            }
        }
    };
    finish(c, m, accum, t.view(), desc, config)
}

fn transposed_shape(shape: [usize; 2], transpose: bool) -> [usize; 2] {
    if transpose {
        [shape[1], shape[0]]
    } else {
        shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::BinaryOpcode;
    use crate::sparse::Orientation;

    fn matrix(
        nrows: usize,
        ncols: usize,
        entries: &[(usize, usize, i64)],
        orientation: Orientation,
    ) -> Matrix {
        let cfg = Config::new().with_orientation(orientation);
        let mut m = Matrix::new_with(DType::I64, nrows, ncols, &cfg).unwrap();
        for &(r, c, v) in entries {
            m.set_element(r, c, v).unwrap();
        }
        m
    }

    fn entries(m: &Matrix) -> Vec<(usize, usize, i64)> {
        let (r, c, v) = m.extract_tuples::<i64>().unwrap();
        let mut out: Vec<_> = r.into_iter().zip(c).zip(v).map(|((r, c), v)| (r, c, v)).collect();
        out.sort();
        out
    }

    const METHODS: [AxbMethod; 3] = [AxbMethod::Gustavson, AxbMethod::Dot, AxbMethod::Heap];

    #[test]
    fn test_plus_times_all_methods_and_orientations() {
        // [1 2; 0 3] * [4 0; 5 6] = [14 12; 15 18]
        let sr = Semiring::plus_times(DType::I64).unwrap();
        for oa in [Orientation::ByRow, Orientation::ByCol] {
            for oc in [Orientation::ByRow, Orientation::ByCol] {
                for method in METHODS {
                    let a = matrix(2, 2, &[(0, 0, 1), (0, 1, 2), (1, 1, 3)], oa);
                    let b = matrix(2, 2, &[(0, 0, 4), (1, 0, 5), (1, 1, 6)], Orientation::ByRow);
                    let mut c = matrix(2, 2, &[], oc);
                    let d = Descriptor::new().method(method);
                    mxm(&mut c, None, None, &sr, &a, &b, &d, &Config::new()).unwrap();
                    assert_eq!(
                        entries(&c),
                        vec![(0, 0, 14), (0, 1, 12), (1, 0, 15), (1, 1, 18)],
                        "{:?} {:?} {:?}",
                        oa,
                        oc,
                        method
                    );
                }
            }
        }
    }

    #[test]
    fn test_noncommutative_multiply_keeps_operand_order() {
        // minus: C(i,j) = sum_k A(i,k) - B(k,j)
        let sr = Semiring::builtin(BinaryOpcode::Plus, BinaryOpcode::Minus, DType::I64).unwrap();
        let a = matrix(1, 2, &[(0, 0, 10), (0, 1, 20)], Orientation::ByRow);
        let b = matrix(2, 1, &[(0, 0, 1), (1, 0, 2)], Orientation::ByRow);
        for oc in [Orientation::ByRow, Orientation::ByCol] {
            for method in METHODS {
                let mut c = matrix(1, 1, &[], oc);
                let d = Descriptor::new().method(method);
                mxm(&mut c, None, None, &sr, &a, &b, &d, &Config::new()).unwrap();
                assert_eq!(entries(&c), vec![(0, 0, 27)]);
            }
        }
    }

    #[test]
    fn test_masked_product() {
        let sr = Semiring::plus_times(DType::I64).unwrap();
        let a = matrix(2, 2, &[(0, 0, 1), (0, 1, 2), (1, 1, 3)], Orientation::ByRow);
        let b = matrix(2, 2, &[(0, 0, 4), (1, 0, 5), (1, 1, 6)], Orientation::ByRow);
        let mask = matrix(2, 2, &[(0, 1, 1), (1, 0, 1)], Orientation::ByCol);
        for method in METHODS {
            let mut c = matrix(2, 2, &[], Orientation::ByRow);
            let d = Descriptor::new().method(method);
            mxm(&mut c, Some(&mask), None, &sr, &a, &b, &d, &Config::new()).unwrap();
            assert_eq!(entries(&c), vec![(0, 1, 12), (1, 0, 15)]);

            let mut c = matrix(2, 2, &[], Orientation::ByRow);
            let d = Descriptor::new().method(method).complement();
            mxm(&mut c, Some(&mask), None, &sr, &a, &b, &d, &Config::new()).unwrap();
            assert_eq!(entries(&c), vec![(0, 0, 14), (1, 1, 18)]);
        }
    }

    #[test]
    fn test_min_plus_with_transpose() {
        // shortest two-hop paths over edge weights; A is given transposed
        let sr = Semiring::min_plus(DType::I64).unwrap();
        let at = matrix(3, 3, &[(1, 0, 2), (2, 0, 9), (2, 1, 3)], Orientation::ByRow);
        let b = matrix(3, 3, &[(0, 1, 2), (0, 2, 9), (1, 2, 3)], Orientation::ByRow);
        for method in METHODS {
            let mut c = matrix(3, 3, &[], Orientation::ByRow);
            let d = Descriptor::new().transpose_a().method(method);
            mxm(&mut c, None, None, &sr, &at, &b, &d, &Config::new()).unwrap();
            assert_eq!(entries(&c), vec![(0, 2, 5)]);
        }
    }

    #[test]
    fn test_inner_dimension_mismatch() {
        let sr = Semiring::plus_times(DType::I64).unwrap();
        let a = matrix(2, 3, &[], Orientation::ByRow);
        let b = matrix(2, 2, &[], Orientation::ByRow);
        let mut c = matrix(2, 2, &[], Orientation::ByRow);
        let err = mxm(&mut c, None, None, &sr, &a, &b, &Descriptor::new(), &Config::new())
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_method_selection() {
        let d = Descriptor::new();
        assert_eq!(select_method(&d, None, 100, 50, false), AxbMethod::Gustavson);
        assert_eq!(select_method(&d, None, 10, 1000, false), AxbMethod::Heap);
        assert_eq!(
            select_method(&d.method(AxbMethod::Heap), None, 100, 50, false),
            AxbMethod::Heap
        );

        // Aᵀ·B prefers dot products only when B needs no reorienting
        let t = d.transpose_a();
        assert_eq!(select_method(&t, None, 100, 50, true), AxbMethod::Dot);
        assert_eq!(select_method(&t, None, 100, 50, false), AxbMethod::Gustavson);
    }
}
