//! Matrix operations
//!
//! Every operation has the form `C<M> = accum(C, T)`: it computes a
//! temporary `T` from its inputs, then writes `T` into the output `C`
//! through the optional accumulator and mask (see [`Descriptor`] for the
//! mask and replace settings). Inputs are validated before any work is
//! done, and `C` is only replaced once the complete result exists, so a
//! failed call leaves `C` as it was.
//!
//! Operations run through a [`Context`], which carries the [`Config`].
//!
//! # Example
//!
//! ```
//! use sparsegrb::prelude::*;
//!
//! let ctx = Context::default();
//! let a = Matrix::from_triplets(2, 2, &[0, 1], &[0, 1], &[2.0f64, 3.0])?;
//! let b = Matrix::from_triplets(2, 2, &[0, 0], &[0, 1], &[1.0f64, 4.0])?;
//!
//! let mut c = Matrix::new(DType::F64, 2, 2)?;
//! let plus_times = Semiring::plus_times(DType::F64)?;
//! ctx.mxm(&mut c, None, None, &plus_times, &a, &b, &Descriptor::new())?;
//! assert_eq!(c.get_element::<f64>(0, 1)?, Some(8.0));
//!
//! let plus = Monoid::builtin(BinaryOpcode::Plus, DType::F64)?;
//! assert_eq!(ctx.reduce_to::<f64>(&plus, &c)?, 10.0);
//! # Ok::<(), sparsegrb::error::Error>(())
//! ```

mod accum_mask;
mod apply;
mod ewise;
mod mask;
mod mxm;
mod reduce;
mod select;
pub(crate) mod slice;

pub use select::SelectOp;

use crate::algebra::{BinaryOp, Monoid, Semiring, UnaryOp};
use crate::config::{Config, Descriptor};
use crate::dtype::{DType, Element, Scalar};
use crate::error::{Error, Result};
use crate::sparse::{Conformed, CsView, Matrix, Orientation, Store};
use accum_mask::{accum_mask, check_output};
use ewise::Pattern;
use mask::Mask;

// ============================================================================
// Shared steps
// ============================================================================

/// Check that `m`, transposed if asked, has shape `expected`
fn check_dims(op: &'static str, expected: [usize; 2], m: &Matrix, transpose: bool) -> Result<()> {
    let [nrows, ncols] = m.shape();
    let got = if transpose { [ncols, nrows] } else { [nrows, ncols] };
    if got != expected {
        return Err(Error::dimension(op, expected, got));
    }
    Ok(())
}

fn check_mask(
    op: &'static str,
    expected: [usize; 2],
    mask: Option<&Matrix>,
    desc: &Descriptor,
) -> Result<()> {
    let Some(m) = mask else {
        return Ok(());
    };
    check_dims(op, expected, m, false)?;
    if !desc.mask_structure && m.dtype().is_udt() {
        return Err(Error::domain("mask", m.dtype(), DType::Bool));
    }
    Ok(())
}

/// Handle an absent, complemented mask: nothing may be written, so clear
/// `C` if asked to and report that the operation is done
fn quick_mask(c: &mut Matrix, mask: Option<&Matrix>, desc: &Descriptor) -> Result<bool> {
    if mask.is_some() || !desc.mask_complement {
        return Ok(false);
    }
    tracing::trace!(replace = desc.replace, "empty complemented mask");
    if desc.replace {
        c.clear()?;
    }
    Ok(true)
}

/// An assembled operand, read as its transpose if asked
#[inline]
fn operand_view(store: &Store, transpose: bool) -> CsView<'_> {
    let v = store.view();
    if transpose {
        v.transposed()
    } else {
        v
    }
}

fn conform_mask(store: Option<&Store>, orientation: Orientation) -> Result<Option<Conformed<'_>>> {
    store
        .map(|s| Conformed::new(s.view(), orientation))
        .transpose()
}

/// Write `T` into `C` through a mask already in `C`'s orientation
fn finish(
    c: &mut Matrix,
    mask: Option<Mask<'_>>,
    accum: Option<&BinaryOp>,
    t: CsView<'_>,
    desc: &Descriptor,
    config: &Config,
) -> Result<()> {
    let store = c.store_mut();
    store.wait()?;
    accum_mask(store, mask, accum, t, desc, config)
}

/// Write `T` into `C` through `mask`
fn write_output(
    c: &mut Matrix,
    mask: Option<&Matrix>,
    accum: Option<&BinaryOp>,
    t: CsView<'_>,
    desc: &Descriptor,
    config: &Config,
) -> Result<()> {
    let orientation = c.orientation();
    let m_store = mask.map(Matrix::assembled).transpose()?;
    let m_conf = conform_mask(m_store.as_deref(), orientation)?;
    let m = m_conf
        .as_ref()
        .map(|v| Mask::new(v.view(), desc))
        .transpose()?;
    finish(c, m, accum, t, desc, config)
}

// ============================================================================
// Context
// ============================================================================

/// Runs operations with a fixed [`Config`]
///
/// All operations take the output first, then the optional mask and
/// accumulator, then the operator and inputs, then the descriptor. The
/// output is a `&mut Matrix`, so it can never also be an input; pass a
/// clone to compute in place.
#[derive(Clone, Debug, Default)]
pub struct Context {
    config: Config,
}

impl Context {
    /// Context running with `config`
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// The configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `C<M> = accum(C, A ⊕ B)` over the union of the patterns of A and B
    ///
    /// Where both have an entry the result is `op(a, b)`; where only one
    /// does, its value is cast into C's type, or into `op`'s result type
    /// when an accumulator is given.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if A, B (after `transpose_a`/`transpose_b`)
    ///   or the mask differ in shape from C
    /// - `DomainMismatch` if a type cannot be cast where the operation
    ///   needs it
    #[allow(clippy::too_many_arguments)]
    pub fn ewise_add(
        &self,
        c: &mut Matrix,
        mask: Option<&Matrix>,
        accum: Option<&BinaryOp>,
        op: &BinaryOp,
        a: &Matrix,
        b: &Matrix,
        desc: &Descriptor,
    ) -> Result<()> {
        ewise::ewise(c, mask, accum, op, a, b, desc, &self.config, Pattern::Union)
    }

    /// `C<M> = accum(C, A ⊗ B)` over the intersection of the patterns of A
    /// and B
    ///
    /// Errors as for [`ewise_add`](Self::ewise_add).
    #[allow(clippy::too_many_arguments)]
    pub fn ewise_mult(
        &self,
        c: &mut Matrix,
        mask: Option<&Matrix>,
        accum: Option<&BinaryOp>,
        op: &BinaryOp,
        a: &Matrix,
        b: &Matrix,
        desc: &Descriptor,
    ) -> Result<()> {
        ewise::ewise(
            c,
            mask,
            accum,
            op,
            a,
            b,
            desc,
            &self.config,
            Pattern::Intersection,
        )
    }

    /// `C<M> = accum(C, A ⊕.⊗ B)` over `semiring`
    ///
    /// `desc.axb_method` forces an algorithm; all of them give the same
    /// result.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if the inner dimensions differ or the result
    ///   does not have C's shape
    /// - `DomainMismatch` if A or B cannot be cast to the multiply
    ///   operator's inputs, or the result cannot be written into C
    #[allow(clippy::too_many_arguments)]
    pub fn mxm(
        &self,
        c: &mut Matrix,
        mask: Option<&Matrix>,
        accum: Option<&BinaryOp>,
        semiring: &Semiring,
        a: &Matrix,
        b: &Matrix,
        desc: &Descriptor,
    ) -> Result<()> {
        mxm::mxm(c, mask, accum, semiring, a, b, desc, &self.config)
    }

    /// `s = accum(s, ⊕ A)`; an empty A reduces to the monoid's identity
    pub fn reduce_to_scalar(
        &self,
        s: &mut Scalar,
        accum: Option<&BinaryOp>,
        monoid: &Monoid,
        a: &Matrix,
    ) -> Result<()> {
        reduce::reduce_to_scalar(s, accum, monoid, a, &self.config)
    }

    /// Reduce all entries of A with `monoid`, returned as `T`
    pub fn reduce_to<T: Element>(&self, monoid: &Monoid, a: &Matrix) -> Result<T> {
        reduce::reduce_to(monoid, a, &self.config)
    }

    /// `C<M> = accum(C, op(A))`
    pub fn apply(
        &self,
        c: &mut Matrix,
        mask: Option<&Matrix>,
        accum: Option<&BinaryOp>,
        op: &UnaryOp,
        a: &Matrix,
        desc: &Descriptor,
    ) -> Result<()> {
        apply::apply(c, mask, accum, op, a, desc, &self.config)
    }

    /// `C<M> = accum(C, select(A, k))`: keep the entries of A that `op`
    /// accepts with thunk `k`
    #[allow(clippy::too_many_arguments)]
    pub fn select(
        &self,
        c: &mut Matrix,
        mask: Option<&Matrix>,
        accum: Option<&BinaryOp>,
        op: SelectOp,
        a: &Matrix,
        k: i64,
        desc: &Descriptor,
    ) -> Result<()> {
        select::select(c, mask, accum, op, a, k, desc, &self.config)
    }

    /// `C<M> = accum(C, Aᵀ)`
    pub fn transpose(
        &self,
        c: &mut Matrix,
        mask: Option<&Matrix>,
        accum: Option<&BinaryOp>,
        a: &Matrix,
        desc: &Descriptor,
    ) -> Result<()> {
        apply::transpose(c, mask, accum, a, desc, &self.config)
    }
}
