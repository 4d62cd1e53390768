//! Physical reorientation
//!
//! A logical transpose never moves data: it is the same arrays read with
//! the opposite orientation (see [`CsView::transposed`]). Data moves only
//! when an operation needs an operand in a specific orientation, and then
//! exactly once, by bucket-sorting the entries into the other orientation.

use super::compressed::want_hyper;
use super::{Compressed, CsView, Orientation};
use crate::config::DEFAULT_HYPER_RATIO;
use crate::error::{try_alloc, Result};

/// Store the same logical matrix in the opposite orientation
///
/// The input must be assembled. The result has sorted vectors, and is
/// hypersparse when few of its vectors would be occupied.
pub(crate) fn reorient(v: CsView<'_>) -> Result<Compressed> {
    tracing::debug!(
        nrows = v.nrows(),
        ncols = v.ncols(),
        nvals = v.nvals(),
        from = %v.orientation,
        "materializing reoriented copy"
    );
    let size = v.value_size();
    let nvals = v.nvals();
    let (vlen, vdim) = (v.vdim, v.vlen);

    // new vector ids: every id, or just the distinct minor indices
    let h = if want_hyper(nvals, vdim, DEFAULT_HYPER_RATIO) {
        let mut h = try_alloc(nvals, 0usize)?;
        for (slot, &t) in h.iter_mut().zip(v.i) {
            debug_assert!(t >= 0);
            *slot = t as usize;
        }
        h.sort_unstable();
        h.dedup();
        Some(h)
    } else {
        None
    };
    let slot_of = |t: usize| match &h {
        Some(h) => h.partition_point(|&j| j < t),
        None => t,
    };
    let nvec = h.as_ref().map_or(vdim, |h| h.len());

    // count entries per new vector, then prefix-sum into pointers
    let mut p = try_alloc(nvec + 1, 0usize)?;
    for &t in v.i {
        debug_assert!(t >= 0);
        p[slot_of(t as usize) + 1] += 1;
    }
    for k in 0..nvec {
        p[k + 1] += p[k];
    }

    let mut cursor = p[..nvec].to_vec();
    let mut i = try_alloc(nvals, 0i64)?;
    let mut x = try_alloc(nvals * size, 0u8)?;
    for k in 0..v.nvec() {
        let (j, range) = v.vector(k);
        for pos in range {
            let slot = slot_of(v.index(pos));
            let q = cursor[slot];
            cursor[slot] += 1;
            i[q] = j as i64;
            x[q * size..(q + 1) * size].copy_from_slice(v.value(pos));
        }
    }

    Ok(Compressed {
        dtype: v.dtype,
        vlen,
        vdim,
        orientation: v.orientation.flip(),
        p,
        h,
        i,
        x,
    })
}

/// An operand in a required orientation: borrowed when it already was,
/// owned when it had to be reoriented
pub(crate) enum Conformed<'a> {
    Borrowed(CsView<'a>),
    Owned(Compressed),
}

impl<'a> Conformed<'a> {
    /// Bring `v` into `orientation`, copying only if it differs
    pub fn new(v: CsView<'a>, orientation: Orientation) -> Result<Self> {
        if v.orientation == orientation {
            Ok(Self::Borrowed(v))
        } else {
            Ok(Self::Owned(reorient(v)?))
        }
    }

    pub fn view(&self) -> CsView<'_> {
        match self {
            Self::Borrowed(v) => *v,
            Self::Owned(c) => c.view(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    #[test]
    fn test_reorient_keeps_logical_matrix() {
        // [[1, 0, 2],
        //  [0, 3, 0]] by row
        let c = Compressed {
            dtype: DType::U8,
            vlen: 3,
            vdim: 2,
            orientation: Orientation::ByRow,
            p: vec![0, 2, 3],
            h: None,
            i: vec![0, 2, 1],
            x: vec![1, 2, 3],
        };
        let r = reorient(c.view()).unwrap();
        assert_eq!(r.orientation, Orientation::ByCol);
        assert_eq!(r.shape(), [2, 3]);
        assert_eq!(r.p, vec![0, 1, 2, 3]);
        assert_eq!(r.i, vec![0, 1, 0]);
        assert_eq!(r.x, vec![1, 3, 2]);
        r.check(false).unwrap();

        // a hypersparse source gives the same result
        let mut hc = c.clone();
        hc.conform_hyper(1.0).unwrap();
        assert_eq!(reorient(hc.view()).unwrap(), r);
    }

    #[test]
    fn test_reorient_tall_matrix_is_hypersparse() {
        // 2 columns of a 2^40-row matrix, one entry each: rows 7 and 2^40 - 1
        let nrows = 1usize << 40;
        let c = Compressed {
            dtype: DType::U8,
            vlen: nrows,
            vdim: 2,
            orientation: Orientation::ByCol,
            p: vec![0, 1, 2],
            h: None,
            i: vec![nrows as i64 - 1, 7],
            x: vec![1, 2],
        };
        let r = reorient(c.view()).unwrap();
        assert_eq!(r.orientation, Orientation::ByRow);
        assert_eq!(r.shape(), [nrows, 2]);
        assert_eq!(r.h, Some(vec![7, nrows - 1]));
        assert_eq!(r.p, vec![0, 1, 2]);
        assert_eq!(r.i, vec![1, 0]);
        assert_eq!(r.x, vec![2, 1]);
        r.check(false).unwrap();
    }

    #[test]
    fn test_conformed_borrows_when_possible() {
        let c = Compressed::empty(DType::F32, 2, 2, Orientation::ByCol, false).unwrap();
        assert!(matches!(
            Conformed::new(c.view(), Orientation::ByCol).unwrap(),
            Conformed::Borrowed(_)
        ));
        assert!(matches!(
            Conformed::new(c.view(), Orientation::ByRow).unwrap(),
            Conformed::Owned(_)
        ));
    }
}
