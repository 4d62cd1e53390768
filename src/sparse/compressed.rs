//! Compressed sparse vectors: owned arrays and borrowed views
//!
//! A matrix is `vdim` sparse vectors of length `vlen`. Vector `k` occupies
//! `p[k]..p[k+1]` of the parallel arrays `i` (minor indices) and `x`
//! (values, `dtype.size_in_bytes()` bytes each). In hypersparse form only
//! the vectors listed in `h` are stored, and `h[k]` is the id of vector `k`;
//! otherwise vector `k` has id `k`.
//!
//! Deleted entries ("zombies") keep their slot with the minor index stored
//! as `!i`, which is negative. Comparisons on indices that may hold zombies
//! go through [`unflip`].

use super::Orientation;
use crate::dtype::DType;
use crate::error::{try_alloc, Error, Result};
use std::ops::Range;

/// Mark a minor index as deleted, or restore a deleted one
#[inline]
pub(crate) fn flip(i: i64) -> i64 {
    !i
}

/// The minor index of an entry, live or deleted
#[inline]
pub(crate) fn unflip(i: i64) -> i64 {
    if i < 0 {
        !i
    } else {
        i
    }
}

/// True if `vdim` vectors with `nonempty` occupied should be hypersparse
#[inline]
pub(crate) fn want_hyper(nonempty: usize, vdim: usize, hyper_ratio: f64) -> bool {
    hyper_ratio > 0.0 && vdim > 1 && (nonempty as f64) <= hyper_ratio * vdim as f64
}

/// Borrowed compressed arrays with a shape and orientation
///
/// Copying a view is free, and so is [`transposed`](Self::transposed): the
/// same arrays read with the opposite orientation are the transpose.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CsView<'a> {
    pub dtype: DType,
    pub vlen: usize,
    pub vdim: usize,
    pub orientation: Orientation,
    pub p: &'a [usize],
    pub h: Option<&'a [usize]>,
    pub i: &'a [i64],
    pub x: &'a [u8],
}

impl<'a> CsView<'a> {
    /// Logical shape `[nrows, ncols]`
    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        self.orientation.shape(self.vlen, self.vdim)
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.shape()[0]
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.shape()[1]
    }

    /// Number of stored vectors
    #[inline]
    pub fn nvec(&self) -> usize {
        self.p.len() - 1
    }

    /// Number of stored entries
    #[inline]
    pub fn nvals(&self) -> usize {
        self.i.len()
    }

    #[inline]
    pub fn value_size(&self) -> usize {
        self.dtype.size_in_bytes()
    }

    /// Id of stored vector `k`
    #[inline]
    pub fn vector_id(&self, k: usize) -> usize {
        match self.h {
            Some(h) => h[k],
            None => k,
        }
    }

    /// Id and entry range of stored vector `k`
    #[inline]
    pub fn vector(&self, k: usize) -> (usize, Range<usize>) {
        (self.vector_id(k), self.p[k]..self.p[k + 1])
    }

    /// Entry range of the vector with id `j` (empty if not stored)
    #[inline]
    pub fn lookup(&self, j: usize) -> Range<usize> {
        match self.h {
            Some(h) => match h.binary_search(&j) {
                Ok(k) => self.p[k]..self.p[k + 1],
                Err(_) => 0..0,
            },
            None => self.p[j]..self.p[j + 1],
        }
    }

    /// Position of entry `(j, i)` in major/minor terms, live or deleted
    pub fn find(&self, j: usize, i: usize) -> Option<usize> {
        let range = self.lookup(j);
        let start = range.start;
        self.i[range]
            .binary_search_by(|&t| unflip(t).cmp(&(i as i64)))
            .ok()
            .map(|off| start + off)
    }

    /// Minor index of entry `pos`; the entry must be live
    #[inline]
    pub fn index(&self, pos: usize) -> usize {
        debug_assert!(self.i[pos] >= 0);
        self.i[pos] as usize
    }

    /// Value bytes of entry `pos`
    #[inline]
    pub fn value(&self, pos: usize) -> &'a [u8] {
        let size = self.value_size();
        &self.x[pos * size..(pos + 1) * size]
    }

    /// The same matrix read as its transpose
    #[inline]
    pub fn transposed(self) -> Self {
        Self {
            orientation: self.orientation.flip(),
            ..self
        }
    }

    /// The same pattern with a replacement value array
    #[inline]
    pub fn with_values(self, x: &'a [u8], dtype: DType) -> Self {
        debug_assert_eq!(x.len(), self.nvals() * dtype.size_in_bytes());
        Self { dtype, x, ..self }
    }

    /// Copy into owned arrays
    pub fn to_owned(&self) -> Compressed {
        Compressed {
            dtype: self.dtype,
            vlen: self.vlen,
            vdim: self.vdim,
            orientation: self.orientation,
            p: self.p.to_vec(),
            h: self.h.map(|h| h.to_vec()),
            i: self.i.to_vec(),
            x: self.x.to_vec(),
        }
    }
}

/// Owned compressed arrays
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Compressed {
    pub dtype: DType,
    pub vlen: usize,
    pub vdim: usize,
    pub orientation: Orientation,
    pub p: Vec<usize>,
    pub h: Option<Vec<usize>>,
    pub i: Vec<i64>,
    pub x: Vec<u8>,
}

impl Compressed {
    /// An empty `nrows` x `ncols` matrix
    pub fn empty(
        dtype: DType,
        nrows: usize,
        ncols: usize,
        orientation: Orientation,
        hyper: bool,
    ) -> Result<Self> {
        let (vlen, vdim) = orientation.split(nrows, ncols);
        let (p, h) = if hyper {
            (vec![0], Some(Vec::new()))
        } else {
            (try_alloc(vdim + 1, 0usize)?, None)
        };
        Ok(Self {
            dtype,
            vlen,
            vdim,
            orientation,
            p,
            h,
            i: Vec::new(),
            x: Vec::new(),
        })
    }

    #[inline]
    pub fn view(&self) -> CsView<'_> {
        CsView {
            dtype: self.dtype,
            vlen: self.vlen,
            vdim: self.vdim,
            orientation: self.orientation,
            p: &self.p,
            h: self.h.as_deref(),
            i: &self.i,
            x: &self.x,
        }
    }

    #[inline]
    pub fn nvec(&self) -> usize {
        self.p.len() - 1
    }

    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        self.orientation.shape(self.vlen, self.vdim)
    }

    /// Number of stored vectors with at least one entry
    pub fn nonempty(&self) -> usize {
        self.p.windows(2).filter(|w| w[1] > w[0]).count()
    }

    /// Switch between standard and hypersparse form as `hyper_ratio`
    /// dictates; a hypersparse result lists only non-empty vectors
    pub fn conform_hyper(&mut self, hyper_ratio: f64) -> Result<()> {
        let nonempty = self.nonempty();
        let hyper = want_hyper(nonempty, self.vdim, hyper_ratio);
        match (&self.h, hyper) {
            (Some(h), true) => {
                if nonempty < h.len() {
                    let (p, h) = self.compact_vectors(nonempty)?;
                    self.p = p;
                    self.h = Some(h);
                }
            }
            (Some(h), false) => {
                tracing::debug!(
                    nonempty,
                    vdim = self.vdim,
                    "converting hypersparse matrix to standard form"
                );
                let mut p = try_alloc(self.vdim + 1, 0usize)?;
                // fill: p[j+1] = end of vector j, carried over gaps
                let mut next = 0;
                for (k, &j) in h.iter().enumerate() {
                    for slot in &mut p[next..=j] {
                        *slot = self.p[k];
                    }
                    next = j + 1;
                }
                let total = self.p[self.nvec()];
                for slot in &mut p[next..] {
                    *slot = total;
                }
                self.p = p;
                self.h = None;
            }
            (None, true) => {
                tracing::debug!(
                    nonempty,
                    vdim = self.vdim,
                    "converting matrix to hypersparse form"
                );
                let (p, h) = self.compact_vectors(nonempty)?;
                self.p = p;
                self.h = Some(h);
            }
            (None, false) => {}
        }
        Ok(())
    }

    fn compact_vectors(&self, nonempty: usize) -> Result<(Vec<usize>, Vec<usize>)> {
        let view = self.view();
        let mut p = Vec::new();
        let mut h = Vec::new();
        p.try_reserve_exact(nonempty + 1)
            .and_then(|_| h.try_reserve_exact(nonempty))
            .map_err(|_| Error::OutOfMemory {
                size: nonempty * 2 * std::mem::size_of::<usize>(),
            })?;
        p.push(0);
        for k in 0..view.nvec() {
            let (j, range) = view.vector(k);
            if !range.is_empty() {
                h.push(j);
                p.push(range.end);
            }
        }
        Ok((p, h))
    }

    /// Verify the structural invariants
    ///
    /// Indices within each vector must be strictly increasing (deleted
    /// entries compared by their restored index), `h` strictly increasing,
    /// and the array lengths consistent.
    pub fn check(&self, allow_zombies: bool) -> Result<()> {
        let bad = |reason: String| Err(Error::invalid_handle("matrix", reason));
        let nvec = self.nvec();
        if self.p.first() != Some(&0) || self.p[nvec] != self.i.len() {
            return bad("vector pointers do not span the index array".into());
        }
        if self.x.len() != self.i.len() * self.dtype.size_in_bytes() {
            return bad("value array length does not match entry count".into());
        }
        match &self.h {
            Some(h) => {
                if h.len() != nvec || h.windows(2).any(|w| w[0] >= w[1]) {
                    return bad("hypersparse vector list is not strictly increasing".into());
                }
                if h.last().is_some_and(|&j| j >= self.vdim) {
                    return bad("hypersparse vector id out of range".into());
                }
            }
            None if nvec != self.vdim => {
                return bad(format!("{} vectors stored, expected {}", nvec, self.vdim));
            }
            None => {}
        }
        for k in 0..nvec {
            if self.p[k] > self.p[k + 1] {
                return bad(format!("vector {} has negative length", k));
            }
            let mut last = -1i64;
            for &t in &self.i[self.p[k]..self.p[k + 1]] {
                if t < 0 && !allow_zombies {
                    return bad(format!("deleted entry in assembled vector {}", k));
                }
                let t = unflip(t);
                if t <= last || t as usize >= self.vlen {
                    return bad(format!("vector {} indices unsorted or out of range", k));
                }
                last = t;
            }
        }
        Ok(())
    }
}
