//! Task slicing and the two-phase count-then-write driver
//!
//! Output is built vector by vector in two passes over disjoint task
//! ranges:
//!
//! ```text
//! Phase 1 (count): each task counts the entries of its output vectors
//! Exclusive scan of the counts gives every vector its offset
//! Phase 2 (fill):  each task writes its vectors into its own disjoint
//!                  slice of the output arrays
//! ```
//!
//! No task ever writes where another might, so the output needs no locks,
//! and the result does not depend on the number of tasks.

use crate::config::Config;
use crate::dtype::DType;
use crate::error::{try_alloc, Result};
use crate::sparse::{Compressed, CsView, Orientation};
use std::ops::Range;

/// A computation producing one sparse output vector at a time
pub(crate) trait VectorKernel: Sync {
    /// Per-task scratch space
    type Workspace;

    /// Create a task's workspace
    fn workspace(&self) -> Result<Self::Workspace>;

    /// Number of entries output vector `j` will hold
    fn count(&self, ws: &mut Self::Workspace, j: usize) -> usize;

    /// Write output vector `j`: sorted minor indices into `i` and values
    /// into `x`, exactly as many as [`count`](Self::count) returned
    fn fill(&self, ws: &mut Self::Workspace, j: usize, i: &mut [i64], x: &mut [u8]);
}

/// The output vectors an operation computes
///
/// A standard-form output visits every vector id `0..vdim`. When the
/// operands are hypersparse only the ids they list can hold entries, and
/// visiting just those keeps the work and the output arrays proportional
/// to the entries rather than the dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum VectorIds {
    /// Every id `0..vdim`; the output is in standard form
    All(usize),
    /// Strictly increasing ids; the output is hypersparse
    Listed(Vec<usize>),
}

impl VectorIds {
    /// The vectors `v` stores
    pub fn of(v: &CsView<'_>) -> Self {
        match v.h {
            Some(h) => Self::Listed(h.to_vec()),
            None => Self::All(v.vdim),
        }
    }

    /// Ids stored by any of `views`, which share `vdim`
    pub fn union(views: &[CsView<'_>]) -> Result<Self> {
        let vdim = views.first().map_or(0, |v| v.vdim);
        let mut lists = Vec::with_capacity(views.len());
        for v in views {
            match v.h {
                Some(h) => lists.push(h),
                None => return Ok(Self::All(vdim)),
            }
        }
        let total = lists.iter().map(|h| h.len()).sum();
        let mut ids = try_alloc(total, 0usize)?;
        ids.clear();
        for h in lists {
            ids.extend_from_slice(h);
        }
        ids.sort_unstable();
        ids.dedup();
        Ok(Self::Listed(ids))
    }

    /// Ids stored by all of `views`, which share `vdim`; a standard-form
    /// view stores every id
    pub fn intersection(views: &[CsView<'_>]) -> Self {
        let vdim = views.first().map_or(0, |v| v.vdim);
        let mut lists = views.iter().filter_map(|v| v.h);
        let Some(first) = lists.next() else {
            return Self::All(vdim);
        };
        let mut ids = first.to_vec();
        for h in lists {
            ids.retain(|j| h.binary_search(j).is_ok());
        }
        Self::Listed(ids)
    }

    /// Number of vectors visited
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::All(vdim) => *vdim,
            Self::Listed(ids) => ids.len(),
        }
    }

    /// Id of the `k`-th visited vector
    #[inline]
    pub fn id(&self, k: usize) -> usize {
        match self {
            Self::All(_) => k,
            Self::Listed(ids) => ids[k],
        }
    }
}

/// Output of [`two_phase`]: pointers over the visited vectors, their ids
/// if hypersparse, indices, values
pub(crate) struct Vectors {
    pub p: Vec<usize>,
    pub h: Option<Vec<usize>>,
    pub i: Vec<i64>,
    pub x: Vec<u8>,
}

impl Vectors {
    /// Wrap as a matrix of `vdim` vectors of length `vlen`
    pub fn into_compressed(
        self,
        dtype: DType,
        vlen: usize,
        vdim: usize,
        orientation: Orientation,
    ) -> Compressed {
        Compressed {
            dtype,
            vlen,
            vdim,
            orientation,
            p: self.p,
            h: self.h,
            i: self.i,
            x: self.x,
        }
    }
}

/// Run `f` over `items`, in parallel when there is more than one; results
/// come back in item order
pub(crate) fn run_each<T, R, F>(items: Vec<T>, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        if items.len() > 1 {
            use rayon::prelude::*;
            return items.into_par_iter().map(f).collect();
        }
    }
    items.into_iter().map(f).collect()
}

/// Number of tasks for `work` units of work
pub(crate) fn ntasks_for(config: &Config, work: usize, max_tasks: usize) -> usize {
    let nthreads = config.nthreads_for(work);
    if nthreads <= 1 {
        1
    } else {
        // a few tasks per thread to balance uneven vectors
        (4 * nthreads).min(max_tasks).max(1)
    }
}

/// Split `0..n` into `ntasks` contiguous ranges of near-equal cost
///
/// `cost(j)` estimates the work for item `j`; every item costs at least 1.
pub(crate) fn slice_by_cost(
    n: usize,
    ntasks: usize,
    cost: impl Fn(usize) -> usize,
) -> Vec<Range<usize>> {
    if ntasks <= 1 || n <= 1 {
        return vec![0..n];
    }
    let mut cumulative = Vec::with_capacity(n + 1);
    cumulative.push(0usize);
    for j in 0..n {
        let last = cumulative[j];
        cumulative.push(last + cost(j).max(1));
    }
    let total = cumulative[n];
    let mut ranges = Vec::with_capacity(ntasks);
    let mut start = 0;
    for t in 1..=ntasks {
        let target = total / ntasks * t + (total % ntasks) * t / ntasks;
        let end = if t == ntasks {
            n
        } else {
            cumulative.partition_point(|&c| c < target).min(n)
        };
        if end > start {
            ranges.push(start..end);
            start = end;
        }
    }
    if ranges.is_empty() {
        ranges.push(0..n);
    }
    ranges
}

/// Split `0..n` into at most `ntasks` contiguous ranges of equal length
pub(crate) fn slice_even(n: usize, ntasks: usize) -> Vec<Range<usize>> {
    let ntasks = ntasks.clamp(1, n.max(1));
    (0..ntasks)
        .map(|t| (t * n / ntasks)..((t + 1) * n / ntasks))
        .collect()
}

/// Build the vectors `ids` names with `kernel`, one task per range of
/// positions in `ids`
pub(crate) fn two_phase<K: VectorKernel>(
    kernel: &K,
    ids: &VectorIds,
    zsize: usize,
    ranges: &[Range<usize>],
) -> Result<Vectors> {
    let nvec = ids.len();
    debug_assert_eq!(ranges.first().map_or(0, |r| r.start), 0);
    debug_assert_eq!(ranges.last().map_or(0, |r| r.end), nvec);

    // phase 1: count
    let counts = run_each(ranges.to_vec(), |range| -> Result<Vec<usize>> {
        let mut ws = kernel.workspace()?;
        Ok(range.map(|k| kernel.count(&mut ws, ids.id(k))).collect())
    });
    let mut p = try_alloc(nvec + 1, 0usize)?;
    let mut k = 0;
    for task_counts in counts {
        for c in task_counts? {
            p[k + 1] = p[k] + c;
            k += 1;
        }
    }
    debug_assert_eq!(k, nvec);

    // phase 2: fill disjoint slices
    let nvals = p[nvec];
    let mut i = try_alloc(nvals, 0i64)?;
    let mut x = try_alloc(nvals * zsize, 0u8)?;
    let mut parts = Vec::with_capacity(ranges.len());
    let (mut irest, mut xrest) = (&mut i[..], &mut x[..]);
    for range in ranges {
        let len = p[range.end] - p[range.start];
        let (ihead, itail) = std::mem::take(&mut irest).split_at_mut(len);
        let (xhead, xtail) = std::mem::take(&mut xrest).split_at_mut(len * zsize);
        parts.push((range.clone(), ihead, xhead));
        irest = itail;
        xrest = xtail;
    }
    let p_ref = &p;
    let filled = run_each(parts, |(range, ichunk, xchunk)| -> Result<()> {
        let mut ws = kernel.workspace()?;
        let base = p_ref[range.start];
        for k in range {
            let (lo, hi) = (p_ref[k] - base, p_ref[k + 1] - base);
            kernel.fill(
                &mut ws,
                ids.id(k),
                &mut ichunk[lo..hi],
                &mut xchunk[lo * zsize..hi * zsize],
            );
        }
        Ok(())
    });
    filled.into_iter().collect::<Result<()>>()?;

    let h = match ids {
        VectorIds::All(_) => None,
        VectorIds::Listed(list) => Some(list.clone()),
    };
    Ok(Vectors { p, h, i, x })
}
