//! Assembly: folding pending tuples and deleted entries into the
//! compressed arrays

use super::matrix::Store;
use super::{Compressed, Deferred, Orientation, PendingTuples};
use crate::algebra::{BinaryOp, BoundBinary};
use crate::dtype::DType;
use crate::error::{Error, Result};

/// How to resolve several tuples for one position
#[derive(Clone, Copy)]
pub(crate) enum DupRule<'a> {
    /// Fold them in insertion order with an operator
    Combine(&'a BinaryOp),
    /// Keep the last one inserted
    LastWins,
    /// Duplicates are an error
    Reject,
}

impl<'a> DupRule<'a> {
    pub fn from_op(dup: Option<&'a BinaryOp>) -> Self {
        match dup {
            Some(op) => Self::Combine(op),
            None => Self::LastWins,
        }
    }
}

/// Sort tuples by (major, minor) and resolve duplicates
pub(crate) fn fold_tuples(
    tuples: &PendingTuples,
    dtype: DType,
    orientation: Orientation,
    rule: DupRule<'_>,
) -> Result<PendingTuples> {
    let size = dtype.size_in_bytes();
    let combine = match rule {
        DupRule::Combine(op) => Some(BoundBinary::new(op, dtype, dtype, dtype)?),
        _ => None,
    };
    let order = tuples.sorted_order();
    let value = |t: usize| &tuples.x[t * size..(t + 1) * size];

    let mut out = PendingTuples::new();
    let mut acc = vec![0u8; size];
    let mut prev: Option<(usize, usize)> = None;
    for &t in &order {
        let pos = (tuples.majors[t], tuples.minors[t]);
        if prev == Some(pos) {
            match (&rule, &combine) {
                (DupRule::Reject, _) => {
                    let (row, col) = orientation.to_row_col(pos.0, pos.1);
                    return Err(Error::invalid_argument(
                        "values",
                        format!(
                            "duplicate entry at ({}, {}) and no dup operator given",
                            row, col
                        ),
                    ));
                }
                (_, Some(bound)) => {
                    let n = out.len() - 1;
                    let last = &mut out.x[n * size..(n + 1) * size];
                    acc.copy_from_slice(last);
                    bound.apply(last, &acc, value(t));
                }
                _ => {
                    let n = out.len() - 1;
                    out.x[n * size..(n + 1) * size].copy_from_slice(value(t));
                }
            }
        } else {
            out.push(pos.0, pos.1, value(t));
            prev = Some(pos);
        }
    }
    debug_assert!(out.sorted);
    Ok(out)
}

/// Merge sorted, duplicate-free tuples into compressed arrays, dropping
/// deleted entries
///
/// The result lists only non-empty vectors (hypersparse form); callers
/// conform it afterwards.
pub(crate) fn merge_tuples(
    cs: &Compressed,
    tuples: &PendingTuples,
    rule: DupRule<'_>,
) -> Result<Compressed> {
    let v = cs.view();
    let size = v.value_size();
    let combine = match rule {
        DupRule::Combine(op) => Some(BoundBinary::new(op, v.dtype, v.dtype, v.dtype)?),
        _ => None,
    };
    let cap = v.nvals() + tuples.len();
    let oom = |_| Error::OutOfMemory {
        size: cap * (size + std::mem::size_of::<i64>()),
    };
    let mut new_i: Vec<i64> = Vec::new();
    let mut new_x: Vec<u8> = Vec::new();
    new_i.try_reserve_exact(cap).map_err(oom)?;
    new_x.try_reserve_exact(cap * size).map_err(oom)?;
    let mut new_p = vec![0usize];
    let mut new_h = Vec::new();

    let tvalue = |q: usize| &tuples.x[q * size..(q + 1) * size];
    let nvec = v.nvec();
    let (mut k, mut q) = (0, 0);
    while k < nvec || q < tuples.len() {
        let je = if k < nvec { v.vector_id(k) } else { usize::MAX };
        let jt = tuples.majors.get(q).copied().unwrap_or(usize::MAX);
        let j = je.min(jt);

        let range = if je == j {
            k += 1;
            v.p[k - 1]..v.p[k]
        } else {
            0..0
        };
        let mut qend = q;
        while qend < tuples.len() && tuples.majors[qend] == j {
            qend += 1;
        }

        let mut a = range.start;
        while a < range.end || q < qend {
            if a < range.end && v.i[a] < 0 {
                a += 1;
                continue;
            }
            let ia = if a < range.end { v.i[a] as usize } else { usize::MAX };
            let it = if q < qend { tuples.minors[q] } else { usize::MAX };
            if ia < it {
                new_i.push(ia as i64);
                new_x.extend_from_slice(v.value(a));
                a += 1;
            } else if it < ia {
                new_i.push(it as i64);
                new_x.extend_from_slice(tvalue(q));
                q += 1;
            } else {
                new_i.push(ia as i64);
                let start = new_x.len();
                new_x.extend_from_slice(tvalue(q));
                if let Some(bound) = &combine {
                    bound.apply(&mut new_x[start..], v.value(a), tvalue(q));
                }
                a += 1;
                q += 1;
            }
        }

        if new_i.len() > new_p[new_p.len() - 1] {
            new_h.push(j);
            new_p.push(new_i.len());
        }
    }

    Ok(Compressed {
        dtype: v.dtype,
        vlen: v.vlen,
        vdim: v.vdim,
        orientation: v.orientation,
        p: new_p,
        h: Some(new_h),
        i: new_i,
        x: new_x,
    })
}

impl Store {
    /// Bring the matrix to the assembled state
    ///
    /// Sorts pending tuples, resolves duplicates with the matrix's dup
    /// operator (last insertion wins when there is none), merges them into
    /// the compressed arrays and drops deleted entries. A no-op on an
    /// assembled matrix. The new arrays are built completely before the old
    /// ones are replaced, so on error the matrix is unchanged.
    pub(crate) fn wait(&mut self) -> Result<()> {
        let Deferred::Building { pending, nzombies } = &self.deferred else {
            return Ok(());
        };
        tracing::debug!(
            npending = pending.len(),
            nzombies = *nzombies,
            "assembling matrix"
        );
        let rule = DupRule::from_op(self.dup.as_ref());
        let tuples = fold_tuples(pending, self.cs.dtype, self.cs.orientation, rule)?;
        let mut merged = merge_tuples(&self.cs, &tuples, rule)?;
        merged.conform_hyper(self.hyper_ratio)?;
        self.cs = merged;
        self.deferred = Deferred::Assembled;
        Ok(())
    }
}
