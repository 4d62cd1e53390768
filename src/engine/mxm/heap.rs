//! Heap-based k-way merge: no dense workspace

use super::Product;
use crate::engine::slice::VectorKernel;
use crate::error::Result;
use crate::sparse::CsView;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

pub(super) struct Heap<'a> {
    p: Product<'a>,
    r: CsView<'a>,
}

/// Next unmerged entry of one `R(k,:)`: (output index, position of `k` in
/// `L(j,:)`, position in `R`, end of `R(k,:)`)
type Head = Reverse<(usize, usize, usize, usize)>;

pub(super) struct Workspace {
    heap: BinaryHeap<Head>,
    acc: Vec<u8>,
    t: Vec<u8>,
    tmp: Vec<u8>,
}

impl<'a> Heap<'a> {
    pub fn new(p: Product<'a>, r: CsView<'a>) -> Self {
        Self { p, r }
    }

    /// Merge output vector `j`, calling `emit` once per output entry in
    /// ascending order with the finished value (empty unless `numeric`)
    fn merge(
        &self,
        ws: &mut Workspace,
        j: usize,
        numeric: bool,
        mut emit: impl FnMut(usize, &[u8]),
    ) {
        let (l, r) = (&self.p.l, &self.r);
        let lr = l.lookup(j);
        let base = lr.start;
        ws.heap.clear();
        for pl in lr {
            let rr = r.lookup(l.index(pl));
            if !rr.is_empty() {
                ws.heap.push(Reverse((r.index(rr.start), pl - base, rr.start, rr.end)));
            }
        }
        let mut cursor = self.p.mask.as_ref().map(|m| m.cursor(j));

        // (index, allowed) of the entry being accumulated
        let mut current: Option<(usize, bool)> = None;
        while let Some(Reverse((i, q, pr, end))) = ws.heap.pop() {
            if pr + 1 < end {
                ws.heap.push(Reverse((r.index(pr + 1), q, pr + 1, end)));
            }
            let lv = l.value(base + q);
            match current {
                Some((ci, allowed)) if ci == i => {
                    if allowed && numeric {
                        self.p.mult.apply_bytes(&mut ws.t, lv, r.value(pr));
                        self.p.accumulate(&mut ws.acc, &ws.t, &mut ws.tmp);
                    }
                }
                _ => {
                    if let Some((ci, true)) = current {
                        emit(ci, &ws.acc);
                    }
                    let allowed = cursor.as_mut().map_or(true, |m| m.allows(i));
                    if allowed && numeric {
                        self.p.mult.apply_bytes(&mut ws.acc, lv, r.value(pr));
                    }
                    current = Some((i, allowed));
                }
            }
        }
        if let Some((ci, true)) = current {
            emit(ci, &ws.acc);
        }
    }
}

impl VectorKernel for Heap<'_> {
    type Workspace = Workspace;

    fn workspace(&self) -> Result<Workspace> {
        let z = self.p.zsize;
        Ok(Workspace {
            heap: BinaryHeap::new(),
            acc: vec![0; z],
            t: vec![0; z],
            tmp: vec![0; z],
        })
    }

    fn count(&self, ws: &mut Workspace, j: usize) -> usize {
        let mut n = 0;
        self.merge(ws, j, false, |_, _| n += 1);
        n
    }

    fn fill(&self, ws: &mut Workspace, j: usize, i: &mut [i64], x: &mut [u8]) {
        let z = self.p.zsize;
        let mut k = 0;
        self.merge(ws, j, true, |idx, value| {
            i[k] = idx as i64;
            x[k * z..(k + 1) * z].copy_from_slice(value);
            k += 1;
        });
    }
}
