//! Dot products: each output entry from a sorted intersection

use super::Product;
use crate::engine::slice::VectorKernel;
use crate::error::Result;
use crate::sparse::CsView;

/// `d` holds, for each output minor index `i`, the vector of `k` terms
/// paired with `L(j,:)`
pub(super) struct Dot<'a> {
    p: Product<'a>,
    d: CsView<'a>,
}

pub(super) struct Workspace {
    acc: Vec<u8>,
    t: Vec<u8>,
    tmp: Vec<u8>,
}

impl<'a> Dot<'a> {
    pub fn new(p: Product<'a>, d: CsView<'a>) -> Self {
        Self { p, d }
    }

    /// Number of output positions examined for vector `j`
    pub fn candidates(&self, j: usize) -> usize {
        match &self.p.mask {
            Some(m) if !m.is_complemented() => m.vector_len(j),
            _ => self.d.nvec(),
        }
    }

    /// `L(j,:) · D(i,:)` into `ws.acc`; false if the vectors do not meet
    fn dot(&self, ws: &mut Workspace, j: usize, i: usize, numeric: bool) -> bool {
        let (l, d) = (&self.p.l, &self.d);
        let (lr, dr) = (l.lookup(j), d.lookup(i));
        let (mut pl, mut pd) = (lr.start, dr.start);
        let mut found = false;
        while pl < lr.end && pd < dr.end {
            let (kl, kd) = (l.index(pl), d.index(pd));
            if kl < kd {
                pl += 1;
            } else if kd < kl {
                pd += 1;
            } else {
                if !numeric {
                    return true;
                }
                if found {
                    self.p.mult.apply_bytes(&mut ws.t, l.value(pl), d.value(pd));
                    self.p.accumulate(&mut ws.acc, &ws.t, &mut ws.tmp);
                } else {
                    self.p.mult.apply_bytes(&mut ws.acc, l.value(pl), d.value(pd));
                    found = true;
                }
                if self.p.add.is_terminal(&ws.acc) {
                    break;
                }
                pl += 1;
                pd += 1;
            }
        }
        found
    }

    /// Compute output vector `j`, calling `emit` per entry in ascending
    /// order with the value (meaningless unless `numeric`)
    fn vector(
        &self,
        ws: &mut Workspace,
        j: usize,
        numeric: bool,
        mut emit: impl FnMut(usize, &[u8]),
    ) {
        if self.p.l.lookup(j).is_empty() {
            return;
        }
        match &self.p.mask {
            Some(m) if !m.is_complemented() => {
                m.for_each_set(j, |i| {
                    if self.dot(ws, j, i, numeric) {
                        emit(i, &ws.acc);
                    }
                });
            }
            mask => {
                let mut cursor = mask.as_ref().map(|m| m.cursor(j));
                for k in 0..self.d.nvec() {
                    let (i, range) = self.d.vector(k);
                    if range.is_empty() || !cursor.as_mut().map_or(true, |c| c.allows(i)) {
                        continue;
                    }
                    if self.dot(ws, j, i, numeric) {
                        emit(i, &ws.acc);
                    }
                }
            }
        }
    }
}

impl VectorKernel for Dot<'_> {
    type Workspace = Workspace;

    fn workspace(&self) -> Result<Workspace> {
        let z = self.p.zsize;
        Ok(Workspace {
            acc: vec![0; z],
            t: vec![0; z],
            tmp: vec![0; z],
        })
    }

    fn count(&self, ws: &mut Workspace, j: usize) -> usize {
        let mut n = 0;
        self.vector(ws, j, false, |_, _| n += 1);
        n
    }

    fn fill(&self, ws: &mut Workspace, j: usize, i: &mut [i64], x: &mut [u8]) {
        let z = self.p.zsize;
        let mut k = 0;
        self.vector(ws, j, true, |idx, value| {
            i[k] = idx as i64;
            x[k * z..(k + 1) * z].copy_from_slice(value);
            k += 1;
        });
    }
}
