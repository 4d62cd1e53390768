//! Gustavson's method: dense accumulator over each output vector

use super::Product;
use crate::engine::slice::VectorKernel;
use crate::error::{try_alloc, Result};
use crate::sparse::CsView;

pub(super) struct Gustavson<'a> {
    p: Product<'a>,
    r: CsView<'a>,
}

pub(super) struct Workspace {
    /// `mark[i] == gen` if the mask sets `i`, `gen + 1` once `i` is written
    mark: Vec<u64>,
    gen: u64,
    values: Vec<u8>,
    touched: Vec<usize>,
    t: Vec<u8>,
    tmp: Vec<u8>,
}

impl<'a> Gustavson<'a> {
    pub fn new(p: Product<'a>, r: CsView<'a>) -> Self {
        Self { p, r }
    }

    /// Scatter output vector `j` into the workspace, multiplying only if
    /// `numeric`
    fn scatter(&self, ws: &mut Workspace, j: usize, numeric: bool) {
        let (l, r, z) = (&self.p.l, &self.r, self.p.zsize);
        ws.gen += 2;
        let gen = ws.gen;
        ws.touched.clear();
        if let Some(m) = &self.p.mask {
            let mark = &mut ws.mark;
            m.for_each_set(j, |i| mark[i] = gen);
        }
        let complement = self.p.mask.as_ref().map(|m| m.is_complemented());

        for pl in l.lookup(j) {
            let lv = l.value(pl);
            for pr in r.lookup(l.index(pl)) {
                let i = r.index(pr);
                let mark = ws.mark[i];
                if mark == gen + 1 {
                    if numeric {
                        self.p.mult.apply_bytes(&mut ws.t, lv, r.value(pr));
                        let acc = &mut ws.values[i * z..(i + 1) * z];
                        self.p.accumulate(acc, &ws.t, &mut ws.tmp);
                    }
                    continue;
                }
                let allowed = match complement {
                    None => true,
                    Some(complement) => (mark == gen) != complement,
                };
                if !allowed {
                    continue;
                }
                ws.mark[i] = gen + 1;
                ws.touched.push(i);
                if numeric {
                    let acc = &mut ws.values[i * z..(i + 1) * z];
                    self.p.mult.apply_bytes(acc, lv, r.value(pr));
                }
            }
        }
    }
}

impl VectorKernel for Gustavson<'_> {
    type Workspace = Workspace;

    fn workspace(&self) -> Result<Workspace> {
        let vlen = self.r.vlen;
        let z = self.p.zsize;
        Ok(Workspace {
            mark: try_alloc(vlen, 0u64)?,
            gen: 0,
            values: try_alloc(vlen * z, 0u8)?,
            touched: Vec::new(),
            t: vec![0; z],
            tmp: vec![0; z],
        })
    }

    fn count(&self, ws: &mut Workspace, j: usize) -> usize {
        self.scatter(ws, j, false);
        ws.touched.len()
    }

    fn fill(&self, ws: &mut Workspace, j: usize, i: &mut [i64], x: &mut [u8]) {
        self.scatter(ws, j, true);
        ws.touched.sort_unstable();
        let z = self.p.zsize;
        for (k, &t) in ws.touched.iter().enumerate() {
            i[k] = t as i64;
            x[k * z..(k + 1) * z].copy_from_slice(&ws.values[t * z..(t + 1) * z]);
        }
    }
}
