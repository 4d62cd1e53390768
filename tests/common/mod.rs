//! Common test utilities
#![allow(dead_code)]

use proptest::collection::btree_map;
use proptest::prelude::*;
use sparsegrb::prelude::*;
use std::collections::BTreeSet;

/// Configuration whose new matrices use `orientation`
pub fn config_by(orientation: Orientation) -> Config {
    Config::new().with_orientation(orientation)
}

/// Create a matrix from `(row, col, value)` entries stored with `orientation`
pub fn from_entries<T: Element>(
    nrows: usize,
    ncols: usize,
    entries: &[(usize, usize, T)],
    orientation: Orientation,
) -> Matrix {
    let mut m = Matrix::new_with(T::DTYPE, nrows, ncols, &config_by(orientation)).unwrap();
    let rows: Vec<usize> = entries.iter().map(|e| e.0).collect();
    let cols: Vec<usize> = entries.iter().map(|e| e.1).collect();
    let vals: Vec<T> = entries.iter().map(|e| e.2).collect();
    m.build(&rows, &cols, &vals, None).unwrap();
    m
}

/// Create a matrix from dense rows, leaving out positions equal to `T::default()`
pub fn from_dense<T: Element + Default + PartialEq>(
    rows: &[&[T]],
    orientation: Orientation,
) -> Matrix {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, |r| r.len());
    let mut entries = Vec::new();
    for (r, row) in rows.iter().enumerate() {
        for (c, &v) in row.iter().enumerate() {
            if v != T::default() {
                entries.push((r, c, v));
            }
        }
    }
    from_entries(nrows, ncols, &entries, orientation)
}

/// Dense copy of `m` with missing entries as `T::default()`
pub fn to_dense<T: Element + Default>(m: &Matrix) -> Vec<Vec<T>> {
    let mut dense = vec![vec![T::default(); m.ncols()]; m.nrows()];
    let (rows, cols, vals) = m.extract_tuples::<T>().unwrap();
    for ((r, c), v) in rows.into_iter().zip(cols).zip(vals) {
        dense[r][c] = v;
    }
    dense
}

/// Entries of `m` sorted by position
pub fn sorted_entries<T: Element>(m: &Matrix) -> Vec<(usize, usize, T)> {
    let (rows, cols, vals) = m.extract_tuples::<T>().unwrap();
    let mut out: Vec<_> = rows
        .into_iter()
        .zip(cols)
        .zip(vals)
        .map(|((r, c), v)| (r, c, v))
        .collect();
    out.sort_by_key(|e| (e.0, e.1));
    out
}

/// Positions of the entries of `m`
pub fn pattern(m: &Matrix) -> BTreeSet<(usize, usize)> {
    let (rows, cols, _) = m.extract_tuples_bytes().unwrap();
    rows.into_iter().zip(cols).collect()
}

// ============================================================================
// Strategies
// ============================================================================

/// A small random sparse matrix, before it is built
#[derive(Debug, Clone)]
pub struct SparseSpec {
    pub nrows: usize,
    pub ncols: usize,
    pub entries: Vec<(usize, usize, i64)>,
}

impl SparseSpec {
    /// Build the matrix as `i64` with `orientation`
    pub fn build(&self, orientation: Orientation) -> Matrix {
        from_entries(self.nrows, self.ncols, &self.entries, orientation)
    }

    /// Positions of the entries
    pub fn pattern(&self) -> BTreeSet<(usize, usize)> {
        self.entries.iter().map(|e| (e.0, e.1)).collect()
    }
}

/// Either orientation
pub fn arb_orientation() -> impl Strategy<Value = Orientation> {
    prop_oneof![Just(Orientation::ByRow), Just(Orientation::ByCol)]
}

/// Entries of an `nrows` x `ncols` matrix with small values, no position twice
pub fn arb_entries(nrows: usize, ncols: usize) -> impl Strategy<Value = SparseSpec> {
    let max = nrows * ncols;
    btree_map((0..nrows, 0..ncols), -4i64..=4, 0..=max).prop_map(move |map| SparseSpec {
        nrows,
        ncols,
        entries: map.into_iter().map(|((r, c), v)| (r, c, v)).collect(),
    })
}

/// A random sparse matrix of up to `max_dim` rows and columns
pub fn arb_sparse(max_dim: usize) -> impl Strategy<Value = SparseSpec> {
    (1..=max_dim, 1..=max_dim).prop_flat_map(|(nrows, ncols)| arb_entries(nrows, ncols))
}

/// Two random sparse matrices of the same shape
pub fn arb_sparse_pair(max_dim: usize) -> impl Strategy<Value = (SparseSpec, SparseSpec)> {
    (1..=max_dim, 1..=max_dim)
        .prop_flat_map(|(nrows, ncols)| (arb_entries(nrows, ncols), arb_entries(nrows, ncols)))
}

/// Operands of a product: an `m` x `k` and a `k` x `n` matrix, and an
/// `m` x `n` mask pattern
pub fn arb_product(
    max_dim: usize,
) -> impl Strategy<Value = (SparseSpec, SparseSpec, SparseSpec)> {
    (1..=max_dim, 1..=max_dim, 1..=max_dim).prop_flat_map(|(m, k, n)| {
        (arb_entries(m, k), arb_entries(k, n), arb_entries(m, n))
    })
}
