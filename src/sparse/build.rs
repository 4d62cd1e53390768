//! Bulk construction from triplets and export to triplets

use super::assemble::{fold_tuples, merge_tuples, DupRule};
use super::{Matrix, PendingTuples};
use crate::algebra::BinaryOp;
use crate::dtype::{cast_values, DType, Element};
use crate::error::{Error, Result};

impl Matrix {
    /// Fill an empty matrix from `(rows[k], cols[k], values[k])` triplets
    ///
    /// Values are cast to the matrix type. Triplets sharing a position are
    /// combined in input order with `dup`; without `dup`, a repeated
    /// position is an error.
    ///
    /// # Errors
    ///
    /// - `InvalidHandle` if the matrix already has entries
    /// - `InvalidArgument` on mismatched lengths or duplicates without `dup`
    /// - `IndexOutOfBounds` for an index outside the matrix
    /// - `DomainMismatch` if the values or `dup` do not fit the matrix type
    pub fn build<T: Element>(
        &mut self,
        rows: &[usize],
        cols: &[usize],
        values: &[T],
        dup: Option<&BinaryOp>,
    ) -> Result<()> {
        let size = T::DTYPE.size_in_bytes();
        let mut x = vec![0u8; values.len() * size];
        for (dst, &v) in x.chunks_exact_mut(size).zip(values) {
            v.write(dst);
        }
        self.build_bytes(rows, cols, &x, T::DTYPE, dup)
    }

    /// Like [`build`](Self::build) with values given as raw bytes of `xtype`
    pub fn build_bytes(
        &mut self,
        rows: &[usize],
        cols: &[usize],
        x: &[u8],
        xtype: DType,
        dup: Option<&BinaryOp>,
    ) -> Result<()> {
        let [nrows, ncols] = self.shape();
        let n = rows.len();
        if cols.len() != n {
            return Err(Error::invalid_argument(
                "cols",
                format!("{} column indices for {} row indices", cols.len(), n),
            ));
        }
        if x.len() != n * xtype.size_in_bytes() {
            return Err(Error::invalid_argument(
                "values",
                format!("{} bytes of {} for {} entries", x.len(), xtype, n),
            ));
        }

        let store = self.store_mut();
        store.wait()?;
        if !store.cs.i.is_empty() {
            return Err(Error::invalid_handle(
                "matrix",
                "build requires a matrix with no entries",
            ));
        }
        let dtype = store.cs.dtype;
        let orientation = store.cs.orientation;
        let values = cast_values(x, xtype, dtype)?;

        let mut tuples = PendingTuples::new();
        tuples.majors.reserve(n);
        tuples.minors.reserve(n);
        tuples.x.reserve(values.len());
        let size = dtype.size_in_bytes();
        for (k, (&row, &col)) in rows.iter().zip(cols).enumerate() {
            if row >= nrows {
                return Err(Error::IndexOutOfBounds {
                    index: row,
                    size: nrows,
                });
            }
            if col >= ncols {
                return Err(Error::IndexOutOfBounds {
                    index: col,
                    size: ncols,
                });
            }
            let (j, i) = orientation.to_major_minor(row, col);
            tuples.push(j, i, &values[k * size..(k + 1) * size]);
        }

        let rule = match dup {
            Some(op) => DupRule::Combine(op),
            None => DupRule::Reject,
        };
        let folded = fold_tuples(&tuples, dtype, orientation, rule)?;
        let merged = merge_tuples(&store.cs, &folded, DupRule::LastWins)?;
        store.replace(merged)
    }

    /// Create a matrix of `T` from triplets with no repeated positions
    pub fn from_triplets<T: Element>(
        nrows: usize,
        ncols: usize,
        rows: &[usize],
        cols: &[usize],
        values: &[T],
    ) -> Result<Self> {
        let mut m = Matrix::new(T::DTYPE, nrows, ncols)?;
        m.build(rows, cols, values, None)?;
        Ok(m)
    }

    /// Export every entry as `(rows, cols, values)` with values cast to `T`
    ///
    /// Entries come in storage order: by row for row-oriented matrices, by
    /// column otherwise.
    pub fn extract_tuples<T: Element>(&self) -> Result<(Vec<usize>, Vec<usize>, Vec<T>)> {
        let (rows, cols, x) = self.extract_tuples_bytes()?;
        let x = cast_values(&x, self.dtype(), T::DTYPE)?;
        let size = T::DTYPE.size_in_bytes();
        let values = x.chunks_exact(size).map(T::read).collect();
        Ok((rows, cols, values))
    }

    /// Export every entry with values as raw bytes of the matrix type
    pub fn extract_tuples_bytes(&self) -> Result<(Vec<usize>, Vec<usize>, Vec<u8>)> {
        let store = self.assembled()?;
        let v = store.view();
        let mut rows = Vec::with_capacity(v.nvals());
        let mut cols = Vec::with_capacity(v.nvals());
        for k in 0..v.nvec() {
            let (j, range) = v.vector(k);
            for pos in range {
                let (row, col) = v.orientation.to_row_col(j, v.index(pos));
                rows.push(row);
                cols.push(col);
            }
        }
        Ok((rows, cols, v.x.to_vec()))
    }
}
