//! The sparse matrix handle

use super::compressed::{flip, want_hyper};
use super::transpose::reorient;
use super::{Compressed, CsView, Deferred, Orientation};
use crate::algebra::{BinaryOp, BoundBinary};
use crate::config::Config;
use crate::dtype::{DType, Element, Scalar};
use crate::error::{Error, Result};
use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard};
use std::fmt;

/// Storage behind a [`Matrix`]
#[derive(Clone, Debug)]
pub(crate) struct Store {
    pub cs: Compressed,
    pub deferred: Deferred,
    pub hyper_ratio: f64,
    pub dup: Option<BinaryOp>,
}

impl Store {
    pub fn is_assembled(&self) -> bool {
        self.deferred.is_assembled()
    }

    /// View of the assembled arrays
    #[inline]
    pub fn view(&self) -> CsView<'_> {
        debug_assert!(self.is_assembled());
        self.cs.view()
    }

    /// Replace the contents with an assembled result
    pub fn replace(&mut self, mut cs: Compressed) -> Result<()> {
        debug_assert_eq!(cs.dtype, self.cs.dtype);
        debug_assert_eq!(cs.shape(), self.cs.shape());
        cs.conform_hyper(self.hyper_ratio)?;
        self.cs = cs;
        self.deferred = Deferred::Assembled;
        Ok(())
    }
}

/// A sparse matrix of a runtime element type
///
/// Entries are held in compressed form, by row or by column, optionally
/// hypersparse. Mutation is deferred: [`set_element`](Self::set_element)
/// appends a pending tuple and [`remove_element`](Self::remove_element)
/// marks the entry deleted in place. Both are folded in by
/// [`wait`](Self::wait), which every operation reading the matrix runs
/// implicitly. Reading through a shared reference may therefore assemble
/// the matrix; the result is the same matrix either way.
///
/// # Example
///
/// ```
/// use sparsegrb::prelude::*;
///
/// let mut a = Matrix::new(DType::I32, 2, 2)?;
/// a.set_element(0, 0, 1i32)?;
/// a.set_element(1, 1, 2i32)?;
/// assert_eq!(a.nvals()?, 2);
/// assert_eq!(a.get_element::<i32>(1, 1)?, Some(2));
/// assert_eq!(a.get_element::<i32>(0, 1)?, None);
/// # Ok::<(), sparsegrb::error::Error>(())
/// ```
pub struct Matrix {
    store: RwLock<Store>,
}

impl Matrix {
    /// Create an empty `nrows` x `ncols` matrix with default settings
    pub fn new(dtype: DType, nrows: usize, ncols: usize) -> Result<Self> {
        Self::new_with(dtype, nrows, ncols, &Config::default())
    }

    /// Create an empty matrix using the orientation and hypersparse ratio
    /// of `config`
    pub fn new_with(dtype: DType, nrows: usize, ncols: usize, config: &Config) -> Result<Self> {
        let orientation = config.orientation();
        let (_, vdim) = orientation.split(nrows, ncols);
        let hyper = want_hyper(0, vdim, config.hyper_ratio());
        let cs = Compressed::empty(dtype, nrows, ncols, orientation, hyper)?;
        Ok(Self::from_compressed(cs, config.hyper_ratio()))
    }

    pub(crate) fn from_compressed(cs: Compressed, hyper_ratio: f64) -> Self {
        Self {
            store: RwLock::new(Store {
                cs,
                deferred: Deferred::Assembled,
                hyper_ratio,
                dup: None,
            }),
        }
    }

    /// Shared access to the assembled storage, assembling first if needed
    pub(crate) fn assembled(&self) -> Result<RwLockReadGuard<'_, Store>> {
        {
            let guard = self.store.upgradable_read();
            if !guard.is_assembled() {
                let mut store = RwLockUpgradableReadGuard::upgrade(guard);
                store.wait()?;
            }
        }
        // a shared reference cannot un-assemble the matrix, so this holds
        Ok(self.store.read_recursive())
    }

    /// Exclusive access to the storage
    #[inline]
    pub(crate) fn store_mut(&mut self) -> &mut Store {
        self.store.get_mut()
    }

    /// Element type
    pub fn dtype(&self) -> DType {
        self.store.read_recursive().cs.dtype
    }

    /// Shape `[nrows, ncols]`
    pub fn shape(&self) -> [usize; 2] {
        self.store.read_recursive().cs.shape()
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        self.shape()[0]
    }

    /// Number of columns
    pub fn ncols(&self) -> usize {
        self.shape()[1]
    }

    /// Storage orientation
    pub fn orientation(&self) -> Orientation {
        self.store.read_recursive().cs.orientation
    }

    /// Returns true if only non-empty vectors are stored
    pub fn is_hypersparse(&self) -> bool {
        self.store.read_recursive().cs.h.is_some()
    }

    /// Hypersparse ratio of this matrix
    pub fn hyper_ratio(&self) -> f64 {
        self.store.read_recursive().hyper_ratio
    }

    /// Number of pending insertions
    pub fn npending(&self) -> usize {
        self.store.read_recursive().deferred.npending()
    }

    /// Number of deleted entries not yet purged
    pub fn nzombies(&self) -> usize {
        self.store.read_recursive().deferred.nzombies()
    }

    /// Returns true if nothing is pending or deleted
    pub fn is_assembled(&self) -> bool {
        self.store.read_recursive().is_assembled()
    }

    /// Number of entries
    pub fn nvals(&self) -> Result<usize> {
        Ok(self.assembled()?.view().nvals())
    }

    /// Fold pending insertions and deletions into the compressed arrays
    ///
    /// Calling it again with no mutation in between changes nothing.
    pub fn wait(&mut self) -> Result<()> {
        self.store_mut().wait()
    }

    /// Remove every entry, keeping type, shape and settings
    pub fn clear(&mut self) -> Result<()> {
        let store = self.store_mut();
        let [nrows, ncols] = store.cs.shape();
        let orientation = store.cs.orientation;
        let (_, vdim) = orientation.split(nrows, ncols);
        let hyper = want_hyper(0, vdim, store.hyper_ratio);
        store.cs = Compressed::empty(store.cs.dtype, nrows, ncols, orientation, hyper)?;
        store.deferred = Deferred::Assembled;
        Ok(())
    }

    /// Set the operator that combines pending insertions at one position
    ///
    /// With no operator the last insertion wins.
    pub fn set_dup_op(&mut self, dup: Option<BinaryOp>) -> Result<()> {
        let store = self.store_mut();
        if let Some(op) = &dup {
            let dtype = store.cs.dtype;
            BoundBinary::new(op, dtype, dtype, dtype)?;
        }
        store.dup = dup;
        Ok(())
    }

    /// Convert the storage to `orientation`
    pub fn set_orientation(&mut self, orientation: Orientation) -> Result<()> {
        let store = self.store_mut();
        store.wait()?;
        if store.cs.orientation != orientation {
            let reoriented = reorient(store.view())?;
            store.replace(reoriented)?;
        }
        Ok(())
    }

    /// Set the hypersparse ratio and convert the storage to match
    pub fn set_hyper_ratio(&mut self, hyper_ratio: f64) -> Result<()> {
        if hyper_ratio.is_nan() {
            return Err(Error::invalid_argument("hyper_ratio", "must not be NaN"));
        }
        let store = self.store_mut();
        store.hyper_ratio = hyper_ratio.max(0.0);
        store.wait()?;
        let ratio = store.hyper_ratio;
        store.cs.conform_hyper(ratio)
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<[usize; 2]> {
        let [nrows, ncols] = self.shape();
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
        Ok([nrows, ncols])
    }

    /// Set entry `(row, col)`, casting `value` to the matrix type
    pub fn set_element<T: Element>(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        self.set_scalar(row, col, &Scalar::new(value))
    }

    /// Set entry `(row, col)` from a scalar, casting it to the matrix type
    ///
    /// An entry already in the compressed arrays, live or deleted, is
    /// updated in place; otherwise the value is appended as a pending tuple.
    pub fn set_scalar(&mut self, row: usize, col: usize, value: &Scalar) -> Result<()> {
        self.check_bounds(row, col)?;
        let store = self.store_mut();
        let dtype = store.cs.dtype;
        let value = value.cast(dtype)?;
        let (j, i) = store.cs.orientation.to_major_minor(row, col);
        let found = store.cs.view().find(j, i);
        match found {
            Some(pos) => {
                let size = dtype.size_in_bytes();
                store.cs.x[pos * size..(pos + 1) * size].copy_from_slice(value.as_bytes());
                if store.cs.i[pos] < 0 {
                    store.cs.i[pos] = flip(store.cs.i[pos]);
                    let (_, nzombies) = store.deferred.building();
                    *nzombies -= 1;
                    store.deferred.settle();
                }
            }
            None => {
                let (pending, _) = store.deferred.building();
                pending.push(j, i, value.as_bytes());
            }
        }
        Ok(())
    }

    /// Entry `(row, col)` cast to `T`, or `None` if there is no entry
    pub fn get_element<T: Element>(&self, row: usize, col: usize) -> Result<Option<T>> {
        match self.get_scalar(row, col)? {
            Some(s) => Ok(Some(s.cast(T::DTYPE)?.get::<T>()?)),
            None => Ok(None),
        }
    }

    /// Entry `(row, col)` in the matrix type, or `None` if there is no entry
    pub fn get_scalar(&self, row: usize, col: usize) -> Result<Option<Scalar>> {
        self.check_bounds(row, col)?;
        let store = self.assembled()?;
        let v = store.view();
        let (j, i) = v.orientation.to_major_minor(row, col);
        v.find(j, i)
            .map(|pos| Scalar::from_bytes(v.dtype, v.value(pos)))
            .transpose()
    }

    /// Delete entry `(row, col)` if present
    ///
    /// The entry is marked deleted in place and purged by the next
    /// [`wait`](Self::wait); it no longer counts as an entry from now on.
    pub fn remove_element(&mut self, row: usize, col: usize) -> Result<()> {
        self.check_bounds(row, col)?;
        let store = self.store_mut();
        let (j, i) = store.cs.orientation.to_major_minor(row, col);
        let mut found = store.cs.view().find(j, i);
        if found.is_none() && store.deferred.npending() > 0 {
            // the entry may still be pending
            store.wait()?;
            found = store.cs.view().find(j, i);
        }
        if let Some(pos) = found {
            if store.cs.i[pos] >= 0 {
                store.cs.i[pos] = flip(store.cs.i[pos]);
                let (_, nzombies) = store.deferred.building();
                *nzombies += 1;
            }
        }
        Ok(())
    }

    /// Verify the storage invariants
    pub fn check(&self) -> Result<()> {
        let store = self.store.read_recursive();
        store.cs.check(!store.is_assembled())?;
        let counted = store.cs.i.iter().filter(|&&t| t < 0).count();
        if counted != store.deferred.nzombies() {
            return Err(Error::invalid_handle(
                "matrix",
                format!(
                    "{} deleted entries stored, {} recorded",
                    counted,
                    store.deferred.nzombies()
                ),
            ));
        }
        Ok(())
    }
}

impl Clone for Matrix {
    fn clone(&self) -> Self {
        Self {
            store: RwLock::new(self.store.read_recursive().clone()),
        }
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store.read_recursive();
        f.debug_struct("Matrix")
            .field("dtype", &store.cs.dtype)
            .field("shape", &store.cs.shape())
            .field("orientation", &store.cs.orientation)
            .field("hypersparse", &store.cs.h.is_some())
            .field("stored", &store.cs.i.len())
            .field("npending", &store.deferred.npending())
            .field("nzombies", &store.deferred.nzombies())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix {
        let mut m = Matrix::new(DType::I32, 3, 3).unwrap();
        m.set_element(0, 0, 1i32).unwrap();
        m.set_element(2, 1, 5i32).unwrap();
        m.set_element(1, 2, 3i32).unwrap();
        m
    }

    #[test]
    fn test_pending_then_assembled() {
        let m = sample();
        assert_eq!(m.npending(), 3);
        assert_eq!(m.nvals().unwrap(), 3);
        assert!(m.is_assembled());
        assert_eq!(m.get_element::<i32>(2, 1).unwrap(), Some(5));
        m.check().unwrap();
    }

    #[test]
    fn test_set_existing_updates_in_place() {
        let mut m = sample();
        m.wait().unwrap();
        m.set_element(2, 1, 9.7f64).unwrap();
        assert_eq!(m.npending(), 0);
        assert_eq!(m.get_element::<i32>(2, 1).unwrap(), Some(9));
    }

    #[test]
    fn test_pending_duplicates_last_wins_or_dup() {
        let mut m = Matrix::new(DType::U8, 2, 2).unwrap();
        m.set_element(0, 1, 4u8).unwrap();
        m.set_element(0, 1, 6u8).unwrap();
        assert_eq!(m.get_element::<u8>(0, 1).unwrap(), Some(6));

        let mut m = Matrix::new(DType::U8, 2, 2).unwrap();
        let plus = BinaryOp::builtin(crate::algebra::BinaryOpcode::Plus, DType::U8).unwrap();
        m.set_dup_op(Some(plus)).unwrap();
        m.set_element(0, 1, 4u8).unwrap();
        m.set_element(0, 1, 6u8).unwrap();
        assert_eq!(m.get_element::<u8>(0, 1).unwrap(), Some(10));
    }

    #[test]
    fn test_remove_is_immediate_and_purged_on_wait() {
        let mut m = sample();
        m.wait().unwrap();
        m.remove_element(0, 0).unwrap();
        assert_eq!(m.nzombies(), 1);
        m.check().unwrap();
        assert_eq!(m.get_element::<i32>(0, 0).unwrap(), None);
        assert_eq!(m.nzombies(), 0);
        assert_eq!(m.nvals().unwrap(), 2);
    }

    #[test]
    fn test_remove_pending_entry() {
        let mut m = sample();
        m.remove_element(1, 2).unwrap();
        assert_eq!(m.npending(), 0);
        assert_eq!(m.nzombies(), 1);
        assert_eq!(m.nvals().unwrap(), 2);
    }

    #[test]
    fn test_set_revives_deleted_entry() {
        let mut m = sample();
        m.wait().unwrap();
        m.remove_element(2, 1).unwrap();
        m.set_element(2, 1, 8i32).unwrap();
        assert_eq!(m.nzombies(), 0);
        assert!(m.is_assembled());
        assert_eq!(m.get_element::<i32>(2, 1).unwrap(), Some(8));
    }

    #[test]
    fn test_wait_is_idempotent() {
        let mut m = sample();
        m.wait().unwrap();
        let before = m.store_mut().clone();
        m.wait().unwrap();
        let after = m.store_mut();
        assert_eq!(before.cs, after.cs);
        assert_eq!(before.deferred, after.deferred);
    }

    #[test]
    fn test_set_orientation_keeps_entries() {
        let mut m = sample();
        m.set_orientation(Orientation::ByCol).unwrap();
        assert_eq!(m.orientation(), Orientation::ByCol);
        assert_eq!(m.get_element::<i32>(1, 2).unwrap(), Some(3));
        assert_eq!(m.nvals().unwrap(), 3);
        m.check().unwrap();
    }

    #[test]
    fn test_hypersparse_matrix() {
        let cfg = Config::new().with_hyper_ratio(0.5);
        let mut m = Matrix::new_with(DType::F64, 1000, 1000, &cfg).unwrap();
        assert!(m.is_hypersparse());
        m.set_element(999, 3, 1.5f64).unwrap();
        m.set_element(7, 3, 2.5f64).unwrap();
        assert_eq!(m.nvals().unwrap(), 2);
        assert!(m.is_hypersparse());
        assert_eq!(m.get_element::<f64>(7, 3).unwrap(), Some(2.5));
        m.set_hyper_ratio(0.0).unwrap();
        assert!(!m.is_hypersparse());
        assert_eq!(m.get_element::<f64>(999, 3).unwrap(), Some(1.5));
    }

    #[test]
    fn test_bounds_and_types() {
        let mut m = sample();
        assert!(matches!(
            m.set_element(3, 0, 1i32),
            Err(Error::IndexOutOfBounds { index: 3, size: 3 })
        ));
        let t = DType::Udt(crate::dtype::UserType::new("cell", 2));
        let s = Scalar::from_bytes(t, &[1, 2]).unwrap();
        assert!(matches!(
            m.set_scalar(0, 0, &s),
            Err(Error::DomainMismatch { .. })
        ));
    }

    #[test]
    fn test_clear() {
        let mut m = sample();
        m.clear().unwrap();
        assert_eq!(m.nvals().unwrap(), 0);
        assert_eq!(m.shape(), [3, 3]);
    }
}
