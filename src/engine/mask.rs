//! Write masks

use crate::config::Descriptor;
use crate::dtype::{cast_fn, CastFn, DType};
use crate::error::{Error, Result};
use crate::sparse::CsView;

/// A mask read in the orientation of the output it guards
///
/// Position `(j, i)` is *set* when the mask holds an entry there whose
/// value casts to `true` (any entry at all if the mask is structural). A
/// position is *allowed* when it is set, or when it is not set and the mask
/// is complemented.
#[derive(Clone, Copy)]
pub(crate) struct Mask<'a> {
    view: CsView<'a>,
    structural: bool,
    complement: bool,
    to_bool: CastFn,
}

impl<'a> Mask<'a> {
    /// Wrap `view`, already in the output's orientation
    pub fn new(view: CsView<'a>, desc: &Descriptor) -> Result<Self> {
        let to_bool = if desc.mask_structure {
            // never called
            cast_fn(DType::Bool, DType::Bool)?
        } else {
            cast_fn(view.dtype, DType::Bool)
                .map_err(|_| Error::domain("mask", view.dtype, DType::Bool))?
        };
        Ok(Self {
            view,
            structural: desc.mask_structure,
            complement: desc.mask_complement,
            to_bool,
        })
    }

    #[inline]
    pub fn is_complemented(&self) -> bool {
        self.complement
    }

    /// True if entry `pos` of the mask sets its position
    #[inline]
    fn is_set(&self, pos: usize) -> bool {
        if self.structural {
            return true;
        }
        let mut b = [0u8];
        (self.to_bool)(&mut b, self.view.value(pos));
        b[0] != 0
    }

    /// Is `(j, i)` allowed?
    pub fn allows(&self, j: usize, i: usize) -> bool {
        let set = self.view.find(j, i).is_some_and(|pos| self.is_set(pos));
        set != self.complement
    }

    /// Ascending-order membership queries over vector `j`
    #[inline]
    pub fn cursor(&self, j: usize) -> MaskCursor<'_, 'a> {
        let range = self.view.lookup(j);
        MaskCursor {
            mask: self,
            pos: range.start,
            end: range.end,
        }
    }

    /// Call `f` with the minor index of every set position in vector `j`
    #[inline]
    pub fn for_each_set(&self, j: usize, mut f: impl FnMut(usize)) {
        for pos in self.view.lookup(j) {
            if self.is_set(pos) {
                f(self.view.index(pos));
            }
        }
    }

    /// Number of entries in vector `j`, an upper bound on its set positions
    #[inline]
    pub fn vector_len(&self, j: usize) -> usize {
        self.view.lookup(j).len()
    }

    /// Number of mask entries
    #[inline]
    pub fn nvals(&self) -> usize {
        self.view.nvals()
    }
}

/// Walks one mask vector; queries must come in ascending minor order
pub(crate) struct MaskCursor<'m, 'a> {
    mask: &'m Mask<'a>,
    pos: usize,
    end: usize,
}

impl MaskCursor<'_, '_> {
    /// Is minor index `i` allowed?
    #[inline]
    pub fn allows(&mut self, i: usize) -> bool {
        let v = &self.mask.view;
        while self.pos < self.end && v.index(self.pos) < i {
            self.pos += 1;
        }
        let set = self.pos < self.end && v.index(self.pos) == i && self.mask.is_set(self.pos);
        set != self.mask.complement
    }
}
