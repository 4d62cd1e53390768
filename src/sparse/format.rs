//! Storage orientation

/// Major orientation of compressed storage
///
/// A matrix is a list of sparse vectors: its rows when stored `ByRow`
/// (CSR), its columns when stored `ByCol` (CSC). The two are dual views of
/// one logical matrix; a transposed operand is the same arrays read with
/// the opposite orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Compressed Sparse Row
    ///
    /// Vectors are rows; minor indices are column indices.
    #[default]
    ByRow,

    /// Compressed Sparse Column
    ///
    /// Vectors are columns; minor indices are row indices.
    ByCol,
}

impl Orientation {
    /// The other orientation
    #[inline]
    pub fn flip(self) -> Self {
        match self {
            Self::ByRow => Self::ByCol,
            Self::ByCol => Self::ByRow,
        }
    }

    /// Returns true for row-major storage
    #[inline]
    pub fn is_by_row(self) -> bool {
        matches!(self, Self::ByRow)
    }

    /// Returns the storage format name ("CSR" or "CSC")
    pub fn format_name(self) -> &'static str {
        match self {
            Self::ByRow => "CSR",
            Self::ByCol => "CSC",
        }
    }

    /// Split a shape `[nrows, ncols]` into `(vlen, vdim)`: the length of
    /// each vector and the number of vectors
    #[inline]
    pub(crate) fn split(self, nrows: usize, ncols: usize) -> (usize, usize) {
        match self {
            Self::ByRow => (ncols, nrows),
            Self::ByCol => (nrows, ncols),
        }
    }

    /// Inverse of [`split`](Self::split)
    #[inline]
    pub(crate) fn shape(self, vlen: usize, vdim: usize) -> [usize; 2] {
        match self {
            Self::ByRow => [vdim, vlen],
            Self::ByCol => [vlen, vdim],
        }
    }

    /// Convert a (row, col) position into (major, minor)
    #[inline]
    pub(crate) fn to_major_minor(self, row: usize, col: usize) -> (usize, usize) {
        match self {
            Self::ByRow => (row, col),
            Self::ByCol => (col, row),
        }
    }

    /// Convert a (major, minor) position into (row, col)
    #[inline]
    pub(crate) fn to_row_col(self, major: usize, minor: usize) -> (usize, usize) {
        self.to_major_minor(major, minor)
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format_name())
    }
}
