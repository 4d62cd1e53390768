//! Runtime configuration and per-call descriptors
//!
//! [`Config`] carries the settings that are global to a [`Context`](crate::engine::Context):
//! the thread budget, the amount of work handed to each thread, and the
//! storage defaults for newly created matrices. [`Descriptor`] carries the
//! settings of one call: mask handling, output replacement, operand
//! transposition, and the matrix-multiply algorithm.

use crate::sparse::Orientation;

/// Default work per thread before another thread is worth starting
pub const DEFAULT_CHUNK: usize = 64 * 1024;

/// Default hypersparse threshold: a matrix is stored hypersparse when fewer
/// than `hyper_ratio * vdim` of its vectors are non-empty.
pub const DEFAULT_HYPER_RATIO: f64 = 1.0 / 16.0;

/// Global settings shared by every operation run through a context
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    nthreads_max: usize,
    chunk: usize,
    hyper_ratio: f64,
    orientation: Orientation,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nthreads_max: default_nthreads(),
            chunk: DEFAULT_CHUNK,
            hyper_ratio: DEFAULT_HYPER_RATIO,
            orientation: Orientation::default(),
        }
    }
}

#[cfg(feature = "rayon")]
fn default_nthreads() -> usize {
    rayon::current_num_threads().max(1)
}

#[cfg(not(feature = "rayon"))]
fn default_nthreads() -> usize {
    1
}

impl Config {
    /// Configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the number of threads an operation may use (at least 1)
    pub fn with_nthreads(mut self, nthreads_max: usize) -> Self {
        self.nthreads_max = nthreads_max.max(1);
        self
    }

    /// Set the minimum work (in entries or flops) given to each thread
    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    /// Set the hypersparse ratio for new matrices
    ///
    /// A ratio of 0 disables hypersparse storage; a ratio of 1 or more makes
    /// every matrix with an empty vector hypersparse.
    pub fn with_hyper_ratio(mut self, hyper_ratio: f64) -> Self {
        self.hyper_ratio = hyper_ratio.max(0.0);
        self
    }

    /// Set the storage orientation for new matrices
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Maximum number of threads
    pub fn nthreads_max(&self) -> usize {
        self.nthreads_max
    }

    /// Work per thread
    pub fn chunk(&self) -> usize {
        self.chunk
    }

    /// Hypersparse ratio for new matrices
    pub fn hyper_ratio(&self) -> f64 {
        self.hyper_ratio
    }

    /// Storage orientation for new matrices
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Number of threads to use for `work` units of work
    pub(crate) fn nthreads_for(&self, work: usize) -> usize {
        let by_work = (work / self.chunk).max(1);
        by_work.min(self.nthreads_max)
    }
}

/// Matrix-multiply algorithm
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AxbMethod {
    /// Pick by estimated cost
    #[default]
    Auto,
    /// Row-accumulate into a dense workspace
    Gustavson,
    /// Sorted-index intersection per output entry
    Dot,
    /// Heap-merge of the contributing rows
    Heap,
}

/// Per-call settings
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Descriptor {
    /// Clear the output before writing the result
    pub replace: bool,
    /// Use the complement of the mask
    pub mask_complement: bool,
    /// Use only the pattern of the mask, ignoring its values
    pub mask_structure: bool,
    /// Use the transpose of the first input
    pub transpose_a: bool,
    /// Use the transpose of the second input
    pub transpose_b: bool,
    /// Matrix-multiply algorithm
    pub axb_method: AxbMethod,
}

impl Descriptor {
    /// Descriptor with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the output before writing
    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    /// Complement the mask
    pub fn complement(mut self) -> Self {
        self.mask_complement = true;
        self
    }

    /// Use a structural mask
    pub fn structure(mut self) -> Self {
        self.mask_structure = true;
        self
    }

    /// Transpose the first input
    pub fn transpose_a(mut self) -> Self {
        self.transpose_a = true;
        self
    }

    /// Transpose the second input
    pub fn transpose_b(mut self) -> Self {
        self.transpose_b = true;
        self
    }

    /// Force a matrix-multiply algorithm
    pub fn method(mut self, method: AxbMethod) -> Self {
        self.axb_method = method;
        self
    }
}
