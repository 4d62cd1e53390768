//! Deferred mutation state: pending insertions and deleted entries

/// Insertions not yet merged into the compressed arrays
///
/// Appending is O(1) and never touches the compressed arrays. Tuples are
/// kept in insertion order so duplicates resolve deterministically.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct PendingTuples {
    pub majors: Vec<usize>,
    pub minors: Vec<usize>,
    pub x: Vec<u8>,
    /// True while every tuple was appended after its predecessor in
    /// (major, minor) order, so no sort is needed
    pub sorted: bool,
}

impl PendingTuples {
    pub fn new() -> Self {
        Self {
            sorted: true,
            ..Self::default()
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.majors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.majors.is_empty()
    }

    pub fn push(&mut self, major: usize, minor: usize, value: &[u8]) {
        if let (Some(&j), Some(&i)) = (self.majors.last(), self.minors.last()) {
            if (j, i) >= (major, minor) {
                self.sorted = false;
            }
        }
        self.majors.push(major);
        self.minors.push(minor);
        self.x.extend_from_slice(value);
    }

    /// Insertion order sorted by (major, minor), stable for duplicates
    pub fn sorted_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        if !self.sorted {
            order.sort_by_key(|&t| (self.majors[t], self.minors[t]));
        }
        order
    }
}

/// The two states of a matrix
///
/// `Assembled` storage is sorted, duplicate-free and has no deleted
/// entries; every algebra kernel reads only assembled matrices. `Building`
/// storage may carry pending insertions and deleted entries; assembling is
/// the only way back.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Deferred {
    Assembled,
    Building {
        pending: PendingTuples,
        nzombies: usize,
    },
}

impl Deferred {
    #[inline]
    pub fn is_assembled(&self) -> bool {
        matches!(self, Self::Assembled)
    }

    pub fn npending(&self) -> usize {
        match self {
            Self::Assembled => 0,
            Self::Building { pending, .. } => pending.len(),
        }
    }

    pub fn nzombies(&self) -> usize {
        match self {
            Self::Assembled => 0,
            Self::Building { nzombies, .. } => *nzombies,
        }
    }

    /// Switch to `Building` if needed and return its parts
    pub fn building(&mut self) -> (&mut PendingTuples, &mut usize) {
        if self.is_assembled() {
            *self = Self::Building {
                pending: PendingTuples::new(),
                nzombies: 0,
            };
        }
        match self {
            Self::Building { pending, nzombies } => (pending, nzombies),
            Self::Assembled => unreachable!("state was just set to Building"),
        }
    }

    /// Drop back to `Assembled` if nothing is deferred any more
    pub fn settle(&mut self) {
        if let Self::Building { pending, nzombies } = self {
            if pending.is_empty() && *nzombies == 0 {
                *self = Self::Assembled;
            }
        }
    }
}
