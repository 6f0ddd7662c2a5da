use serde::{Deserialize, Serialize};
use std::fmt;

/// Genomic strand/orientation.
///
/// `Plus` and `Minus` are the two concrete strands; `Unknown` is both the
/// "no strand given" input state and a valid terminal bucket after strand
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strand {
    Plus,
    Minus,
    Unknown,
}

impl Strand {
    /// All buckets, in the order the pipeline processes them.
    pub const ALL: [Strand; 3] = [Strand::Plus, Strand::Minus, Strand::Unknown];

    /// Slot of a concrete strand in two-element accumulators.
    #[inline]
    pub fn slot(self) -> Option<usize> {
        match self {
            Strand::Plus => Some(0),
            Strand::Minus => Some(1),
            Strand::Unknown => None,
        }
    }

    #[inline]
    pub fn is_known(self) -> bool {
        self != Strand::Unknown
    }

    pub fn as_char(self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
            Strand::Unknown => '.',
        }
    }

    /// Lowercase name, used for output file suffixes.
    pub fn name(self) -> &'static str {
        match self {
            Strand::Plus => "plus",
            Strand::Minus => "minus",
            Strand::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A contiguous genomic interval.
/// Coordinates are 0-based, half-open: [start, end)
///
/// Split exon pieces ("nodes") are plain intervals; two nodes are the same
/// node iff their coordinates match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: u32,
    pub end: u32,
}

impl Interval {
    /// Create a new interval. Panics if start > end.
    pub fn new(start: u32, end: u32) -> Self {
        assert!(start <= end, "Interval requires start <= end");
        Self { start, end }
    }

    #[inline]
    pub fn len(self) -> u32 {
        self.end - self.start
    }

    /// Degenerate (zero-length) intervals are ignored by splitting.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One value per strand bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrandBuckets<T> {
    pub plus: T,
    pub minus: T,
    pub unknown: T,
}

impl<T> StrandBuckets<T> {
    pub fn get(&self, strand: Strand) -> &T {
        match strand {
            Strand::Plus => &self.plus,
            Strand::Minus => &self.minus,
            Strand::Unknown => &self.unknown,
        }
    }

    pub fn get_mut(&mut self, strand: Strand) -> &mut T {
        match strand {
            Strand::Plus => &mut self.plus,
            Strand::Minus => &mut self.minus,
            Strand::Unknown => &mut self.unknown,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Strand, &T)> {
        [
            (Strand::Plus, &self.plus),
            (Strand::Minus, &self.minus),
            (Strand::Unknown, &self.unknown),
        ]
        .into_iter()
    }
}
