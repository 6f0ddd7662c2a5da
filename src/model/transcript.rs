use crate::types::{Interval, Strand};
use serde::{Deserialize, Serialize};

/// An assembled transcript fragment ("transfrag") as read from the annotation.
///
/// Exons are kept in genomic coordinate order regardless of strand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub chrom: String,
    pub strand: Strand,
    pub score: f64,
    /// Curated reference transcript: contributes strand evidence, never score.
    pub is_ref: bool,
    exons: Vec<Interval>,
}

impl Transcript {
    pub fn new(
        id: impl Into<String>,
        chrom: impl Into<String>,
        strand: Strand,
        score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            chrom: chrom.into(),
            strand,
            score,
            is_ref: false,
            exons: Vec::new(),
        }
    }

    /// Convenience constructor used heavily by tests and library callers.
    pub fn with_exons(
        id: impl Into<String>,
        chrom: impl Into<String>,
        strand: Strand,
        score: f64,
        exons: &[(u32, u32)],
    ) -> Self {
        let mut t = Self::new(id, chrom, strand, score);
        for &(s, e) in exons {
            t.add_exon(Interval::new(s, e));
        }
        t.finalize();
        t
    }

    pub fn reference(mut self) -> Self {
        self.is_ref = true;
        self
    }

    pub fn add_exon(&mut self, exon: Interval) {
        self.exons.push(exon);
    }

    pub fn exons(&self) -> &[Interval] {
        &self.exons
    }

    /// Sort exons by genomic start.
    ///
    /// Exons are not merged: touching exons still contribute both endpoints
    /// as boundaries.
    pub fn finalize(&mut self) {
        self.exons.sort_by_key(|e| (e.start, e.end));
    }
}
