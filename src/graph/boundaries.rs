//! Exon boundary indexing and boundary-respecting exon splitting.

use crate::model::Transcript;
use crate::types::Interval;

/// Sorted, deduplicated exon start/end coordinates of a transcript set.
pub fn find_boundaries<'a, I>(transcripts: I) -> Vec<u32>
where
    I: IntoIterator<Item = &'a Transcript>,
{
    let mut out: Vec<u32> = Vec::new();
    for t in transcripts {
        for exon in t.exons() {
            out.push(exon.start);
            out.push(exon.end);
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}

/// Partition `exon` at every boundary strictly inside it.
///
/// `boundaries` must be sorted and deduplicated. Degenerate exons yield
/// nothing; an exon without interior boundaries is yielded unchanged.
pub fn split_exon(exon: Interval, boundaries: &[u32]) -> impl Iterator<Item = Interval> + '_ {
    // lo: first boundary > start, hi: first boundary >= end
    let (lo, hi) = if exon.is_empty() {
        (0, 0)
    } else {
        (
            boundaries.partition_point(|&b| b <= exon.start),
            boundaries.partition_point(|&b| b < exon.end),
        )
    };

    let cuts: &[u32] = if lo < hi { &boundaries[lo..hi] } else { &[] };
    let points = std::iter::once(exon.start)
        .chain(cuts.iter().copied())
        .chain(std::iter::once(exon.end));

    let mut prev: Option<u32> = None;
    points
        .filter_map(move |p| {
            let piece = prev.map(|s| Interval { start: s, end: p });
            prev = Some(p);
            piece
        })
        .filter(move |_| !exon.is_empty())
}

/// Nodes of a transcript: all of its exons split against `boundaries`, in
/// genomic order.
pub fn split_exons<'a>(
    t: &'a Transcript,
    boundaries: &'a [u32],
) -> impl Iterator<Item = Interval> + 'a {
    t.exons().iter().flat_map(move |&e| split_exon(e, boundaries))
}
