//! Strand inference for transcripts that arrive without a strand.
//!
//! Evidence is gathered per node in a [`NodeSupportTable`]: stranded
//! transcripts add their score, reference transcripts flag the strand they
//! were annotated on. Unstranded transcripts are then resolved in two
//! explicit stages:
//!
//! - stage A votes every unstranded transcript against the table as it was
//!   after the stranded pass (the table is only borrowed while voting, so
//!   nothing resolved in this batch can influence the rest of the batch);
//! - stage B clusters the nodes of whatever is left, votes once per cluster
//!   against the stage-A-updated table, and lets each transcript pick the
//!   strand covering most of its bases.
//!
//! Transcripts without any usable evidence stay [`Strand::Unknown`].

use std::collections::HashMap;

use log::debug;

use crate::graph::boundaries::{find_boundaries, split_exons};
use crate::graph::cluster::cluster_intervals;
use crate::model::Transcript;
use crate::types::{Interval, Strand, StrandBuckets};

/// Strand evidence accumulated on one node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeSupport {
    /// Summed transcript score per concrete strand (plus, minus).
    pub scores: [f64; 2],
    /// Whether a reference transcript on that strand covers the node.
    pub ref_strands: [bool; 2],
}

/// Owned node → evidence map, threaded through the resolution stages.
///
/// `version` increases on every fold so callers can tell whether a table
/// changed between two points of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct NodeSupportTable {
    nodes: HashMap<Interval, NodeSupport>,
    version: u64,
}

impl NodeSupportTable {
    pub fn get(&self, node: &Interval) -> Option<&NodeSupport> {
        self.nodes.get(node)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn mark_reference<I: IntoIterator<Item = Interval>>(&mut self, nodes: I, strand: Strand) {
        let Some(slot) = strand.slot() else { return };
        for n in nodes {
            self.nodes.entry(n).or_default().ref_strands[slot] = true;
        }
        self.version += 1;
    }

    /// Fold a transcript's score into every node it visits.
    ///
    /// Unknown-strand transcripts have no score slot; they still register
    /// their nodes.
    fn add_score<I>(&mut self, nodes: I, strand: Strand, score: f64)
    where
        I: IntoIterator<Item = Interval>,
    {
        let slot = strand.slot();
        for n in nodes {
            let nd = self.nodes.entry(n).or_default();
            if let Some(slot) = slot {
                nd.scores[slot] += score;
            }
        }
        self.version += 1;
    }

    /// Vote a strand for a set of nodes.
    ///
    /// Length-weighted scores decide first when their sum exceeds `epsilon`;
    /// otherwise reference coverage in bp decides. Ties go to `Plus`.
    pub fn vote<'a, I>(&self, nodes: I, epsilon: f64) -> Strand
    where
        I: IntoIterator<Item = &'a Interval>,
    {
        let mut total_scores = [0.0f64; 2];
        let mut ref_bp = [0u64; 2];

        for n in nodes {
            let Some(nd) = self.nodes.get(n) else { continue };
            let length = n.len() as f64;
            for slot in 0..2 {
                total_scores[slot] += nd.scores[slot] * length;
                if nd.ref_strands[slot] {
                    ref_bp[slot] += n.len() as u64;
                }
            }
        }

        if total_scores[0] + total_scores[1] > epsilon {
            return if total_scores[0] >= total_scores[1] {
                Strand::Plus
            } else {
                Strand::Minus
            };
        }
        if ref_bp[0] + ref_bp[1] > 0 {
            return if ref_bp[0] >= ref_bp[1] {
                Strand::Plus
            } else {
                Strand::Minus
            };
        }
        Strand::Unknown
    }
}

/// Reference transcripts per concrete strand; they carry strand evidence only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceLists {
    pub plus: Vec<Transcript>,
    pub minus: Vec<Transcript>,
}

impl ReferenceLists {
    pub fn len(&self) -> usize {
        self.plus.len() + self.minus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counters describing how unstranded transcripts were handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub unstranded: usize,
    pub resolved_by_vote: usize,
    pub resolved_by_cluster: usize,
    pub unresolved: usize,
}

/// Output of [`StrandResolver::resolve`].
#[derive(Debug, Clone, Default)]
pub struct StrandPartition {
    pub transcripts: StrandBuckets<Vec<Transcript>>,
    pub references: ReferenceLists,
    pub stats: ResolveStats,
    /// Evidence table after all folds, exposed for inspection.
    pub support: NodeSupportTable,
}

type Pending = (Transcript, Vec<Interval>);

#[derive(Debug, Clone, Copy)]
pub struct StrandResolver {
    epsilon: f64,
}

impl StrandResolver {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Partition a locus' transcripts into strand buckets.
    ///
    /// Never fails: every non-reference transcript lands in exactly one of
    /// the three buckets.
    pub fn resolve(&self, transcripts: Vec<Transcript>) -> StrandPartition {
        let boundaries = find_boundaries(&transcripts);
        let mut table = NodeSupportTable::default();
        let mut buckets: StrandBuckets<Vec<Transcript>> = StrandBuckets::default();
        let mut references = ReferenceLists::default();
        let mut unstranded: Vec<Transcript> = Vec::new();

        for t in transcripts {
            if t.is_ref {
                match t.strand {
                    Strand::Plus | Strand::Minus => {
                        table.mark_reference(split_exons(&t, &boundaries), t.strand);
                        if t.strand == Strand::Plus {
                            references.plus.push(t);
                        } else {
                            references.minus.push(t);
                        }
                    }
                    Strand::Unknown => {
                        debug!("reference transcript {} has no strand, ignored", t.id);
                    }
                }
            } else if t.strand.is_known() {
                table.add_score(split_exons(&t, &boundaries), t.strand, t.score);
                buckets.get_mut(t.strand).push(t);
            } else {
                unstranded.push(t);
            }
        }

        let mut stats = ResolveStats {
            unstranded: unstranded.len(),
            ..Default::default()
        };
        debug!("{} unstranded transcripts", stats.unstranded);

        // stage A: batch vote against the post-stranded table
        let (resolved, pending) = self.vote_batch(&table, unstranded, &boundaries);
        stats.resolved_by_vote = resolved.len();
        for (t, nodes) in resolved {
            table.add_score(nodes, t.strand, t.score);
            buckets.get_mut(t.strand).push(t);
        }

        // stage B: cluster fallback for what is left
        if !pending.is_empty() {
            debug!("{} unresolved transcripts after voting", pending.len());
            let node_strands = self.resolve_by_clusters(&table, &pending);
            for (mut t, nodes) in pending {
                t.strand = strand_by_coverage(&nodes, &node_strands);
                if t.strand.is_known() {
                    stats.resolved_by_cluster += 1;
                } else {
                    stats.unresolved += 1;
                }
                table.add_score(nodes, t.strand, t.score);
                buckets.get_mut(t.strand).push(t);
            }
            debug!("could not resolve {} transcripts", stats.unresolved);
        }

        StrandPartition {
            transcripts: buckets,
            references,
            stats,
            support: table,
        }
    }

    /// Stage A. Returns `(resolved, still_unresolved)`; resolved transcripts
    /// already carry their voted strand.
    fn vote_batch(
        &self,
        table: &NodeSupportTable,
        batch: Vec<Transcript>,
        boundaries: &[u32],
    ) -> (Vec<Pending>, Vec<Pending>) {
        let mut resolved = Vec::new();
        let mut pending = Vec::new();
        for mut t in batch {
            let nodes: Vec<Interval> = split_exons(&t, boundaries).collect();
            let strand = table.vote(&nodes, self.epsilon);
            if strand.is_known() {
                t.strand = strand;
                resolved.push((t, nodes));
            } else {
                pending.push((t, nodes));
            }
        }
        (resolved, pending)
    }

    /// Stage B. Assigns one strand to every node of every pending transcript
    /// by voting over clusters of touching nodes.
    fn resolve_by_clusters(
        &self,
        table: &NodeSupportTable,
        pending: &[Pending],
    ) -> HashMap<Interval, Strand> {
        let mut nodes: Vec<Interval> = pending
            .iter()
            .flat_map(|(_, n)| n.iter().copied())
            .collect();
        nodes.sort_unstable();
        nodes.dedup();

        let intervals: Vec<(u32, u32, usize)> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.start, n.end, i))
            .collect();

        let mut node_strands = HashMap::with_capacity(nodes.len());
        for cluster in cluster_intervals(&intervals) {
            let members: Vec<Interval> = cluster.iter().map(|&i| nodes[i]).collect();
            let strand = table.vote(&members, self.epsilon);
            for n in members {
                node_strands.insert(n, strand);
            }
        }
        node_strands
    }
}

/// Strand covering the most bases of `nodes`, or `Unknown` when none of
/// them resolved. Ties go to `Plus`.
fn strand_by_coverage(nodes: &[Interval], node_strands: &HashMap<Interval, Strand>) -> Strand {
    let mut strand_bp = [0u64; 2];
    for n in nodes {
        if let Some(slot) = node_strands.get(n).and_then(|s| s.slot()) {
            strand_bp[slot] += n.len() as u64;
        }
    }
    match strand_bp {
        [0, 0] => Strand::Unknown,
        [p, m] if p >= m => Strand::Plus,
        _ => Strand::Minus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_STRAND_EPSILON;
    use std::collections::HashSet;

    fn tx(id: &str, strand: Strand, score: f64, exons: &[(u32, u32)]) -> Transcript {
        Transcript::with_exons(id, "chr1", strand, score, exons)
    }

    fn resolver() -> StrandResolver {
        StrandResolver::new(DEFAULT_STRAND_EPSILON)
    }

    fn ids(v: &[Transcript]) -> Vec<&str> {
        v.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn score_vote_picks_heavier_strand() {
        let ts = vec![
            tx("p", Strand::Plus, 5.0, &[(10, 20)]),
            tx("m", Strand::Minus, 1.0, &[(10, 20)]),
            tx("u", Strand::Unknown, 1.0, &[(10, 20)]),
        ];
        let part = resolver().resolve(ts);
        assert_eq!(ids(&part.transcripts.plus), vec!["p", "u"]);
        assert_eq!(ids(&part.transcripts.minus), vec!["m"]);
        assert!(part.transcripts.unknown.is_empty());
        assert_eq!(part.stats.resolved_by_vote, 1);
        assert_eq!(part.transcripts.plus[1].strand, Strand::Plus);
    }

    #[test]
    fn equal_scores_tie_to_plus() {
        let ts = vec![
            tx("m", Strand::Minus, 2.0, &[(10, 20)]),
            tx("p", Strand::Plus, 2.0, &[(10, 20)]),
            tx("u", Strand::Unknown, 1.0, &[(10, 20)]),
        ];
        let part = resolver().resolve(ts);
        assert_eq!(ids(&part.transcripts.plus), vec!["p", "u"]);
    }

    #[test]
    fn equal_reference_coverage_ties_to_plus() {
        let ts = vec![
            tx("rp", Strand::Plus, 0.0, &[(0, 10)]).reference(),
            tx("rm", Strand::Minus, 0.0, &[(20, 30)]).reference(),
            tx("u", Strand::Unknown, 1.0, &[(0, 10), (20, 30)]),
        ];
        let part = resolver().resolve(ts);
        assert_eq!(ids(&part.transcripts.plus), vec!["u"]);
        assert_eq!(part.stats.resolved_by_vote, 1);
    }

    #[test]
    fn equal_cluster_coverage_ties_to_plus() {
        // u3 has no evidence in the first vote. Its two nodes sit in
        // separate clusters, one voted plus and one minus, 10bp each.
        let ts = vec![
            tx("p", Strand::Plus, 1.0, &[(0, 10)]),
            tx("u1", Strand::Unknown, 1.0, &[(0, 20)]),
            tx("m", Strand::Minus, 1.0, &[(100, 110)]),
            tx("u2", Strand::Unknown, 1.0, &[(100, 120)]),
            tx("u3", Strand::Unknown, 1.0, &[(10, 20), (110, 120)]),
        ];
        let part = resolver().resolve(ts);
        assert_eq!(ids(&part.transcripts.plus), vec!["p", "u1", "u3"]);
        assert_eq!(ids(&part.transcripts.minus), vec!["m", "u2"]);
        assert_eq!(part.stats.resolved_by_vote, 2);
        assert_eq!(part.stats.resolved_by_cluster, 1);
    }

    #[test]
    fn reference_strand_decides_without_scores() {
        let ts = vec![
            tx("ref", Strand::Minus, 100.0, &[(10, 20), (30, 40)]).reference(),
            tx("u", Strand::Unknown, 3.0, &[(10, 20), (30, 40)]),
        ];
        let part = resolver().resolve(ts);
        assert_eq!(ids(&part.transcripts.minus), vec!["u"]);
        assert_eq!(ids(&part.references.minus), vec!["ref"]);
        // references never contribute score
        let nd = part.support.get(&Interval::new(10, 20)).copied().unwrap_or_default();
        assert_eq!(nd.ref_strands, [false, true]);
        assert_eq!(nd.scores[0], 0.0);
        assert_eq!(nd.scores[1], 3.0);
    }

    #[test]
    fn isolated_transcript_stays_unknown() {
        let ts = vec![
            tx("p", Strand::Plus, 5.0, &[(10, 20)]),
            tx("u", Strand::Unknown, 1.0, &[(1000, 1100)]),
        ];
        let part = resolver().resolve(ts);
        assert_eq!(ids(&part.transcripts.unknown), vec!["u"]);
        assert_eq!(part.transcripts.unknown[0].strand, Strand::Unknown);
        assert_eq!(part.stats.unresolved, 1);
        assert_eq!(part.stats.resolved_by_cluster, 0);
    }

    #[test]
    fn stage_a_does_not_see_its_own_resolutions() {
        // u1 resolves to plus through node (0,10); u2 only covers (10,20), which
        // has no evidence until u1 is folded in, so it must go through clustering.
        let ts = vec![
            tx("p", Strand::Plus, 1.0, &[(0, 10)]),
            tx("u1", Strand::Unknown, 2.0, &[(0, 20)]),
            tx("u2", Strand::Unknown, 2.0, &[(10, 20)]),
        ];
        let part = resolver().resolve(ts);
        assert_eq!(ids(&part.transcripts.plus), vec!["p", "u1", "u2"]);
        assert_eq!(part.stats.resolved_by_vote, 1);
        assert_eq!(part.stats.resolved_by_cluster, 1);
    }

    #[test]
    fn cluster_fallback_spreads_evidence_to_touching_nodes() {
        // u1 resolves by vote and leaves score on (10,20). u2 and u3 have no
        // evidence of their own, but their nodes form one touching cluster
        // with (10,20), so the cluster vote carries both to plus.
        let ts = vec![
            tx("p", Strand::Plus, 1.0, &[(0, 10)]),
            tx("u1", Strand::Unknown, 2.0, &[(0, 20)]),
            tx("u2", Strand::Unknown, 1.0, &[(10, 30)]),
            tx("u3", Strand::Unknown, 1.0, &[(30, 40)]),
        ];
        let part = resolver().resolve(ts);
        assert_eq!(ids(&part.transcripts.plus), vec!["p", "u1", "u2", "u3"]);
        assert_eq!(part.stats.resolved_by_vote, 1);
        assert_eq!(part.stats.resolved_by_cluster, 2);
    }

    #[test]
    fn every_transcript_lands_in_exactly_one_bucket() {
        let ts = vec![
            tx("a", Strand::Plus, 1.0, &[(0, 100), (200, 300)]),
            tx("b", Strand::Minus, 4.0, &[(250, 400)]),
            tx("c", Strand::Unknown, 1.0, &[(50, 120)]),
            tx("d", Strand::Unknown, 0.0, &[(280, 320)]),
            tx("e", Strand::Unknown, 1.0, &[(5000, 5100)]),
            tx("f", Strand::Unknown, 1.0, &[(120, 180)]),
            tx("r", Strand::Plus, 0.0, &[(0, 50)]).reference(),
        ];
        let input: HashSet<String> = ts
            .iter()
            .filter(|t| !t.is_ref)
            .map(|t| t.id.clone())
            .collect();
        let part = resolver().resolve(ts);

        let mut seen: Vec<String> = Vec::new();
        for (strand, bucket) in part.transcripts.iter() {
            for t in bucket {
                assert_eq!(t.strand, strand);
                seen.push(t.id.clone());
            }
        }
        assert_eq!(seen.len(), input.len());
        assert_eq!(seen.into_iter().collect::<HashSet<_>>(), input);
        assert_eq!(part.references.len(), 1);
        let s = part.stats;
        assert_eq!(s.unstranded, s.resolved_by_vote + s.resolved_by_cluster + s.unresolved);
    }

    #[test]
    fn epsilon_gates_score_vote() {
        let ts = vec![
            tx("p", Strand::Plus, 0.001, &[(0, 10)]),
            tx("u", Strand::Unknown, 1.0, &[(0, 10)]),
        ];
        // 0.001 * 10bp = 0.01 < 1.0: score evidence is inconclusive
        let part = StrandResolver::new(1.0).resolve(ts);
        assert_eq!(ids(&part.transcripts.unknown), vec!["u"]);
    }

    #[test]
    fn table_version_advances_on_fold() {
        let ts = vec![tx("p", Strand::Plus, 1.0, &[(0, 10)])];
        let part = resolver().resolve(ts);
        assert!(part.support.version() >= 1);
        assert_eq!(part.support.len(), 1);
    }
}
