//! Node trimming: choose weakly supported nodes to drop before collapsing.

use std::collections::HashSet;

use log::debug;

use crate::graph::splice_graph::{NodeId, SpliceGraph};
use crate::model::TrimParams;

/// Picks the nodes of a graph that should be removed.
///
/// Implementations must only return ids present in `graph`; the pipeline
/// removes exactly the returned set together with the incident edges.
pub trait NodeTrimmer {
    fn trim(&self, graph: &SpliceGraph, params: &TrimParams) -> HashSet<NodeId>;
}

/// Default trimming policy.
///
/// Evaluated once on the untrimmed graph:
/// - a start (end) node with a single successor (predecessor) is a UTR
///   candidate and is dropped when its score is below
///   `utr_fraction * neighbour score`;
/// - a node with one predecessor `p` and one successor `s` where the splice
///   `p -> s` also exists retains an intron, and is dropped when its score is
///   below `intron_fraction * max(p, s)`.
///
/// Nodes shorter than `min_trim_length` are always kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupportTrimmer;

impl NodeTrimmer for SupportTrimmer {
    fn trim(&self, graph: &SpliceGraph, params: &TrimParams) -> HashSet<NodeId> {
        let mut out = HashSet::new();
        if params.utr_fraction <= 0.0 && params.intron_fraction <= 0.0 {
            return out;
        }

        let score_of = |id: NodeId| graph.attrs(id).map(|a| a.score).unwrap_or(0.0);

        for id in graph.node_ids() {
            let Some(attrs) = graph.attrs(id) else { continue };
            if attrs.length < params.min_trim_length {
                continue;
            }

            let preds: Vec<NodeId> = graph.predecessors(id).collect();
            let succs: Vec<NodeId> = graph.successors(id).collect();

            let utr_neighbour = match (preds.as_slice(), succs.as_slice()) {
                ([], [s]) => Some(*s),
                ([p], []) => Some(*p),
                _ => None,
            };
            if let Some(nb) = utr_neighbour {
                if attrs.score < params.utr_fraction * score_of(nb) {
                    debug!("trimming utr node {} (score {:.3})", attrs.node, attrs.score);
                    out.insert(id);
                    continue;
                }
            }

            if let ([p], [s]) = (preds.as_slice(), succs.as_slice()) {
                if graph.has_edge(*p, *s) {
                    let flank = score_of(*p).max(score_of(*s));
                    if attrs.score < params.intron_fraction * flank {
                        debug!("trimming intronic node {} (score {:.3})", attrs.node, attrs.score);
                        out.insert(id);
                    }
                }
            }
        }

        out
    }
}
