//! Chain collapsing: merge runs of single-in/single-out nodes.

use std::collections::{HashMap, HashSet};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::NodeIndexable;
use serde::{Deserialize, Serialize};

use crate::graph::splice_graph::{NodeId, SpliceGraph};
use crate::types::{Interval, Strand};

/// Arena id of a collapsed node.
pub type CollapsedId = NodeIndex;

/// A maximal linear chain of original nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollapsedNode {
    /// Original nodes in transcription order.
    pub members: Vec<Interval>,
    pub start: u32,
    pub end: u32,
    /// Summed member length (introns excluded).
    pub length: u32,
    /// Highest member score.
    pub score: f64,
}

impl CollapsedNode {
    fn from_members(members: Vec<Interval>, scores: &[f64]) -> Self {
        let start = members.iter().map(|n| n.start).min().unwrap_or(0);
        let end = members.iter().map(|n| n.end).max().unwrap_or(0);
        let length = members.iter().map(|n| n.len()).sum();
        let score = scores.iter().copied().fold(0.0, f64::max);
        Self {
            members,
            start,
            end,
            length,
            score,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollapsedGraph {
    strand: Strand,
    graph: StableDiGraph<CollapsedNode, ()>,
}

impl CollapsedGraph {
    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn node(&self, id: CollapsedId) -> Option<&CollapsedNode> {
        self.graph.node_weight(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = CollapsedId> + '_ {
        self.graph.node_indices()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Upper bound on ids, for dense per-node tables.
    pub fn node_bound(&self) -> usize {
        self.graph.node_bound()
    }

    pub fn edges(&self) -> Vec<(CollapsedId, CollapsedId)> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .collect()
    }
}

/// Original node id -> collapsed node id. Total over the collapsed graph's source nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainMap {
    map: HashMap<NodeId, CollapsedId>,
}

impl ChainMap {
    pub fn get(&self, id: NodeId) -> Option<CollapsedId> {
        self.map.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Merges linear chains of a splice graph.
///
/// The returned chain map must cover every node of `graph`.
pub trait ChainCollapser {
    fn collapse(
        &self,
        graph: &SpliceGraph,
        merge_through_introns: bool,
    ) -> (CollapsedGraph, ChainMap);
}

/// Default collapser.
///
/// `v` extends the chain of `u` when `u -> v` is the only edge out of `u`
/// and the only edge into `v`; without `merge_through_introns` the two nodes
/// must also abut genomically.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearChainCollapser;

impl LinearChainCollapser {
    fn continues(graph: &SpliceGraph, u: NodeId, v: NodeId, merge_through_introns: bool) -> bool {
        if graph.out_degree(u) != 1 || graph.in_degree(v) != 1 {
            return false;
        }
        if merge_through_introns {
            return true;
        }
        match (graph.attrs(u), graph.attrs(v)) {
            (Some(a), Some(b)) => a.node.end == b.node.start || b.node.end == a.node.start,
            _ => false,
        }
    }

    fn walk(
        graph: &SpliceGraph,
        head: NodeId,
        merge_through_introns: bool,
        visited: &mut HashSet<NodeId>,
    ) -> Vec<NodeId> {
        let mut chain = vec![head];
        visited.insert(head);
        let mut cur = head;
        loop {
            let mut succs = graph.successors(cur);
            let (Some(v), None) = (succs.next(), succs.next()) else { break };
            if visited.contains(&v) || !Self::continues(graph, cur, v, merge_through_introns) {
                break;
            }
            visited.insert(v);
            chain.push(v);
            cur = v;
        }
        chain
    }
}

impl ChainCollapser for LinearChainCollapser {
    fn collapse(
        &self,
        graph: &SpliceGraph,
        merge_through_introns: bool,
    ) -> (CollapsedGraph, ChainMap) {
        let is_head = |id: NodeId| {
            let mut preds = graph.predecessors(id);
            match (preds.next(), preds.next()) {
                (Some(p), None) => !Self::continues(graph, p, id, merge_through_introns),
                _ => true,
            }
        };

        let mut visited: HashSet<NodeId> = HashSet::with_capacity(graph.node_count());
        let mut chains: Vec<Vec<NodeId>> = Vec::new();
        for id in graph.node_ids() {
            if is_head(id) {
                chains.push(Self::walk(graph, id, merge_through_introns, &mut visited));
            }
        }
        // nodes on a closed loop have no head
        for id in graph.node_ids() {
            if !visited.contains(&id) {
                chains.push(Self::walk(graph, id, merge_through_introns, &mut visited));
            }
        }

        let mut out = StableDiGraph::new();
        let mut chain_map = ChainMap::default();
        for chain in chains {
            let (members, scores): (Vec<Interval>, Vec<f64>) = chain
                .iter()
                .filter_map(|&id| graph.attrs(id))
                .map(|a| (a.node, a.score))
                .unzip();
            let cid = out.add_node(CollapsedNode::from_members(members, &scores));
            for id in chain {
                chain_map.map.insert(id, cid);
            }
        }

        for (u, v) in graph.edges() {
            if let (Some(cu), Some(cv)) = (chain_map.get(u), chain_map.get(v)) {
                if cu != cv {
                    out.update_edge(cu, cv, ());
                }
            }
        }

        (
            CollapsedGraph {
                strand: graph.strand(),
                graph: out,
            },
            chain_map,
        )
    }
}
