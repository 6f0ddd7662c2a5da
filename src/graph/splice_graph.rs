use std::collections::{HashMap, HashSet};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::graph::boundaries::{find_boundaries, split_exons};
use crate::model::Transcript;
use crate::types::{Interval, Strand};

/// Arena id of a node. Ids stay valid when other nodes are removed.
pub type NodeId = NodeIndex;

/// Vertex payload of a [`SpliceGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeAttrs {
    pub node: Interval,
    pub length: u32,
    /// Sum of the scores of every transcript visit.
    pub score: f64,
}

/// Strand-specific splice graph of one locus.
///
/// Edges point from the earlier- to the later-transcribed node, so on the
/// minus strand they run towards lower coordinates.
#[derive(Debug, Clone)]
pub struct SpliceGraph {
    strand: Strand,
    graph: StableDiGraph<NodeAttrs, ()>,
    index: HashMap<Interval, NodeId>,
    boundaries: Vec<u32>,
}

impl SpliceGraph {
    /// Build the graph of one strand bucket.
    ///
    /// Boundaries are recomputed from exactly these transcripts, so a
    /// position may split differently on each strand.
    pub fn build(strand: Strand, transcripts: &[Transcript]) -> Self {
        let boundaries = find_boundaries(transcripts);
        let mut g = Self {
            strand,
            graph: StableDiGraph::new(),
            index: HashMap::new(),
            boundaries,
        };

        for t in transcripts {
            let mut nodes: Vec<Interval> = split_exons(t, &g.boundaries).collect();
            if strand == Strand::Minus {
                nodes.reverse();
            }
            g.add_path(&nodes, t.score);
        }

        g
    }

    fn add_path(&mut self, nodes: &[Interval], score: f64) {
        let mut prev: Option<NodeId> = None;
        for &n in nodes {
            let id = self.add_node(n);
            self.graph[id].score += score;
            if let Some(u) = prev {
                self.graph.update_edge(u, id, ());
            }
            prev = Some(id);
        }
    }

    fn add_node(&mut self, n: Interval) -> NodeId {
        if let Some(&id) = self.index.get(&n) {
            return id;
        }
        let id = self.graph.add_node(NodeAttrs {
            node: n,
            length: n.len(),
            score: 0.0,
        });
        self.index.insert(n, id);
        id
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    /// Boundary list the graph was split with.
    pub fn boundaries(&self) -> &[u32] {
        &self.boundaries
    }

    pub fn node_id(&self, n: &Interval) -> Option<NodeId> {
        self.index.get(n).copied()
    }

    pub fn attrs(&self, id: NodeId) -> Option<&NodeAttrs> {
        self.graph.node_weight(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors_directed(id, Direction::Outgoing)
    }

    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors_directed(id, Direction::Incoming)
    }

    pub fn in_degree(&self, id: NodeId) -> usize {
        self.predecessors(id).count()
    }

    pub fn out_degree(&self, id: NodeId) -> usize {
        self.successors(id).count()
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.graph.find_edge(from, to).is_some()
    }

    /// All edges as (from, to) pairs.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .collect()
    }

    pub fn total_score(&self) -> f64 {
        self.graph.node_indices().map(|i| self.graph[i].score).sum()
    }

    /// Copy of this graph without `removed` (and their edges).
    ///
    /// Surviving nodes keep their ids and attributes; the boundary list is
    /// carried over unchanged.
    pub fn without_nodes(&self, removed: &HashSet<NodeId>) -> SpliceGraph {
        let mut out = self.clone();
        for &id in removed {
            if let Some(attrs) = out.graph.remove_node(id) {
                out.index.remove(&attrs.node);
            }
        }
        out
    }

    /// (node, score) rows sorted by node start, for score-track output.
    pub fn score_track(&self) -> Vec<(Interval, f64)> {
        let mut rows: Vec<(Interval, f64)> = self
            .graph
            .node_indices()
            .map(|i| (self.graph[i].node, self.graph[i].score))
            .collect();
        rows.sort_by_key(|(n, _)| *n);
        rows
    }
}
