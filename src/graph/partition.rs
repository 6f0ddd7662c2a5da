//! Weakly connected components of a collapsed graph, and the projection of
//! transcript paths onto them.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::unionfind::UnionFind;

use crate::graph::boundaries::split_exons;
use crate::graph::collapse::{ChainMap, CollapsedGraph, CollapsedId, CollapsedNode};
use crate::graph::splice_graph::{NodeId, SpliceGraph};
use crate::model::Transcript;
use crate::types::Strand;

/// Node sequence through one component graph, in transcription order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<NodeIndex>);

impl Path {
    pub fn new(nodes: Vec<NodeIndex>) -> Self {
        Self(nodes)
    }

    pub fn nodes(&self) -> &[NodeIndex] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One connected piece of a strand's graph with the weighted paths that
/// cross it.
#[derive(Debug, Clone)]
pub struct TranscriptGraph {
    pub chrom: String,
    pub strand: Strand,
    /// Component index within its strand, stable for a run.
    pub component: usize,
    pub graph: StableDiGraph<CollapsedNode, ()>,
    /// Distinct paths and their summed transcript scores, sorted by path.
    pub partial_paths: Vec<(Path, f64)>,
}

impl TranscriptGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn path_score(&self) -> f64 {
        self.partial_paths.iter().map(|(_, s)| s).sum()
    }
}

/// Builds one [`TranscriptGraph`], collecting path scores along the way.
#[derive(Debug)]
struct PathAccumulator {
    component: usize,
    graph: StableDiGraph<CollapsedNode, ()>,
    paths: HashMap<Path, f64>,
}

impl PathAccumulator {
    fn new(component: usize) -> Self {
        Self {
            component,
            graph: StableDiGraph::new(),
            paths: HashMap::new(),
        }
    }

    fn add(&mut self, path: Path, score: f64) {
        *self.paths.entry(path).or_insert(0.0) += score;
    }

    fn finish(self, chrom: &str, strand: Strand) -> TranscriptGraph {
        let mut partial_paths: Vec<(Path, f64)> = self.paths.into_iter().collect();
        partial_paths.sort_by(|a, b| a.0.cmp(&b.0));
        TranscriptGraph {
            chrom: chrom.to_string(),
            strand,
            component: self.component,
            graph: self.graph,
            partial_paths,
        }
    }
}

/// Result of [`partition_components`].
#[derive(Debug, Clone, Default)]
pub struct ComponentPartition {
    pub graphs: Vec<TranscriptGraph>,
    /// Transcripts whose path fell into more than one component.
    pub split_transcripts: usize,
}

/// Split `collapsed` into weakly connected components and project every
/// transcript onto them.
///
/// `graph` is the strand graph before trimming; its boundaries are used to
/// re-split the transcripts so that nodes in `trimmed` can be recognised and
/// dropped. Every surviving node must be covered by `chain_map`.
pub fn partition_components(
    chrom: &str,
    graph: &SpliceGraph,
    trimmed: &HashSet<NodeId>,
    collapsed: &CollapsedGraph,
    chain_map: &ChainMap,
    transcripts: &[Transcript],
) -> ComponentPartition {
    let strand = collapsed.strand();

    let mut uf: UnionFind<usize> = UnionFind::new(collapsed.node_bound());
    for (u, v) in collapsed.edges() {
        uf.union(u.index(), v.index());
    }

    // components numbered by their smallest node index
    let mut component_of_root: HashMap<usize, usize> = HashMap::new();
    let mut accumulators: Vec<PathAccumulator> = Vec::new();
    let mut local: HashMap<CollapsedId, (usize, NodeIndex)> =
        HashMap::with_capacity(collapsed.node_count());
    for id in collapsed.node_ids() {
        let root = uf.find(id.index());
        let comp = *component_of_root.entry(root).or_insert_with(|| {
            accumulators.push(PathAccumulator::new(accumulators.len()));
            accumulators.len() - 1
        });
        if let Some(node) = collapsed.node(id) {
            let lid = accumulators[comp].graph.add_node(node.clone());
            local.insert(id, (comp, lid));
        }
    }
    for (u, v) in collapsed.edges() {
        if let (Some(&(cu, lu)), Some(&(cv, lv))) = (local.get(&u), local.get(&v)) {
            if cu == cv {
                accumulators[cu].graph.add_edge(lu, lv, ());
            }
        }
    }

    let mut split_transcripts = 0;
    for t in transcripts {
        let mut per_component: BTreeMap<usize, Vec<(u32, NodeIndex)>> = BTreeMap::new();
        for n in split_exons(t, graph.boundaries()) {
            let Some(id) = graph.node_id(&n) else { continue };
            if trimmed.contains(&id) {
                continue;
            }
            let Some(&(comp, lid)) = chain_map.get(id).and_then(|cid| local.get(&cid)) else {
                continue;
            };
            let start = accumulators[comp].graph[lid].start;
            per_component.entry(comp).or_default().push((start, lid));
        }

        if per_component.len() > 1 {
            split_transcripts += 1;
            debug!(
                "transcript {} spans {} components on {} strand",
                t.id,
                per_component.len(),
                strand
            );
        }

        for (comp, mut nodes) in per_component {
            nodes.sort_unstable();
            nodes.dedup();
            if strand == Strand::Minus {
                nodes.reverse();
            }
            let path = Path::new(nodes.into_iter().map(|(_, lid)| lid).collect());
            accumulators[comp].add(path, t.score);
        }
    }

    ComponentPartition {
        graphs: accumulators
            .into_iter()
            .map(|acc| acc.finish(chrom, strand))
            .collect(),
        split_transcripts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::collapse::{ChainCollapser, LinearChainCollapser};
    use crate::types::Interval;

    fn tx(id: &str, strand: Strand, score: f64, exons: &[(u32, u32)]) -> Transcript {
        Transcript::with_exons(id, "chr1", strand, score, exons)
    }

    fn run(
        strand: Strand,
        ts: &[Transcript],
        trimmed: &HashSet<NodeId>,
        merge: bool,
    ) -> ComponentPartition {
        let g = SpliceGraph::build(strand, ts);
        let kept = g.without_nodes(trimmed);
        let (collapsed, map) = LinearChainCollapser.collapse(&kept, merge);
        partition_components("chr1", &g, trimmed, &collapsed, &map, ts)
    }

    fn starts(tg: &TranscriptGraph, path: &Path) -> Vec<u32> {
        path.nodes().iter().map(|&n| tg.graph[n].start).collect()
    }

    #[test]
    fn identical_paths_accumulate_scores() {
        let ts = vec![
            tx("a", Strand::Plus, 1.0, &[(0, 10), (20, 30)]),
            tx("b", Strand::Plus, 2.5, &[(0, 10), (20, 30)]),
        ];
        let part = run(Strand::Plus, &ts, &HashSet::new(), true);
        assert_eq!(part.graphs.len(), 1);
        let tg = &part.graphs[0];
        assert_eq!(tg.partial_paths.len(), 1);
        assert_eq!(tg.partial_paths[0].1, 3.5);
        assert_eq!(part.split_transcripts, 0);
    }

    #[test]
    fn transcript_across_trimmed_gap_scores_both_components() {
        let ts = vec![tx("a", Strand::Plus, 2.0, &[(0, 10), (20, 30), (40, 50)])];
        let g = SpliceGraph::build(Strand::Plus, &ts);
        let mid = g.node_id(&Interval::new(20, 30)).expect("mid");
        let part = run(Strand::Plus, &ts, &HashSet::from([mid]), true);

        assert_eq!(part.graphs.len(), 2);
        assert_eq!(part.split_transcripts, 1);
        for (i, tg) in part.graphs.iter().enumerate() {
            assert_eq!(tg.component, i);
            assert_eq!(tg.partial_paths.len(), 1);
            assert_eq!(tg.partial_paths[0].1, 2.0);
        }
        assert_eq!(part.graphs[0].graph[NodeIndex::new(0)].start, 0);
        assert_eq!(part.graphs[1].graph[NodeIndex::new(0)].start, 40);
    }

    #[test]
    fn minus_paths_run_from_high_to_low_coordinates() {
        let ts = vec![
            tx("inc", Strand::Minus, 1.0, &[(0, 10), (20, 30), (40, 50)]),
            tx("skip", Strand::Minus, 1.0, &[(0, 10), (40, 50)]),
        ];
        let part = run(Strand::Minus, &ts, &HashSet::new(), true);
        assert_eq!(part.graphs.len(), 1);
        let tg = &part.graphs[0];
        assert_eq!(tg.node_count(), 3);
        assert_eq!(tg.edge_count(), 3);

        let mut got: Vec<Vec<u32>> = tg.partial_paths.iter().map(|(p, _)| starts(tg, p)).collect();
        got.sort();
        assert_eq!(got, vec![vec![40, 0], vec![40, 20, 0]]);
    }

    #[test]
    fn path_scores_sum_to_transcript_scores() {
        let ts = vec![
            tx("a", Strand::Plus, 1.0, &[(0, 100), (200, 300)]),
            tx("b", Strand::Plus, 2.0, &[(50, 100), (200, 250)]),
            tx("c", Strand::Plus, 4.0, &[(1000, 1100)]),
        ];
        let part = run(Strand::Plus, &ts, &HashSet::new(), false);
        assert_eq!(part.graphs.len(), 2);
        let total: f64 = part.graphs.iter().map(TranscriptGraph::path_score).sum();
        assert_eq!(total, 7.0);
    }

    #[test]
    fn mapping_is_idempotent() {
        let ts = vec![
            tx("a", Strand::Plus, 1.0, &[(0, 100), (200, 300)]),
            tx("b", Strand::Plus, 2.0, &[(0, 100), (150, 300)]),
            tx("c", Strand::Plus, 0.5, &[(0, 300)]),
        ];
        let first = run(Strand::Plus, &ts, &HashSet::new(), true);
        let second = run(Strand::Plus, &ts, &HashSet::new(), true);
        assert_eq!(first.graphs.len(), second.graphs.len());
        for (a, b) in first.graphs.iter().zip(&second.graphs) {
            assert_eq!(a.partial_paths, b.partial_paths);
            assert_eq!(a.node_count(), b.node_count());
        }
    }

    #[test]
    fn empty_graph_has_no_components() {
        let part = run(Strand::Unknown, &[], &HashSet::new(), true);
        assert!(part.graphs.is_empty());
    }
}
