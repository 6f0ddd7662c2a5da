pub mod boundaries;
pub mod cluster;
pub mod collapse;
pub mod partition;
pub mod splice_graph;
pub mod strand;
pub mod trim;

pub use boundaries::{find_boundaries, split_exon, split_exons};
pub use cluster::cluster_intervals;
pub use collapse::{
    ChainCollapser, ChainMap, CollapsedGraph, CollapsedId, CollapsedNode, LinearChainCollapser,
};
pub use partition::{partition_components, ComponentPartition, Path, TranscriptGraph};
pub use splice_graph::{NodeAttrs, NodeId, SpliceGraph};
pub use strand::{
    NodeSupport, NodeSupportTable, ReferenceLists, ResolveStats, StrandPartition, StrandResolver,
};
pub use trim::{NodeTrimmer, SupportTrimmer};
