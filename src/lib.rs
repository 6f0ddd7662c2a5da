//! gtf_splice_graph
//!
//! Per-locus splice graphs from assembled transcript fragments.
//! Transcripts are read from GTF/GFF3, split at every exon boundary,
//! assigned a strand (inferring it when missing), turned into one directed
//! graph per strand, trimmed and collapsed, and finally partitioned into
//! connected components carrying weighted partial transcript paths.
//! Coordinates are 0-based, half-open.

pub mod types;
pub mod model;
pub mod annotation;
pub mod graph;
pub mod locus;
pub mod output;

pub use types::{Interval, Strand, StrandBuckets};

pub use model::{GraphOptions, Transcript, TrimParams, DEFAULT_STRAND_EPSILON};

pub use annotation::{AttrKeys, Locus, LocusError, ParseError};

pub use graph::{
    ChainCollapser, LinearChainCollapser, NodeTrimmer, Path, SpliceGraph, StrandResolver,
    SupportTrimmer, TranscriptGraph,
};

pub use locus::{LocusAssembler, LocusAssembly, LocusStats, ScoreTrackRow};
