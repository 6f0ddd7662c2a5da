//! Per-locus pipeline: strand resolution, graph building, trimming,
//! collapsing and path mapping for every strand bucket.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::annotation::{parse_locus_transcripts, AttrKeys, Locus, LocusError};
use crate::graph::{
    partition_components, ChainCollapser, LinearChainCollapser, NodeTrimmer, ReferenceLists,
    ResolveStats, SpliceGraph, StrandResolver, SupportTrimmer, TranscriptGraph,
};
use crate::model::{GraphOptions, Transcript};
use crate::types::{Strand, StrandBuckets};

/// One bedGraph row: node coverage of an untrimmed strand graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTrackRow {
    pub chrom: String,
    pub start: u32,
    pub end: u32,
    pub score: f64,
}

/// Counters for one assembled locus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocusStats {
    pub transcripts: usize,
    pub references: usize,
    /// Transcripts per strand bucket after resolution.
    pub per_strand: StrandBuckets<usize>,
    pub resolve: ResolveStats,
    pub trimmed_nodes: usize,
    pub components: usize,
    pub split_transcripts: usize,
}

impl LocusStats {
    /// Fold another locus' counters into these.
    pub fn merge(&mut self, other: &LocusStats) {
        self.transcripts += other.transcripts;
        self.references += other.references;
        for strand in Strand::ALL {
            *self.per_strand.get_mut(strand) += other.per_strand.get(strand);
        }
        self.resolve.unstranded += other.resolve.unstranded;
        self.resolve.resolved_by_vote += other.resolve.resolved_by_vote;
        self.resolve.resolved_by_cluster += other.resolve.resolved_by_cluster;
        self.resolve.unresolved += other.resolve.unresolved;
        self.trimmed_nodes += other.trimmed_nodes;
        self.components += other.components;
        self.split_transcripts += other.split_transcripts;
    }
}

impl fmt::Display for LocusStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "transcripts={} (+{} -{} .{}) references={} unstranded={} voted={} clustered={} \
             unresolved={} trimmed={} components={} split={}",
            self.transcripts,
            self.per_strand.plus,
            self.per_strand.minus,
            self.per_strand.unknown,
            self.references,
            self.resolve.unstranded,
            self.resolve.resolved_by_vote,
            self.resolve.resolved_by_cluster,
            self.resolve.unresolved,
            self.trimmed_nodes,
            self.components,
            self.split_transcripts
        )
    }
}

/// Everything produced for one locus.
#[derive(Debug, Clone)]
pub struct LocusAssembly {
    pub chrom: String,
    /// Component graphs of the plus, minus and unknown buckets, in that order.
    pub graphs: Vec<TranscriptGraph>,
    pub references: ReferenceLists,
    /// Empty unless score tracks are enabled.
    pub score_tracks: StrandBuckets<Vec<ScoreTrackRow>>,
    pub stats: LocusStats,
}

/// Runs the graph pipeline with pluggable trimming and collapsing.
#[derive(Debug, Clone)]
pub struct LocusAssembler<T = SupportTrimmer, C = LinearChainCollapser> {
    options: GraphOptions,
    trimmer: T,
    collapser: C,
}

impl LocusAssembler {
    pub fn new(options: GraphOptions) -> Self {
        Self::with_collaborators(options, SupportTrimmer, LinearChainCollapser)
    }
}

impl<T: NodeTrimmer, C: ChainCollapser> LocusAssembler<T, C> {
    pub fn with_collaborators(options: GraphOptions, trimmer: T, collapser: C) -> Self {
        Self {
            options,
            trimmer,
            collapser,
        }
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Parse a locus and assemble it. Malformed transcript structure fails
    /// the whole locus; nothing partial is returned.
    pub fn assemble_locus(
        &self,
        locus: &Locus,
        keys: &AttrKeys,
    ) -> Result<LocusAssembly, LocusError> {
        let transcripts = parse_locus_transcripts(locus, keys)?;
        Ok(self.assemble(&locus.chrom, transcripts))
    }

    pub fn assemble(&self, chrom: &str, transcripts: Vec<Transcript>) -> LocusAssembly {
        let mut stats = LocusStats {
            transcripts: transcripts.iter().filter(|t| !t.is_ref).count(),
            ..Default::default()
        };

        let partition = StrandResolver::new(self.options.strand_epsilon).resolve(transcripts);
        stats.references = partition.references.len();
        stats.resolve = partition.stats;

        let mut graphs = Vec::new();
        let mut score_tracks: StrandBuckets<Vec<ScoreTrackRow>> = StrandBuckets::default();

        for strand in Strand::ALL {
            let bucket = partition.transcripts.get(strand);
            *stats.per_strand.get_mut(strand) = bucket.len();
            if bucket.is_empty() {
                continue;
            }

            let graph = SpliceGraph::build(strand, bucket);
            if self.options.score_tracks {
                *score_tracks.get_mut(strand) = graph
                    .score_track()
                    .into_iter()
                    .map(|(node, score)| ScoreTrackRow {
                        chrom: chrom.to_string(),
                        start: node.start,
                        end: node.end,
                        score,
                    })
                    .collect();
            }

            let trimmed = self.trimmer.trim(&graph, &self.options.trim);
            let kept = graph.without_nodes(&trimmed);
            let (collapsed, chain_map) =
                self.collapser.collapse(&kept, self.options.merge_through_introns);
            let part =
                partition_components(chrom, &graph, &trimmed, &collapsed, &chain_map, bucket);

            debug!(
                "{} {} strand: {} nodes, {} trimmed, {} collapsed, {} components",
                chrom,
                strand,
                graph.node_count(),
                trimmed.len(),
                collapsed.node_count(),
                part.graphs.len()
            );

            stats.trimmed_nodes += trimmed.len();
            stats.components += part.graphs.len();
            stats.split_transcripts += part.split_transcripts;
            graphs.extend(part.graphs);
        }

        LocusAssembly {
            chrom: chrom.to_string(),
            graphs,
            references: partition.references,
            score_tracks,
            stats,
        }
    }
}
