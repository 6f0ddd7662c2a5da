//! Writers for assembled loci: JSON lines for component graphs and paths,
//! bedGraph for per-strand node scores.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::graph::TranscriptGraph;
use crate::locus::ScoreTrackRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub start: u32,
    pub end: u32,
    pub length: u32,
    pub score: f64,
    /// Member intervals as (start, end), in transcription order.
    pub members: Vec<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathEntry {
    /// Positions into [`PathRecord::nodes`].
    pub nodes: Vec<usize>,
    pub score: f64,
}

/// Serialisable view of one [`TranscriptGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRecord {
    pub chrom: String,
    pub strand: char,
    pub component: usize,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<(usize, usize)>,
    pub paths: Vec<PathEntry>,
}

impl From<&TranscriptGraph> for PathRecord {
    fn from(tg: &TranscriptGraph) -> Self {
        // component graphs are never pruned, so indices are dense
        let nodes = tg
            .graph
            .node_indices()
            .map(|i| {
                let n = &tg.graph[i];
                NodeRecord {
                    start: n.start,
                    end: n.end,
                    length: n.length,
                    score: n.score,
                    members: n.members.iter().map(|m| (m.start, m.end)).collect(),
                }
            })
            .collect();

        let mut edges: Vec<(usize, usize)> = tg
            .graph
            .edge_indices()
            .filter_map(|e| tg.graph.edge_endpoints(e))
            .map(|(u, v)| (u.index(), v.index()))
            .collect();
        edges.sort_unstable();

        let paths = tg
            .partial_paths
            .iter()
            .map(|(path, score)| PathEntry {
                nodes: path.nodes().iter().map(|n| n.index()).collect(),
                score: *score,
            })
            .collect();

        Self {
            chrom: tg.chrom.clone(),
            strand: tg.strand.as_char(),
            component: tg.component,
            nodes,
            edges,
            paths,
        }
    }
}

/// One JSON object per line.
pub struct JsonLinesWriter<W: Write> {
    inner: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write(&mut self, record: &PathRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.inner, record)?;
        self.inner.write_all(b"\n")
    }

    pub fn write_graphs<'a, I>(&mut self, graphs: I) -> io::Result<()>
    where
        I: IntoIterator<Item = &'a TranscriptGraph>,
    {
        for tg in graphs {
            self.write(&PathRecord::from(tg))?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Tab-separated `chrom start end score` lines.
pub struct BedGraphWriter<W: Write> {
    inner: W,
}

impl<W: Write> BedGraphWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_row(&mut self, row: &ScoreTrackRow) -> io::Result<()> {
        writeln!(self.inner, "{}\t{}\t{}\t{}", row.chrom, row.start, row.end, row.score)
    }

    pub fn write_rows<'a, I>(&mut self, rows: I) -> io::Result<()>
    where
        I: IntoIterator<Item = &'a ScoreTrackRow>,
    {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
