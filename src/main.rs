use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, Level};
use rayon::prelude::*;
use simple_logger::init_with_level;
use thiserror::Error;

use gtf_splice_graph::annotation::{open_annotation, read_loci, AttrKeys, Locus};
use gtf_splice_graph::output::{BedGraphWriter, JsonLinesWriter};
use gtf_splice_graph::{GraphOptions, LocusAssembler, LocusStats, Strand, StrandBuckets};

/// Build strand-resolved splice graphs and partial transcript paths from
/// assembled transfrags, one locus at a time.
#[derive(Parser, Debug)]
#[command(name = "splice-graph")]
#[command(author, version, about)]
struct Cli {
    /// Input annotation (.gtf/.gff/.gff3, optionally .gz), sorted by position
    annotation: PathBuf,

    /// Output prefix; writes <PREFIX>.paths.jsonl
    #[arg(long, short)]
    output: PathBuf,

    /// Nodes shorter than this (bp) are never trimmed
    #[arg(long, default_value_t = 0)]
    min_trim_length: u32,

    /// Trim start/end nodes scoring below this fraction of their neighbour
    #[arg(long, default_value_t = 0.0)]
    trim_utr_fraction: f64,

    /// Trim intron-retaining nodes scoring below this fraction of their flanks
    #[arg(long, default_value_t = 0.0)]
    trim_intron_fraction: f64,

    /// Score evidence (score * bp) at or below this counts as no evidence
    #[arg(long, default_value_t = gtf_splice_graph::DEFAULT_STRAND_EPSILON)]
    strand_epsilon: f64,

    /// Only collapse chains of genomically adjacent nodes
    #[arg(long)]
    no_intron_merge: bool,

    /// Also write per-strand node scores as <PREFIX>.{plus,minus,unknown}.bedgraph
    #[arg(long)]
    bedgraph: bool,

    /// Keep reference transcripts as strand evidence
    #[arg(long)]
    guided: bool,

    /// Attribute holding the transcript expression value
    #[arg(long, value_name = "KEY", default_value = "expr")]
    expr_attr: String,

    /// Fall back to the GTF score column when the expression attribute is missing
    #[arg(long)]
    score_column: bool,

    /// Attribute flagging reference transcripts (non-zero integer)
    #[arg(long, value_name = "KEY", default_value = "ref")]
    ref_attr: String,

    /// Worker threads
    #[arg(long, short, default_value_t = default_threads())]
    threads: usize,

    /// Loci handed to the workers at a time
    #[arg(long, default_value_t = 256)]
    batch_size: usize,

    /// Debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

impl Cli {
    fn check(&self) -> Result<(), CliError> {
        for (name, v) in [
            ("--trim-utr-fraction", self.trim_utr_fraction),
            ("--trim-intron-fraction", self.trim_intron_fraction),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(CliError::InvalidInput(format!(
                    "{name} must be within [0, 1], got {v}"
                )));
            }
        }
        if !self.strand_epsilon.is_finite() || self.strand_epsilon < 0.0 {
            return Err(CliError::InvalidInput(format!(
                "--strand-epsilon must be >= 0, got {}",
                self.strand_epsilon
            )));
        }
        if self.threads == 0 {
            return Err(CliError::InvalidInput("--threads must be >= 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(CliError::InvalidInput("--batch-size must be >= 1".to_string()));
        }
        if !self.annotation.is_file() {
            return Err(CliError::InvalidInput(format!(
                "{} is not a file",
                self.annotation.display()
            )));
        }
        Ok(())
    }

    fn options(&self) -> GraphOptions {
        GraphOptions::default()
            .with_trim(self.min_trim_length, self.trim_utr_fraction, self.trim_intron_fraction)
            .with_strand_epsilon(self.strand_epsilon)
            .with_intron_merge(!self.no_intron_merge)
            .with_score_tracks(self.bedgraph)
    }

    fn keys(&self) -> AttrKeys {
        AttrKeys::default()
            .expr_key(&self.expr_attr)
            .ref_key(&self.ref_attr)
            .keep_refs(self.guided)
            .score_column_fallback(self.score_column)
    }
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut s = prefix.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn main() -> Result<()> {
    let start = std::time::Instant::now();
    let cli = Cli::parse();
    init_with_level(if cli.verbose { Level::Debug } else { Level::Info })?;
    cli.check()?;

    let assembler = LocusAssembler::new(cli.options());
    let keys = cli.keys();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build()
        .context("building worker pool")?;

    let paths_file = with_suffix(&cli.output, ".paths.jsonl");
    let mut paths = JsonLinesWriter::new(create(&paths_file)?);
    let open_track = |strand: Strand| -> Result<BedGraphWriter<BufWriter<File>>> {
        let path = with_suffix(&cli.output, &format!(".{}.bedgraph", strand.name()));
        Ok(BedGraphWriter::new(create(&path)?))
    };
    let mut tracks = if cli.bedgraph {
        Some(StrandBuckets {
            plus: open_track(Strand::Plus)?,
            minus: open_track(Strand::Minus)?,
            unknown: open_track(Strand::Unknown)?,
        })
    } else {
        None
    };

    let reader = open_annotation(&cli.annotation)?;
    let mut loci = read_loci(reader);
    let mut totals = LocusStats::default();
    let (mut n_loci, mut skipped) = (0usize, 0usize);

    loop {
        let batch: Vec<Locus> = loci
            .by_ref()
            .take(cli.batch_size)
            .collect::<Result<_, _>>()
            .with_context(|| format!("reading {}", cli.annotation.display()))?;
        if batch.is_empty() {
            break;
        }

        let results: Vec<_> = pool.install(|| {
            batch
                .par_iter()
                .map(|locus| assembler.assemble_locus(locus, &keys))
                .collect()
        });

        // written in input order
        for (locus, res) in batch.iter().zip(results) {
            n_loci += 1;
            let asm = match res {
                Ok(asm) => asm,
                Err(e) => {
                    warn!("skipping locus {}:{}-{}: {}", locus.chrom, locus.start, locus.end, e);
                    skipped += 1;
                    continue;
                }
            };
            paths
                .write_graphs(&asm.graphs)
                .with_context(|| format!("writing {}", paths_file.display()))?;
            if let Some(tracks) = tracks.as_mut() {
                for strand in Strand::ALL {
                    tracks
                        .get_mut(strand)
                        .write_rows(asm.score_tracks.get(strand))
                        .context("writing bedGraph")?;
                }
            }
            totals.merge(&asm.stats);
        }
    }

    paths.flush()?;
    if let Some(tracks) = tracks.as_mut() {
        for strand in Strand::ALL {
            tracks.get_mut(strand).flush()?;
        }
    }

    info!("{} loci ({} skipped)", n_loci, skipped);
    info!("{}", totals);
    info!("Elapsed time: {:?}", start.elapsed());
    Ok(())
}
