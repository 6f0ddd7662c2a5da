use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use log::debug;
use thiserror::Error;

use crate::annotation::io::{AnnotationReader, AnnotationRecord, ParseError};
use crate::model::Transcript;
use crate::types::Interval;

/// Which attributes and feature types describe a transcript.
///
/// Defaults match assembler-style GTF output:
/// `transcript` lines declare transcripts, `exon` lines attach to them via
/// `transcript_id`, expression comes from `expr` and the reference flag
/// from `ref`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrKeys {
    pub transcript_id_keys: Vec<String>,
    pub expr_key: String,
    pub ref_key: String,
    pub transcript_feature_types: Vec<String>,
    pub exon_feature_types: Vec<String>,
    /// Keep reference transcripts (guided mode); otherwise they are dropped.
    pub keep_refs: bool,
    /// Use the GTF score column when the expression attribute is missing.
    /// Off by default: assemblers such as Cufflinks write a constant there.
    pub score_column_fallback: bool,
}

impl Default for AttrKeys {
    fn default() -> Self {
        Self {
            transcript_id_keys: vec!["transcript_id".to_string()],
            expr_key: "expr".to_string(),
            ref_key: "ref".to_string(),
            transcript_feature_types: vec!["transcript".to_string()],
            exon_feature_types: vec!["exon".to_string()],
            keep_refs: false,
            score_column_fallback: false,
        }
    }
}

impl AttrKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set transcript id key(s), first match wins (GFF3 usually needs `["ID", "Parent"]`).
    pub fn transcript_id_keys(mut self, keys: &[&str]) -> Self {
        self.transcript_id_keys = keys.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn expr_key(mut self, key: &str) -> Self {
        self.expr_key = key.to_string();
        self
    }

    pub fn ref_key(mut self, key: &str) -> Self {
        self.ref_key = key.to_string();
        self
    }

    pub fn transcript_feature_types(mut self, types: &[&str]) -> Self {
        self.transcript_feature_types = types.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn exon_feature_types(mut self, types: &[&str]) -> Self {
        self.exon_feature_types = types.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn keep_refs(mut self, keep: bool) -> Self {
        self.keep_refs = keep;
        self
    }

    pub fn score_column_fallback(mut self, enabled: bool) -> Self {
        self.score_column_fallback = enabled;
        self
    }
}

/// Malformed transcript structure inside one locus. Fatal for that locus only.
#[derive(Debug, Error, PartialEq)]
pub enum LocusError {
    #[error("{feature} feature at {chrom}:{start} has no transcript id")]
    MissingTranscriptId { feature: String, chrom: String, start: u32 },
    #[error("transcript '{id}' declared twice")]
    DuplicateTranscript { id: String },
    #[error("exon at {chrom}:{start} references undeclared transcript '{id}'")]
    UndeclaredTranscript { id: String, chrom: String, start: u32 },
    #[error("transcript '{id}' has invalid expression value '{value}'")]
    InvalidScore { id: String, value: String },
}

/// Records of one contiguous region of a chromosome.
#[derive(Debug, Clone, PartialEq)]
pub struct Locus {
    pub chrom: String,
    pub start: u32,
    pub end: u32,
    pub records: Vec<AnnotationRecord>,
}

impl Locus {
    fn open(rec: AnnotationRecord) -> Self {
        Self {
            chrom: rec.chrom.clone(),
            start: rec.start,
            end: rec.end,
            records: vec![rec],
        }
    }

    fn accepts(&self, rec: &AnnotationRecord) -> bool {
        rec.chrom == self.chrom && rec.start < self.end
    }

    fn push(&mut self, rec: AnnotationRecord) {
        self.start = self.start.min(rec.start);
        self.end = self.end.max(rec.end);
        self.records.push(rec);
    }
}

/// Groups a coordinate-sorted record stream into [`Locus`] values.
///
/// A record opens a new locus when its chromosome differs from the current
/// one or it starts at or past the current locus end.
pub struct LocusReader<I> {
    records: I,
    current: Option<Locus>,
    done: bool,
}

impl<I> LocusReader<I>
where
    I: Iterator<Item = Result<AnnotationRecord, ParseError>>,
{
    pub fn new(records: I) -> Self {
        Self {
            records,
            current: None,
            done: false,
        }
    }
}

impl<I> Iterator for LocusReader<I>
where
    I: Iterator<Item = Result<AnnotationRecord, ParseError>>,
{
    type Item = Result<Locus, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        for rec in self.records.by_ref() {
            let rec = match rec {
                Ok(r) => r,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            match self.current.as_mut() {
                Some(locus) if locus.accepts(&rec) => locus.push(rec),
                _ => {
                    if let Some(finished) = self.current.replace(Locus::open(rec)) {
                        return Some(Ok(finished));
                    }
                }
            }
        }
        self.done = true;
        self.current.take().map(Ok)
    }
}

/// Loci of a GTF/GFF3 stream.
pub fn read_loci<R: BufRead>(
    reader: R,
) -> LocusReader<impl Iterator<Item = Result<AnnotationRecord, ParseError>>> {
    LocusReader::new(AnnotationReader::new(reader).records())
}

/// Open an annotation file, gunzipping when the name ends in `.gz`.
pub fn open_annotation<P: AsRef<Path>>(path: P) -> anyhow::Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("failed to open annotation '{}'", path.display()))?;

    let is_gz = path.extension().map(|e| e == "gz").unwrap_or(false);
    if is_gz {
        Ok(Box::new(BufReader::new(flate2::read::GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn checked_score(id: &str, value: f64) -> Result<f64, LocusError> {
    if !value.is_finite() || value < 0.0 {
        return Err(LocusError::InvalidScore {
            id: id.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn parse_score(id: &str, raw: &str) -> Result<f64, LocusError> {
    let value: f64 = raw.trim().parse().map_err(|_| LocusError::InvalidScore {
        id: id.to_string(),
        value: raw.to_string(),
    })?;
    checked_score(id, value)
}

/// Turn a locus' records into transcripts, in declaration order.
///
/// Transcript features declare transcripts; exon features attach to an
/// already declared one. Any other feature type is ignored. Records flagged
/// as reference are skipped outright unless `keep_refs` is set. The score is
/// the expression attribute, else 0 (or the score column when
/// `score_column_fallback` is set).
pub fn parse_locus_transcripts(
    locus: &Locus,
    keys: &AttrKeys,
) -> Result<Vec<Transcript>, LocusError> {
    let mut transcripts: Vec<Transcript> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut skipped_refs: HashSet<String> = HashSet::new();

    for rec in &locus.records {
        let is_transcript = rec.is_feature(&keys.transcript_feature_types);
        let is_exon = rec.is_feature(&keys.exon_feature_types);
        if !is_transcript && !is_exon {
            continue;
        }

        let is_ref = is_reference(rec, &keys.ref_key);
        let id = rec.pick_first_attr(&keys.transcript_id_keys);
        if is_ref && !keys.keep_refs {
            if let (true, Some(id)) = (is_transcript, id) {
                skipped_refs.insert(id.to_string());
            }
            continue;
        }

        let id = id.ok_or_else(|| LocusError::MissingTranscriptId {
            feature: rec.feature_type.clone(),
            chrom: rec.chrom.clone(),
            start: rec.start,
        })?;

        if is_transcript {
            if by_id.contains_key(id) {
                return Err(LocusError::DuplicateTranscript { id: id.to_string() });
            }
            let score = match (rec.attr(&keys.expr_key), rec.score) {
                (Some(raw), _) => parse_score(id, raw)?,
                (None, Some(s)) if keys.score_column_fallback => checked_score(id, s)?,
                (None, _) => 0.0,
            };
            let mut t = Transcript::new(id, rec.chrom.clone(), rec.strand, score);
            t.is_ref = is_ref;
            by_id.insert(id.to_string(), transcripts.len());
            transcripts.push(t);
        } else {
            let idx = match by_id.get(id) {
                Some(&idx) => idx,
                // exons of a dropped reference need not repeat the flag
                None if skipped_refs.contains(id) => continue,
                None => {
                    return Err(LocusError::UndeclaredTranscript {
                        id: id.to_string(),
                        chrom: rec.chrom.clone(),
                        start: rec.start,
                    })
                }
            };
            transcripts[idx].add_exon(Interval::new(rec.start, rec.end));
        }
    }

    for t in &mut transcripts {
        t.finalize();
    }
    if !skipped_refs.is_empty() {
        debug!(
            "{}:{}-{} dropped {} reference transcripts",
            locus.chrom,
            locus.start,
            locus.end,
            skipped_refs.len()
        );
    }
    Ok(transcripts)
}

/// Non-zero integer in the reference attribute.
fn is_reference(rec: &AnnotationRecord, ref_key: &str) -> bool {
    rec.attr(ref_key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|v| v != 0)
        .unwrap_or(false)
}
