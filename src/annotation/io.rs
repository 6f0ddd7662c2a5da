use std::collections::HashMap;
use std::io::BufRead;

use thiserror::Error;

use crate::types::Strand;

/// File dialect detected from attribute syntax.
///
/// - GFF3 typically uses: key=value;key2=value2
/// - GTF typically uses: key "value"; key2 "value2";
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Gff3,
    Gtf,
    Unknown,
}

/// A single parsed record line from GTF/GFF3.
///
/// Coordinates are converted to 0-based half-open `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub chrom: String,
    pub feature_type: String,
    pub start: u32,
    pub end: u32,
    pub score: Option<f64>, // '.' => None
    pub strand: Strand,     // + / - / . / ?
    pub attrs: HashMap<String, String>,
}

impl AnnotationRecord {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(|s| s.as_str())
    }

    pub fn is_feature(&self, types: &[String]) -> bool {
        types.iter().any(|t| t == &self.feature_type)
    }

    /// First non-empty value among `keys`.
    pub fn pick_first_attr(&self, keys: &[String]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.attr(k))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }
}

/// Line-level parsing errors. `line` is the 1-based line number when known.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error after line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed GTF/GFF line {line}: {text}")]
    MalformedLine { line: usize, text: String },
    #[error("bad coordinates on line {line}: {text}")]
    BadCoordinates { line: usize, text: String },
}

/// Streaming parser for GTF/GFF3 text.
///
/// ```no_run
/// use std::fs::File;
/// use std::io::BufReader;
/// use gtf_splice_graph::annotation::AnnotationReader;
///
/// let file = File::open("fragments.gtf").unwrap();
/// for rec in AnnotationReader::new(BufReader::new(file)).records() {
///     let rec = rec.unwrap();
///     println!("{} {}-{}", rec.chrom, rec.start, rec.end);
/// }
/// ```
pub struct AnnotationReader<R: BufRead> {
    reader: R,
    buf: String,
    line_no: usize,
}

impl<R: BufRead> AnnotationReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line_no: 0,
        }
    }

    /// Iterator over parsed records, skipping blank and '#' lines.
    pub fn records(mut self) -> impl Iterator<Item = Result<AnnotationRecord, ParseError>> {
        std::iter::from_fn(move || loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line_no += 1,
                Err(e) => {
                    return Some(Err(ParseError::Io {
                        line: self.line_no,
                        source: e,
                    }))
                }
            }

            let line = self.buf.trim_end_matches(&['\n', '\r'][..]);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            return Some(parse_record_line(line, self.line_no));
        })
    }
}

/// Parse one non-comment line. `line_no` is only used in error messages.
pub fn parse_record_line(line: &str, line_no: usize) -> Result<AnnotationRecord, ParseError> {
    let malformed = || ParseError::MalformedLine {
        line: line_no,
        text: line.to_string(),
    };
    let bad_coords = || ParseError::BadCoordinates {
        line: line_no,
        text: line.to_string(),
    };

    // seqname source feature start end score strand phase attributes
    let cols: Vec<&str> = line.split('\t').collect();
    let [chrom, _source, feature_type, start_s, end_s, score_s, strand_s, _phase, attrs_s] =
        cols[..]
    else {
        return Err(malformed());
    };

    // 1-based inclusive -> 0-based half-open
    let start_1: u32 = start_s.trim().parse().map_err(|_| bad_coords())?;
    let end_1: u32 = end_s.trim().parse().map_err(|_| bad_coords())?;
    if start_1 == 0 || end_1 < start_1 {
        return Err(bad_coords());
    }

    let score = match score_s.trim() {
        "." => None,
        s => Some(s.parse::<f64>().map_err(|_| malformed())?),
    };

    let strand = match strand_s.trim() {
        "+" => Strand::Plus,
        "-" => Strand::Minus,
        "." | "?" => Strand::Unknown,
        _ => return Err(malformed()),
    };

    let (_, attrs) = parse_attributes(attrs_s);

    Ok(AnnotationRecord {
        chrom: chrom.to_string(),
        feature_type: feature_type.to_string(),
        start: start_1 - 1,
        end: end_1,
        score,
        strand,
        attrs,
    })
}

/// Parse the attribute column of either dialect.
///
/// '=' anywhere means GFF3, a quote means GTF; anything else is parsed
/// best-effort per field.
pub fn parse_attributes(s: &str) -> (Dialect, HashMap<String, String>) {
    let s = s.trim();

    let dialect = if s.contains('=') {
        Dialect::Gff3
    } else if s.contains('"') {
        Dialect::Gtf
    } else {
        Dialect::Unknown
    };

    let mut map = HashMap::new();
    for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let gff_style = match dialect {
            Dialect::Gff3 => true,
            Dialect::Gtf => false,
            Dialect::Unknown => part.contains('='),
        };
        let (key, value) = if gff_style {
            part.split_once('=').unwrap_or((part, ""))
        } else {
            part.split_once(char::is_whitespace).unwrap_or((part, ""))
        };
        let key = key.trim();
        let value = unquote(value);
        // GTF keys without a value carry no information
        if key.is_empty() || (!gff_style && value.is_empty()) {
            continue;
        }
        map.insert(key.to_string(), value);
    }

    (dialect, map)
}

fn unquote(v: &str) -> String {
    let v = v.trim();
    let v = v.strip_prefix('"').unwrap_or(v);
    let v = v.strip_suffix('"').unwrap_or(v);
    v.to_string()
}
