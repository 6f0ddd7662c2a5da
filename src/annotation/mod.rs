pub mod io;
pub mod loci;

pub use io::{AnnotationReader, AnnotationRecord, Dialect, ParseError};
pub use loci::{
    open_annotation, parse_locus_transcripts, read_loci, AttrKeys, Locus, LocusError, LocusReader,
};
