use std::io::{Cursor, Write};

use flate2::write::GzEncoder;
use flate2::Compression;

use gtf_splice_graph::annotation::{open_annotation, read_loci, AttrKeys, Locus};
use gtf_splice_graph::output::PathRecord;
use gtf_splice_graph::{GraphOptions, LocusAssembler, LocusError, Strand};

const GTF: &str = "\
##gff-version 2
chr1\tasm\ttranscript\t101\t400\t.\t+\t.\ttranscript_id \"T1\"; expr \"10\";
chr1\tasm\texon\t101\t200\t.\t+\t.\ttranscript_id \"T1\";
chr1\tasm\texon\t301\t400\t.\t+\t.\ttranscript_id \"T1\";
chr1\tasm\ttranscript\t101\t400\t.\t+\t.\ttranscript_id \"T2\"; expr \"5\";
chr1\tasm\texon\t101\t200\t.\t+\t.\ttranscript_id \"T2\";
chr1\tasm\texon\t351\t400\t.\t+\t.\ttranscript_id \"T2\";
chr1\tasm\ttranscript\t151\t380\t.\t-\t.\ttranscript_id \"T4\"; expr \"3\";
chr1\tasm\texon\t151\t380\t.\t-\t.\ttranscript_id \"T4\";
chr1\tasm\ttranscript\t301\t400\t.\t.\t.\ttranscript_id \"T3\"; expr \"2\";
chr1\tasm\texon\t301\t400\t.\t.\t.\ttranscript_id \"T3\";
chr1\tasm\ttranscript\t2001\t2100\t.\t.\t.\ttranscript_id \"T5\"; expr \"1\";
chr1\tasm\texon\t2001\t2100\t.\t.\t.\ttranscript_id \"T5\";
chr2\tasm\texon\t1\t100\t.\t+\t.\ttranscript_id \"orphan\";
";

fn loci() -> Vec<Locus> {
    read_loci(Cursor::new(GTF.as_bytes()))
        .collect::<Result<Vec<_>, _>>()
        .expect("well-formed records")
}

#[test]
fn gtf_to_component_graphs() {
    let loci = loci();
    assert_eq!(loci.len(), 3);

    let assembler = LocusAssembler::new(GraphOptions::default());
    let keys = AttrKeys::default();

    let first = assembler.assemble_locus(&loci[0], &keys).expect("valid locus");
    assert_eq!(first.stats.transcripts, 4);
    assert_eq!(first.stats.resolve.resolved_by_vote, 1);
    let strands: Vec<Strand> = first.graphs.iter().map(|g| g.strand).collect();
    assert_eq!(strands, vec![Strand::Plus, Strand::Minus]);

    let plus = &first.graphs[0];
    assert_eq!(plus.node_count(), 3);
    assert_eq!(plus.partial_paths.len(), 3);
    assert_eq!(plus.path_score(), 17.0);

    let starts = |path: &gtf_splice_graph::Path| -> Vec<u32> {
        path.nodes().iter().map(|&n| plus.graph[n].start).collect()
    };
    let mut got: Vec<(Vec<u32>, f64)> = plus
        .partial_paths
        .iter()
        .map(|(p, s)| (starts(p), *s))
        .collect();
    got.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        got,
        vec![
            (vec![100, 300, 350], 10.0),
            (vec![100, 350], 5.0),
            (vec![300, 350], 2.0),
        ]
    );

    let second = assembler.assemble_locus(&loci[1], &keys).expect("valid locus");
    assert_eq!(second.graphs.len(), 1);
    assert_eq!(second.graphs[0].strand, Strand::Unknown);
    assert_eq!(second.stats.resolve.unresolved, 1);

    let third = assembler.assemble_locus(&loci[2], &keys);
    assert!(matches!(third, Err(LocusError::UndeclaredTranscript { .. })));
}

#[test]
fn trimming_and_collapsing_follow_options() {
    let loci = loci();
    let keys = AttrKeys::default();

    // without merging through introns nothing on the plus strand collapses
    let opts = GraphOptions::default().with_intron_merge(false);
    let asm = LocusAssembler::new(opts).assemble_locus(&loci[0], &keys).unwrap();
    assert_eq!(asm.graphs[0].node_count(), 3);

    // every trim candidate scores far above 5% of its neighbours
    let opts = GraphOptions::default().with_trim(0, 0.05, 0.05);
    let asm = LocusAssembler::new(opts).assemble_locus(&loci[0], &keys).unwrap();
    assert_eq!(asm.stats.trimmed_nodes, 0);
}

#[test]
fn path_records_serialise_every_graph() {
    let loci = loci();
    let asm = LocusAssembler::new(GraphOptions::default())
        .assemble_locus(&loci[0], &AttrKeys::default())
        .unwrap();
    let records: Vec<PathRecord> = asm.graphs.iter().map(PathRecord::from).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].strand, '+');
    assert_eq!(records[1].strand, '-');
    let json = serde_json::to_string(&records[1]).unwrap();
    assert!(json.contains("\"chrom\":\"chr1\""));
}

#[test]
fn gzipped_annotation_is_read_transparently() {
    let path = std::env::temp_dir().join(format!("splice_graph_{}.gtf.gz", std::process::id()));
    {
        let file = std::fs::File::create(&path).unwrap();
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(GTF.as_bytes()).unwrap();
        enc.finish().unwrap();
    }

    let reader = open_annotation(&path).unwrap();
    let n = read_loci(reader).filter_map(Result::ok).count();
    std::fs::remove_file(&path).ok();
    assert_eq!(n, 3);
}

#[test]
fn missing_annotation_reports_path() {
    let err = open_annotation("/definitely/not/here.gtf").err().expect("missing file");
    assert!(format!("{err:#}").contains("/definitely/not/here.gtf"));
}
