use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

use gwloc_core::models::{
    CredibleSet, GenomicInterval, Locus, LocusAssignment, LocusSummary, VariantAnnotation,
};
use gwloc_core::utils::get_dynamic_reader;

use crate::error::{Result, SumstatsError};

pub const LOCUS_TABLE_HEADER: &str = "locus_id\tlead_variant\tchr\tlead_pos\tlead_p\tstart\tend\tn_significant\tn_window\tstatus\tcs_size\tcs_mass\ttop_variant\ttop_pip";
pub const ASSIGNMENT_TABLE_HEADER: &str = "variant_id\tchr\tpos\teffect_allele\tother_allele\tp\tlocus_id\tis_lead\tdistance_to_lead";
pub const ANNOTATION_TABLE_HEADER: &str = "variant_id\tchr\tpos\tp\tsignificant\tis_lead\tlocus_id\tdistance_to_lead";
pub const CREDIBLE_SET_TABLE_HEADER: &str = "locus_id\tvariant_id\tchr\tpos\tlog_abf\tposterior\trank\tcumulative\tin_credible_set";

/// Plain notation for ordinary magnitudes, scientific for the tiny p-values GWAS produces.
pub fn format_float(x: f64) -> String {
    let ax = x.abs();
    if x == 0.0 || (1e-4..1e9).contains(&ax) || !x.is_finite() {
        format!("{}", x)
    } else {
        format!("{:e}", x)
    }
}

fn format_opt<T: ToString>(x: Option<T>) -> String {
    x.map(|v| v.to_string()).unwrap_or_else(|| "NA".to_string())
}

///
/// Output file for one table, gzip-compressed when its path ends in `.gz`.
///
/// Rows can be written one at a time, so tables with a row per input variant
/// never have to be held in memory. Call [`TableStream::finish`] to flush;
/// a gzip stream dropped without it may miss its trailer.
///
pub enum TableStream {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl TableStream {
    pub fn create<T: AsRef<Path>>(path: T) -> std::io::Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = BufWriter::new(File::create(path)?);
        if path.extension().is_some_and(|ext| ext == "gz") {
            Ok(TableStream::Gzip(GzEncoder::new(file, Compression::default())))
        } else {
            Ok(TableStream::Plain(file))
        }
    }

    pub fn finish(self) -> std::io::Result<()> {
        match self {
            TableStream::Plain(mut w) => w.flush(),
            TableStream::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for TableStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            TableStream::Plain(w) => w.write(buf),
            TableStream::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            TableStream::Plain(w) => w.flush(),
            TableStream::Gzip(w) => w.flush(),
        }
    }
}

pub trait TableWrite {
    ///
    /// Write the table, header first, to any writer.
    ///
    fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;

    ///
    /// Write the table to disk, gzip-compressed when `path` ends in `.gz`.
    ///
    /// # Arguments
    /// - path: the path to the file to dump to
    fn write_table_path<T: AsRef<Path>>(&self, path: T) -> std::io::Result<()> {
        let mut out = TableStream::create(path)?;
        self.write_table(&mut out)?;
        out.finish()
    }
}

impl TableWrite for [LocusSummary] {
    fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{}", LOCUS_TABLE_HEADER)?;
        for s in self {
            let l = &s.locus;
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                l.id,
                l.lead_id,
                l.chr,
                l.lead_pos,
                format_float(l.lead_pval),
                l.interval.start,
                l.interval.end,
                s.n_significant,
                s.n_window,
                s.status,
                format_opt(s.credible_set_size),
                format_opt(s.credible_set_mass.map(format_float)),
                format_opt(s.top_variant.as_deref()),
                format_opt(s.top_posterior.map(format_float)),
            )?;
        }
        Ok(())
    }
}

impl TableWrite for [LocusAssignment] {
    fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{}", ASSIGNMENT_TABLE_HEADER)?;
        for a in self {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                a.variant_id,
                a.chr,
                a.pos,
                a.effect_allele,
                a.other_allele,
                format_float(a.pval),
                a.locus_id,
                a.is_lead,
                a.distance_to_lead,
            )?;
        }
        Ok(())
    }
}

/// One row of the annotation table; write [`ANNOTATION_TABLE_HEADER`] first.
pub fn write_annotation<W: Write>(writer: &mut W, a: &VariantAnnotation) -> std::io::Result<()> {
    writeln!(
        writer,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        a.variant_id,
        a.chr,
        a.pos,
        format_float(a.pval),
        a.significant,
        a.is_lead,
        format_opt(a.locus_id),
        format_opt(a.distance_to_lead),
    )
}

impl TableWrite for [VariantAnnotation] {
    fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{}", ANNOTATION_TABLE_HEADER)?;
        for a in self {
            write_annotation(writer, a)?;
        }
        Ok(())
    }
}

impl TableWrite for [CredibleSet] {
    fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{}", CREDIBLE_SET_TABLE_HEADER)?;
        for cs in self {
            for r in &cs.rows {
                writeln!(
                    writer,
                    "{}\t{}\t{}\t{}\t{:.6}\t{}\t{}\t{}\t{}",
                    r.locus_id,
                    r.variant_id,
                    r.chr,
                    r.pos,
                    r.log_abf,
                    format_float(r.posterior),
                    r.rank,
                    format_float(r.cumulative),
                    r.in_credible_set,
                )?;
            }
        }
        Ok(())
    }
}

pub trait BedWrite {
    ///
    /// Write locus windows as BED (`chr`, `start`, `end`, `name`), with the start
    /// clamped at zero and `chr` prefixed, as BED consumers expect.
    ///
    /// # Arguments
    /// - path: the path to the file to dump to
    fn write_bed<T: AsRef<Path>>(&self, path: T) -> std::io::Result<()>;
}

impl BedWrite for [Locus] {
    fn write_bed<T: AsRef<Path>>(&self, path: T) -> std::io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = BufWriter::new(File::create(path)?);

        for locus in self {
            // BED is half-open; the window is closed, so the end moves by one
            writeln!(
                file,
                "chr{}\t{}\t{}\t{}",
                locus.interval.chr,
                locus.interval.clamped_start(),
                locus.interval.end + 1,
                locus.label()
            )?;
        }
        file.flush()
    }
}

///
/// Read a locus table written by [`TableWrite`] back into defined loci.
///
/// The locus columns and `n_significant` are read; fine-mapping columns are
/// ignored, so every row comes back with status `defined`.
///
pub fn read_locus_table<P: AsRef<Path>>(path: P) -> Result<Vec<LocusSummary>> {
    let path = path.as_ref();
    let label = path.display().to_string();
    let reader = get_dynamic_reader(path)
        .map_err(|e| SumstatsError::Io(std::io::Error::other(format!("{:#}", e))))?;

    let malformed = |line: usize, reason: String| SumstatsError::MalformedTable {
        path: label.clone(),
        line,
        reason,
    };

    let mut loci = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        if line_no == 1 || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            return Err(malformed(line_no, format!("expected at least 7 fields, found {}", fields.len())));
        }
        let parse_err = |name: &str, value: &str| malformed(line_no, format!("bad {} `{}`", name, value));

        let id = fields[0].parse().map_err(|_| parse_err("locus_id", fields[0]))?;
        let lead_pos = fields[3].parse().map_err(|_| parse_err("lead_pos", fields[3]))?;
        let lead_pval = fields[4].parse().map_err(|_| parse_err("lead_p", fields[4]))?;
        let start = fields[5].parse().map_err(|_| parse_err("start", fields[5]))?;
        let end = fields[6].parse().map_err(|_| parse_err("end", fields[6]))?;
        let n_significant = match fields.get(7) {
            Some(n) => n.parse().map_err(|_| parse_err("n_significant", *n))?,
            None => 0,
        };

        let locus = Locus {
            id,
            lead_id: fields[1].to_string(),
            chr: fields[2].to_string(),
            lead_pos,
            lead_pval,
            interval: GenomicInterval::new(fields[2], start, end),
        };
        loci.push(LocusSummary::defined(locus, n_significant));
    }

    Ok(loci)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwloc_core::models::{LocusStatus, PosteriorRow, Variant};
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn locus() -> Locus {
        let lead = Variant::new("1", 100, "A", "G", 0.5, 0.05, 1e-9);
        Locus::from_lead(1, &lead, 250_000)
    }

    #[rstest]
    #[case(1e-9, "1e-9")]
    #[case(0.25, "0.25")]
    #[case(0.0, "0")]
    #[case(3.5e-12, "3.5e-12")]
    fn test_format_float(#[case] x: f64, #[case] expected: &str) {
        assert_eq!(format_float(x), expected);
    }

    #[rstest]
    fn test_locus_table_round_trip(locus: Locus) {
        let summaries = vec![LocusSummary::defined(locus.clone(), 2)];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/loci.tsv.gz");
        summaries.write_table_path(&path).unwrap();

        let loci = read_locus_table(&path).unwrap();
        assert_eq!(loci.len(), 1);
        assert_eq!(loci[0].locus, locus);
        assert_eq!(loci[0].n_significant, 2);
        assert_eq!(summaries[0].status, LocusStatus::Defined);
    }

    #[rstest]
    fn test_locus_table_columns(locus: Locus) {
        let mut summary = LocusSummary::defined(locus, 1);
        summary.status = LocusStatus::FineMapped;
        summary.credible_set_size = Some(3);
        summary.top_variant = Some("rs1".to_string());
        let mut out = Vec::new();
        [summary].write_table(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], LOCUS_TABLE_HEADER);
        assert_eq!(
            lines[1],
            "1\t1:100:G:A\t1\t100\t1e-9\t-249900\t250100\t1\t0\tfine_mapped\t3\tNA\trs1\tNA"
        );
    }

    #[rstest]
    fn test_credible_set_table() {
        let cs = CredibleSet {
            locus_id: 4,
            coverage: 0.95,
            rows: vec![PosteriorRow {
                locus_id: 4,
                variant_id: "rs9".to_string(),
                chr: "2".to_string(),
                pos: 10,
                log_abf: 12.0,
                posterior: 1.0,
                rank: 1,
                cumulative: 1.0,
                in_credible_set: true,
            }],
        };
        let mut out = Vec::new();
        [cs].write_table(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1).unwrap(), "4\trs9\t2\t10\t12.000000\t1\t1\t1\ttrue");
    }

    #[rstest]
    fn test_annotation_rows_mark_missing_locus(locus: Locus) {
        let inside = Variant::new("1", 150, "A", "G", 0.1, 0.05, 1e-7);
        let outside = Variant::new("2", 10, "A", "G", 0.1, 0.05, 0.3);
        let rows = vec![
            VariantAnnotation::new(&inside, false, false, Some(&locus)),
            VariantAnnotation::new(&outside, false, false, None),
        ];
        let mut out = Vec::new();
        rows.write_table(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ANNOTATION_TABLE_HEADER);
        assert_eq!(lines[1], "1:150:G:A\t1\t150\t1e-7\tfalse\tfalse\t1\t50");
        assert_eq!(lines[2], "2:10:G:A\t2\t10\t0.3\tfalse\tfalse\tNA\tNA");
    }

    #[rstest]
    fn test_table_stream_writes_rows_incrementally() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/rows.tsv.gz");
        let mut out = TableStream::create(&path).unwrap();
        writeln!(out, "{}", ANNOTATION_TABLE_HEADER).unwrap();
        for pos in [10, 20] {
            let v = Variant::new("3", pos, "A", "G", 0.1, 0.05, 0.5);
            write_annotation(&mut out, &VariantAnnotation::new(&v, false, false, None)).unwrap();
        }
        out.finish().unwrap();

        let lines: Vec<String> = get_dynamic_reader(&path)
            .unwrap()
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("3:20:G:A\t3\t20\t"));
    }

    #[rstest]
    fn test_bed_export_clamps_start(locus: Locus) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loci.bed");
        vec![locus].write_bed(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "chr1\t0\t250101\tlocus_1\n");
    }

    #[rstest]
    fn test_read_locus_table_reports_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loci.tsv");
        std::fs::write(&path, format!("{}\nx\trs1\t1\t100\t1e-9\t0\t200\n", LOCUS_TABLE_HEADER)).unwrap();
        assert!(matches!(
            read_locus_table(&path),
            Err(SumstatsError::MalformedTable { line: 2, .. })
        ));
    }
}
