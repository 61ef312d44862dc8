//! Streaming reader for GWAS summary statistics.
//!
//! Column names differ between consortia (`BETA`/`Effect`, `SE`/`StdErr`,
//! `P`/`P-value`, ...). The reader first looks for the name configured in the
//! [`ColumnMap`], then falls back to a table of common spellings, matching
//! case-insensitively. Rows are parsed lazily, so arbitrarily large files can be
//! streamed with constant memory.

use std::io::{self, BufRead, BufReader, Lines, Read};
use std::path::Path;

use gwloc_core::config::ColumnMap;
use gwloc_core::errors::{DropReason, VariantError};
use gwloc_core::models::{GenomicInterval, Variant};
use gwloc_core::models::variant::default_variant_id;
use gwloc_core::utils::{effective_sample_size, get_dynamic_reader, normalize_chrom};

use crate::error::{Result, SumstatsError};

const ID_ALIASES: &[&str] = &["SNP", "ID", "RSID", "RS_ID", "SNPID", "MARKERNAME", "VARIANT_ID"];
const CHROM_ALIASES: &[&str] = &["CHR", "CHROM", "CHROMOSOME", "#CHROM", "CHRX"];
const POS_ALIASES: &[&str] = &["POS", "BP", "POSITION", "BASE_PAIR_LOCATION", "GENPOS"];
const EA_ALIASES: &[&str] = &["EA", "A1", "ALT", "ALLELE1", "EFFECT_ALLELE", "TESTED_ALLELE"];
const OA_ALIASES: &[&str] = &["OA", "A2", "REF", "ALLELE2", "OTHER_ALLELE", "NON_EFFECT_ALLELE"];
const BETA_ALIASES: &[&str] = &["BETA", "EFFECT", "B", "LOG_ODDS", "EFFECT_SIZE"];
const SE_ALIASES: &[&str] = &["SE", "STDERR", "STANDARD_ERROR", "SEBETA", "SE_BETA"];
const P_ALIASES: &[&str] = &["P", "PVAL", "P-VALUE", "P_VALUE", "P.VALUE", "PVALUE"];
const EAF_ALIASES: &[&str] = &["EAF", "FRQ", "FREQ", "FREQ1", "AF", "A1FREQ", "EFFECT_ALLELE_FREQUENCY"];
const N_ALIASES: &[&str] = &["N", "NEFF", "N_EFF", "OBS_CT", "TOTALSAMPLESIZE"];
const N_CASES_ALIASES: &[&str] = &["N_CASES", "NCASE", "N_CAS", "NCASES"];
const N_CONTROLS_ALIASES: &[&str] = &["N_CONTROLS", "NCONTROL", "N_CON", "NCONTROLS"];

/// Field separator, sniffed from the header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Tab,
    Comma,
    Whitespace,
}

impl Delimiter {
    pub fn detect(header: &str) -> Self {
        if header.contains('\t') {
            Delimiter::Tab
        } else if header.contains(',') {
            Delimiter::Comma
        } else {
            Delimiter::Whitespace
        }
    }

    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Tab => line.split('\t').map(str::trim).collect(),
            Delimiter::Comma => line.split(',').map(str::trim).collect(),
            Delimiter::Whitespace => line.split_whitespace().collect(),
        }
    }
}

///
/// Header positions of every column the reader knows about.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    pub variant_id: Option<usize>,
    pub chrom: usize,
    pub pos: usize,
    pub effect_allele: usize,
    pub other_allele: usize,
    pub beta: usize,
    pub se: usize,
    pub pval: usize,
    pub eaf: Option<usize>,
    pub n: Option<usize>,
    pub n_cases: Option<usize>,
    pub n_controls: Option<usize>,
    pub n_fields: usize,
}

fn find_column(header: &[&str], configured: &str, aliases: &[&str]) -> Option<usize> {
    if let Some(i) = header.iter().position(|h| *h == configured) {
        return Some(i);
    }
    if let Some(i) = header.iter().position(|h| h.eq_ignore_ascii_case(configured)) {
        return Some(i);
    }
    aliases
        .iter()
        .find_map(|alias| header.iter().position(|h| h.eq_ignore_ascii_case(alias)))
}

impl ColumnIndex {
    ///
    /// Resolve a header against a column map.
    ///
    /// Fails with [`SumstatsError::MissingColumn`] when a required column has no match.
    ///
    pub fn resolve(header: &[&str], columns: &ColumnMap) -> Result<Self> {
        let required = |field: &'static str, configured: &str, aliases: &[&str]| {
            find_column(header, configured, aliases).ok_or_else(|| SumstatsError::MissingColumn {
                field,
                expected: configured.to_string(),
                header: header.join(","),
            })
        };

        Ok(ColumnIndex {
            variant_id: find_column(header, &columns.variant_id, ID_ALIASES),
            chrom: required("chrom", &columns.chrom, CHROM_ALIASES)?,
            pos: required("pos", &columns.pos, POS_ALIASES)?,
            effect_allele: required("effect_allele", &columns.effect_allele, EA_ALIASES)?,
            other_allele: required("other_allele", &columns.other_allele, OA_ALIASES)?,
            beta: required("beta", &columns.beta, BETA_ALIASES)?,
            se: required("se", &columns.se, SE_ALIASES)?,
            pval: required("pval", &columns.pval, P_ALIASES)?,
            eaf: find_column(header, &columns.eaf, EAF_ALIASES),
            n: find_column(header, &columns.n, N_ALIASES),
            n_cases: find_column(header, &columns.n_cases, N_CASES_ALIASES),
            n_controls: find_column(header, &columns.n_controls, N_CONTROLS_ALIASES),
            n_fields: header.len(),
        })
    }

    fn max_required(&self) -> usize {
        [
            self.chrom,
            self.pos,
            self.effect_allele,
            self.other_allele,
            self.beta,
            self.se,
            self.pval,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Missing markers (`NA`, `.`, empty) and unparsable values become NaN.
fn parse_float(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn is_missing(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v == "." || v.eq_ignore_ascii_case("NA")
}

fn parse_optional(fields: &[&str], idx: Option<usize>) -> Option<f64> {
    idx.and_then(|i| fields.get(i))
        .map(|v| parse_float(v))
        .filter(|v| v.is_finite())
}

///
/// Streaming iterator over the rows of a summary-statistics table.
///
/// Yields `Ok(Variant)` for usable rows, `Err(SumstatsError::Dropped)` for rows
/// that fail validation, and any other error when the input itself is broken.
///
pub struct SumstatsReader<R: BufRead> {
    lines: Lines<R>,
    columns: ColumnIndex,
    delimiter: Delimiter,
    line_no: usize,
    seen_data: bool,
    region: Option<GenomicInterval>,
}

impl SumstatsReader<BufReader<Box<dyn Read>>> {
    ///
    /// Open a (possibly gzipped) summary-statistics file.
    ///
    pub fn from_path<P: AsRef<Path>>(path: P, columns: &ColumnMap) -> Result<Self> {
        let path = path.as_ref();
        let reader = get_dynamic_reader(path)
            .map_err(|e| SumstatsError::Io(io::Error::other(format!("{:#}", e))))?;
        SumstatsReader::new(reader, columns, &path.display().to_string())
    }
}

impl<R: BufRead> SumstatsReader<R> {
    pub fn new(reader: R, columns: &ColumnMap, label: &str) -> Result<Self> {
        let mut lines = reader.lines();
        let mut line_no = 0;

        let header = loop {
            match lines.next() {
                Some(line) => {
                    line_no += 1;
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Err(SumstatsError::EmptyInput(label.to_string())),
            }
        };

        let header = header.trim_start_matches('#').trim_end();
        let delimiter = Delimiter::detect(header);
        let fields = delimiter.split(header);
        let columns = ColumnIndex::resolve(&fields, columns)?;

        Ok(SumstatsReader {
            lines,
            columns,
            delimiter,
            line_no,
            seen_data: false,
            region: None,
        })
    }

    ///
    /// Only yield rows inside `region`. Rows elsewhere are skipped before their
    /// numeric columns are parsed, and rows whose position cannot be read are
    /// skipped too, since they cannot be placed.
    ///
    pub fn with_region(mut self, region: GenomicInterval) -> Self {
        self.region = Some(region);
        self
    }

    pub fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    fn malformed(&self, detail: String) -> SumstatsError {
        SumstatsError::Dropped(VariantError::new(
            format!("line {}", self.line_no),
            DropReason::MalformedRow,
            detail,
        ))
    }

    fn column_type(&self, column: &str, value: &str) -> SumstatsError {
        SumstatsError::ColumnType {
            column: column.to_string(),
            value: value.to_string(),
            line: self.line_no,
        }
    }

    /// `None` means the row is outside the region filter.
    ///
    /// The first complete data row is checked for column types: text in a
    /// numeric required column there means the column map is wrong, so it
    /// ends the run instead of dropping every row.
    fn parse_row(&mut self, line: &str) -> Option<Result<Variant>> {
        let fields = self.delimiter.split(line);
        if fields.len() <= self.columns.max_required() {
            if self.region.is_some() {
                return None;
            }
            return Some(Err(self.malformed(format!(
                "expected {} fields, found {}",
                self.columns.n_fields,
                fields.len()
            ))));
        }

        let first_row = !self.seen_data;
        self.seen_data = true;
        let cols = &self.columns;

        if first_row {
            for (column, idx) in [("beta", cols.beta), ("se", cols.se), ("pval", cols.pval)] {
                let value = fields[idx];
                if !is_missing(value) && value.trim().parse::<f64>().is_err() {
                    return Some(Err(self.column_type(column, value)));
                }
            }
        }

        let chr = normalize_chrom(fields[cols.chrom]);
        let pos = match fields[cols.pos].parse::<u64>() {
            Ok(pos) => pos,
            Err(_) if first_row => {
                return Some(Err(self.column_type("pos", fields[cols.pos])));
            }
            Err(_) => {
                if self.region.is_some() {
                    return None;
                }
                return Some(Err(
                    self.malformed(format!("bad position `{}`", fields[cols.pos]))
                ));
            }
        };

        if let Some(region) = &self.region {
            if !region.contains(&chr, pos) {
                return None;
            }
        }

        if chr.is_empty() {
            return Some(Err(self.malformed("empty chromosome".to_string())));
        }

        let effect_allele = fields[cols.effect_allele].to_ascii_uppercase();
        let other_allele = fields[cols.other_allele].to_ascii_uppercase();
        let id = cols
            .variant_id
            .and_then(|i| fields.get(i))
            .filter(|id| !id.is_empty() && **id != "." && !id.eq_ignore_ascii_case("NA"))
            .map(|id| id.to_string())
            .unwrap_or_else(|| default_variant_id(&chr, pos, &other_allele, &effect_allele));

        let cases = parse_optional(&fields, cols.n_cases);
        let controls = parse_optional(&fields, cols.n_controls);
        let n_eff = match (cases, controls) {
            (Some(cases), Some(controls)) => effective_sample_size(cases, controls),
            _ => parse_optional(&fields, cols.n).filter(|n| *n > 0.0),
        };

        let variant = Variant {
            id,
            chr,
            pos,
            effect_allele,
            other_allele,
            beta: parse_float(fields[cols.beta]),
            se: parse_float(fields[cols.se]),
            pval: parse_float(fields[cols.pval]),
            eaf: parse_optional(&fields, cols.eaf),
            n_eff,
        };

        Some(match variant.validate() {
            Ok(()) => Ok(variant),
            Err(e) => Err(SumstatsError::Dropped(e)),
        })
    }
}

impl<R: BufRead> Iterator for SumstatsReader<R> {
    type Item = Result<Variant>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(SumstatsError::Io(e))),
            };
            self.line_no += 1;

            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(item) = self.parse_row(&line) {
                return Some(item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Cursor;

    fn reader(text: &str) -> Result<SumstatsReader<Cursor<Vec<u8>>>> {
        SumstatsReader::new(
            Cursor::new(text.as_bytes().to_vec()),
            &ColumnMap::default(),
            "test",
        )
    }

    #[rstest]
    fn test_reads_default_columns() {
        let text = "CHR\tPOS\tSNP\tEA\tOA\tBETA\tSE\tP\tEAF\tN\n\
                    chr1\t100\trs1\ta\tg\t0.5\t0.1\t1e-9\t0.3\t1000\n";
        let rows: Vec<Variant> = reader(text).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        let v = &rows[0];
        assert_eq!(v.id, "rs1");
        assert_eq!(v.chr, "1");
        assert_eq!(v.pos, 100);
        assert_eq!(v.effect_allele, "A");
        assert_eq!(v.eaf, Some(0.3));
        assert_eq!(v.n_eff, Some(1000.0));
    }

    #[rstest]
    fn test_consortium_aliases_and_commas() {
        let text = "chromosome,base_pair_location,Allele1,Allele2,Effect,StdErr,P-value\n\
                    2,5000,T,C,-0.2,0.05,3e-5\n";
        let r = reader(text).unwrap();
        assert_eq!(r.delimiter(), Delimiter::Comma);
        let rows: Vec<Variant> = r.map(|r| r.unwrap()).collect();
        assert_eq!(rows[0].id, "2:5000:C:T");
        assert_eq!(rows[0].beta, -0.2);
        assert_eq!(rows[0].n_eff, None);
    }

    #[rstest]
    fn test_case_control_effective_size() {
        let text = "CHR POS EA OA BETA SE P N_CASES N_CONTROLS N\n\
                    1 10 A G 0.1 0.1 0.5 1000 1000 99\n";
        let rows: Vec<Variant> = reader(text).unwrap().map(|r| r.unwrap()).collect();
        assert!((rows[0].n_eff.unwrap() - 2000.0).abs() < 1e-9);
    }

    #[rstest]
    fn test_missing_column_is_fatal() {
        let text = "CHR\tPOS\tEA\tOA\tBETA\tP\n1\t1\tA\tG\t0.1\t0.1\n";
        match reader(text) {
            Err(SumstatsError::MissingColumn { field, .. }) => assert_eq!(field, "se"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected missing column error"),
        }
    }

    #[rstest]
    fn test_configured_names_win() {
        let mut columns = ColumnMap::default();
        columns.beta = "my_beta".to_string();
        let text = "CHR\tPOS\tEA\tOA\tBETA\tmy_beta\tSE\tP\n1\t1\tA\tG\t9.0\t0.25\t0.1\t0.5\n";
        let mut r = SumstatsReader::new(Cursor::new(text.as_bytes().to_vec()), &columns, "t").unwrap();
        assert_eq!(r.next().unwrap().unwrap().beta, 0.25);
    }

    #[rstest]
    fn test_empty_input() {
        assert!(matches!(reader("\n\n"), Err(SumstatsError::EmptyInput(_))));
    }

    #[rstest]
    fn test_wrong_type_on_first_row_is_fatal() {
        let text = "CHR\tPOS\tEA\tOA\tBETA\tSE\tP\n1\tabc\tA\tG\t0.1\t0.1\t0.5\n";
        let first = reader(text).unwrap().next().unwrap();
        assert!(matches!(first, Err(SumstatsError::ColumnType { .. })));
    }

    #[rstest]
    #[case("abc\t0.1\t0.5", "beta")]
    #[case("0.1\tx\t0.5", "se")]
    #[case("0.1\t0.1\tsignificant", "pval")]
    fn test_text_in_numeric_column_is_fatal(#[case] values: &str, #[case] expected: &str) {
        let text = format!("CHR\tPOS\tEA\tOA\tBETA\tSE\tP\n1\t10\tA\tG\t{}\n", values);
        match reader(&text).unwrap().next().unwrap() {
            Err(SumstatsError::ColumnType { column, line, .. }) => {
                assert_eq!(column, expected);
                assert_eq!(line, 2);
            }
            other => panic!("expected a column type error, got {:?}", other),
        }
    }

    #[rstest]
    fn test_missing_markers_on_first_row_are_dropped() {
        let text = "CHR\tPOS\tEA\tOA\tBETA\tSE\tP\n\
                    1\t10\tA\tG\tNA\t.\t\n\
                    1\t11\tA\tG\t0.1\t0.1\t0.5\n";
        let rows: Vec<Result<Variant>> = reader(text).unwrap().collect();
        assert!(matches!(rows[0], Err(SumstatsError::Dropped(_))));
        assert!(rows[1].is_ok());
    }

    #[rstest]
    fn test_type_check_skips_truncated_first_row() {
        let text = "CHR\tPOS\tEA\tOA\tBETA\tSE\tP\n\
                    1\t10\tA\n\
                    1\t11\tA\tG\tabc\t0.1\t0.5\n";
        let rows: Vec<Result<Variant>> = reader(text).unwrap().collect();
        assert!(matches!(rows[0], Err(SumstatsError::Dropped(_))));
        assert!(matches!(rows[1], Err(SumstatsError::ColumnType { .. })));
    }

    #[rstest]
    fn test_bad_rows_are_dropped_with_reason() {
        let text = "CHR\tPOS\tEA\tOA\tBETA\tSE\tP\n\
                    1\t1\tA\tG\t0.1\t0.1\t0.5\n\
                    1\t2\tA\tG\tNA\t0.1\t0.5\n\
                    1\t3\tA\tG\t0.1\t0\t0.5\n\
                    1\tx\tA\tG\t0.1\t0.1\t0.5\n\
                    1\t5\tA\n\
                    # trailing comment\n\
                    1\t6\tA\tG\t0.1\t0.1\t7\n";
        let reasons: Vec<Option<DropReason>> = reader(text)
            .unwrap()
            .map(|r| match r {
                Ok(_) => None,
                Err(SumstatsError::Dropped(e)) => Some(e.reason),
                Err(e) => panic!("unexpected fatal error: {}", e),
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                None,
                Some(DropReason::NonFiniteBeta),
                Some(DropReason::NonPositiveSe),
                Some(DropReason::MalformedRow),
                Some(DropReason::MalformedRow),
                Some(DropReason::InvalidPValue),
            ]
        );
    }

    #[rstest]
    fn test_region_filter() {
        let text = "CHR\tPOS\tEA\tOA\tBETA\tSE\tP\n\
                    1\t100\tA\tG\t0.1\t0.1\t0.5\n\
                    1\t200\tA\tG\t0.1\t0.1\t0.5\n\
                    1\tx\tA\tG\t0.1\t0.1\t0.5\n\
                    2\t150\tA\tG\t0.1\t0.1\t0.5\n\
                    1\t300\tA\tG\tNA\t0.1\t0.5\n";
        let r = reader(text)
            .unwrap()
            .with_region(GenomicInterval::new("chr1", 150, 250));
        let rows: Vec<Variant> = r.map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pos, 200);
    }
}
