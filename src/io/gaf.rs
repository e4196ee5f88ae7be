//! Reading of annotation records from GAF or simple TSV files.

use std::{collections::HashSet, io::Read, path::Path, str::FromStr};

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use strum::{EnumIter, IntoEnumIterator};

use crate::{algos::partition::AnnotationRecord, Error};

/// Experimental evidence codes.
pub const EXPERIMENTAL_EVIDENCE: &[&str] = &["EXP", "IPI", "IDA", "IMP", "IGI", "IEP"];
/// Author and curator statement evidence codes.
pub const STATEMENT_EVIDENCE: &[&str] = &["TAS", "IC"];
/// High throughput experimental evidence codes.
pub const HIGH_THROUGHPUT_EVIDENCE: &[&str] = &["HTP", "HDA", "HMP", "HGI", "HEP"];

/// Accepted shape of term identifiers.
static TERM_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+:[0-9]+$").expect("term regex must compile"));

/// Whether `term` looks like `PREFIX:0000000`.
pub fn is_valid_term(term: &str) -> bool {
    TERM_ID.is_match(term)
}

/// Format of the annotation input.
#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    EnumIter,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    strum::Display,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum InputFormat {
    /// Gene Association File, version 2.x.
    #[default]
    Gaf,
    /// Tab-separated with header `EntryID`, `term`, `aspect`.
    Tsv,
}

impl FromStr for InputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InputFormat::iter()
            .find(|m| m.to_string().as_str().eq(s))
            .ok_or(anyhow::anyhow!("unknown input format: {}", s))
    }
}

/// Row filter applied to GAF records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GafFilter {
    /// Required value of the `DB` column, any if `None`.
    pub db: Option<String>,
    /// Accepted evidence codes.
    pub evidence_codes: HashSet<String>,
}

impl Default for GafFilter {
    fn default() -> Self {
        Self {
            db: Some(String::from("UniProtKB")),
            evidence_codes: EXPERIMENTAL_EVIDENCE
                .iter()
                .chain(STATEMENT_EVIDENCE)
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl GafFilter {
    /// Also accept the high throughput evidence codes.
    #[must_use]
    pub fn with_high_throughput(mut self) -> Self {
        self.evidence_codes
            .extend(HIGH_THROUGHPUT_EVIDENCE.iter().map(|s| (*s).to_string()));
        self
    }
}

/// Counts collected while reading annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReadStats {
    /// Data lines seen.
    pub lines: usize,
    /// Lines with too few columns or invalid UTF-8.
    pub malformed: usize,
    /// Lines with a different `DB` value.
    pub other_db: usize,
    /// Lines with a rejected evidence code.
    pub other_evidence: usize,
    /// Lines with a `NOT` qualifier.
    pub negated: usize,
    /// Lines with a malformed term identifier.
    pub invalid_terms: usize,
    /// Repeated (gene, term, aspect) triples.
    pub duplicates: usize,
    /// Records handed on.
    pub records: usize,
}

/// Collects unique records and keeps the counts.
#[derive(Debug, Default)]
struct Collector {
    records: IndexSet<AnnotationRecord>,
    stats: ReadStats,
}

impl Collector {
    fn push(&mut self, gene_id: &str, term: &str, aspect: &str) {
        if !is_valid_term(term) {
            tracing::debug!("{}", Error::InvalidTerm(term.to_string()));
            self.stats.invalid_terms += 1;
        } else if !self
            .records
            .insert(AnnotationRecord::new(gene_id, term, aspect))
        {
            self.stats.duplicates += 1;
        }
    }

    fn finish(mut self) -> (Vec<AnnotationRecord>, ReadStats) {
        self.stats.records = self.records.len();
        if self.stats.invalid_terms > 0 {
            tracing::warn!(
                "skipped {} records with invalid term identifiers",
                self.stats.invalid_terms
            );
        }
        (self.records.into_iter().collect(), self.stats)
    }
}

/// Read a GAF 2.x file.
///
/// Comment lines start with `!`.  Rows are kept if they pass `filter` and carry no `NOT`
/// qualifier; identical (gene, term, aspect) triples are reported once.
///
/// # Errors
///
/// In the case that the input cannot be read.
pub fn read_gaf<R: Read>(
    reader: R,
    filter: &GafFilter,
) -> Result<(Vec<AnnotationRecord>, ReadStats), anyhow::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'!'))
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut collector = Collector::default();
    for record in csv_reader.byte_records() {
        let record = record?;
        collector.stats.lines += 1;
        let record = match csv::StringRecord::from_byte_record(record) {
            Ok(record) if record.len() >= 15 => record,
            Ok(_) => {
                collector.stats.malformed += 1;
                continue;
            }
            Err(e) => {
                tracing::debug!("skipping GAF line that is not valid UTF-8: {}", e);
                collector.stats.malformed += 1;
                continue;
            }
        };

        let (db, gene_id, qualifier, term, evidence, aspect) = (
            &record[0],
            &record[1],
            &record[3],
            &record[4],
            &record[6],
            &record[8],
        );
        if filter.db.as_deref().is_some_and(|expected| expected != db) {
            collector.stats.other_db += 1;
        } else if !filter.evidence_codes.contains(evidence) {
            collector.stats.other_evidence += 1;
        } else if qualifier.split('|').any(|q| q.eq_ignore_ascii_case("NOT")) {
            collector.stats.negated += 1;
        } else {
            collector.push(gene_id, term, aspect);
        }
    }

    if collector.stats.malformed > 0 {
        tracing::warn!(
            "skipped {} GAF lines with fewer than 15 columns or invalid UTF-8",
            collector.stats.malformed
        );
    }
    Ok(collector.finish())
}

/// Record of the simple TSV format.
#[derive(Debug, serde::Deserialize)]
struct TsvRecord {
    #[serde(rename = "EntryID")]
    entry_id: String,
    term: String,
    aspect: String,
}

/// Read the simple TSV format with header `EntryID`, `term`, `aspect`.
///
/// # Errors
///
/// In the case that the input cannot be read or lacks a column.
pub fn read_tsv<R: Read>(reader: R) -> Result<(Vec<AnnotationRecord>, ReadStats), anyhow::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader);

    let mut collector = Collector::default();
    for record in csv_reader.deserialize() {
        let record: TsvRecord = record?;
        collector.stats.lines += 1;
        collector.push(&record.entry_id, &record.term, &record.aspect);
    }
    Ok(collector.finish())
}

/// Read annotations from `path` in the given `format`; `.gz` files are decompressed.
///
/// # Errors
///
/// In the case that the file cannot be opened or read.
pub fn read_path<P: AsRef<Path>>(
    path: P,
    format: InputFormat,
    filter: &GafFilter,
) -> Result<(Vec<AnnotationRecord>, ReadStats), anyhow::Error> {
    let path = path.as_ref();
    let reader = crate::common::open_read_maybe_gz(path)
        .map_err(|e| anyhow::anyhow!("could not open {}: {}", path.display(), e))?;
    match format {
        InputFormat::Gaf => read_gaf(reader, filter),
        InputFormat::Tsv => read_tsv(reader),
    }
}

#[cfg(test)]
mod test {
    use super::{read_gaf, read_tsv, GafFilter, InputFormat};
    use crate::algos::partition::AnnotationRecord;

    const GAF: &str = "!gaf-version: 2.2
UniProtKB\tP1\tG1\tenables\tGO:0000001\tPMID:1\tIDA\t\tF\tname\t\tprotein\ttaxon:9606\t20200101\tUniProt
UniProtKB\tP1\tG1\tenables\tGO:0000001\tPMID:2\tIDA\t\tF\tname\t\tprotein\ttaxon:9606\t20200101\tUniProt
UniProtKB\tP1\tG1\tNOT|enables\tGO:0000002\tPMID:1\tIDA\t\tF\tname\t\tprotein\ttaxon:9606\t20200101\tUniProt
UniProtKB\tP2\tG2\tinvolved_in\tGO:0000003\tPMID:1\tIEA\t\tP\tname\t\tprotein\ttaxon:9606\t20200101\tUniProt
UniProtKB\tP2\tG2\tinvolved_in\tGO:0000004\tPMID:1\tHDA\t\tP\tname\t\tprotein\ttaxon:9606\t20200101\tUniProt
ComplexPortal\tC1\tC1\tpart_of\tGO:0000005\tPMID:1\tIDA\t\tC\tname\t\tcomplex\ttaxon:9606\t20200101\tCP
UniProtKB\tP3\tG3\tlocated_in\tbogus\tPMID:1\tIDA\t\tC\tname\t\tprotein\ttaxon:9606\t20200101\tUniProt
UniProtKB\tP3\tshort line
";

    #[test]
    fn gaf_default_filter() -> Result<(), anyhow::Error> {
        let (records, stats) = read_gaf(GAF.as_bytes(), &GafFilter::default())?;

        assert_eq!(records, vec![AnnotationRecord::new("P1", "GO:0000001", "F")]);
        assert_eq!(stats.lines, 8);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.negated, 1);
        assert_eq!(stats.other_evidence, 2);
        assert_eq!(stats.other_db, 1);
        assert_eq!(stats.invalid_terms, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.records, 1);

        Ok(())
    }

    #[test]
    fn gaf_invalid_utf8_line_is_skipped() -> Result<(), anyhow::Error> {
        let mut bytes = GAF.as_bytes().to_vec();
        bytes.extend_from_slice(
            b"UniProtKB\tP4\tG\xff4\tenables\tGO:0000006\tPMID:1\tIDA\t\tF\tname\t\t\
            protein\ttaxon:9606\t20200101\tUniProt\n",
        );

        let (records, stats) = read_gaf(bytes.as_slice(), &GafFilter::default())?;

        assert_eq!(records, vec![AnnotationRecord::new("P1", "GO:0000001", "F")]);
        assert_eq!(stats.lines, 9);
        assert_eq!(stats.malformed, 2);

        Ok(())
    }

    #[test]
    fn gaf_high_throughput_any_db() -> Result<(), anyhow::Error> {
        let filter = GafFilter {
            db: None,
            ..GafFilter::default().with_high_throughput()
        };
        let (records, _) = read_gaf(GAF.as_bytes(), &filter)?;

        assert_eq!(
            records,
            vec![
                AnnotationRecord::new("P1", "GO:0000001", "F"),
                AnnotationRecord::new("P2", "GO:0000004", "P"),
                AnnotationRecord::new("C1", "GO:0000005", "C"),
            ]
        );

        Ok(())
    }

    #[test]
    fn tsv_records() -> Result<(), anyhow::Error> {
        let text = "EntryID\tterm\taspect\nP1\tGO:0000001\tBPO\nP1\tGO:0000001\tBPO\nP2\tGO:1\tZ\n";
        let (records, stats) = read_tsv(text.as_bytes())?;

        assert_eq!(
            records,
            vec![
                AnnotationRecord::new("P1", "GO:0000001", "BPO"),
                AnnotationRecord::new("P2", "GO:1", "Z"),
            ]
        );
        assert_eq!(stats.duplicates, 1);

        Ok(())
    }

    #[test]
    fn input_format_from_str() -> Result<(), anyhow::Error> {
        assert_eq!("gaf".parse::<InputFormat>()?, InputFormat::Gaf);
        assert_eq!("tsv".parse::<InputFormat>()?, InputFormat::Tsv);
        assert!("xml".parse::<InputFormat>().is_err());
        Ok(())
    }
}
