//! Propagation of GO annotations to the full ancestor closure.

use std::{io::Write, time::Instant};

use clap::Parser;

use crate::{
    algos::{partition::Partitions, propagator::Propagator},
    io::gaf::{GafFilter, InputFormat, ReadStats},
};

/// Command line arguments for `propagate` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Propagate annotations to ancestor terms", long_about = None)]
pub struct Args {
    /// Path to the ontology, OBO or `.tsv` edge list, optionally gzip-compressed.
    #[arg(long, required = true)]
    pub path_obo: String,
    /// Path to the annotation file, optionally gzip-compressed.
    #[arg(long, required = true)]
    pub path_annotations: String,
    /// Format of the annotation file.
    #[arg(long, default_value_t = InputFormat::default())]
    pub input_format: InputFormat,

    /// Value of the GAF `DB` column to keep.
    #[arg(long, default_value = "UniProtKB")]
    pub db: String,
    /// Keep GAF records of any `DB`.
    #[arg(long, default_value_t = false)]
    pub any_db: bool,
    /// Accepted evidence codes, defaults to experimental and statement codes.
    #[arg(long, value_delimiter = ',')]
    pub evidence_codes: Vec<String>,
    /// Also accept high throughput evidence codes.
    #[arg(long, default_value_t = false)]
    pub high_throughput: bool,

    /// Path to TSV file with `obsolete<TAB>replacement` pairs, replaces the built-in table.
    #[arg(long)]
    pub path_obsolete_map: Option<String>,
    /// Add `replaced_by` tags of obsolete OBO terms to the obsolete map.
    #[arg(long, default_value_t = false)]
    pub obsolete_from_obo: bool,

    /// Path to the output TSV file.
    #[arg(long, required = true)]
    pub path_out_tsv: String,
    /// Optional path to the JSON run report.
    #[arg(long)]
    pub path_out_report: Option<String>,

    /// Number of threads to use for propagation (default is 1 thread per core).
    #[arg(long)]
    pub num_threads: Option<usize>,
}

impl Args {
    /// The GAF row filter described by the arguments.
    pub fn gaf_filter(&self) -> GafFilter {
        let mut filter = GafFilter::default();
        if self.any_db {
            filter.db = None;
        } else {
            filter.db = Some(self.db.clone());
        }
        if !self.evidence_codes.is_empty() {
            filter.evidence_codes = self.evidence_codes.iter().cloned().collect();
        }
        if self.high_throughput {
            filter = filter.with_high_throughput();
        }
        filter
    }
}

/// Report written with `--path-out-report`.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Version of the `goprop` package.
    pub version: String,
    /// Counts from reading the annotation file.
    pub input: ReadStats,
    /// Counts from propagation.
    pub propagation: crate::algos::propagator::Report,
    /// Rows written to the output table.
    pub rows_written: usize,
}

/// Run the pipeline and return the report.
///
/// # Errors
///
/// In the case that an input cannot be loaded, the ontology is cyclic, or the output
/// cannot be written.
pub fn run_propagation(args: &Args) -> Result<RunReport, anyhow::Error> {
    let ontology = crate::common::load_ontology(&args.path_obo)?;
    let obsolete = crate::common::load_obsolete_map(
        args.path_obsolete_map.as_deref(),
        args.obsolete_from_obo,
        &ontology,
    )?;

    tracing::info!("Loading annotations...");
    let before_annotations = Instant::now();
    let (records, input) = crate::io::gaf::read_path(
        &args.path_annotations,
        args.input_format,
        &args.gaf_filter(),
    )?;
    tracing::info!(
        "...done loading {} annotation records in {:?}",
        records.len(),
        before_annotations.elapsed()
    );
    tracing::debug!("input counts = {:?}", &input);

    tracing::info!("Propagating annotations...");
    let before_propagation = Instant::now();
    let partitions = Partitions::new(records);
    let (entries, propagation) = Propagator::new(&obsolete).run(&ontology, &partitions);
    tracing::info!(
        "...done propagating {} entries in {:?}",
        entries.len(),
        before_propagation.elapsed()
    );
    if !propagation.unresolved_terms.is_empty() {
        tracing::warn!(
            "{} terms are neither in the ontology nor in the obsolete map",
            propagation.unresolved_terms.len()
        );
    }

    tracing::info!("Writing {}...", &args.path_out_tsv);
    let rows_written = crate::io::terms::write_path(&args.path_out_tsv, &entries)?;
    tracing::info!("...done writing {} rows", rows_written);

    Ok(RunReport {
        version: crate::common::VERSION.to_string(),
        input,
        propagation,
        rows_written,
    })
}

/// Main entry point for `propagate` sub command.
///
/// # Errors
///
/// In the case of pipeline failure.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    crate::common::init_env_logger(args_common);
    if let Some(num_threads) = args.num_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()?;
    }

    let report = run_propagation(args)?;

    if let Some(path_out_report) = args.path_out_report.as_ref() {
        tracing::info!("Writing report to {}", path_out_report);
        let mut writer = std::io::BufWriter::new(std::fs::File::create(path_out_report)?);
        serde_json::to_writer_pretty(&mut writer, &report)?;
        writer.flush()?;
    }

    tracing::info!("All done. Have a nice day!");
    Ok(())
}
