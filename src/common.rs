//! Functionality shared across the crate.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

use crate::algos::{obsolete::ObsoleteMap, ontology::Ontology};

/// Shared command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

/// Construct the `indicatif` style for progress bars.
///
/// # Panics
///
/// In the case when writing the ETA seconds could not be written to the progress bar.
pub fn indicatif_style() -> indicatif::ProgressStyle {
    let tpl = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] \
    {human_pos}/{human_len} ({per_sec})";
    indicatif::ProgressStyle::with_template(tpl)
        .unwrap()
        .with_key(
            "eta",
            |state: &indicatif::ProgressState, w: &mut dyn std::fmt::Write| {
                write!(w, "{:.1}s", state.eta().as_secs_f64())
                    .expect("could not write the ETA as seconds to progress bar");
            },
        )
        .progress_chars("#>-")
}

/// Construct an `indicatif` progress bar with the common style.
///
/// Also, we will enable a steady tick every 0.1s and hide in tests.
pub fn progress_bar(#[allow(unused_variables)] len: usize) -> indicatif::ProgressBar {
    #[cfg(test)]
    let pb = indicatif::ProgressBar::hidden();
    #[cfg(not(test))]
    let pb = indicatif::ProgressBar::new(len as u64).with_style(indicatif_style());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Switch `log`-based crates to debug output when running verbosely.
pub fn init_env_logger(args_common: &Args) {
    if let Some(log::Level::Trace | log::Level::Debug) = args_common.verbose.log_level() {
        std::env::set_var("RUST_LOG", "debug");
        // Ignore repeated initialisation, e.g., when running several commands in tests.
        let _ = env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("info"))
            .try_init();
    }
}

/// Open a file for buffered reading, transparently decompressing `.gz` files.
///
/// # Errors
///
/// In the case that the file cannot be opened.
pub fn open_read_maybe_gz<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>, std::io::Error> {
    let path = path.as_ref();
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        tracing::debug!("opening {} as gzip", path.display());
        Ok(Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(
            BufReader::new(file),
        ))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Load the ontology graph from `path`, logging timing and size.
///
/// # Errors
///
/// In the case of loading failure or a cyclic graph.
pub fn load_ontology<P: AsRef<Path>>(path: P) -> Result<Ontology, anyhow::Error> {
    tracing::info!("Loading ontology...");
    let before_loading = std::time::Instant::now();
    let ontology = Ontology::from_path(path.as_ref())?;
    tracing::info!("...done loading ontology in {:?}", before_loading.elapsed());
    tracing::info!(
        "Ontology with {} terms and {} is_a/part_of edges",
        ontology.len(),
        ontology.num_edges()
    );
    Ok(ontology)
}

/// Build the obsolete map from `path` if given, else use the curated table.
///
/// With `from_obo`, the `replaced_by` tags of `ontology` are added for terms not mapped yet.
///
/// # Errors
///
/// In the case that the file cannot be loaded.
pub fn load_obsolete_map(
    path: Option<&str>,
    from_obo: bool,
    ontology: &Ontology,
) -> Result<ObsoleteMap, anyhow::Error> {
    let map = match path {
        Some(path) => {
            tracing::info!("Loading obsolete map from {}", path);
            ObsoleteMap::from_path(path)?
        }
        None => ObsoleteMap::curated(),
    };
    let map = if from_obo {
        map.with_replaced_by(ontology)
    } else {
        map
    };
    tracing::info!("Obsolete map with {} entries", map.len());
    Ok(map)
}

/// The version of `goprop` package.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod test {
    use std::io::{Read, Write};

    use temp_testdir::TempDir;

    #[test]
    fn load_obsolete_map_variants() -> Result<(), anyhow::Error> {
        let ontology = super::load_ontology("tests/data/go-mini.obo")?;

        let curated = super::load_obsolete_map(None, false, &ontology)?;
        assert_eq!(curated.len(), 29);
        let from_file =
            super::load_obsolete_map(Some("tests/data/obsolete.tsv"), false, &ontology)?;
        assert_eq!(from_file.resolve("GO:0000000"), "GO:0008150");
        let with_obo = super::load_obsolete_map(None, true, &ontology)?;
        assert_eq!(with_obo.resolve("GO:0090001"), "GO:0005634");

        Ok(())
    }

    #[test]
    fn open_plain_and_gz() -> Result<(), anyhow::Error> {
        let tmp_dir = TempDir::default();
        let plain = tmp_dir.join("x.txt");
        let gz = tmp_dir.join("x.txt.gz");

        std::fs::write(&plain, "hello\n")?;
        let mut encoder =
            flate2::write::GzEncoder::new(std::fs::File::create(&gz)?, flate2::Compression::fast());
        encoder.write_all(b"hello\n")?;
        encoder.finish()?;

        for path in [plain, gz] {
            let mut text = String::new();
            super::open_read_maybe_gz(&path)?.read_to_string(&mut text)?;
            assert_eq!(text, "hello\n");
        }

        Ok(())
    }
}
