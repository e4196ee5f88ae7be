//! Lookup of the ancestor closure of individual terms on the command line.

use clap::Parser;

use crate::algos::{closure::AncestorCache, obsolete::ObsoleteMap};

/// Command line arguments for `ancestors` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Print ancestors of ontology terms", long_about = None)]
pub struct Args {
    /// Path to the ontology, OBO or `.tsv` edge list, optionally gzip-compressed.
    #[arg(long, required = true)]
    pub path_obo: String,
    /// Path to TSV file with `obsolete<TAB>replacement` pairs, replaces the built-in table.
    #[arg(long)]
    pub path_obsolete_map: Option<String>,
    /// Add `replaced_by` tags of obsolete OBO terms to the obsolete map.
    #[arg(long, default_value_t = false)]
    pub obsolete_from_obo: bool,

    /// The term(s) to look up.
    #[arg(long = "term", required = true)]
    pub terms: Vec<String>,
}

/// Ancestor closure of one queried term.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TermAncestors {
    /// The term as given.
    pub term: String,
    /// The term after obsolete substitution.
    pub resolved: String,
    /// Whether the resolved term is missing from the ontology.
    pub orphan: bool,
    /// Sorted strict ancestors of the resolved term.
    pub ancestors: Vec<String>,
}

/// Look up the ancestors of each of `terms`.
pub fn lookup(
    cache: &mut AncestorCache,
    obsolete: &ObsoleteMap,
    terms: &[String],
) -> Vec<TermAncestors> {
    terms
        .iter()
        .map(|term| {
            let resolved = obsolete.resolve(term);
            if resolved != term.as_str() {
                tracing::info!("{} is obsolete, using {}", term, resolved);
            }
            TermAncestors {
                term: term.clone(),
                resolved: resolved.to_string(),
                orphan: !cache.ontology().contains(resolved),
                ancestors: cache
                    .ancestor_terms(resolved)
                    .into_iter()
                    .map(String::from)
                    .collect(),
            }
        })
        .collect()
}

/// Main entry point for `ancestors` sub command.
///
/// # Errors
///
/// In the case that the ontology or obsolete map cannot be loaded.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    crate::common::init_env_logger(args_common);

    let ontology = crate::common::load_ontology(&args.path_obo)?;
    let obsolete = crate::common::load_obsolete_map(
        args.path_obsolete_map.as_deref(),
        args.obsolete_from_obo,
        &ontology,
    )?;

    let mut cache = AncestorCache::new(&ontology);
    let result = lookup(&mut cache, &obsolete, &args.terms);
    for entry in result.iter().filter(|entry| entry.orphan) {
        tracing::warn!("{}", crate::Error::UnresolvedTerm(entry.resolved.clone()));
    }

    println!("{}", serde_json::to_string_pretty(&result)?);

    tracing::info!("All done. Have a nice day!");
    Ok(())
}
