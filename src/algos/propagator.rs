//! Propagation of per-gene annotations to the ancestor closure.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::{IndexMap, IndexSet};
use indicatif::ParallelProgressIterator;
use itertools::Itertools;
use rayon::prelude::*;

use crate::{
    algos::{
        closure::AncestorCache,
        obsolete::ObsoleteMap,
        ontology::Ontology,
        partition::{Aspect, Partitions},
    },
    Error,
};

/// Propagated term set of one gene in one aspect.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PropagatedEntry {
    /// The gene identifier.
    pub gene_id: String,
    /// The aspect the terms belong to.
    pub aspect: Aspect,
    /// Direct terms and all their ancestors, sorted lexicographically.
    pub terms: Vec<String>,
}

impl PropagatedEntry {
    /// Flatten into `(gene, aspect label, term)` rows.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &'static str, &str)> {
        let label = self.aspect.label();
        self.terms
            .iter()
            .map(move |term| (self.gene_id.as_str(), label, term.as_str()))
    }
}

/// Counts for one aspect of a propagation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AspectReport {
    /// Annotations in the partition.
    pub annotations: usize,
    /// Distinct genes in the partition.
    pub genes: usize,
    /// Genes with an emitted entry.
    pub genes_emitted: usize,
    /// Genes whose terms were all orphaned; nothing is emitted for them.
    pub genes_all_orphaned: usize,
    /// Total number of (gene, term) rows emitted.
    pub rows: usize,
}

/// Summary of a propagation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Report {
    /// Records dropped because of an unknown aspect.
    pub unknown_aspect_records: usize,
    /// Distinct obsolete terms that were rewritten.
    pub obsolete_replaced: usize,
    /// Distinct terms that are neither in the graph nor in the obsolete map.
    pub unresolved_terms: Vec<String>,
    /// Number of ancestor traversals performed.
    pub ancestor_traversals: usize,
    /// Per-aspect counts, keyed by aspect label.
    pub aspects: IndexMap<String, AspectReport>,
}

/// Propagation engine applying a fixed obsolete map.
///
/// The ontology is taken from the [`AncestorCache`] a run works on.
#[derive(Debug, Clone, Copy)]
pub struct Propagator<'a> {
    obsolete: &'a ObsoleteMap,
}

impl<'a> Propagator<'a> {
    /// Construct a new propagator.
    pub fn new(obsolete: &'a ObsoleteMap) -> Self {
        Self { obsolete }
    }

    /// Propagate all partitions over `ontology` with a fresh ancestor cache.
    ///
    /// Entries are ordered by aspect, then gene.
    pub fn run(
        &self,
        ontology: &Ontology,
        partitions: &Partitions,
    ) -> (Vec<PropagatedEntry>, Report) {
        let mut cache = AncestorCache::new(ontology);
        self.run_with_cache(partitions, &mut cache)
    }

    /// Propagate all partitions over the ontology of `cache`, reusing and extending it.
    pub fn run_with_cache(
        &self,
        partitions: &Partitions,
        cache: &mut AncestorCache,
    ) -> (Vec<PropagatedEntry>, Report) {
        let ontology = cache.ontology();
        let mut report = Report {
            unknown_aspect_records: partitions.num_unknown_aspect(),
            ..Default::default()
        };

        // Resolve every observed term once and warm the cache for all of them.
        let observed = partitions
            .iter()
            .flat_map(|(_, annotations)| annotations.iter().map(|a| a.term.as_str()))
            .collect::<BTreeSet<_>>();
        report.obsolete_replaced = observed
            .iter()
            .filter(|term| self.obsolete.is_obsolete(term))
            .count();
        let resolved = observed
            .iter()
            .map(|term| self.obsolete.resolve(term))
            .collect::<BTreeSet<_>>();
        report.unresolved_terms = resolved
            .iter()
            .filter(|term| !ontology.contains(term))
            .map(|term| (*term).to_string())
            .collect();
        for term in &report.unresolved_terms {
            tracing::warn!("{}", Error::UnresolvedTerm(term.clone()));
        }

        let traversals_before = cache.num_traversals();
        cache.populate(resolved.iter().copied());
        report.ancestor_traversals = cache.num_traversals() - traversals_before;
        let cache: &AncestorCache = cache;

        let mut entries = Vec::new();
        for (aspect, annotations) in partitions.iter() {
            let by_gene = self
                .group_by_gene(annotations)
                .into_iter()
                .map(|(gene_id, terms)| (gene_id, terms.into_iter().collect::<Vec<_>>()))
                .collect::<Vec<_>>();
            let mut aspect_report = AspectReport {
                annotations: annotations.len(),
                genes: by_gene.len(),
                ..Default::default()
            };

            let propagated = by_gene
                .into_par_iter()
                .progress_with(crate::common::progress_bar(aspect_report.genes))
                .map(|(gene_id, terms)| (gene_id, propagate_gene(cache, &terms)))
                .collect::<Vec<_>>();

            for (gene_id, terms) in propagated {
                if terms.is_empty() {
                    tracing::debug!(
                        "gene {} has only orphaned {} terms, nothing emitted",
                        gene_id,
                        aspect
                    );
                    aspect_report.genes_all_orphaned += 1;
                    continue;
                }
                aspect_report.genes_emitted += 1;
                aspect_report.rows += terms.len();
                entries.push(PropagatedEntry {
                    gene_id: gene_id.to_string(),
                    aspect,
                    terms: terms
                        .into_iter()
                        .map(|idx| ontology.term(idx).to_string())
                        .sorted_unstable()
                        .collect(),
                });
            }

            tracing::info!(
                "{}: {} annotations of {} genes, {} genes propagated to {} rows, {} genes \
                dropped with only orphaned terms",
                aspect,
                aspect_report.annotations,
                aspect_report.genes,
                aspect_report.genes_emitted,
                aspect_report.rows,
                aspect_report.genes_all_orphaned
            );
            report
                .aspects
                .insert(aspect.label().to_string(), aspect_report);
        }

        (entries, report)
    }

    /// Map each gene to its distinct resolved direct terms in first-seen order, in a single
    /// pass.
    fn group_by_gene<'p>(
        &self,
        annotations: &'p [crate::algos::partition::Annotation],
    ) -> BTreeMap<&'p str, IndexSet<&'p str>>
    where
        'a: 'p,
    {
        let mut result: BTreeMap<&str, IndexSet<&str>> = BTreeMap::new();
        for annotation in annotations {
            result
                .entry(annotation.gene_id.as_str())
                .or_default()
                .insert(self.obsolete.resolve(&annotation.term));
        }
        result
    }
}

/// Union of the resolved `terms` of one gene with their cached ancestors.
///
/// Orphaned terms are not graph members and have no ancestors, so they drop out; an
/// empty result means the gene had only orphaned terms.
fn propagate_gene(cache: &AncestorCache, terms: &[&str]) -> BTreeSet<usize> {
    let ontology = cache.ontology();
    let ancestors_of = |term: &str| cache.get(term).unwrap_or_default();

    if let [term] = terms {
        return match ontology.index_of(term) {
            Some(idx) => std::iter::once(idx)
                .chain(ancestors_of(*term).iter().copied())
                .collect(),
            None => BTreeSet::new(),
        };
    }

    let mut result = BTreeSet::new();
    for term in terms {
        if let Some(idx) = ontology.index_of(term) {
            result.insert(idx);
            result.extend(ancestors_of(*term).iter().copied());
        }
    }
    result
}
