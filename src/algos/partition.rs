//! Splitting annotation records by ontology aspect.

use std::str::FromStr;

use indexmap::IndexMap;
use strum::{EnumIter, IntoEnumIterator};

use crate::Error;

/// One of the three independent sub-ontologies.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum Aspect {
    /// Biological process.
    Process,
    /// Cellular component.
    Component,
    /// Molecular function.
    Function,
}

impl Aspect {
    /// Single letter code as used in GAF files.
    pub fn code(self) -> &'static str {
        match self {
            Aspect::Process => "P",
            Aspect::Component => "C",
            Aspect::Function => "F",
        }
    }

    /// Sub-ontology label used in the output.
    pub fn label(self) -> &'static str {
        match self {
            Aspect::Process => "BPO",
            Aspect::Component => "CCO",
            Aspect::Function => "MFO",
        }
    }

    /// Position of the aspect in processing order.
    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Aspect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "P" | "BPO" | "biological_process" => Ok(Aspect::Process),
            "C" | "CCO" | "cellular_component" => Ok(Aspect::Component),
            "F" | "MFO" | "molecular_function" => Ok(Aspect::Function),
            other => Err(Error::UnknownAspect(other.to_string())),
        }
    }
}

/// Annotation record as handed over by the annotation reader.
///
/// The aspect is kept as the raw code so that unknown values can be reported here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationRecord {
    /// The gene (or gene product) identifier.
    pub gene_id: String,
    /// The directly annotated term.
    pub term: String,
    /// The raw aspect code.
    pub aspect: String,
}

impl AnnotationRecord {
    /// Construct a new record.
    pub fn new(gene_id: &str, term: &str, aspect: &str) -> Self {
        Self {
            gene_id: gene_id.to_string(),
            term: term.to_string(),
            aspect: aspect.to_string(),
        }
    }
}

/// Gene-term pair within one aspect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Annotation {
    /// The gene identifier.
    pub gene_id: String,
    /// The directly annotated term.
    pub term: String,
}

/// Annotation records routed to their aspect.
#[derive(Debug, Default, Clone)]
pub struct Partitions {
    /// Annotations indexed by `Aspect::index`.
    by_aspect: [Vec<Annotation>; 3],
    /// Unknown aspect values with the number of records carrying them.
    unknown: IndexMap<String, usize>,
}

impl Partitions {
    /// Route each record into the partition of its aspect.
    ///
    /// Records with an unknown aspect are dropped and counted.
    pub fn new<I>(records: I) -> Self
    where
        I: IntoIterator<Item = AnnotationRecord>,
    {
        let mut result = Self::default();
        for AnnotationRecord {
            gene_id,
            term,
            aspect,
        } in records
        {
            match aspect.parse::<Aspect>() {
                Ok(aspect) => result.by_aspect[aspect.index()].push(Annotation { gene_id, term }),
                Err(e) => {
                    tracing::debug!("skipping record of gene {}: {}", gene_id, e);
                    *result.unknown.entry(aspect).or_default() += 1;
                }
            }
        }

        for (value, count) in &result.unknown {
            tracing::warn!(
                "{} ({} records skipped)",
                Error::UnknownAspect(value.clone()),
                count
            );
        }

        result
    }

    /// Annotations of `aspect`.
    pub fn get(&self, aspect: Aspect) -> &[Annotation] {
        &self.by_aspect[aspect.index()]
    }

    /// Iterate the partitions in processing order.
    pub fn iter(&self) -> impl Iterator<Item = (Aspect, &[Annotation])> {
        Aspect::iter().map(move |aspect| (aspect, self.get(aspect)))
    }

    /// Total number of partitioned annotations.
    pub fn len(&self) -> usize {
        self.by_aspect.iter().map(Vec::len).sum()
    }

    /// Whether no annotation was partitioned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records dropped for an unknown aspect.
    pub fn num_unknown_aspect(&self) -> usize {
        self.unknown.values().sum()
    }

    /// The distinct unknown aspect values.
    pub fn unknown_aspects(&self) -> impl Iterator<Item = &str> {
        self.unknown.keys().map(String::as_str)
    }
}
