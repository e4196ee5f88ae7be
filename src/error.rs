//! Error type definition.

use thiserror::Error;

/// Error type for `goprop`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The ontology source could not be read or parsed.
    #[error("could not load ontology graph: {0}")]
    GraphLoad(String),
    /// The `is_a`/`part_of` graph contains a cycle, given as the path closing it.
    #[error("cycle detected in ontology graph: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),
    /// Aspect code that is none of process, component, function.
    #[error("unknown aspect {0:?}")]
    UnknownAspect(String),
    /// Term that is neither in the graph nor in the obsolete map.
    #[error("term {0} is neither in the ontology nor in the obsolete map")]
    UnresolvedTerm(String),
    /// Annotation record with a malformed term identifier.
    #[error("invalid term identifier {0:?}")]
    InvalidTerm(String),
    /// The obsolete map could not be read or parsed.
    #[error("could not load obsolete map: {0}")]
    ObsoleteMapLoad(String),
}
