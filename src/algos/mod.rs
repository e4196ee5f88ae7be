//! Algorithms for propagating annotations along the ontology.

pub mod closure;
pub mod obsolete;
pub mod ontology;
pub mod partition;
pub mod propagator;
