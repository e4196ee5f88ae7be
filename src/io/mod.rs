//! Reading annotations and writing propagated terms.

pub mod gaf;
pub mod terms;
