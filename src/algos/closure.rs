//! Memoized ancestor closure of ontology terms.

use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;
use rayon::prelude::*;

use crate::algos::ontology::Ontology;

/// Cache of the strict ancestors of each queried term.
///
/// Ancestors are stored as sorted term indices of the backing [`Ontology`].  Each distinct
/// term is traversed at most once; terms that are not in the graph map to the empty set
/// without any traversal.
#[derive(Debug)]
pub struct AncestorCache<'a> {
    /// The graph to traverse.
    ontology: &'a Ontology,
    /// Term identifier to sorted ancestor indices.
    cache: HashMap<String, Vec<usize>>,
    /// Number of graph traversals performed so far.
    traversals: usize,
}

impl<'a> AncestorCache<'a> {
    /// Construct an empty cache over `ontology`.
    pub fn new(ontology: &'a Ontology) -> Self {
        Self {
            ontology,
            cache: HashMap::new(),
            traversals: 0,
        }
    }

    /// The backing ontology.
    pub fn ontology(&self) -> &'a Ontology {
        self.ontology
    }

    /// Number of cached terms.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no term has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Number of graph traversals performed so far.
    pub fn num_traversals(&self) -> usize {
        self.traversals
    }

    /// Strict ancestors of `term`, computing and caching them on first access.
    pub fn ancestors(&mut self, term: &str) -> &[usize] {
        if !self.cache.contains_key(term) {
            let ancestors = match self.ontology.index_of(term) {
                Some(idx) => {
                    self.traversals += 1;
                    traverse(self.ontology, idx)
                }
                None => Vec::new(),
            };
            self.cache.insert(term.to_string(), ancestors);
        }
        self.cache.get(term).map_or(&[][..], Vec::as_slice)
    }

    /// Strict ancestors of `term` as sorted identifiers.
    pub fn ancestor_terms(&mut self, term: &str) -> Vec<&'a str> {
        let ontology = self.ontology;
        self.ancestors(term)
            .iter()
            .map(|&idx| ontology.term(idx))
            .sorted_unstable()
            .collect()
    }

    /// Cached ancestors of `term`, `None` if it has not been queried yet.
    pub fn get(&self, term: &str) -> Option<&[usize]> {
        self.cache.get(term).map(Vec::as_slice)
    }

    /// Make sure all of `terms` are cached.
    ///
    /// The missing terms are traversed in parallel; afterwards the cache can be shared
    /// read-only via [`AncestorCache::get`].
    pub fn populate<'t, I>(&mut self, terms: I)
    where
        I: IntoIterator<Item = &'t str>,
    {
        let missing = terms
            .into_iter()
            .filter(|term| !self.cache.contains_key(*term))
            .collect::<BTreeSet<_>>();
        if missing.is_empty() {
            return;
        }

        let ontology = self.ontology;
        let computed = missing
            .into_par_iter()
            .map(|term| {
                let ancestors = ontology.index_of(term).map(|idx| traverse(ontology, idx));
                (term, ancestors)
            })
            .collect::<Vec<_>>();

        for (term, ancestors) in computed {
            if ancestors.is_some() {
                self.traversals += 1;
            }
            self.cache
                .insert(term.to_string(), ancestors.unwrap_or_default());
        }
        tracing::debug!(
            "ancestor cache holds {} terms after {} traversals",
            self.cache.len(),
            self.traversals
        );
    }
}

/// All nodes reachable from `idx` along parent edges, excluding `idx`.
///
/// Termination relies on the graph being acyclic.
fn traverse(ontology: &Ontology, idx: usize) -> Vec<usize> {
    let mut seen = BTreeSet::new();
    let mut stack = ontology.parents(idx).to_vec();
    while let Some(parent) = stack.pop() {
        if seen.insert(parent) {
            stack.extend_from_slice(ontology.parents(parent));
        }
    }
    seen.into_iter().collect()
}

#[cfg(test)]
mod test {
    use super::AncestorCache;
    use crate::algos::ontology::{test::chain, Builder, Ontology, Relation};

    #[rstest::rstest]
    fn closure_of_chain(chain: Ontology) {
        let mut cache = AncestorCache::new(&chain);

        assert_eq!(cache.ancestor_terms("GO:A"), vec!["GO:B", "GO:C"]);
        assert_eq!(cache.ancestor_terms("GO:B"), vec!["GO:C"]);
        assert!(cache.ancestor_terms("GO:C").is_empty());
    }

    #[rstest::rstest]
    fn other_relations_are_not_followed(chain: Ontology) {
        let mut cache = AncestorCache::new(&chain);

        assert!(cache.ancestors("GO:D").is_empty());
    }

    #[rstest::rstest]
    fn repeated_queries_do_not_traverse(chain: Ontology) {
        let mut cache = AncestorCache::new(&chain);

        let first = cache.ancestors("GO:A").to_vec();
        assert_eq!(cache.num_traversals(), 1);
        let second = cache.ancestors("GO:A").to_vec();
        assert_eq!(cache.num_traversals(), 1);
        assert_eq!(first, second);
    }

    #[rstest::rstest]
    fn orphans_are_empty_without_traversal(chain: Ontology) {
        let mut cache = AncestorCache::new(&chain);

        assert!(cache.ancestors("GO:NOPE").is_empty());
        assert_eq!(cache.num_traversals(), 0);
        assert_eq!(cache.get("GO:NOPE"), Some(&[][..]));
    }

    #[rstest::rstest]
    fn populate_matches_lazy(chain: Ontology) {
        let mut eager = AncestorCache::new(&chain);
        eager.populate(["GO:A", "GO:B", "GO:A", "GO:NOPE"]);
        assert_eq!(eager.len(), 3);
        assert_eq!(eager.num_traversals(), 2);

        let mut lazy = AncestorCache::new(&chain);
        for term in ["GO:A", "GO:B", "GO:NOPE"] {
            assert_eq!(
                eager.get(term).map(<[usize]>::to_vec),
                Some(lazy.ancestors(term).to_vec())
            );
        }

        eager.populate(["GO:A"]);
        assert_eq!(eager.num_traversals(), 2);
    }

    #[test]
    fn diamond_is_deduplicated() {
        let mut builder = Builder::new();
        for t in ["GO:1", "GO:2", "GO:3", "GO:4"] {
            builder.add_term(t);
        }
        builder
            .add_edge("GO:1", Relation::IsA, "GO:2")
            .add_edge("GO:1", Relation::PartOf, "GO:3")
            .add_edge("GO:2", Relation::IsA, "GO:4")
            .add_edge("GO:3", Relation::IsA, "GO:4");
        let ontology = builder.build().unwrap();
        let mut cache = AncestorCache::new(&ontology);

        assert_eq!(cache.ancestor_terms("GO:1"), vec!["GO:2", "GO:3", "GO:4"]);
    }
}
