//! Construction of the relation-filtered ontology graph.
//!
//! Only `is_a` and `part_of` edges are kept; every other relation kind is
//! dropped while the nodes it connects are preserved.  The resulting
//! [`Ontology`] is immutable and guaranteed to be acyclic.

use std::{io::Read, path::Path};

use indexmap::{IndexMap, IndexSet};

use crate::Error;

/// Kind of a relation between two terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Subsumption (`is_a`).
    IsA,
    /// Compositional containment (`part_of`).
    PartOf,
    /// Any other relation, e.g., `regulates`.
    Other(String),
}

impl Relation {
    /// Whether annotations are propagated along this relation.
    pub fn propagates(&self) -> bool {
        matches!(self, Relation::IsA | Relation::PartOf)
    }
}

impl From<&str> for Relation {
    fn from(s: &str) -> Self {
        match s {
            "is_a" => Relation::IsA,
            "part_of" | "BFO:0000050" => Relation::PartOf,
            other => Relation::Other(other.to_string()),
        }
    }
}

/// Directed acyclic graph of terms with edges pointing from specific to general.
///
/// Terms are interned; a term's index is stable for the lifetime of the value.
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    /// Term identifiers, the position is the term index.
    terms: IndexSet<String>,
    /// Sorted direct parent indices for each term.
    parents: Vec<Vec<usize>>,
    /// `replaced_by` targets of obsolete terms seen in the source.
    replaced_by: IndexMap<String, String>,
}

impl Ontology {
    /// Number of terms in the graph.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the graph has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of retained edges.
    pub fn num_edges(&self) -> usize {
        self.parents.iter().map(Vec::len).sum()
    }

    /// Whether `term` is a node of the graph.
    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(term)
    }

    /// Index of `term`, if it is a node.
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms.get_index_of(term)
    }

    /// Identifier of the term at `idx`.
    ///
    /// # Panics
    ///
    /// If `idx` is out of bounds.
    pub fn term(&self, idx: usize) -> &str {
        &self.terms[idx]
    }

    /// Direct parents of the term at `idx`.
    pub fn parents(&self, idx: usize) -> &[usize] {
        &self.parents[idx]
    }

    /// Iterate all term identifiers in index order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    /// `replaced_by` tags of obsolete terms in the source, if any.
    pub fn replaced_by(&self) -> &IndexMap<String, String> {
        &self.replaced_by
    }

    /// Load from a file.
    ///
    /// Files ending in `.tsv` (optionally followed by `.gz`) are read as an edge list with
    /// `subject<TAB>relation<TAB>object` lines, everything else is parsed as OBO.
    ///
    /// # Errors
    ///
    /// `Error::GraphLoad` if the file cannot be read or parsed, `Error::CycleDetected` if
    /// the filtered graph is not acyclic.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let name = path.to_string_lossy();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        let reader = crate::common::open_read_maybe_gz(path)
            .map_err(|e| Error::GraphLoad(format!("{}: {}", path.display(), e)))?;
        if name.ends_with(".tsv") {
            Self::from_edge_list(reader)
        } else {
            let doc = fastobo::from_reader(reader)
                .map_err(|e| Error::GraphLoad(format!("{}: {}", path.display(), e)))?;
            Self::from_obo_doc(&doc)
        }
    }

    /// Parse OBO text.
    ///
    /// # Errors
    ///
    /// See [`Ontology::from_path`].
    pub fn from_obo_str(text: &str) -> Result<Self, Error> {
        let doc = fastobo::from_str(text).map_err(|e| Error::GraphLoad(e.to_string()))?;
        Self::from_obo_doc(&doc)
    }

    /// Build from a parsed OBO document.
    ///
    /// Obsolete term frames do not become nodes; their `replaced_by` tags are recorded.
    ///
    /// # Errors
    ///
    /// `Error::CycleDetected` if the filtered graph is not acyclic.
    pub fn from_obo_doc(doc: &fastobo::ast::OboDoc) -> Result<Self, Error> {
        use fastobo::ast::TermClause;

        let mut builder = Builder::default();
        for frame in doc
            .entities()
            .iter()
            .filter_map(fastobo::ast::EntityFrame::as_term)
        {
            let id = ident_to_string(frame.id().as_inner().as_ref());
            let obsolete = frame
                .clauses()
                .iter()
                .any(|line| matches!(line.as_inner(), TermClause::IsObsolete(true)));

            for line in frame.clauses().iter().map(fastobo::ast::Line::as_inner) {
                match line {
                    TermClause::ReplacedBy(target) if obsolete => {
                        builder.add_replaced_by(&id, &class_to_string(target));
                    }
                    TermClause::IsA(target) if !obsolete => {
                        builder.add_edge(&id, Relation::IsA, &class_to_string(target));
                    }
                    TermClause::Relationship(relation, target) if !obsolete => {
                        let relation = Relation::from(relation_to_string(relation).as_str());
                        builder.add_edge(&id, relation, &class_to_string(target));
                    }
                    _ => (),
                }
            }
            if !obsolete {
                builder.add_term(&id);
            }
        }

        builder.build()
    }

    /// Read a tab-separated `subject relation object` edge list.
    ///
    /// Both endpoints of every line become nodes, whatever the relation.  Empty lines and
    /// lines starting with `#` are ignored.
    ///
    /// # Errors
    ///
    /// `Error::GraphLoad` on unreadable input or lines without exactly three fields.
    pub fn from_edge_list<R: Read>(reader: R) -> Result<Self, Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .comment(Some(b'#'))
            .flexible(true)
            .from_reader(reader);

        let mut builder = Builder::default();
        for (lineno, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| Error::GraphLoad(e.to_string()))?;
            if record.len() != 3 {
                return Err(Error::GraphLoad(format!(
                    "edge record {} has {} fields instead of 3",
                    lineno + 1,
                    record.len()
                )));
            }
            let (subject, relation, object) = (record[0].trim(), record[1].trim(), record[2].trim());
            if subject.is_empty() || object.is_empty() {
                return Err(Error::GraphLoad(format!(
                    "edge record {} has an empty term",
                    lineno + 1
                )));
            }
            builder.add_term(subject);
            builder.add_term(object);
            builder.add_edge(subject, Relation::from(relation), object);
        }

        builder.build()
    }

    /// Check that the graph has no cycles.
    ///
    /// Iterative depth-first search with three colours; the first back edge found is
    /// reported as the term path closing the cycle.
    fn check_acyclic(&self) -> Result<(), Error> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let mut marks = vec![Mark::New; self.len()];
        for root in 0..self.len() {
            if marks[root] != Mark::New {
                continue;
            }
            marks[root] = Mark::Active;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            while let Some((node, pos)) = stack.last_mut() {
                let node = *node;
                if let Some(&parent) = self.parents[node].get(*pos) {
                    *pos += 1;
                    match marks[parent] {
                        Mark::New => {
                            marks[parent] = Mark::Active;
                            stack.push((parent, 0));
                        }
                        Mark::Active => {
                            let start = stack
                                .iter()
                                .position(|(n, _)| *n == parent)
                                .unwrap_or_default();
                            let mut path = stack[start..]
                                .iter()
                                .map(|(n, _)| self.terms[*n].clone())
                                .collect::<Vec<_>>();
                            path.push(self.terms[parent].clone());
                            return Err(Error::CycleDetected(path));
                        }
                        Mark::Done => (),
                    }
                } else {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }

        Ok(())
    }
}

/// Incremental construction of an [`Ontology`].
///
/// Edges may be added before their endpoints; edges whose endpoints never become
/// terms are dropped in [`Builder::build`].
#[derive(Debug, Default)]
pub struct Builder {
    terms: IndexSet<String>,
    edges: Vec<(String, Relation, String)>,
    replaced_by: IndexMap<String, String>,
}

impl Builder {
    /// Construct a new, empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a term, returning its index.
    pub fn add_term(&mut self, term: &str) -> usize {
        self.terms.insert_full(term.to_string()).0
    }

    /// Register a typed edge from `subject` (specific) to `object` (general).
    pub fn add_edge(&mut self, subject: &str, relation: Relation, object: &str) -> &mut Self {
        self.edges
            .push((subject.to_string(), relation, object.to_string()));
        self
    }

    /// Record that obsolete `term` is replaced by `replacement`.
    pub fn add_replaced_by(&mut self, term: &str, replacement: &str) {
        self.replaced_by
            .entry(term.to_string())
            .or_insert_with(|| replacement.to_string());
    }

    /// Filter the edges down to `is_a`/`part_of` and freeze the graph.
    ///
    /// # Errors
    ///
    /// `Error::CycleDetected` if the filtered graph is not acyclic.
    pub fn build(self) -> Result<Ontology, Error> {
        let Builder {
            terms,
            edges,
            replaced_by,
        } = self;

        let mut parents = vec![Vec::new(); terms.len()];
        let mut num_filtered = 0usize;
        let mut num_dangling = 0usize;
        for (subject, relation, object) in &edges {
            if !relation.propagates() {
                num_filtered += 1;
                continue;
            }
            match (terms.get_index_of(subject), terms.get_index_of(object)) {
                (Some(s), Some(o)) => parents[s].push(o),
                _ => num_dangling += 1,
            }
        }
        for p in &mut parents {
            p.sort_unstable();
            p.dedup();
        }
        tracing::debug!(
            "ontology has {} terms; dropped {} edges of other relations and {} dangling edges",
            terms.len(),
            num_filtered,
            num_dangling
        );

        let ontology = Ontology {
            terms,
            parents,
            replaced_by,
        };
        ontology.check_acyclic()?;
        Ok(ontology)
    }
}

/// Convert ident to String.
fn ident_to_string(ident: &fastobo::ast::Ident) -> String {
    match ident {
        fastobo::ast::Ident::Prefixed(val) => format!("{}:{}", val.prefix(), val.local()),
        fastobo::ast::Ident::Unprefixed(val) => val.as_str().to_string(),
        fastobo::ast::Ident::Url(val) => val.as_str().to_string(),
    }
}

/// Convert class ident to String.
fn class_to_string(ident: &fastobo::ast::ClassIdent) -> String {
    ident_to_string(ident.as_ref())
}

/// Convert relation ident to String.
fn relation_to_string(ident: &fastobo::ast::RelationIdent) -> String {
    ident_to_string(ident.as_ref())
}

#[cfg(test)]
pub(crate) mod test {
    use super::{Builder, Ontology, Relation};
    use crate::Error;

    /// OBO snippet with a small process branch, a regulates edge, and obsolete terms.
    pub const SMALL_OBO: &str = "format-version: 1.2
ontology: go

[Term]
id: GO:0000001
name: root

[Term]
id: GO:0000002
name: middle
is_a: GO:0000001 ! root

[Term]
id: GO:0000003
name: leaf
is_a: GO:0000002 ! middle

[Term]
id: GO:0000004
name: part
relationship: part_of GO:0000002 ! middle

[Term]
id: GO:0000005
name: regulator
relationship: regulates GO:0000003 ! leaf

[Term]
id: GO:0000009
name: retired
is_obsolete: true
replaced_by: GO:0000003
";

    /// Chain `A -> B -> C` plus `D --regulates--> A`.
    #[rstest::fixture]
    pub fn chain() -> Ontology {
        let mut builder = Builder::new();
        for t in ["GO:A", "GO:B", "GO:C", "GO:D"] {
            builder.add_term(t);
        }
        builder
            .add_edge("GO:A", Relation::IsA, "GO:B")
            .add_edge("GO:B", Relation::IsA, "GO:C")
            .add_edge("GO:D", Relation::Other("regulates".into()), "GO:A");
        builder.build().expect("chain is acyclic")
    }

    #[rstest::rstest]
    fn builder_filters_relations(chain: Ontology) {
        assert_eq!(chain.len(), 4);
        assert_eq!(chain.num_edges(), 2);
        let d = chain.index_of("GO:D").unwrap();
        assert!(chain.parents(d).is_empty());
    }

    #[test]
    fn relation_from_str() {
        assert_eq!(Relation::from("is_a"), Relation::IsA);
        assert_eq!(Relation::from("part_of"), Relation::PartOf);
        assert!(!Relation::from("regulates").propagates());
    }

    #[test]
    fn builder_detects_cycle() {
        let mut builder = Builder::new();
        for t in ["GO:1", "GO:2", "GO:3"] {
            builder.add_term(t);
        }
        builder
            .add_edge("GO:1", Relation::IsA, "GO:2")
            .add_edge("GO:2", Relation::PartOf, "GO:3")
            .add_edge("GO:3", Relation::IsA, "GO:1");

        let err = builder.build().unwrap_err();
        assert_eq!(
            err,
            Error::CycleDetected(vec![
                "GO:1".to_string(),
                "GO:2".to_string(),
                "GO:3".to_string(),
                "GO:1".to_string()
            ])
        );
    }

    #[test]
    fn cycle_through_other_relation_is_ignored() {
        let mut builder = Builder::new();
        builder.add_term("GO:1");
        builder.add_term("GO:2");
        builder
            .add_edge("GO:1", Relation::IsA, "GO:2")
            .add_edge("GO:2", Relation::Other("regulates".into()), "GO:1");

        assert!(builder.build().is_ok());
    }

    #[test]
    fn builder_drops_dangling_edges() {
        let mut builder = Builder::new();
        builder.add_term("GO:1");
        builder.add_edge("GO:1", Relation::IsA, "GO:404");
        let ontology = builder.build().unwrap();

        assert_eq!(ontology.len(), 1);
        assert_eq!(ontology.num_edges(), 0);
    }

    #[test]
    fn from_obo_str() -> Result<(), anyhow::Error> {
        let ontology = Ontology::from_obo_str(SMALL_OBO)?;

        assert_eq!(
            ontology.terms().collect::<Vec<_>>(),
            vec![
                "GO:0000001",
                "GO:0000002",
                "GO:0000003",
                "GO:0000004",
                "GO:0000005"
            ]
        );
        assert!(!ontology.contains("GO:0000009"));
        assert_eq!(ontology.num_edges(), 3);
        assert_eq!(
            ontology.replaced_by().get("GO:0000009").map(String::as_str),
            Some("GO:0000003")
        );

        Ok(())
    }

    #[test]
    fn from_edge_list() -> Result<(), anyhow::Error> {
        let text = "# comment\nGO:A\tis_a\tGO:B\nGO:B\tpart_of\tGO:C\nGO:X\tregulates\tGO:A\n";
        let ontology = Ontology::from_edge_list(text.as_bytes())?;

        assert_eq!(ontology.len(), 4);
        assert!(ontology.contains("GO:X"));
        assert_eq!(ontology.num_edges(), 2);

        Ok(())
    }

    #[test]
    fn from_edge_list_malformed() {
        let text = "GO:A\tis_a\n";
        assert!(matches!(
            Ontology::from_edge_list(text.as_bytes()),
            Err(Error::GraphLoad(_))
        ));
    }

    #[test]
    fn from_obo_str_malformed() {
        assert!(matches!(
            Ontology::from_obo_str("[Term]\nthis is not obo\n"),
            Err(Error::GraphLoad(_))
        ));
    }

    #[test]
    fn from_path_obo() -> Result<(), anyhow::Error> {
        let ontology = Ontology::from_path("tests/data/go-mini.obo")?;
        assert!(ontology.contains("GO:0008150"));
        assert!(!ontology.contains("GO:0006975"));
        Ok(())
    }

    #[test]
    fn from_path_missing() {
        assert!(matches!(
            Ontology::from_path("tests/data/does-not-exist.obo"),
            Err(Error::GraphLoad(_))
        ));
    }
}
