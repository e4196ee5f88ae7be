//! Rewriting of obsolete term identifiers.
//!
//! Only a single level of substitution is applied: if `A` maps to `B` and `B` is itself
//! listed as obsolete, `A` still resolves to `B`.  Following chains would change existing
//! results whenever the table grows, so this is kept flat on purpose and documented as a
//! known limitation.

use std::{io::Read, path::Path};

use indexmap::IndexMap;

use crate::{algos::ontology::Ontology, Error};

/// Curated obsolete term replacements for the Gene Ontology.
const CURATED: &[(&str, &str)] = &[
    ("GO:0006975", "GO:0042770"),
    ("GO:0031617", "GO:0000776"),
    ("GO:1901720", "GO:1905560"),
    ("GO:0034291", "GO:0140911"),
    ("GO:0034290", "GO:0140911"),
    ("GO:0034292", "GO:0140911"),
    ("GO:0004147", "GO:0043754"),
    ("GO:0044662", "GO:0051673"),
    ("GO:0044649", "GO:0051715"),
    ("GO:0050828", "GO:0043129"),
    ("GO:1990142", "GO:0044179"),
    ("GO:0102430", "GO:0102431"),
    ("GO:0006295", "GO:0006289"),
    ("GO:0006296", "GO:0006289"),
    ("GO:0006875", "GO:0030003"),
    ("GO:0008022", "GO:0005515"),
    ("GO:0008852", "GO:0008310"),
    ("GO:0008853", "GO:0008311"),
    ("GO:0030004", "GO:0030003"),
    ("GO:0030320", "GO:0030002"),
    ("GO:0031997", "GO:0005515"),
    ("GO:0032199", "GO:0032197"),
    ("GO:0033683", "GO:0006289"),
    ("GO:0046916", "GO:0030003"),
    ("GO:0047485", "GO:0005515"),
    ("GO:0072507", "GO:0055080"),
    ("GO:0097056", "GO:0001717"),
    ("GO:1904608", "GO:1902065"),
    ("GO:1990731", "GO:0070914"),
];

/// Immutable mapping from obsolete term to its replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObsoleteMap {
    replacements: IndexMap<String, String>,
}

impl ObsoleteMap {
    /// Construct an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in curated replacement table.
    pub fn curated() -> Self {
        CURATED.iter().copied().collect()
    }

    /// Load a two column tab-separated file of `obsolete<TAB>replacement` pairs.
    ///
    /// Lines starting with `#` are ignored.  A repeated obsolete term keeps its first
    /// replacement.
    ///
    /// # Errors
    ///
    /// `Error::ObsoleteMapLoad` if the file cannot be read or a line does not have two
    /// fields.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let reader = crate::common::open_read_maybe_gz(path)
            .map_err(|e| Error::ObsoleteMapLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_reader(reader)
    }

    /// Read pairs from `reader`, see [`ObsoleteMap::from_path`].
    ///
    /// # Errors
    ///
    /// `Error::ObsoleteMapLoad` on malformed input.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .comment(Some(b'#'))
            .flexible(true)
            .from_reader(reader);

        let mut result = Self::new();
        for (lineno, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| Error::ObsoleteMapLoad(e.to_string()))?;
            match (record.get(0), record.get(1), record.len()) {
                (Some(obsolete), Some(replacement), 2)
                    if !obsolete.trim().is_empty() && !replacement.trim().is_empty() =>
                {
                    result.insert(obsolete.trim(), replacement.trim());
                }
                _ => {
                    return Err(Error::ObsoleteMapLoad(format!(
                        "record {} is not an `obsolete<TAB>replacement` pair",
                        lineno + 1
                    )))
                }
            }
        }
        Ok(result)
    }

    /// Add the `replaced_by` tags recorded in `ontology` for terms not already mapped.
    #[must_use]
    pub fn with_replaced_by(mut self, ontology: &Ontology) -> Self {
        for (obsolete, replacement) in ontology.replaced_by() {
            self.insert(obsolete, replacement);
        }
        self
    }

    /// Insert unless `obsolete` is already mapped.
    fn insert(&mut self, obsolete: &str, replacement: &str) {
        self.replacements
            .entry(obsolete.to_string())
            .or_insert_with(|| replacement.to_string());
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Whether `term` is listed as obsolete.
    pub fn is_obsolete(&self, term: &str) -> bool {
        self.replacements.contains_key(term)
    }

    /// Return the replacement of `term`, or `term` itself.
    ///
    /// Exactly one lookup is performed, replacements are not chased further.
    pub fn resolve<'a>(&'a self, term: &'a str) -> &'a str {
        self.replacements.get(term).map_or(term, String::as_str)
    }

    /// Whether `term`, once resolved, is absent from `ontology`.
    pub fn is_orphan(&self, term: &str, ontology: &Ontology) -> bool {
        !ontology.contains(self.resolve(term))
    }
}

impl<S: Into<String>, T: Into<String>> FromIterator<(S, T)> for ObsoleteMap {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut result = Self::new();
        for (obsolete, replacement) in iter {
            let (obsolete, replacement): (String, String) = (obsolete.into(), replacement.into());
            result.insert(&obsolete, &replacement);
        }
        result
    }
}

#[cfg(test)]
mod test {
    use super::ObsoleteMap;
    use crate::{
        algos::ontology::{test::chain, Ontology},
        Error,
    };

    #[test]
    fn curated_table() {
        let map = ObsoleteMap::curated();
        assert_eq!(map.len(), 29);
        assert_eq!(map.resolve("GO:0006975"), "GO:0042770");
        assert_eq!(map.resolve("GO:0008150"), "GO:0008150");
    }

    #[test]
    fn resolve_single_hop() {
        let map: ObsoleteMap = [("GO:X", "GO:Y"), ("GO:Y", "GO:Z")].into_iter().collect();

        assert_eq!(map.resolve("GO:X"), "GO:Y");
        assert_eq!(map.resolve("GO:Y"), "GO:Z");
        assert_eq!(map.resolve("GO:Q"), "GO:Q");
    }

    #[rstest::rstest]
    fn is_orphan(chain: Ontology) {
        let map: ObsoleteMap = [("GO:OLD", "GO:A"), ("GO:GONE", "GO:NOWHERE")]
            .into_iter()
            .collect();

        assert!(!map.is_orphan("GO:A", &chain));
        assert!(!map.is_orphan("GO:OLD", &chain));
        assert!(map.is_orphan("GO:GONE", &chain));
        assert!(map.is_orphan("GO:UNKNOWN", &chain));
    }

    #[test]
    fn from_reader() -> Result<(), anyhow::Error> {
        let text = "# obsolete\treplacement\nGO:1\tGO:2\nGO:1\tGO:3\nGO:4\tGO:5\n";
        let map = ObsoleteMap::from_reader(text.as_bytes())?;

        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve("GO:1"), "GO:2");
        assert_eq!(map.resolve("GO:4"), "GO:5");

        Ok(())
    }

    #[test]
    fn from_reader_malformed() {
        assert!(matches!(
            ObsoleteMap::from_reader("GO:1\n".as_bytes()),
            Err(Error::ObsoleteMapLoad(_))
        ));
    }

    #[test]
    fn with_replaced_by_keeps_curated() -> Result<(), anyhow::Error> {
        let ontology = Ontology::from_obo_str(crate::algos::ontology::test::SMALL_OBO)?;
        let map: ObsoleteMap = [("GO:0000009", "GO:0000001")].into_iter().collect();

        assert_eq!(
            map.clone().with_replaced_by(&ontology).resolve("GO:0000009"),
            "GO:0000001"
        );
        assert_eq!(
            ObsoleteMap::new()
                .with_replaced_by(&ontology)
                .resolve("GO:0000009"),
            "GO:0000003"
        );

        Ok(())
    }
}
