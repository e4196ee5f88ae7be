//! Writing of the propagated term table.

use std::{io::Write, path::Path};

use crate::algos::propagator::PropagatedEntry;

/// Header of the term table.
pub const HEADER: [&str; 3] = ["EntryID", "term", "aspect"];

/// One row of the term table.
#[derive(Debug, serde::Serialize)]
struct Row<'a> {
    #[serde(rename = "EntryID")]
    entry_id: &'a str,
    term: &'a str,
    aspect: &'a str,
}

/// Write `entries` as a tab-separated table with one row per (gene, term, aspect).
///
/// Returns the number of rows written.
///
/// # Errors
///
/// In the case of I/O failure.
pub fn write_entries<W: Write>(
    writer: W,
    entries: &[PropagatedEntry],
) -> Result<usize, anyhow::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(HEADER)?;
    let mut count = 0;
    for (entry_id, aspect, term) in entries.iter().flat_map(|entry| entry.rows()) {
        csv_writer.serialize(Row {
            entry_id,
            term,
            aspect,
        })?;
        count += 1;
    }
    csv_writer.flush()?;

    Ok(count)
}

/// Write `entries` to the file at `path`, see [`write_entries`].
///
/// # Errors
///
/// In the case that the file cannot be created or written.
pub fn write_path<P: AsRef<Path>>(
    path: P,
    entries: &[PropagatedEntry],
) -> Result<usize, anyhow::Error> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .map_err(|e| anyhow::anyhow!("could not create {}: {}", path.display(), e))?;
    write_entries(std::io::BufWriter::new(file), entries)
}
