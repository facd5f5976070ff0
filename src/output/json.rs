//! JSON export of crawl results

use crate::crawler::Record;
use crate::HarvestError;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// keyword -> ranked records, ordered by keyword for stable output
pub type ResultSets = BTreeMap<String, Vec<Record>>;

/// Writes result sets as pretty-printed JSON
///
/// # Arguments
///
/// * `path` - Destination file, created or truncated
/// * `results` - Result sets keyed by keyword
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the file
/// * `Err(HarvestError)` - Failed to create or serialize the file
pub fn write_results_json(path: &Path, results: &ResultSets) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::info!("Wrote {} result set(s) to {}", results.len(), path.display());
    Ok(())
}

/// Reads result sets previously written by [`write_results_json`]
pub fn read_results_json(path: &Path) -> Result<ResultSets, HarvestError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
