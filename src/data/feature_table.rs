//! CSV interchange for the feature table
//!
//! The flat file is the handoff artifact between the feature builder and
//! the training/scoring stages, so each can run as its own process.

use crate::features::FeatureRow;
use crate::Result;
use std::fs::File;
use std::path::Path;

/// Write feature rows to a CSV file, creating parent directories as needed
pub fn write_features<P: AsRef<Path>>(path: P, rows: &[FeatureRow]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read feature rows back from a CSV file
pub fn read_features<P: AsRef<Path>>(path: P) -> Result<Vec<FeatureRow>> {
    let mut reader = csv::Reader::from_reader(File::open(path.as_ref())?);
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<FeatureRow>, _>>()?;
    Ok(rows)
}
