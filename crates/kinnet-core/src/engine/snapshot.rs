//! Human-readable progress of one exploration: one `state\tstep\tname` line per
//! reaction instance, rewritten after every tick.

use super::error::EngineError;
use super::instance::ReactionInstance;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const SNAPSHOT_FILE: &str = "progress.tsv";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SnapshotRow {
    pub state: String,
    pub step: usize,
    pub name: String,
}

/// Writes the snapshot to a sibling temporary file and renames it into place,
/// so readers never see a half-written table.
pub fn write_snapshot<'a>(
    path: &Path,
    instances: impl IntoIterator<Item = &'a ReactionInstance>,
) -> Result<(), EngineError> {
    let tmp = path.with_extension("tsv.tmp");
    let table_error = |source| EngineError::Table {
        path: tmp.clone(),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(&tmp)
        .map_err(table_error)?;
    for instance in instances {
        writer
            .serialize((instance.state().as_str(), instance.step(), instance.name()))
            .map_err(table_error)?;
    }
    writer.flush().map_err(|source| EngineError::Io {
        path: tmp.clone(),
        source,
    })?;
    drop(writer);
    fs::rename(&tmp, path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_snapshot(path: &Path) -> Result<Vec<SnapshotRow>, EngineError> {
    let table_error = |source| EngineError::Table {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .map_err(table_error)?;
    reader
        .deserialize()
        .map(|row| row.map_err(table_error))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::instance::tests::{OneStepFamily, reactant};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn snapshot_lists_every_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE);
        let reactant = reactant();
        let instances = vec![
            ReactionInstance::new(Arc::new(OneStepFamily), vec![0, 1, 2], &reactant, 30),
            ReactionInstance::new(Arc::new(OneStepFamily), vec![2, 1, 0], &reactant, 30),
        ];

        write_snapshot(&path, &instances).unwrap();
        let rows = read_snapshot(&path).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].state, "ts_searching");
        assert_eq!(rows[0].step, 0);
        assert_eq!(rows[1].name, instances[1].name());
        assert!(!dir.path().join("progress.tsv.tmp").exists());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("ts_searching\t0\t"));
    }

    #[test]
    fn snapshot_is_replaced_not_appended() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE);
        let reactant = reactant();
        let one = [ReactionInstance::new(Arc::new(OneStepFamily), vec![0, 1, 2], &reactant, 30)];

        write_snapshot(&path, &one).unwrap();
        write_snapshot(&path, &one).unwrap();

        assert_eq!(read_snapshot(&path).unwrap().len(), 1);
    }
}
