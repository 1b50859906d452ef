//! The list of wells discovered across all explorations of one surface.
//!
//! Several processes append to the same file. Every entry is written as one
//! complete line with a single `write_all` on a file opened in append mode, so
//! concurrent appends never interleave. Two processes can still publish the
//! same chemid; readers keep the first entry of each chemid.

use crate::core::io::traits::{MolecularFile, MoleculeRecord};
use crate::core::io::xyz::{XyzError, XyzFile};
use crate::core::models::structure::{Chemid, Structure};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const WELL_LIST_FILE: &str = "chemids";
pub const WELL_GEOMETRY_DIR: &str = "wells";

#[derive(Debug, Error)]
pub enum WellListError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed entry on line {line} of the well list: '{content}'")]
    Parse { line: usize, content: String },
    #[error("Cannot access geometry of well {chemid}: {source}")]
    Geometry {
        chemid: Chemid,
        #[source]
        source: XyzError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WellEntry {
    pub chemid: Chemid,
    /// Barrier threshold to use when exploring this well, if it was adjusted.
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct WellList {
    path: PathBuf,
    geometry_dir: PathBuf,
}

impl WellList {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(WELL_LIST_FILE),
            geometry_dir: dir.join(WELL_GEOMETRY_DIR),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn geometry_path(&self, chemid: &Chemid) -> PathBuf {
        self.geometry_dir.join(format!("{chemid}.xyz"))
    }

    /// Appends one entry as a single line.
    pub fn append(&self, entry: &WellEntry) -> Result<(), WellListError> {
        let line = match entry.threshold {
            Some(threshold) => format!("{} {:.4}\n", entry.chemid, threshold),
            None => format!("{}\n", entry.chemid),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| self.io_error(source))
    }

    /// Publishes a well unless its chemid is already listed. The geometry is
    /// written before the entry, so a listed well always has a geometry.
    pub fn register(&self, structure: &Structure, threshold: f64) -> Result<bool, WellListError> {
        let chemid = structure.chemid();
        if self.contains(chemid)? {
            return Ok(false);
        }
        fs::create_dir_all(&self.geometry_dir).map_err(|source| WellListError::Io {
            path: self.geometry_dir.clone(),
            source,
        })?;
        let record = MoleculeRecord::from_structure(structure, format!("chemid={chemid}"));
        XyzFile::write_to_path(&record, self.geometry_path(chemid)).map_err(|source| {
            WellListError::Geometry {
                chemid: chemid.clone(),
                source,
            }
        })?;
        self.append(&WellEntry {
            chemid: chemid.clone(),
            threshold: Some(threshold),
        })?;
        info!(%chemid, threshold, "Published new well");
        Ok(true)
    }

    /// All entries in file order, first occurrence of each chemid only. A
    /// missing file is an empty list.
    pub fn entries(&self) -> Result<Vec<WellEntry>, WellListError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let Some(chemid) = fields.next() else {
                continue;
            };
            let threshold = match fields.next() {
                Some(value) => Some(value.parse::<f64>().map_err(|_| WellListError::Parse {
                    line: n + 1,
                    content: line.to_string(),
                })?),
                None => None,
            };
            if seen.insert(chemid.to_string()) {
                entries.push(WellEntry {
                    chemid: Chemid::new(chemid),
                    threshold,
                });
            }
        }
        Ok(entries)
    }

    pub fn contains(&self, chemid: &Chemid) -> Result<bool, WellListError> {
        Ok(self.entries()?.iter().any(|e| &e.chemid == chemid))
    }

    pub fn load_geometry(&self, chemid: &Chemid) -> Result<MoleculeRecord, WellListError> {
        XyzFile::read_from_path(self.geometry_path(chemid)).map_err(|source| {
            WellListError::Geometry {
                chemid: chemid.clone(),
                source,
            }
        })
    }

    fn io_error(&self, source: io::Error) -> WellListError {
        WellListError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
