//! Geometry and vibrations of the stationary points of finished reactions,
//! kept under `molecular/` in the working directory for master-equation input.
//!
//! Wells and product fragments are stored under their chemid, saddle points
//! under the name of the reaction instance that found them.

use super::error::EngineError;
use crate::core::models::structure::Structure;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MOLECULAR_DIR: &str = "molecular";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MolecularData {
    pub atoms: Vec<String>,
    /// Angstrom.
    pub geometry: Vec<[f64; 3]>,
    /// cm^-1, ascending; imaginary modes are negative.
    #[serde(default)]
    pub frequencies: Vec<f64>,
    pub multiplicity: u32,
}

impl MolecularData {
    pub fn from_structure(structure: &Structure) -> Self {
        Self {
            atoms: structure.atoms().to_vec(),
            geometry: structure.geometry().iter().map(|p| [p.x, p.y, p.z]).collect(),
            frequencies: structure.frequencies.clone().unwrap_or_default(),
            multiplicity: structure.multiplicity(),
        }
    }

    pub fn is_atom(&self) -> bool {
        self.atoms.len() == 1
    }

    /// The imaginary mode, as a negative wavenumber.
    pub fn imaginary_frequency(&self) -> Option<f64> {
        self.frequencies.iter().copied().find(|&f| f < 0.0)
    }

    pub fn real_frequencies(&self) -> impl Iterator<Item = f64> + '_ {
        self.frequencies.iter().copied().filter(|&f| f >= 0.0)
    }
}

pub fn molecular_path(workdir: &Path, key: &str) -> PathBuf {
    workdir.join(MOLECULAR_DIR).join(format!("{key}.toml"))
}

pub fn write_molecular_data(workdir: &Path, key: &str, data: &MolecularData) -> Result<(), EngineError> {
    let path = molecular_path(workdir, key);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| EngineError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let text = toml::to_string(data).map_err(|e| EngineError::MolecularData {
        path: path.clone(),
        message: e.to_string(),
    })?;
    fs::write(&path, text).map_err(|source| EngineError::Io { path, source })
}

pub fn read_molecular_data(workdir: &Path, key: &str) -> Result<MolecularData, EngineError> {
    let path = molecular_path(workdir, key);
    let text = fs::read_to_string(&path).map_err(|source| EngineError::Io {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&text).map_err(|e| EngineError::MolecularData {
        path,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::fixtures;
    use tempfile::tempdir;

    #[test]
    fn stored_data_reads_back() {
        let dir = tempdir().unwrap();
        let mut ethane = fixtures::ethane();
        ethane.frequencies = Some(vec![300.0, 1200.0]);
        let data = MolecularData::from_structure(&ethane);

        write_molecular_data(dir.path(), ethane.chemid().as_str(), &data).unwrap();

        let read = read_molecular_data(dir.path(), ethane.chemid().as_str()).unwrap();
        assert_eq!(read, data);
        assert_eq!(read.atoms.len(), 8);
    }

    #[test]
    fn missing_data_is_an_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_molecular_data(dir.path(), "nothing"),
            Err(EngineError::Io { .. })
        ));
    }

    #[test]
    fn saddle_point_modes_are_split() {
        let data = MolecularData {
            atoms: vec!["H".to_string(); 3],
            geometry: vec![[0.0; 3]; 3],
            frequencies: vec![-1500.0, 400.0, 2100.0],
            multiplicity: 2,
        };
        assert_eq!(data.imaginary_frequency(), Some(-1500.0));
        assert_eq!(data.real_frequencies().collect::<Vec<_>>(), vec![400.0, 2100.0]);
        assert!(!data.is_atom());
    }
}
