pub mod explore;
pub mod network;
pub mod pes;

use crate::error::{CliError, Result};
use kinnet::core::chem::characterize::Characterizer;
use kinnet::core::io::traits::MolecularFile;
use kinnet::core::io::xyz::XyzFile;
use kinnet::core::models::structure::Structure;
use std::path::Path;

/// Reads an XYZ file and characterizes the molecule in it.
pub(crate) fn load_structure(path: &Path, characterizer: &dyn Characterizer) -> Result<Structure> {
    let record = XyzFile::read_from_path(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    record
        .into_structure(characterizer)
        .map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
}
