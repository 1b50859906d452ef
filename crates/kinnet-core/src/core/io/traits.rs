use crate::core::chem::characterize::Characterizer;
use crate::core::models::structure::{Structure, StructureError};
use nalgebra::Point3;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Atoms, coordinates and electronic state as stored in a molecule file,
/// before any characterization.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeRecord {
    pub atoms: Vec<String>,
    pub geometry: Vec<Point3<f64>>,
    pub charge: i32,
    pub multiplicity: u32,
    pub title: String,
}

impl MoleculeRecord {
    pub fn from_structure(structure: &Structure, title: impl Into<String>) -> Self {
        Self {
            atoms: structure.atoms().to_vec(),
            geometry: structure.geometry().to_vec(),
            charge: structure.charge(),
            multiplicity: structure.multiplicity(),
            title: title.into(),
        }
    }

    pub fn into_structure(
        self,
        characterizer: &dyn Characterizer,
    ) -> Result<Structure, StructureError> {
        Structure::new(
            self.atoms,
            self.geometry,
            self.charge,
            self.multiplicity,
            characterizer,
        )
    }
}

/// Defines the interface for reading and writing molecule file formats.
pub trait MolecularFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads one molecule from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<MoleculeRecord, Self::Error>;

    /// Writes one molecule to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(record: &MoleculeRecord, writer: &mut impl Write) -> Result<(), Self::Error>;

    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<MoleculeRecord, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    fn write_to_path<P: AsRef<Path>>(record: &MoleculeRecord, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(record, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
