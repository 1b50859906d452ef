use crate::core::chem::characterize::{Characterization, Characterizer, characterize_connectivity};
use crate::core::models::topology::BondMatrix;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Canonical identifier of a chemical species.
///
/// Two structures with equal chemids are the same species regardless of atom
/// ordering or geometry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chemid(String);

impl Chemid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Chemid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Chemid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructureError {
    #[error("A structure must contain at least one atom")]
    Empty,
    #[error("Got {atoms} element symbols but {coordinates} coordinates")]
    LengthMismatch { atoms: usize, coordinates: usize },
    #[error("Characterization covers {got} atoms, expected {expected}")]
    CharacterizationMismatch { got: usize, expected: usize },
}

/// A species or stationary point: atoms, geometry and the derived graph data.
///
/// Geometry is never edited in place. A new geometry produces a new, freshly
/// characterized structure through [`Structure::with_geometry`], so the bond
/// matrix and chemid always describe the coordinates they are stored with.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    atoms: Vec<String>,
    geometry: Vec<Point3<f64>>,
    charge: i32,
    multiplicity: u32,
    characterization: Characterization,
    /// Electronic energy in Hartree, once computed.
    pub energy: Option<f64>,
    /// Zero-point energy in Hartree, once computed.
    pub zpe: Option<f64>,
    /// Vibrational frequencies in cm^-1, ascending; imaginary modes are negative.
    pub frequencies: Option<Vec<f64>>,
}

impl Structure {
    pub fn new(
        atoms: Vec<String>,
        geometry: Vec<Point3<f64>>,
        charge: i32,
        multiplicity: u32,
        characterizer: &dyn Characterizer,
    ) -> Result<Self, StructureError> {
        Self::check_lengths(&atoms, &geometry)?;
        let characterization = characterizer.characterize(&atoms, &geometry, charge, multiplicity);
        Self::from_parts(atoms, geometry, charge, multiplicity, characterization)
    }

    pub fn from_parts(
        atoms: Vec<String>,
        geometry: Vec<Point3<f64>>,
        charge: i32,
        multiplicity: u32,
        characterization: Characterization,
    ) -> Result<Self, StructureError> {
        Self::check_lengths(&atoms, &geometry)?;
        let got = characterization.bond_matrix.natoms();
        if got != atoms.len()
            || characterization.radical_sites.len() != atoms.len()
            || characterization.symmetry_classes.len() != atoms.len()
        {
            return Err(StructureError::CharacterizationMismatch {
                got,
                expected: atoms.len(),
            });
        }
        Ok(Self {
            atoms,
            geometry,
            charge,
            multiplicity,
            characterization,
            energy: None,
            zpe: None,
            frequencies: None,
        })
    }

    fn check_lengths(atoms: &[String], geometry: &[Point3<f64>]) -> Result<(), StructureError> {
        if atoms.is_empty() {
            return Err(StructureError::Empty);
        }
        if atoms.len() != geometry.len() {
            return Err(StructureError::LengthMismatch {
                atoms: atoms.len(),
                coordinates: geometry.len(),
            });
        }
        Ok(())
    }

    /// Returns a re-characterized copy at a new geometry. Computed energies and
    /// frequencies are not carried over.
    pub fn with_geometry(
        &self,
        geometry: Vec<Point3<f64>>,
        characterizer: &dyn Characterizer,
    ) -> Result<Self, StructureError> {
        Self::new(
            self.atoms.clone(),
            geometry,
            self.charge,
            self.multiplicity,
            characterizer,
        )
    }

    /// Returns a copy whose graph data is derived from `connectivity` rather
    /// than from the geometry. Computed energies and frequencies are kept.
    pub fn with_connectivity(&self, connectivity: &BondMatrix) -> Result<Self, StructureError> {
        if connectivity.natoms() != self.atoms.len() {
            return Err(StructureError::CharacterizationMismatch {
                got: connectivity.natoms(),
                expected: self.atoms.len(),
            });
        }
        let characterization =
            characterize_connectivity(&self.atoms, connectivity, self.charge, self.multiplicity);
        let mut structure = Self::from_parts(
            self.atoms.clone(),
            self.geometry.clone(),
            self.charge,
            self.multiplicity,
            characterization,
        )?;
        structure.energy = self.energy;
        structure.zpe = self.zpe;
        structure.frequencies = self.frequencies.clone();
        Ok(structure)
    }

    /// Splits the structure into its connected molecular fragments.
    ///
    /// A single connected structure yields a copy of itself. For several
    /// fragments the multiplicity of each is derived from its own radical
    /// electrons, and any net charge is kept on the first fragment.
    pub fn fragments(
        &self,
        characterizer: &dyn Characterizer,
    ) -> Result<Vec<Structure>, StructureError> {
        let components = self.bond_matrix().connected_components();
        if components.len() <= 1 {
            return Ok(vec![self.clone()]);
        }
        components
            .iter()
            .enumerate()
            .map(|(n, component)| {
                let atoms = component.iter().map(|&i| self.atoms[i].clone()).collect();
                let geometry = component.iter().map(|&i| self.geometry[i]).collect();
                let unpaired: u32 = component
                    .iter()
                    .map(|&i| self.characterization.radical_sites[i] as u32)
                    .sum();
                let charge = if n == 0 { self.charge } else { 0 };
                Structure::new(atoms, geometry, charge, unpaired + 1, characterizer)
            })
            .collect()
    }

    pub fn natoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn atoms(&self) -> &[String] {
        &self.atoms
    }

    pub fn element(&self, index: usize) -> &str {
        &self.atoms[index]
    }

    pub fn geometry(&self) -> &[Point3<f64>] {
        &self.geometry
    }

    pub fn charge(&self) -> i32 {
        self.charge
    }

    pub fn multiplicity(&self) -> u32 {
        self.multiplicity
    }

    pub fn chemid(&self) -> &Chemid {
        &self.characterization.chemid
    }

    pub fn bond_matrix(&self) -> &BondMatrix {
        &self.characterization.bond_matrix
    }

    pub fn radical_sites(&self) -> &[u8] {
        &self.characterization.radical_sites
    }

    /// Indices of atoms carrying at least one unpaired electron.
    pub fn radical_atoms(&self) -> Vec<usize> {
        self.radical_sites()
            .iter()
            .enumerate()
            .filter_map(|(i, &r)| (r > 0).then_some(i))
            .collect()
    }

    pub fn is_closed_shell(&self) -> bool {
        self.radical_sites().iter().all(|&r| r == 0)
    }

    pub fn rings(&self) -> &[Vec<usize>] {
        &self.characterization.rings
    }

    pub fn symmetry_classes(&self) -> &[usize] {
        &self.characterization.symmetry_classes
    }

    /// Electronic plus zero-point energy in Hartree, when both are known.
    pub fn total_energy(&self) -> Option<f64> {
        Some(self.energy? + self.zpe?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::characterize::GraphCharacterizer;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn new_rejects_mismatched_lengths() {
        let err = Structure::new(
            symbols(&["H", "H"]),
            vec![Point3::origin()],
            0,
            1,
            &GraphCharacterizer::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            StructureError::LengthMismatch {
                atoms: 2,
                coordinates: 1
            }
        );
    }

    #[test]
    fn new_rejects_empty_structure() {
        let err = Structure::new(vec![], vec![], 0, 1, &GraphCharacterizer::default());
        assert_eq!(err.unwrap_err(), StructureError::Empty);
    }

    #[test]
    fn fragments_split_disconnected_atoms_with_radical_multiplicities() {
        let characterizer = GraphCharacterizer::default();
        // H2 far away from an isolated H atom.
        let structure = Structure::new(
            symbols(&["H", "H", "H"]),
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.74, 0.0, 0.0),
                Point3::new(5.0, 0.0, 0.0),
            ],
            0,
            2,
            &characterizer,
        )
        .unwrap();

        let fragments = structure.fragments(&characterizer).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].natoms(), 2);
        assert_eq!(fragments[0].multiplicity(), 1);
        assert_eq!(fragments[1].natoms(), 1);
        assert_eq!(fragments[1].multiplicity(), 2);
    }

    #[test]
    fn with_geometry_recharacterizes_and_clears_energies() {
        let characterizer = GraphCharacterizer::default();
        let mut bonded = Structure::new(
            symbols(&["H", "H"]),
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.74, 0.0, 0.0)],
            0,
            1,
            &characterizer,
        )
        .unwrap();
        bonded.energy = Some(-1.17);

        let stretched = bonded
            .with_geometry(
                vec![Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0)],
                &characterizer,
            )
            .unwrap();
        assert!(bonded.bond_matrix().is_bonded(0, 1));
        assert!(!stretched.bond_matrix().is_bonded(0, 1));
        assert_ne!(bonded.chemid(), stretched.chemid());
        assert_eq!(stretched.energy, None);
    }

    #[test]
    fn total_energy_requires_both_terms() {
        let characterizer = GraphCharacterizer::default();
        let mut s = Structure::new(
            symbols(&["H"]),
            vec![Point3::origin()],
            0,
            2,
            &characterizer,
        )
        .unwrap();
        s.energy = Some(-0.5);
        assert_eq!(s.total_energy(), None);
        s.zpe = Some(0.0);
        assert_eq!(s.total_energy(), Some(-0.5));
        assert!(!s.is_closed_shell());
        assert_eq!(s.radical_atoms(), vec![0]);
    }

    #[test]
    fn connectivity_overrides_geometry_perception() {
        let characterizer = GraphCharacterizer::default();
        let stretched = [0.0, 1.1, 2.2]
            .iter()
            .map(|&x| Point3::new(x, 0.0, 0.0))
            .collect();
        let mut saddle =
            Structure::new(symbols(&["H", "H", "H"]), stretched, 0, 2, &characterizer).unwrap();
        saddle.energy = Some(-1.45);
        saddle.zpe = Some(0.005);
        assert_eq!(saddle.bond_matrix().bonds().count(), 0);

        let mut bonds = BondMatrix::new(3);
        bonds.set(0, 1, 1).unwrap();
        bonds.set(1, 2, 1).unwrap();
        let rebuilt = saddle.with_connectivity(&bonds).unwrap();

        assert!(rebuilt.bond_matrix().is_bonded(0, 1));
        assert!(rebuilt.bond_matrix().is_bonded(1, 2));
        assert_eq!(rebuilt.geometry(), saddle.geometry());
        assert_eq!(rebuilt.energy, Some(-1.45));
        assert_eq!(rebuilt.zpe, Some(0.005));
        assert_eq!(
            saddle.with_connectivity(&BondMatrix::new(2)),
            Err(StructureError::CharacterizationMismatch {
                got: 2,
                expected: 3
            })
        );
    }
}
