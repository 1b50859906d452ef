//! Structure characterization: bond perception, bond orders, radical sites,
//! rings, symmetry classes and the canonical chemid.

pub mod characterize;

#[cfg(test)]
pub(crate) mod fixtures {
    use super::characterize::characterize_connectivity;
    use crate::core::models::structure::Structure;
    use crate::core::models::topology::BondMatrix;
    use nalgebra::Point3;

    pub fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    pub fn connectivity(natoms: usize, edges: &[(usize, usize)]) -> BondMatrix {
        let mut bonds = BondMatrix::new(natoms);
        for &(i, j) in edges {
            bonds.set(i, j, 1).unwrap();
        }
        bonds
    }

    /// Builds a structure from an explicit graph. Coordinates are a simple
    /// zig-zag and carry no chemical meaning.
    pub fn from_edges(atoms: &[&str], edges: &[(usize, usize)], multiplicity: u32) -> Structure {
        let atoms = symbols(atoms);
        let bonds = connectivity(atoms.len(), edges);
        let geometry = (0..atoms.len())
            .map(|i| Point3::new(1.4 * i as f64, 0.8 * (i % 2) as f64, 0.1 * (i % 3) as f64))
            .collect();
        let characterization = characterize_connectivity(&atoms, &bonds, 0, multiplicity);
        Structure::from_parts(atoms, geometry, 0, multiplicity, characterization).unwrap()
    }

    pub fn ethane() -> Structure {
        from_edges(
            &["C", "C", "H", "H", "H", "H", "H", "H"],
            &[(0, 1), (0, 2), (0, 3), (0, 4), (1, 5), (1, 6), (1, 7)],
            1,
        )
    }

    /// CH2(.)-CH2-CH3 with the radical on atom 0.
    pub fn propyl_radical() -> Structure {
        from_edges(
            &["C", "C", "C", "H", "H", "H", "H", "H", "H", "H"],
            &[
                (0, 1),
                (1, 2),
                (0, 3),
                (0, 4),
                (1, 5),
                (1, 6),
                (2, 7),
                (2, 8),
                (2, 9),
            ],
            2,
        )
    }

    /// CH2=CH-CH3.
    pub fn propene() -> Structure {
        from_edges(
            &["C", "C", "C", "H", "H", "H", "H", "H", "H"],
            &[
                (0, 1),
                (1, 2),
                (0, 3),
                (0, 4),
                (1, 5),
                (2, 6),
                (2, 7),
                (2, 8),
            ],
            1,
        )
    }

    pub fn cyclobutane() -> Structure {
        from_edges(
            &["C", "C", "C", "C", "H", "H", "H", "H", "H", "H", "H", "H"],
            &[
                (0, 1),
                (1, 2),
                (2, 3),
                (3, 0),
                (0, 4),
                (0, 5),
                (1, 6),
                (1, 7),
                (2, 8),
                (2, 9),
                (3, 10),
                (3, 11),
            ],
            1,
        )
    }

    pub fn cyclopropane() -> Structure {
        from_edges(
            &["C", "C", "C", "H", "H", "H", "H", "H", "H"],
            &[
                (0, 1),
                (1, 2),
                (2, 0),
                (0, 3),
                (0, 4),
                (1, 5),
                (1, 6),
                (2, 7),
                (2, 8),
            ],
            1,
        )
    }
}
