use crate::core::models::structure::Structure;
use crate::core::utils::geometry;
use nalgebra::Point3;
use rand::Rng;
use rand::seq::SliceRandom;

/// One ring conformer to build: the selected ring dihedrals and their targets.
#[derive(Debug, Clone, PartialEq)]
pub struct RingConformerPlan {
    pub ring: usize,
    pub dihedrals: Vec<[usize; 4]>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RingConformerSearch {
    /// Ring-puckering variants to optimize.
    pub variants: Vec<RingConformerPlan>,
    /// Geometries carried forward unchanged (three-membered rings have no
    /// conformers of their own).
    pub retained: Vec<Vec<Point3<f64>>>,
}

/// Enumerates ring conformers for every ring of the structure.
///
/// For a ring of `n` atoms, `n - 3` of its `n` dihedrals are chosen at random
/// and each is set to `-d`, `0` or `+d`, where `d` is the mean absolute ring
/// dihedral, giving `3^(n-3)` variants. Three-membered rings are rigid and only
/// keep the input geometry.
pub fn generate_ring_conformers<R: Rng + ?Sized>(
    structure: &Structure,
    rng: &mut R,
) -> RingConformerSearch {
    let mut search = RingConformerSearch::default();
    let geom = structure.geometry();

    for (ring_index, ring) in structure.rings().iter().enumerate() {
        let n = ring.len();
        if n <= 3 {
            search.retained.push(geom.to_vec());
            continue;
        }

        let dihedrals: Vec<[usize; 4]> = (0..n)
            .map(|i| {
                [
                    ring[(i + n - 3) % n],
                    ring[(i + n - 2) % n],
                    ring[(i + n - 1) % n],
                    ring[i],
                ]
            })
            .collect();
        let flatness = dihedrals
            .iter()
            .map(|d| geometry::dihedral(&geom[d[0]], &geom[d[1]], &geom[d[2]], &geom[d[3]]).abs())
            .sum::<f64>()
            / n as f64;

        let independent = n - 3;
        let selected: Vec<[usize; 4]> = dihedrals
            .choose_multiple(rng, independent)
            .copied()
            .collect();

        for index in 0..3usize.pow(independent as u32) {
            let values = (0..independent)
                .map(|j| {
                    let digit = (index / 3usize.pow(j as u32)) % 3;
                    flatness * (digit as f64 - 1.0)
                })
                .collect();
            search.variants.push(RingConformerPlan {
                ring: ring_index,
                dihedrals: selected.clone(),
                values,
            });
        }
    }
    search
}
