use crate::core::models::element;
use crate::core::models::structure::Chemid;
use crate::core::models::topology::BondMatrix;
use nalgebra::Point3;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Graph-level description of a structure, as produced by a [`Characterizer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Characterization {
    pub bond_matrix: BondMatrix,
    pub chemid: Chemid,
    /// Unpaired electrons per atom.
    pub radical_sites: Vec<u8>,
    /// Smallest rings, each as an ordered cycle of atom indices.
    pub rings: Vec<Vec<usize>>,
    /// Symmetry-equivalence class per atom; equal values mean interchangeable atoms.
    pub symmetry_classes: Vec<usize>,
}

/// Derives bonds, identity and symmetry information from raw coordinates.
pub trait Characterizer: Send + Sync {
    fn characterize(
        &self,
        atoms: &[String],
        geometry: &[Point3<f64>],
        charge: i32,
        multiplicity: u32,
    ) -> Characterization;
}

/// Distance-based bond perception followed by valence-driven bond-order
/// assignment and iterative neighbourhood refinement for symmetry classes.
#[derive(Debug, Clone, Copy)]
pub struct GraphCharacterizer {
    /// Two atoms are bonded when closer than this factor times the sum of their
    /// covalent radii.
    pub bond_tolerance: f64,
}

impl Default for GraphCharacterizer {
    fn default() -> Self {
        Self {
            bond_tolerance: 1.25,
        }
    }
}

impl Characterizer for GraphCharacterizer {
    fn characterize(
        &self,
        atoms: &[String],
        geometry: &[Point3<f64>],
        charge: i32,
        multiplicity: u32,
    ) -> Characterization {
        let connectivity = self.perceive_connectivity(atoms, geometry);
        characterize_connectivity(atoms, &connectivity, charge, multiplicity)
    }
}

impl GraphCharacterizer {
    pub fn perceive_connectivity(&self, atoms: &[String], geometry: &[Point3<f64>]) -> BondMatrix {
        let n = atoms.len().min(geometry.len());
        let mut bonds = BondMatrix::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let cutoff = self.bond_tolerance
                    * (element::covalent_radius(&atoms[i]) + element::covalent_radius(&atoms[j]));
                if (geometry[i] - geometry[j]).norm() < cutoff {
                    // Indices are in range and distinct by construction.
                    let _ = bonds.set(i, j, 1);
                }
            }
        }
        bonds
    }
}

/// Characterizes a structure from its connectivity alone.
///
/// Bond orders are reassigned from element valences; the chemid and symmetry
/// classes depend only on elements, connectivity, charge and multiplicity, so
/// resonance forms of the same species share a chemid.
pub fn characterize_connectivity(
    atoms: &[String],
    connectivity: &BondMatrix,
    charge: i32,
    multiplicity: u32,
) -> Characterization {
    let (bond_matrix, radical_sites) = assign_bond_orders(atoms, connectivity, multiplicity);
    let rings = find_rings(&bond_matrix);
    let (symmetry_classes, canonical_labels) = refine_classes(atoms, &bond_matrix);
    let chemid = compute_chemid(atoms, &canonical_labels, charge, multiplicity);
    Characterization {
        bond_matrix,
        chemid,
        radical_sites,
        rings,
        symmetry_classes,
    }
}

fn assign_bond_orders(
    atoms: &[String],
    connectivity: &BondMatrix,
    multiplicity: u32,
) -> (BondMatrix, Vec<u8>) {
    let n = atoms.len();
    let mut bonds = BondMatrix::new(n);
    for (i, j, _) in connectivity.bonds() {
        let _ = bonds.set(i, j, 1);
    }
    let mut free: Vec<i32> = (0..n)
        .map(|i| (element::valence(&atoms[i]) as i32 - bonds.degree(i) as i32).max(0))
        .collect();

    let edges: Vec<(usize, usize)> = bonds.bonds().map(|(i, j, _)| (i, j)).collect();
    loop {
        let mut changed = false;
        for &(i, j) in &edges {
            if free[i] > 0 && free[j] > 0 && bonds.get(i, j) < 3 {
                let _ = bonds.set(i, j, bonds.get(i, j) + 1);
                free[i] -= 1;
                free[j] -= 1;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // High-spin states need their unpaired electrons back from multiple bonds.
    let unpaired = multiplicity.saturating_sub(1) as i32;
    while free.iter().sum::<i32>() < unpaired {
        let Some(&(i, j)) = edges.iter().rev().find(|&&(i, j)| bonds.get(i, j) > 1) else {
            break;
        };
        let _ = bonds.set(i, j, bonds.get(i, j) - 1);
        free[i] += 1;
        free[j] += 1;
    }

    let radicals = free.into_iter().map(|f| f.clamp(0, 3) as u8).collect();
    (bonds, radicals)
}

/// Smallest ring through every bond, deduplicated by atom set.
fn find_rings(bonds: &BondMatrix) -> Vec<Vec<usize>> {
    let mut seen: HashSet<BTreeSet<usize>> = HashSet::new();
    let mut rings = Vec::new();
    for (i, j, _) in bonds.bonds() {
        let Some(path) = shortest_path_avoiding_edge(bonds, i, j) else {
            continue;
        };
        let key: BTreeSet<usize> = path.iter().copied().collect();
        if seen.insert(key) {
            rings.push(canonical_cycle(path));
        }
    }
    rings.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    rings
}

fn shortest_path_avoiding_edge(bonds: &BondMatrix, from: usize, to: usize) -> Option<Vec<usize>> {
    let n = bonds.natoms();
    let mut previous = vec![usize::MAX; n];
    let mut visited = vec![false; n];
    let mut queue = VecDeque::from([from]);
    visited[from] = true;
    while let Some(atom) = queue.pop_front() {
        for next in bonds.neighbors(atom) {
            if atom == from && next == to {
                continue;
            }
            if visited[next] {
                continue;
            }
            visited[next] = true;
            previous[next] = atom;
            if next == to {
                let mut path = vec![to];
                let mut cursor = to;
                while cursor != from {
                    cursor = previous[cursor];
                    path.push(cursor);
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}

/// Rotates a cycle to start at its lowest atom and walk toward the lower neighbour.
fn canonical_cycle(mut cycle: Vec<usize>) -> Vec<usize> {
    let Some(start) = cycle.iter().enumerate().min_by_key(|(_, a)| **a).map(|(i, _)| i) else {
        return cycle;
    };
    cycle.rotate_left(start);
    if cycle.len() > 2 && cycle[cycle.len() - 1] < cycle[1] {
        cycle[1..].reverse();
    }
    cycle
}

fn ranks_from_labels(labels: &[String]) -> Vec<usize> {
    let unique: BTreeSet<&String> = labels.iter().collect();
    let index: BTreeMap<&String, usize> = unique.into_iter().enumerate().map(|(r, l)| (l, r)).collect();
    labels.iter().map(|l| index[l]).collect()
}

fn refine_classes(atoms: &[String], bonds: &BondMatrix) -> (Vec<usize>, Vec<String>) {
    let n = atoms.len();
    let mut labels: Vec<String> = (0..n)
        .map(|i| format!("{}:{}", atoms[i], bonds.degree(i)))
        .collect();
    let mut ranks = ranks_from_labels(&labels);
    let mut classes = ranks.iter().collect::<BTreeSet<_>>().len();

    for _ in 0..n {
        labels = (0..n)
            .map(|i| {
                let mut neighbourhood: Vec<usize> = bonds.neighbors(i).map(|j| ranks[j]).collect();
                neighbourhood.sort_unstable();
                format!("{}{:?}", ranks[i], neighbourhood)
            })
            .collect();
        let refined = ranks_from_labels(&labels);
        let refined_classes = refined.iter().collect::<BTreeSet<_>>().len();
        ranks = refined;
        if refined_classes == classes {
            break;
        }
        classes = refined_classes;
    }
    (ranks, labels)
}

fn formula(atoms: &[String]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for atom in atoms {
        *counts.entry(atom.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(symbol, count)| format!("{symbol}{count}"))
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn compute_chemid(atoms: &[String], labels: &[String], charge: i32, multiplicity: u32) -> Chemid {
    let mut sorted: Vec<&String> = labels.iter().collect();
    sorted.sort();
    let canonical = format!(
        "{}|{}|{}|{}",
        formula(atoms),
        charge,
        multiplicity,
        sorted.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(";")
    );
    Chemid::new(fnv1a(canonical.as_bytes()).to_string())
}
