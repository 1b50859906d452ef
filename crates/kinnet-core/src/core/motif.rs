//! Labeled-path search over a molecular bond graph.
//!
//! A motif is a sequence of positional labels, each either the wildcard `"X"`
//! or an element symbol. An embedding is an ordered tuple of distinct atoms,
//! consecutive atoms bonded, whose symbols satisfy the labels position by
//! position. Ring motifs are expressed as paths whose first and last atoms the
//! caller additionally checks for a closing bond.

use crate::core::models::topology::BondMatrix;
use std::collections::HashSet;

/// Label matching any element.
pub const WILDCARD: &str = "X";

/// Finds all distinct embeddings of `labels` in the bond graph.
///
/// With an `anchor`, every walk starts at that atom. Without one, walks start
/// from the lowest-indexed atom of each symmetry class, since walks from
/// equivalent atoms would only reproduce equivalent embeddings. An embedding is
/// dropped when one with the same symmetry classes at both endpoints and the
/// same interior atoms was already returned.
///
/// The search is a depth-first, self-avoiding walk with neighbours visited in
/// ascending index order, so the result is deterministic.
pub fn find_embeddings(
    labels: &[&str],
    bonds: &BondMatrix,
    atoms: &[String],
    anchor: Option<usize>,
    symmetry_classes: &[usize],
) -> Vec<Vec<usize>> {
    let natoms = bonds.natoms().min(atoms.len()).min(symmetry_classes.len());
    if labels.is_empty() || natoms == 0 {
        return Vec::new();
    }

    let starts: Vec<usize> = match anchor {
        Some(a) if a < natoms => vec![a],
        Some(_) => Vec::new(),
        None => {
            let mut seen_classes = HashSet::new();
            (0..natoms)
                .filter(|&i| seen_classes.insert(symmetry_classes[i]))
                .collect()
        }
    };

    let mut search = Search {
        labels,
        bonds,
        atoms,
        natoms,
        path: Vec::with_capacity(labels.len()),
        visited: vec![false; natoms],
        found: Vec::new(),
    };
    for start in starts {
        if matches_label(labels[0], &atoms[start]) {
            search.extend(start);
        }
    }

    let mut seen = HashSet::new();
    search
        .found
        .into_iter()
        .filter(|path| {
            let first = symmetry_classes[path[0]];
            let last = symmetry_classes[path[path.len() - 1]];
            let interior = if path.len() > 2 {
                path[1..path.len() - 1].to_vec()
            } else {
                Vec::new()
            };
            seen.insert((first, interior, last))
        })
        .collect()
}

/// Checks consecutive bond orders along `path` against `pattern`.
///
/// `pattern[k]` constrains the bond between `path[k]` and `path[k + 1]`;
/// `None` accepts any order. A pattern shorter than the path leaves the
/// remaining bonds unconstrained; a longer one never matches.
pub fn bond_filter(path: &[usize], bonds: &BondMatrix, pattern: &[Option<u8>]) -> bool {
    if pattern.len() + 1 > path.len().max(1) {
        return false;
    }
    pattern.iter().enumerate().all(|(k, required)| match required {
        Some(order) => bonds.get(path[k], path[k + 1]) == *order,
        None => true,
    })
}

fn matches_label(label: &str, symbol: &str) -> bool {
    label == WILDCARD || label == symbol
}

struct Search<'a> {
    labels: &'a [&'a str],
    bonds: &'a BondMatrix,
    atoms: &'a [String],
    natoms: usize,
    path: Vec<usize>,
    visited: Vec<bool>,
    found: Vec<Vec<usize>>,
}

impl Search<'_> {
    fn extend(&mut self, atom: usize) {
        self.path.push(atom);
        self.visited[atom] = true;

        if self.path.len() == self.labels.len() {
            self.found.push(self.path.clone());
        } else {
            let label = self.labels[self.path.len()];
            for next in 0..self.natoms {
                if !self.visited[next]
                    && self.bonds.is_bonded(atom, next)
                    && matches_label(label, &self.atoms[next])
                {
                    self.extend(next);
                }
            }
        }

        self.visited[atom] = false;
        self.path.pop();
    }
}
