//! Intramolecular atom and group migrations.

use super::{
    ConstraintSet, FamilyContext, ReactionFamily, bond_walk_schedule, chain, closes_ring,
    dedup_by_ends, distinct_sites, ring_closure_schedule, search, search_from_radicals,
};
use crate::core::models::element;
use crate::core::models::structure::Structure;
use crate::core::motif;
use std::sync::Arc;

pub(super) fn families() -> Vec<Arc<dyn ReactionFamily>> {
    vec![
        Arc::new(IntraHMigration),
        Arc::new(IntraHMigrationSuprafacial),
        Arc::new(IntraRMigration),
        Arc::new(IntraOHMigration),
        Arc::new(CpdHMigration),
        Arc::new(SulfurShiftForward),
        Arc::new(SulfurShiftReverse),
    ]
}

/// Sites an H atom can migrate to in a closed-shell molecule.
fn acceptor_sites(reactant: &Structure) -> Vec<usize> {
    let bonds = reactant.bond_matrix();
    (0..reactant.natoms())
        .filter(|&i| {
            matches!(reactant.element(i), "O" | "N" | "S")
                || bonds.neighbors(i).any(|j| bonds.get(i, j) > 1)
        })
        .collect()
}

/// H transfer through a cyclic transition state of 3 to 8 atoms.
pub struct IntraHMigration;

impl ReactionFamily for IntraHMigration {
    fn name(&self) -> &'static str {
        "intra_H_migration"
    }

    fn max_step(&self) -> usize {
        14
    }

    fn skip(&self) -> bool {
        true
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        let anchors = if reactant.is_closed_shell() {
            acceptor_sites(reactant)
        } else {
            reactant.radical_atoms()
        };
        let anchors = distinct_sites(reactant, anchors);
        let mut found = Vec::new();
        for size in 3..=8 {
            let labels = chain(size - 1, "H");
            for &anchor in &anchors {
                found.extend(search(reactant, &labels, Some(anchor)));
            }
        }
        dedup_by_ends(found)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        ring_closure_schedule(step, ctx, 0, &[(0, -1, 1.35), (-2, -1, 1.35)])
    }
}

/// [1,3] H shift across a double bond on one face of the pi system.
pub struct IntraHMigrationSuprafacial;

impl ReactionFamily for IntraHMigrationSuprafacial {
    fn name(&self) -> &'static str {
        "intra_H_migration_suprafacial"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        search(reactant, &chain(3, "H"), None)
            .into_iter()
            .filter(|p| motif::bond_filter(p, reactant.bond_matrix(), &[Some(2)]))
            .collect()
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        let mut cs = bond_walk_schedule(step, ctx, &[(0, -1, 1.35), (-2, -1, 1.35)]);
        if step == 0 {
            cs.set_dihedral(ctx, [0, 1, 2, 3], 0.0);
        }
        cs
    }
}

/// Migration of a heavy-atom group toward a radical center.
pub struct IntraRMigration;

impl ReactionFamily for IntraRMigration {
    fn name(&self) -> &'static str {
        "intra_R_migration"
    }

    fn max_step(&self) -> usize {
        14
    }

    fn skip(&self) -> bool {
        true
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        if reactant.radical_atoms().len() != 1 {
            return Vec::new();
        }
        let mut found = Vec::new();
        for size in 3..=6 {
            let labels = vec![motif::WILDCARD; size];
            found.extend(
                search_from_radicals(reactant, &labels)
                    .into_iter()
                    .filter(|p| reactant.element(p[size - 1]) != "H"),
            );
        }
        dedup_by_ends(found)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        ring_closure_schedule(step, ctx, 0, &[(0, -1, 2.2), (-2, -1, 2.2)])
    }
}

/// OH group transfer between a radical center and a hydroperoxide, through a
/// cyclic transition state of 3 to 8 atoms. The hydroxyl hydrogen is not part
/// of the instance.
///
/// Both directions are searched from the radical site: `R. ... O-OH` and the
/// reverse `.O ... O-H`, where the alkoxy radical takes the OH group back.
pub struct IntraOHMigration;

impl ReactionFamily for IntraOHMigration {
    fn name(&self) -> &'static str {
        "intra_OH_migration"
    }

    fn max_step(&self) -> usize {
        14
    }

    fn skip(&self) -> bool {
        true
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        let mut found = Vec::new();
        for ring in 3..=8 {
            let mut forward = vec![motif::WILDCARD; ring - 2];
            forward.extend(["O", "O", "H"]);
            found.extend(search_from_radicals(reactant, &forward));

            let mut reverse = vec!["O"];
            reverse.extend(vec![motif::WILDCARD; ring - 2]);
            reverse.extend(["O", "H"]);
            found.extend(search_from_radicals(reactant, &reverse));
        }
        let found = found
            .into_iter()
            .map(|mut p| {
                p.pop();
                p
            })
            .collect();
        dedup_by_ends(found)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        let (to_first, to_last) = if ctx.element(0) == "C" {
            (2.0, 1.7)
        } else {
            (1.7, 2.0)
        };
        ring_closure_schedule(step, ctx, 0, &[(0, -1, to_first), (-2, -1, to_last)])
    }
}

/// [1,5] H shift around a cyclopentadiene ring.
pub struct CpdHMigration;

impl ReactionFamily for CpdHMigration {
    fn name(&self) -> &'static str {
        "cpd_H_migration"
    }

    fn max_step(&self) -> usize {
        14
    }

    fn skip(&self) -> bool {
        true
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        let bonds = reactant.bond_matrix();
        let found = search(reactant, &chain(5, "H"), None)
            .into_iter()
            .filter(|p| {
                let ring = &p[..5];
                let order_sum: u32 = (0..5)
                    .map(|k| bonds.get(ring[k], ring[(k + 1) % 5]) as u32)
                    .sum();
                closes_ring(reactant, ring) && order_sum == 7
            })
            .collect();
        dedup_by_ends(found)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        let mut cs = ConstraintSet::new(step);
        if step < ctx.max_step {
            cs.fix_bonds(ctx);
            if step == 0 {
                cs.set_angle(ctx, -2, -1, 0, 70.0);
            } else {
                cs.walk_bond(ctx, -2, -1, step, ctx.max_step, 1.35);
                cs.walk_bond(ctx, 0, -1, step, ctx.max_step, 1.35);
            }
        }
        cs.clean()
    }
}

fn sulfur_shift_constraints(step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
    let to_middle = element::standard_bond_length(ctx.element(1), ctx.element(2));
    let to_first = element::standard_bond_length(ctx.element(0), ctx.element(2));
    bond_walk_schedule(step, ctx, &[(1, 2, to_middle), (0, 2, to_first)])
}

/// 1,2 shift onto a radical center through an adjacent sulfur atom.
pub struct SulfurShiftForward;

impl ReactionFamily for SulfurShiftForward {
    fn name(&self) -> &'static str {
        "12_shift_S_F"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        if reactant.radical_atoms().len() != 1 {
            return Vec::new();
        }
        search_from_radicals(reactant, &["X", "S", "X"])
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        sulfur_shift_constraints(step, ctx)
    }
}

/// 1,2 shift onto a sulfur-centred radical.
pub struct SulfurShiftReverse;

impl ReactionFamily for SulfurShiftReverse {
    fn name(&self) -> &'static str {
        "12_shift_S_R"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        if reactant.radical_atoms().len() != 1 {
            return Vec::new();
        }
        search_from_radicals(reactant, &["S", "X", "X"])
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        sulfur_shift_constraints(step, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::fixtures;
    use crate::families::{Coordinate, TargetedCoordinate};

    fn context<'a>(reactant: &'a Structure, instance: &'a [usize], max_step: usize) -> FamilyContext<'a> {
        FamilyContext {
            reactant,
            instance,
            geometry: reactant.geometry(),
            max_step,
        }
    }

    #[test]
    fn h_migration_finds_one_instance_per_ring_size() {
        let propyl = fixtures::propyl_radical();
        let found = IntraHMigration.find_instances(&propyl);
        assert_eq!(found, vec![vec![0, 1, 5], vec![0, 1, 2, 7]]);
    }

    #[test]
    fn h_migration_final_step_sets_both_transfer_bonds() {
        let propyl = fixtures::propyl_radical();
        let instance = [0, 1, 2, 7];
        let cs = IntraHMigration.constraints(13, &context(&propyl, &instance, 14));
        assert!(cs.change.contains(&TargetedCoordinate {
            coordinate: Coordinate::Bond([0, 7]),
            value: 1.35
        }));
        assert!(cs.change.contains(&TargetedCoordinate {
            coordinate: Coordinate::Bond([2, 7]),
            value: 1.35
        }));
        assert!(!cs.fix.contains(&Coordinate::Bond([2, 7])));
    }

    #[test]
    fn suprafacial_shift_needs_a_leading_double_bond() {
        assert_eq!(
            IntraHMigrationSuprafacial.find_instances(&fixtures::propene()),
            vec![vec![0, 1, 2, 6]]
        );
        assert!(
            IntraHMigrationSuprafacial
                .find_instances(&fixtures::ethane())
                .is_empty()
        );
    }

    #[test]
    fn r_migration_moves_heavy_groups_only() {
        let propyl = fixtures::propyl_radical();
        assert_eq!(IntraRMigration.find_instances(&propyl), vec![vec![0, 1, 2]]);
        assert!(IntraRMigration.find_instances(&fixtures::propene()).is_empty());
    }

    #[test]
    fn oh_migration_cuts_the_hydroxyl_hydrogen() {
        // .CH2-O-O-H
        let radical = fixtures::from_edges(
            &["C", "O", "O", "H", "H", "H"],
            &[(0, 1), (1, 2), (2, 3), (0, 4), (0, 5)],
            2,
        );
        assert_eq!(IntraOHMigration.find_instances(&radical), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn oh_migration_runs_back_from_an_alkoxy_radical() {
        // .O-CH2-CH2-OH
        let radical = fixtures::from_edges(
            &["O", "C", "C", "O", "H", "H", "H", "H", "H"],
            &[(0, 1), (1, 2), (2, 3), (3, 4), (1, 5), (1, 6), (2, 7), (2, 8)],
            2,
        );
        assert_eq!(radical.radical_atoms(), vec![0]);
        assert_eq!(IntraOHMigration.find_instances(&radical), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn oh_migration_reaches_eight_membered_rings() {
        // .CH2-(CH2)5-O-OH: the radical carbon and the outer oxygen close a ring of 8.
        let mut atoms = vec!["C"; 6];
        atoms.extend(["O", "O", "H"]);
        let mut edges: Vec<(usize, usize)> = (0..8).map(|i| (i, i + 1)).collect();
        for (k, carbon) in [0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5].into_iter().enumerate() {
            atoms.push("H");
            edges.push((carbon, 9 + k));
        }
        let radical = fixtures::from_edges(&atoms, &edges, 2);
        assert_eq!(radical.radical_atoms(), vec![0]);
        let found = IntraOHMigration.find_instances(&radical);
        assert!(found.contains(&vec![0, 1, 2, 3, 4, 5, 6, 7]));
    }

    #[test]
    fn oh_migration_bond_targets_follow_the_radical_element() {
        let radical = fixtures::from_edges(
            &["O", "C", "C", "O", "H", "H", "H", "H", "H"],
            &[(0, 1), (1, 2), (2, 3), (3, 4), (1, 5), (1, 6), (2, 7), (2, 8)],
            2,
        );
        let instance = [0, 1, 2, 3];
        let last = IntraOHMigration.constraints(13, &context(&radical, &instance, 14));
        assert!(last.change.contains(&TargetedCoordinate {
            coordinate: Coordinate::Bond([0, 3]),
            value: 1.7
        }));
        assert!(last.change.contains(&TargetedCoordinate {
            coordinate: Coordinate::Bond([2, 3]),
            value: 2.0
        }));

        let peroxy = fixtures::from_edges(
            &["C", "O", "O", "H", "H", "H"],
            &[(0, 1), (1, 2), (2, 3), (0, 4), (0, 5)],
            2,
        );
        let instance = [0, 1, 2];
        let last = IntraOHMigration.constraints(13, &context(&peroxy, &instance, 14));
        assert_eq!(last.change[0].value, 2.0);
        assert_eq!(last.change[1].value, 1.7);
    }

    #[test]
    fn h_migration_starts_once_per_equivalent_radical_site() {
        // .CH2-CH2-CH2. : both radical ends are equivalent.
        let biradical = fixtures::from_edges(
            &["C", "C", "C", "H", "H", "H", "H", "H", "H"],
            &[(0, 1), (1, 2), (0, 3), (0, 4), (1, 5), (1, 6), (2, 7), (2, 8)],
            3,
        );
        assert_eq!(biradical.radical_atoms(), vec![0, 2]);
        let found = IntraHMigration.find_instances(&biradical);
        assert!(found.iter().all(|inst| inst[0] == 0));
        assert_eq!(found, vec![vec![0, 1, 5], vec![0, 1, 2, 7]]);
    }

    #[test]
    fn walk_families_stop_constraining_at_the_last_step() {
        let propene = fixtures::propene();
        let instance = [0, 1, 2, 6];
        let cs = IntraHMigrationSuprafacial.constraints(12, &context(&propene, &instance, 12));
        assert!(cs.is_unguided());
        assert!(cs.fix.is_empty());

        let first = IntraHMigrationSuprafacial.constraints(0, &context(&propene, &instance, 12));
        assert_eq!(first.change.len(), 3);
    }

    #[test]
    fn closed_shell_species_have_no_radical_families() {
        let ethane = fixtures::ethane();
        assert!(SulfurShiftForward.find_instances(&ethane).is_empty());
        assert!(SulfurShiftReverse.find_instances(&ethane).is_empty());
        assert!(IntraOHMigration.find_instances(&ethane).is_empty());
    }
}
