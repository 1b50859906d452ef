//! Radical and R-H additions to multiple bonds, and their reverse scissions.

use super::{
    ConstraintSet, FamilyContext, ReactionFamily, bond_walk_schedule, chain, closes_ring,
    dedup_by_ends, ring_closure_schedule, search, search_from_radicals,
};
use crate::core::models::element;
use crate::core::models::structure::Structure;
use crate::core::motif;
use std::sync::Arc;

pub(super) fn families() -> Vec<Arc<dyn ReactionFamily>> {
    vec![
        Arc::new(IntraRHAddEndocyclicForward),
        Arc::new(IntraRHAddEndocyclicReverse),
        Arc::new(IntraRHAddExocyclicForward),
        Arc::new(IntraRHAddExocyclicReverse),
        Arc::new(IntraRAddEndocyclicForward),
        Arc::new(IntraRAddExoTetCyclicForward),
        Arc::new(IntraRAddExocyclicForward),
        Arc::new(RAdditionMultipleBond),
        Arc::new(RAdditionCOReverse),
        Arc::new(RAdditionCSReverse),
    ]
}

/// Appends the lowest-indexed hydrogen bonded to `path[position]`.
fn with_hydrogen_on(reactant: &Structure, mut path: Vec<usize>, position: usize) -> Option<Vec<usize>> {
    let h = reactant
        .bond_matrix()
        .neighbors(path[position])
        .find(|&n| reactant.element(n) == "H" && !path.contains(&n))?;
    path.push(h);
    Some(path)
}

fn last_bond_is_multiple(reactant: &Structure, path: &[usize]) -> bool {
    let n = path.len();
    reactant.bond_matrix().get(path[n - 2], path[n - 1]) > 1
}

/// R-H adding across a double bond whose both atoms end up in the new ring.
fn rh_forward_instances(reactant: &Structure, sizes: std::ops::RangeInclusive<usize>) -> Vec<Vec<usize>> {
    if !reactant.is_closed_shell() {
        return Vec::new();
    }
    let mut found = Vec::new();
    for size in sizes {
        found.extend(
            search(reactant, &chain(size, "H"), None)
                .into_iter()
                .filter(|p| motif::bond_filter(p, reactant.bond_matrix(), &[Some(2)])),
        );
    }
    dedup_by_ends(found)
}

pub struct IntraRHAddEndocyclicForward;

impl ReactionFamily for IntraRHAddEndocyclicForward {
    fn name(&self) -> &'static str {
        "Intra_RH_Add_Endocyclic_F"
    }

    fn max_step(&self) -> usize {
        14
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        rh_forward_instances(reactant, 5..=8)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        ring_closure_schedule(step, ctx, 1, &[(0, -2, 2.2), (1, -1, 1.35)])
    }
}

/// Ring opening with the ring hydrogen returning to the chain end.
pub struct IntraRHAddEndocyclicReverse;

impl ReactionFamily for IntraRHAddEndocyclicReverse {
    fn name(&self) -> &'static str {
        "Intra_RH_Add_Endocyclic_R"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        if !reactant.is_closed_shell() {
            return Vec::new();
        }
        let mut found = Vec::new();
        for size in 5..=8 {
            found.extend(
                search(reactant, &vec![motif::WILDCARD; size], None)
                    .into_iter()
                    .filter(|p| closes_ring(reactant, p))
                    .filter_map(|p| with_hydrogen_on(reactant, p, 1)),
            );
        }
        dedup_by_ends(found)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        bond_walk_schedule(step, ctx, &[(0, -2, 2.2), (-2, -1, 1.35), (1, -1, 1.35)])
    }
}

pub struct IntraRHAddExocyclicForward;

impl ReactionFamily for IntraRHAddExocyclicForward {
    fn name(&self) -> &'static str {
        "Intra_RH_Add_Exocyclic_F"
    }

    fn max_step(&self) -> usize {
        14
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        rh_forward_instances(reactant, 4..=8)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        ring_closure_schedule(step, ctx, 1, &[(1, -2, 2.2), (0, -1, 1.35)])
    }
}

pub struct IntraRHAddExocyclicReverse;

impl ReactionFamily for IntraRHAddExocyclicReverse {
    fn name(&self) -> &'static str {
        "Intra_RH_Add_Exocyclic_R"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        if !reactant.is_closed_shell() {
            return Vec::new();
        }
        let bonds = reactant.bond_matrix();
        let mut found = Vec::new();
        for ring_size in 3..=7 {
            found.extend(
                search(reactant, &vec![motif::WILDCARD; ring_size + 1], None)
                    .into_iter()
                    .filter(|p| {
                        let last = p[p.len() - 1];
                        bonds.is_bonded(p[1], last) && !bonds.is_bonded(p[0], last)
                    })
                    .filter_map(|p| with_hydrogen_on(reactant, p, 0)),
            );
        }
        dedup_by_ends(found)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        bond_walk_schedule(step, ctx, &[(1, -2, 2.2), (-2, -1, 1.35), (0, -1, 1.35)])
    }
}

/// Radical attack on the far end of a multiple bond, closing a ring that
/// contains the multiple bond.
pub struct IntraRAddEndocyclicForward;

impl ReactionFamily for IntraRAddEndocyclicForward {
    fn name(&self) -> &'static str {
        "Intra_R_Add_Endocyclic_F"
    }

    fn max_step(&self) -> usize {
        14
    }

    fn skip(&self) -> bool {
        true
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        let mut found = Vec::new();
        for size in 3..=9 {
            found.extend(
                search_from_radicals(reactant, &vec![motif::WILDCARD; size])
                    .into_iter()
                    .filter(|p| last_bond_is_multiple(reactant, p)),
            );
        }
        dedup_by_ends(found)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        ring_closure_schedule(step, ctx, 0, &[(0, -1, 2.2)])
    }
}

/// Radical attack on a saturated center, displacing its last substituent.
pub struct IntraRAddExoTetCyclicForward;

impl ReactionFamily for IntraRAddExoTetCyclicForward {
    fn name(&self) -> &'static str {
        "Intra_R_Add_ExoTetCyclic_F"
    }

    fn max_step(&self) -> usize {
        14
    }

    fn skip(&self) -> bool {
        true
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        let bonds = reactant.bond_matrix();
        let mut found = Vec::new();
        for size in 4..=9 {
            found.extend(
                search_from_radicals(reactant, &vec![motif::WILDCARD; size])
                    .into_iter()
                    .filter(|p| {
                        let n = p.len();
                        reactant.element(p[n - 1]) != "H" && bonds.get(p[n - 2], p[n - 1]) == 1
                    }),
            );
        }
        dedup_by_ends(found)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        ring_closure_schedule(step, ctx, 1, &[(0, -2, 2.0), (-2, -1, 2.0)])
    }
}

/// Radical attack on the near end of a multiple bond; the multiple bond stays
/// outside the new ring.
pub struct IntraRAddExocyclicForward;

impl ReactionFamily for IntraRAddExocyclicForward {
    fn name(&self) -> &'static str {
        "Intra_R_Add_Exocyclic_F"
    }

    fn max_step(&self) -> usize {
        14
    }

    fn skip(&self) -> bool {
        true
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        let mut found = Vec::new();
        for size in 4..=9 {
            found.extend(
                search_from_radicals(reactant, &vec![motif::WILDCARD; size])
                    .into_iter()
                    .filter(|p| last_bond_is_multiple(reactant, p)),
            );
        }
        dedup_by_ends(found)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        ring_closure_schedule(step, ctx, 1, &[(0, -2, 2.2)])
    }
}

/// Beta scission of a radical, the reverse of a radical adding to a multiple
/// bond. The breaking bond is scanned.
pub struct RAdditionMultipleBond;

impl ReactionFamily for RAdditionMultipleBond {
    fn name(&self) -> &'static str {
        "R_Addition_MultipleBond"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn scan(&self) -> bool {
        true
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        search_from_radicals(reactant, &["X", "X", "X"])
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        let target = 1.55 * element::standard_bond_length(ctx.element(1), ctx.element(2));
        bond_walk_schedule(step, ctx, &[(1, 2, target)])
    }
}

fn small_molecule_loss(reactant: &Structure, partner: &'static str) -> Vec<Vec<usize>> {
    let radicals = reactant.radical_sites();
    let bonds = reactant.bond_matrix();
    search(reactant, &["X", "C", partner], None)
        .into_iter()
        .filter(|p| radicals[p[1]] > 0 && bonds.get(p[1], p[2]) >= 2)
        .collect()
}

/// Loss of CO from an acyl radical.
pub struct RAdditionCOReverse;

impl ReactionFamily for RAdditionCOReverse {
    fn name(&self) -> &'static str {
        "R_Addition_COm3_R"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        small_molecule_loss(reactant, "O")
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        bond_walk_schedule(step, ctx, &[(0, 1, 2.1)])
    }
}

/// Loss of CS from a thioacyl radical.
pub struct RAdditionCSReverse;

impl ReactionFamily for RAdditionCSReverse {
    fn name(&self) -> &'static str {
        "R_Addition_CSm_R"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        small_molecule_loss(reactant, "S")
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        bond_walk_schedule(step, ctx, &[(0, 1, 2.1)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::fixtures;
    use crate::families::Coordinate;

    /// .CH2-CH2-CH=CH2
    fn butenyl_radical() -> Structure {
        fixtures::from_edges(
            &["C", "C", "C", "C", "H", "H", "H", "H", "H", "H", "H"],
            &[
                (0, 1),
                (1, 2),
                (2, 3),
                (0, 4),
                (0, 5),
                (1, 6),
                (1, 7),
                (2, 8),
                (3, 9),
                (3, 10),
            ],
            2,
        )
    }

    #[test]
    fn radical_additions_require_a_terminal_multiple_bond() {
        let radical = butenyl_radical();
        assert_eq!(
            IntraRAddExocyclicForward.find_instances(&radical),
            vec![vec![0, 1, 2, 3]]
        );
        assert_eq!(
            IntraRAddEndocyclicForward.find_instances(&radical),
            vec![vec![0, 1, 2, 3]]
        );
        assert!(
            IntraRAddExocyclicForward
                .find_instances(&fixtures::propyl_radical())
                .is_empty()
        );
    }

    #[test]
    fn exocyclic_closure_keeps_the_last_atom_out_of_the_ring() {
        let radical = butenyl_radical();
        let instance = [0, 1, 2, 3];
        let ctx = FamilyContext {
            reactant: &radical,
            instance: &instance,
            geometry: radical.geometry(),
            max_step: 14,
        };
        let first = IntraRAddExocyclicForward.constraints(0, &ctx);
        assert!(first.change.is_empty());
        let last = IntraRAddExocyclicForward.constraints(13, &ctx);
        assert_eq!(last.change.len(), 1);
        assert_eq!(last.change[0].coordinate, Coordinate::Bond([0, 2]));
    }

    #[test]
    fn beta_scission_is_a_scan_from_the_radical_site() {
        let propyl = fixtures::propyl_radical();
        let found = RAdditionMultipleBond.find_instances(&propyl);
        assert_eq!(found, vec![vec![0, 1, 2], vec![0, 1, 5]]);
        assert!(RAdditionMultipleBond.scan());
    }

    #[test]
    fn acyl_radical_loses_carbon_monoxide() {
        // CH3-C(.)=O
        let acetyl = fixtures::from_edges(
            &["C", "C", "O", "H", "H", "H"],
            &[(0, 1), (1, 2), (0, 3), (0, 4), (0, 5)],
            2,
        );
        assert_eq!(RAdditionCOReverse.find_instances(&acetyl), vec![vec![0, 1, 2]]);
        assert!(RAdditionCSReverse.find_instances(&acetyl).is_empty());
    }

    #[test]
    fn rh_additions_skip_open_shell_species() {
        let radical = butenyl_radical();
        assert!(IntraRHAddEndocyclicForward.find_instances(&radical).is_empty());
        assert!(IntraRHAddExocyclicReverse.find_instances(&radical).is_empty());
    }

    #[test]
    fn exocyclic_ring_opening_carries_the_exocyclic_hydrogen() {
        // Methylcyclopropane: C3 outside the C0-C1-C2 ring.
        let molecule = fixtures::from_edges(
            &["C", "C", "C", "C", "H", "H", "H", "H", "H", "H", "H", "H"],
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
                (3, 9),
                (3, 10),
                (3, 11),
            ],
            1,
        );
        let found = IntraRHAddExocyclicReverse.find_instances(&molecule);
        assert!(!found.is_empty());
        for instance in &found {
            assert_eq!(instance.len(), 5);
            assert_eq!(molecule.element(instance[4]), "H");
            assert!(molecule.bond_matrix().is_bonded(instance[0], instance[4]));
        }
        assert!(found.iter().any(|i| i[0] == 3));
    }
}
