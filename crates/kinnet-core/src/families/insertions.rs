//! Reverse insertions: extrusion of a group from between two partners that end
//! up bonded to each other.

use super::{
    ConstraintSet, FamilyContext, ReactionFamily, bond_walk_schedule, dedup_by_ends, search,
};
use crate::core::models::element;
use crate::core::models::structure::Structure;
use std::sync::Arc;

pub(super) fn families() -> Vec<Arc<dyn ReactionFamily>> {
    vec![
        Arc::new(R12InsertionReverse),
        Arc::new(R13InsertionCO2),
        Arc::new(R13InsertionROR),
        Arc::new(R13InsertionRSR),
    ]
}

/// Extrusion of the middle atom of `X-Y-Z`, leaving `X-Z` bonded.
pub struct R12InsertionReverse;

impl ReactionFamily for R12InsertionReverse {
    fn name(&self) -> &'static str {
        "r12_insertion_R"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        if !reactant.is_closed_shell() {
            return Vec::new();
        }
        let found = search(reactant, &["X", "X", "X"], None)
            .into_iter()
            .filter(|p| reactant.element(p[1]) != "H")
            .collect();
        dedup_by_ends(found)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        let length = |a: isize, b: isize| element::standard_bond_length(ctx.element(a), ctx.element(b));
        bond_walk_schedule(
            step,
            ctx,
            &[
                (0, 2, 1.2 * length(0, 2)),
                (0, 1, 1.3 * length(0, 1)),
            ],
        )
    }
}

const R13_DIHEDRAL_STEPS: usize = 12;

/// Four-center schedule: flatten the `X-Y-Z-W` dihedral, then walk the four
/// ring bonds to their transition-state lengths.
fn four_center_schedule(step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
    let transfer = if ctx.element(0) == "H" { 1.3 } else { 2.0 };
    let targets = [
        (0, 1, transfer),
        (1, 2, 1.45),
        (2, 3, 2.0),
        (3, 0, transfer),
    ];
    let mut cs = ConstraintSet::new(step);
    if step < ctx.max_step {
        cs.fix_bonds(ctx);
    }
    if step < R13_DIHEDRAL_STEPS {
        cs.set_ring_dihedrals(ctx, step, R13_DIHEDRAL_STEPS, 0);
    } else if step < ctx.max_step {
        if step == R13_DIHEDRAL_STEPS {
            cs.release_ring_dihedrals(ctx, 0);
        }
        for (a, b, target) in targets {
            cs.walk_bond(
                ctx,
                a,
                b,
                step - R13_DIHEDRAL_STEPS,
                ctx.max_step - R13_DIHEDRAL_STEPS,
                target,
            );
        }
    }
    cs.clean()
}

fn four_center_instances(reactant: &Structure, labels: &[&str]) -> Vec<Vec<usize>> {
    if !reactant.is_closed_shell() {
        return Vec::new();
    }
    dedup_by_ends(search(reactant, labels, None))
}

/// Loss of CO2 from a carboxylic ester or acid, joining the two partners.
pub struct R13InsertionCO2;

impl ReactionFamily for R13InsertionCO2 {
    fn name(&self) -> &'static str {
        "r13_insertion_CO2"
    }

    fn max_step(&self) -> usize {
        22
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        let bonds = reactant.bond_matrix();
        four_center_instances(reactant, &["X", "C", "O", "X"])
            .into_iter()
            .filter(|p| {
                bonds.neighbors(p[1]).any(|n| {
                    !p.contains(&n) && reactant.element(n) == "O" && bonds.get(p[1], n) == 2
                })
            })
            .collect()
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        four_center_schedule(step, ctx)
    }
}

pub struct R13InsertionROR;

impl ReactionFamily for R13InsertionROR {
    fn name(&self) -> &'static str {
        "r13_insertion_ROR"
    }

    fn max_step(&self) -> usize {
        22
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        four_center_instances(reactant, &["X", "X", "X", "O"])
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        four_center_schedule(step, ctx)
    }
}

pub struct R13InsertionRSR;

impl ReactionFamily for R13InsertionRSR {
    fn name(&self) -> &'static str {
        "r13_insertion_RSR"
    }

    fn max_step(&self) -> usize {
        22
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        four_center_instances(reactant, &["X", "X", "X", "S"])
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        four_center_schedule(step, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::fixtures;
    use crate::families::Coordinate;

    fn ethanol() -> Structure {
        fixtures::from_edges(
            &["C", "C", "O", "H", "H", "H", "H", "H", "H"],
            &[(0, 1), (1, 2), (2, 3), (0, 4), (0, 5), (0, 6), (1, 7), (1, 8)],
            1,
        )
    }

    #[test]
    fn ror_instance_ends_on_the_oxygen() {
        assert_eq!(R13InsertionROR.find_instances(&ethanol()), vec![vec![4, 0, 1, 2]]);
        assert!(R13InsertionRSR.find_instances(&ethanol()).is_empty());
    }

    #[test]
    fn hydrogen_transfer_uses_short_four_center_bonds() {
        let molecule = ethanol();
        let instance = [4, 0, 1, 2];
        let ctx = FamilyContext {
            reactant: &molecule,
            instance: &instance,
            geometry: molecule.geometry(),
            max_step: 22,
        };
        let cs = R13InsertionROR.constraints(21, &ctx);
        assert_eq!(cs.change.len(), 4);
        assert_eq!(cs.change[0].coordinate, Coordinate::Bond([4, 0]));
        assert_eq!(cs.change[0].value, 1.3);
        assert_eq!(cs.change[2].value, 2.0);

        let flattening = R13InsertionROR.constraints(0, &ctx);
        assert_eq!(flattening.change.len(), 1);
        assert!(R13InsertionROR.constraints(22, &ctx).is_unguided());
    }

    #[test]
    fn co2_loss_requires_a_second_carbonyl_oxygen() {
        // CH3-C(=O)-O-CH3
        let ester = fixtures::from_edges(
            &["C", "C", "O", "O", "C", "H", "H", "H", "H", "H", "H"],
            &[
                (0, 1),
                (1, 2),
                (1, 3),
                (3, 4),
                (0, 5),
                (0, 6),
                (0, 7),
                (4, 8),
                (4, 9),
                (4, 10),
            ],
            1,
        );
        assert_eq!(R13InsertionCO2.find_instances(&ester), vec![vec![0, 1, 3, 4]]);
        assert!(R13InsertionCO2.find_instances(&ethanol()).is_empty());
    }

    #[test]
    fn extrusion_skips_hydrogen_centres() {
        let found = R12InsertionReverse.find_instances(&fixtures::ethane());
        assert!(!found.is_empty());
        assert!(found.iter().all(|p| p[1] < 2));
    }
}
