//! Ring-forming and ring-breaking pericyclic families.

use super::{
    ConstraintSet, FamilyContext, ReactionFamily, bond_walk_schedule, closes_ring,
    dedup_by_ends, dedup_exact, ring_closure_schedule, search, search_from_radicals,
};
use crate::core::models::structure::Structure;
use crate::core::motif;
use std::sync::Arc;

pub(super) fn families() -> Vec<Arc<dyn ReactionFamily>> {
    vec![
        Arc::new(CyclicEtherFormation),
        Arc::new(R22Cycloaddition),
        Arc::new(R12Cycloaddition),
        Arc::new(DielsAlderAddition),
        Arc::new(IntraDielsAlderReverse),
        Arc::new(R14CyclicBiradicalScission),
    ]
}

fn ring_paths(reactant: &Structure, size: usize) -> Vec<Vec<usize>> {
    search(reactant, &vec![motif::WILDCARD; size], None)
        .into_iter()
        .filter(|p| closes_ring(reactant, p))
        .collect()
}

/// A carbon radical attacks the inner oxygen of a hydroperoxide, closing a
/// cyclic ether and expelling OH.
pub struct CyclicEtherFormation;

impl ReactionFamily for CyclicEtherFormation {
    fn name(&self) -> &'static str {
        "Cyclic_Ether_Formation"
    }

    fn max_step(&self) -> usize {
        14
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        let mut found = Vec::new();
        for size in 4..=9 {
            let mut labels = vec!["C"];
            labels.extend(vec![motif::WILDCARD; size - 4]);
            labels.extend(["O", "O", "H"]);
            found.extend(search_from_radicals(reactant, &labels).into_iter().map(|mut p| {
                p.truncate(p.len() - 2);
                p
            }));
        }
        dedup_by_ends(found)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        ring_closure_schedule(step, ctx, 0, &[(0, -1, 2.0)])
    }
}

/// Cleavage of a four-membered ring into two unsaturated fragments.
pub struct R22Cycloaddition;

impl ReactionFamily for R22Cycloaddition {
    fn name(&self) -> &'static str {
        "r22_cycloaddition"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        ring_paths(reactant, 4)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        bond_walk_schedule(step, ctx, &[(0, 1, 2.2), (2, 3, 2.2)])
    }
}

/// Extrusion of one atom from a three-membered ring.
pub struct R12Cycloaddition;

impl ReactionFamily for R12Cycloaddition {
    fn name(&self) -> &'static str {
        "r12_cycloaddition"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        dedup_exact(
            ring_paths(reactant, 3)
                .into_iter()
                .map(|mut p| {
                    let apex = p[0];
                    p.sort_unstable();
                    p.retain(|&a| a != apex);
                    p.insert(0, apex);
                    p
                })
                .collect(),
        )
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        bond_walk_schedule(step, ctx, &[(0, 1, 2.2), (0, 2, 2.2)])
    }
}

/// Retro Diels-Alder cleavage of a cyclohexene ring.
pub struct DielsAlderAddition;

impl ReactionFamily for DielsAlderAddition {
    fn name(&self) -> &'static str {
        "Diels_alder_addition"
    }

    fn max_step(&self) -> usize {
        1
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        let bonds = reactant.bond_matrix();
        ring_paths(reactant, 6)
            .into_iter()
            .filter(|p| {
                let order_sum: u32 = (0..6).map(|k| bonds.get(p[k], p[(k + 1) % 6]) as u32).sum();
                order_sum == 7 && motif::bond_filter(p, bonds, &[Some(2)])
            })
            .collect()
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        let mut cs = ConstraintSet::new(step);
        if step < ctx.max_step {
            cs.fix_bonds(ctx);
            cs.set_bond(ctx, 2, 3, 2.2);
            cs.set_bond(ctx, 4, 5, 2.2);
        }
        cs.clean()
    }
}

/// Intramolecular Diels-Alder between a diene at one end of a chain and a
/// dienophile at the other.
pub struct IntraDielsAlderReverse;

impl ReactionFamily for IntraDielsAlderReverse {
    fn name(&self) -> &'static str {
        "Intra_Diels_alder_R"
    }

    fn max_step(&self) -> usize {
        10
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        if !reactant.is_closed_shell() {
            return Vec::new();
        }
        let bonds = reactant.bond_matrix();
        let mut found = Vec::new();
        for size in 7..=10 {
            found.extend(
                search(reactant, &vec![motif::WILDCARD; size], None)
                    .into_iter()
                    .filter(|p| {
                        motif::bond_filter(p, bonds, &[Some(2), Some(1), Some(2)])
                            && bonds.get(p[size - 2], p[size - 1]) == 2
                    }),
            );
        }
        dedup_by_ends(found)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        bond_walk_schedule(step, ctx, &[(0, -1, 2.2), (3, -2, 2.2)])
    }
}

/// Ring closure of a 1,4-biradical after flattening its backbone.
pub struct R14CyclicBiradicalScission;

impl ReactionFamily for R14CyclicBiradicalScission {
    fn name(&self) -> &'static str {
        "r14_cyclic_birad_scission_R"
    }

    fn max_step(&self) -> usize {
        22
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        let radicals = reactant.radical_atoms();
        if radicals.len() != 2 {
            return Vec::new();
        }
        search(reactant, &["X", "X", "X", "X"], Some(radicals[0]))
            .into_iter()
            .filter(|p| p[3] == radicals[1])
            .collect()
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        const DIHEDRAL_STEPS: usize = 12;
        let mut cs = ConstraintSet::new(step);
        if step < ctx.max_step {
            cs.fix_bonds(ctx);
        }
        if step < DIHEDRAL_STEPS {
            cs.set_ring_dihedrals(ctx, step, DIHEDRAL_STEPS, 0);
        } else if step < ctx.max_step {
            if step == DIHEDRAL_STEPS {
                cs.release_ring_dihedrals(ctx, 0);
            }
            cs.walk_bond(
                ctx,
                0,
                -1,
                step - DIHEDRAL_STEPS,
                ctx.max_step - DIHEDRAL_STEPS,
                1.8,
            );
        }
        cs.clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::fixtures;
    use crate::families::Coordinate;

    #[test]
    fn four_ring_gives_both_cleavage_directions() {
        let found = R22Cycloaddition.find_instances(&fixtures::cyclobutane());
        assert_eq!(found, vec![vec![0, 1, 2, 3], vec![0, 3, 2, 1]]);
    }

    #[test]
    fn three_ring_extrusion_lists_each_apex_once() {
        let found = R12Cycloaddition.find_instances(&fixtures::cyclopropane());
        assert_eq!(found, vec![vec![0, 1, 2]]);
        assert!(R12Cycloaddition.find_instances(&fixtures::cyclobutane()).is_empty());
    }

    #[test]
    fn cyclic_ether_instance_stops_at_the_ring_oxygen() {
        // .CH2-CH2-O-O-H
        let radical = fixtures::from_edges(
            &["C", "C", "O", "O", "H", "H", "H", "H", "H"],
            &[(0, 1), (1, 2), (2, 3), (3, 4), (0, 5), (0, 6), (1, 7), (1, 8)],
            2,
        );
        assert_eq!(
            CyclicEtherFormation.find_instances(&radical),
            vec![vec![0, 1, 2]]
        );
    }

    #[test]
    fn retro_diels_alder_sets_both_breaking_bonds_in_one_step() {
        let cyclobutane = fixtures::cyclobutane();
        let instance = [0, 1, 2, 3, 4, 5];
        let ctx = FamilyContext {
            reactant: &cyclobutane,
            instance: &instance,
            geometry: cyclobutane.geometry(),
            max_step: 1,
        };
        let cs = DielsAlderAddition.constraints(0, &ctx);
        let changed: Vec<Coordinate> = cs.change.iter().map(|c| c.coordinate).collect();
        assert_eq!(changed, vec![Coordinate::Bond([2, 3]), Coordinate::Bond([4, 5])]);
        assert!(!cs.fix.contains(&Coordinate::Bond([2, 3])));
        assert!(DielsAlderAddition.constraints(1, &ctx).is_unguided());
    }

    #[test]
    fn biradical_closure_flattens_then_walks_the_closing_bond() {
        let propyl = fixtures::propyl_radical();
        let instance = [0, 1, 2, 7];
        let ctx = FamilyContext {
            reactant: &propyl,
            instance: &instance,
            geometry: propyl.geometry(),
            max_step: 22,
        };
        let early = R14CyclicBiradicalScission.constraints(3, &ctx);
        assert!(matches!(early.change[0].coordinate, Coordinate::Dihedral(_)));
        let switch = R14CyclicBiradicalScission.constraints(12, &ctx);
        assert_eq!(switch.release, vec![Coordinate::Dihedral([0, 1, 2, 7])]);
        assert_eq!(switch.change[0].coordinate, Coordinate::Bond([0, 7]));
        let last = R14CyclicBiradicalScission.constraints(21, &ctx);
        assert_eq!(last.change[0].value, 1.8);
    }
}
