//! Molecular eliminations and tautomerizations.

use super::{
    ConstraintSet, FamilyContext, ReactionFamily, bond_walk_schedule, chain, closes_ring,
    dedup_by_ends, dedup_exact, search, search_from_radicals,
};
use crate::core::models::structure::Structure;
use crate::core::motif;
use std::sync::Arc;

pub(super) fn families() -> Vec<Arc<dyn ReactionFamily>> {
    vec![
        Arc::new(RetroEne),
        Arc::new(KetoEnol),
        Arc::new(HO2Elimination),
        Arc::new(KorcekStep2),
    ]
}

/// Six-center fragmentation of an alkene carrying a delta hydrogen.
pub struct RetroEne;

impl ReactionFamily for RetroEne {
    fn name(&self) -> &'static str {
        "Retro_Ene"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        if !reactant.is_closed_shell() {
            return Vec::new();
        }
        let found = search(reactant, &chain(5, "H"), None)
            .into_iter()
            .filter(|p| motif::bond_filter(p, reactant.bond_matrix(), &[Some(2)]))
            .collect();
        dedup_by_ends(found)
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        bond_walk_schedule(step, ctx, &[(2, 3, 2.0), (0, -1, 1.35), (-2, -1, 1.35)])
    }
}

/// Keto-enol tautomerization in either direction.
pub struct KetoEnol;

impl ReactionFamily for KetoEnol {
    fn name(&self) -> &'static str {
        "ketoenol"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        if !reactant.is_closed_shell() {
            return Vec::new();
        }
        let bonds = reactant.bond_matrix();
        let mut found = search(reactant, &["C", "C", "O", "H"], None);
        found.extend(search(reactant, &["O", "C", "C", "H"], None));
        dedup_exact(
            found
                .into_iter()
                .filter(|p| motif::bond_filter(p, bonds, &[Some(2)]))
                .collect(),
        )
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        let mut cs = bond_walk_schedule(step, ctx, &[(0, -1, 1.35), (-2, -1, 1.35)]);
        if step == 0 {
            cs.set_dihedral(ctx, [0, 1, 2, 3], 0.0);
        }
        cs
    }
}

/// Concerted HO2 loss from an alkylperoxy radical, leaving an alkene.
pub struct HO2Elimination;

impl ReactionFamily for HO2Elimination {
    fn name(&self) -> &'static str {
        "HO2_Elimination_from_PeroxyRadical"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        search_from_radicals(reactant, &["O", "O", "X", "X", "H"])
            .into_iter()
            .map(|mut p| {
                p.reverse();
                p
            })
            .collect()
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        bond_walk_schedule(step, ctx, &[(0, -1, 1.3), (0, 1, 1.4), (2, 3, 2.0)])
    }
}

/// Fragmentation of a 1,2-dioxolane into a carbonyl and an enol.
pub struct KorcekStep2;

impl ReactionFamily for KorcekStep2 {
    fn name(&self) -> &'static str {
        "Korcek_step2"
    }

    fn max_step(&self) -> usize {
        12
    }

    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>> {
        search(reactant, &["O", "O", "X", "X", "X"], None)
            .into_iter()
            .filter(|p| closes_ring(reactant, p))
            .collect()
    }

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet {
        bond_walk_schedule(step, ctx, &[(0, 1, 2.0), (2, 3, 2.2)])
    }
}
