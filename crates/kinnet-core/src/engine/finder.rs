use crate::core::models::structure::{Chemid, Structure};
use crate::families::ReactionFamily;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A reactive atom tuple of one family, ready to become a reaction instance.
#[derive(Clone)]
pub struct Candidate {
    pub family: Arc<dyn ReactionFamily>,
    pub atoms: Vec<usize>,
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("family", &self.family.name())
            .field("atoms", &self.atoms)
            .finish()
    }
}

/// Runs every family over the reactant. Families are searched in parallel;
/// the result keeps family order and the order each family reports.
#[instrument(skip_all, name = "reaction_finder", fields(reactant = %reactant.chemid()))]
pub fn find_candidates(reactant: &Structure, families: &[Arc<dyn ReactionFamily>]) -> Vec<Candidate> {
    #[cfg(not(feature = "parallel"))]
    let iterator = families.iter();

    #[cfg(feature = "parallel")]
    let iterator = families.par_iter();

    let per_family: Vec<Vec<Candidate>> = iterator
        .map(|family| {
            let mut seen = HashSet::new();
            let candidates: Vec<Candidate> = family
                .find_instances(reactant)
                .into_iter()
                .filter(|atoms| seen.insert(atoms.clone()))
                .map(|atoms| Candidate {
                    family: Arc::clone(family),
                    atoms,
                })
                .collect();
            debug!(family = family.name(), count = candidates.len(), "Family searched");
            candidates
        })
        .collect();

    let candidates: Vec<Candidate> = per_family.into_iter().flatten().collect();
    info!(
        families = families.len(),
        candidates = candidates.len(),
        "Reaction search complete"
    );
    candidates
}

/// `{chemid}_{family}_{atoms}` with one-based atom indices.
pub fn instance_name(chemid: &Chemid, family: &str, atoms: &[usize]) -> String {
    let mut name = format!("{chemid}_{family}");
    for atom in atoms {
        name.push('_');
        name.push_str(&(atom + 1).to_string());
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::fixtures;
    use crate::families::{ConstraintSet, FamilyContext, FamilyRegistry, FamilySelection};

    struct Repeating;

    impl ReactionFamily for Repeating {
        fn name(&self) -> &'static str {
            "repeating"
        }

        fn max_step(&self) -> usize {
            1
        }

        fn find_instances(&self, _reactant: &Structure) -> Vec<Vec<usize>> {
            vec![vec![2, 1], vec![0, 1], vec![2, 1]]
        }

        fn constraints(&self, step: usize, _ctx: &FamilyContext<'_>) -> ConstraintSet {
            ConstraintSet::new(step)
        }
    }

    #[test]
    fn names_use_one_based_indices() {
        assert_eq!(
            instance_name(&Chemid::new("300010000000000000002"), "intra_H_migration", &[0, 1, 5]),
            "300010000000000000002_intra_H_migration_1_2_6"
        );
    }

    #[test]
    fn duplicate_tuples_are_dropped_in_order() {
        let families: Vec<Arc<dyn ReactionFamily>> = vec![Arc::new(Repeating)];
        let candidates = find_candidates(&fixtures::ethane(), &families);
        let atoms: Vec<_> = candidates.iter().map(|c| c.atoms.clone()).collect();
        assert_eq!(atoms, vec![vec![2, 1], vec![0, 1]]);
    }

    #[test]
    fn candidates_follow_family_order() {
        let families = FamilyRegistry::standard()
            .select(&FamilySelection::All, &[])
            .unwrap();
        let candidates = find_candidates(&fixtures::propyl_radical(), &families);
        assert!(!candidates.is_empty());

        let position = |name: &str| families.iter().position(|f| f.name() == name).unwrap();
        let order: Vec<usize> = candidates.iter().map(|c| position(c.family.name())).collect();
        assert!(order.windows(2).all(|w| w[0] <= w[1]));
        assert!(
            candidates
                .iter()
                .any(|c| c.family.name() == "intra_H_migration" && c.atoms == vec![0, 1, 5])
        );
    }
}
