//! # Reaction Families
//!
//! Each reaction family knows how to locate its reactive atom tuples in a
//! reactant and how to guide a constrained transition-state search for one such
//! tuple. Families are stateless: a single shared object serves every reaction
//! instance of that family.
//!
//! ## Constraint schedules
//!
//! A search proceeds through numbered steps. At each step a family returns a
//! [`ConstraintSet`]:
//!
//! - `fix` pins internal coordinates at their current value,
//! - `change` pins coordinates to new target values,
//! - `release` removes pins set by an earlier step.
//!
//! Most families fix every existing bond to prevent unrelated drift while the
//! reactive coordinates are walked linearly from reactant values toward
//! estimated transition-state values. Ring-forming families first flatten the
//! ring dihedrals, then set ring angles, then set the final bond distances.
//! An empty `change` and `release` list means the search continues unguided.

mod additions;
mod cyclizations;
mod eliminations;
mod insertions;
mod migrations;

use crate::core::models::structure::Structure;
use crate::core::motif;
use crate::core::utils::geometry;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// An internal coordinate addressed by atom indices of the reactant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coordinate {
    Bond([usize; 2]),
    Angle([usize; 3]),
    Dihedral([usize; 4]),
}

impl Coordinate {
    /// Bonds compare equal regardless of atom order.
    fn same_bond(&self, other: &Coordinate) -> bool {
        match (self, other) {
            (Coordinate::Bond([a, b]), Coordinate::Bond([c, d])) => {
                (a == c && b == d) || (a == d && b == c)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetedCoordinate {
    pub coordinate: Coordinate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConstraintSet {
    pub next_step: usize,
    pub fix: Vec<Coordinate>,
    pub change: Vec<TargetedCoordinate>,
    pub release: Vec<Coordinate>,
}

/// Everything a family may look at when computing constraints for one step.
pub struct FamilyContext<'a> {
    pub reactant: &'a Structure,
    pub instance: &'a [usize],
    /// Geometry the next job starts from.
    pub geometry: &'a [Point3<f64>],
    /// Effective last step of the schedule.
    pub max_step: usize,
}

impl FamilyContext<'_> {
    /// Atom at a position of the instance; negative positions count from the end.
    pub fn atom(&self, position: isize) -> usize {
        if position < 0 {
            self.instance[(self.instance.len() as isize + position) as usize]
        } else {
            self.instance[position as usize]
        }
    }

    pub fn element(&self, position: isize) -> &str {
        self.reactant.element(self.atom(position))
    }

    pub fn distance(&self, a: isize, b: isize) -> f64 {
        geometry::distance(&self.geometry[self.atom(a)], &self.geometry[self.atom(b)])
    }
}

impl ConstraintSet {
    pub fn new(step: usize) -> Self {
        Self {
            next_step: step,
            ..Default::default()
        }
    }

    pub fn is_unguided(&self) -> bool {
        self.change.is_empty() && self.release.is_empty()
    }

    /// Pins every bond of the reactant.
    pub fn fix_bonds(&mut self, ctx: &FamilyContext<'_>) {
        self.fix.extend(
            ctx.reactant
                .bond_matrix()
                .bonds()
                .map(|(i, j, _)| Coordinate::Bond([i, j])),
        );
    }

    pub fn set_bond(&mut self, ctx: &FamilyContext<'_>, a: isize, b: isize, value: f64) {
        self.change.push(TargetedCoordinate {
            coordinate: Coordinate::Bond([ctx.atom(a), ctx.atom(b)]),
            value,
        });
    }

    /// Moves a bond one step of a linear walk toward `target`.
    pub fn walk_bond(
        &mut self,
        ctx: &FamilyContext<'_>,
        a: isize,
        b: isize,
        step: usize,
        steps: usize,
        target: f64,
    ) {
        let value = geometry::new_bond_length(ctx.distance(a, b), step, steps, target);
        self.set_bond(ctx, a, b, value);
    }

    pub fn set_angle(&mut self, ctx: &FamilyContext<'_>, a: isize, b: isize, c: isize, value: f64) {
        self.change.push(TargetedCoordinate {
            coordinate: Coordinate::Angle([ctx.atom(a), ctx.atom(b), ctx.atom(c)]),
            value,
        });
    }

    pub fn set_dihedral(&mut self, ctx: &FamilyContext<'_>, positions: [isize; 4], value: f64) {
        self.change.push(TargetedCoordinate {
            coordinate: Coordinate::Dihedral(positions.map(|p| ctx.atom(p))),
            value,
        });
    }

    /// Flattens the dihedrals along the first `len - tail` instance atoms.
    pub fn set_ring_dihedrals(
        &mut self,
        ctx: &FamilyContext<'_>,
        step: usize,
        steps: usize,
        tail: usize,
    ) {
        let ring = ring_part(ctx.instance, tail);
        let values = geometry::new_ring_dihedrals(ctx.geometry, ring, step, steps);
        for (window, value) in ring.windows(4).zip(values) {
            self.change.push(TargetedCoordinate {
                coordinate: Coordinate::Dihedral([window[0], window[1], window[2], window[3]]),
                value,
            });
        }
    }

    pub fn fix_ring_dihedrals(&mut self, ctx: &FamilyContext<'_>, tail: usize) {
        self.fix.extend(ring_dihedrals(ctx.instance, tail));
    }

    pub fn release_ring_dihedrals(&mut self, ctx: &FamilyContext<'_>, tail: usize) {
        self.release.extend(ring_dihedrals(ctx.instance, tail));
    }

    /// Sets the angles along the instance to the interior angle of a regular
    /// polygon with as many vertices as the instance has atoms.
    pub fn set_ring_angles(&mut self, ctx: &FamilyContext<'_>) {
        let n = ctx.instance.len() as f64;
        let value = 180.0 * (n - 2.0) / n;
        for w in ctx.instance.windows(3) {
            self.change.push(TargetedCoordinate {
                coordinate: Coordinate::Angle([w[0], w[1], w[2]]),
                value,
            });
        }
    }

    pub fn release_ring_angles(&mut self, ctx: &FamilyContext<'_>) {
        self.release.extend(
            ctx.instance
                .windows(3)
                .map(|w| Coordinate::Angle([w[0], w[1], w[2]])),
        );
    }

    /// Drops fixed bonds that are also being changed.
    pub fn clean(mut self) -> Self {
        let changed: Vec<Coordinate> = self.change.iter().map(|c| c.coordinate).collect();
        self.fix
            .retain(|f| !changed.iter().any(|c| c.same_bond(f)));
        self
    }
}

fn ring_part(instance: &[usize], tail: usize) -> &[usize] {
    &instance[..instance.len().saturating_sub(tail)]
}

fn ring_dihedrals(instance: &[usize], tail: usize) -> Vec<Coordinate> {
    ring_part(instance, tail)
        .windows(4)
        .map(|w| Coordinate::Dihedral([w[0], w[1], w[2], w[3]]))
        .collect()
}

/// Shared schedule of ring-forming families: flatten the ring for the first
/// `max_step - 2` steps, set ring angles, then release and set final bonds.
pub(crate) fn ring_closure_schedule(
    step: usize,
    ctx: &FamilyContext<'_>,
    tail: usize,
    final_bonds: &[(isize, isize, f64)],
) -> ConstraintSet {
    let dihstep = ctx.max_step.saturating_sub(2);
    let mut cs = ConstraintSet::new(step);
    if step < ctx.max_step {
        cs.fix_bonds(ctx);
    }
    if step < dihstep {
        cs.set_ring_dihedrals(ctx, step, dihstep, tail);
    } else if step == dihstep {
        cs.fix_ring_dihedrals(ctx, tail);
        cs.set_ring_angles(ctx);
    } else if step == dihstep + 1 {
        cs.release_ring_angles(ctx);
        cs.release_ring_dihedrals(ctx, tail);
        for &(a, b, value) in final_bonds {
            cs.set_bond(ctx, a, b, value);
        }
    }
    cs.clean()
}

/// Shared schedule of bond-walking families: every listed bond moves linearly
/// to its target over the steps before `max_step`.
pub(crate) fn bond_walk_schedule(
    step: usize,
    ctx: &FamilyContext<'_>,
    targets: &[(isize, isize, f64)],
) -> ConstraintSet {
    let mut cs = ConstraintSet::new(step);
    if step < ctx.max_step {
        cs.fix_bonds(ctx);
        for &(a, b, target) in targets {
            cs.walk_bond(ctx, a, b, step, ctx.max_step, target);
        }
    }
    cs.clean()
}

/// The behaviour shared by every reaction family.
pub trait ReactionFamily: Send + Sync {
    fn name(&self) -> &'static str;

    /// Last step of the constrained search; the job at this step is the
    /// unconstrained saddle-point optimization.
    fn max_step(&self) -> usize;

    /// Whether steps sweep one bond length while watching the energy.
    fn scan(&self) -> bool {
        false
    }

    /// Whether instances shorter than four atoms skip the ring-flattening steps.
    fn skip(&self) -> bool {
        false
    }

    /// Reactive atom tuples of this family in the reactant, without duplicates.
    fn find_instances(&self, reactant: &Structure) -> Vec<Vec<usize>>;

    fn constraints(&self, step: usize, ctx: &FamilyContext<'_>) -> ConstraintSet;
}

/// Which families a search runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FamilySelection {
    #[default]
    All,
    Only(Vec<String>),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown reaction family: {0}")]
pub struct UnknownFamily(pub String);

/// Name-keyed collection of the available reaction families.
pub struct FamilyRegistry {
    families: Vec<Arc<dyn ReactionFamily>>,
}

impl FamilyRegistry {
    pub fn new(families: Vec<Arc<dyn ReactionFamily>>) -> Self {
        Self { families }
    }

    /// Every built-in family.
    pub fn standard() -> Self {
        let mut families: Vec<Arc<dyn ReactionFamily>> = Vec::new();
        families.extend(migrations::families());
        families.extend(additions::families());
        families.extend(cyclizations::families());
        families.extend(insertions::families());
        families.extend(eliminations::families());
        Self { families }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ReactionFamily>> {
        self.families.iter().find(|f| f.name() == name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.families.iter().map(|f| f.name())
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Resolves a selection minus the skipped names, in registry order.
    pub fn select(
        &self,
        selection: &FamilySelection,
        skip: &[String],
    ) -> Result<Vec<Arc<dyn ReactionFamily>>, UnknownFamily> {
        for name in skip {
            if self.get(name).is_none() {
                return Err(UnknownFamily(name.clone()));
            }
        }
        let chosen: Vec<Arc<dyn ReactionFamily>> = match selection {
            FamilySelection::All => self.families.clone(),
            FamilySelection::Only(names) => {
                for name in names {
                    if self.get(name).is_none() {
                        return Err(UnknownFamily(name.clone()));
                    }
                }
                self.families
                    .iter()
                    .filter(|f| names.iter().any(|n| n == f.name()))
                    .cloned()
                    .collect()
            }
        };
        Ok(chosen
            .into_iter()
            .filter(|f| !skip.iter().any(|s| s == f.name()))
            .collect())
    }
}

// --- Search helpers shared by the family implementations ---

/// A path motif of `n` wildcards followed by `last`.
pub(crate) fn chain(n: usize, last: &'static str) -> Vec<&'static str> {
    let mut labels = vec![motif::WILDCARD; n];
    labels.push(last);
    labels
}

pub(crate) fn search(
    reactant: &Structure,
    labels: &[&str],
    anchor: Option<usize>,
) -> Vec<Vec<usize>> {
    motif::find_embeddings(
        labels,
        reactant.bond_matrix(),
        reactant.atoms(),
        anchor,
        reactant.symmetry_classes(),
    )
}

/// Keeps the first site of each symmetry class.
pub(crate) fn distinct_sites(reactant: &Structure, sites: Vec<usize>) -> Vec<usize> {
    let classes = reactant.symmetry_classes();
    let mut seen = HashSet::new();
    sites
        .into_iter()
        .filter(|&site| seen.insert(classes.get(site).copied().unwrap_or(site)))
        .collect()
}

/// Runs the motif from every symmetry-distinct radical site.
pub(crate) fn search_from_radicals(reactant: &Structure, labels: &[&str]) -> Vec<Vec<usize>> {
    distinct_sites(reactant, reactant.radical_atoms())
        .into_iter()
        .flat_map(|site| search(reactant, labels, Some(site)))
        .collect()
}

pub(crate) fn closes_ring(reactant: &Structure, path: &[usize]) -> bool {
    path.len() > 2 && reactant.bond_matrix().is_bonded(path[0], path[path.len() - 1])
}

/// Keeps the first instance for each (first atom, last atom) pair.
pub(crate) fn dedup_by_ends(instances: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    let mut seen = HashSet::new();
    instances
        .into_iter()
        .filter(|inst| seen.insert((inst[0], inst[inst.len() - 1])))
        .collect()
}

pub(crate) fn dedup_exact(instances: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    let mut seen = HashSet::new();
    instances
        .into_iter()
        .filter(|inst| seen.insert(inst.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::fixtures;

    #[test]
    fn standard_registry_has_unique_names() {
        let registry = FamilyRegistry::standard();
        let names: Vec<_> = registry.names().collect();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique.len());
        assert!(registry.len() >= 30);
        assert!(registry.get("intra_H_migration").is_some());
        assert!(registry.get("R_Addition_MultipleBond").unwrap().scan());
    }

    #[test]
    fn select_honours_explicit_lists_and_skips() {
        let registry = FamilyRegistry::standard();
        let only = FamilySelection::Only(vec![
            "intra_H_migration".to_string(),
            "r22_cycloaddition".to_string(),
        ]);
        let chosen = registry
            .select(&only, &["r22_cycloaddition".to_string()])
            .unwrap();
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].name(), "intra_H_migration");

        let all = registry.select(&FamilySelection::All, &[]).unwrap();
        assert_eq!(all.len(), registry.len());
    }

    #[test]
    fn select_rejects_unknown_names() {
        let registry = FamilyRegistry::standard();
        let err = registry
            .select(&FamilySelection::Only(vec!["nope".to_string()]), &[])
            .err();
        assert_eq!(err, Some(UnknownFamily("nope".to_string())));
        assert!(registry
            .select(&FamilySelection::All, &["missing".to_string()])
            .is_err());
    }

    #[test]
    fn clean_removes_fixed_bonds_that_are_changed() {
        let propyl = fixtures::propyl_radical();
        let instance = [0, 1, 2, 7];
        let ctx = FamilyContext {
            reactant: &propyl,
            instance: &instance,
            geometry: propyl.geometry(),
            max_step: 14,
        };
        let mut cs = ConstraintSet::new(13);
        cs.fix_bonds(&ctx);
        let before = cs.fix.len();
        cs.set_bond(&ctx, -2, -1, 1.35);
        let cs = cs.clean();
        assert_eq!(cs.fix.len(), before - 1);
        assert!(!cs.fix.contains(&Coordinate::Bond([2, 7])));
    }

    #[test]
    fn ring_closure_schedule_follows_its_phases() {
        let propyl = fixtures::propyl_radical();
        let instance = [0, 1, 2, 7];
        let ctx = FamilyContext {
            reactant: &propyl,
            instance: &instance,
            geometry: propyl.geometry(),
            max_step: 14,
        };
        let early = ring_closure_schedule(0, &ctx, 0, &[(0, -1, 1.35)]);
        assert_eq!(early.change.len(), 1);
        assert!(matches!(early.change[0].coordinate, Coordinate::Dihedral(_)));

        let angles = ring_closure_schedule(12, &ctx, 0, &[(0, -1, 1.35)]);
        assert_eq!(angles.change.len(), 2);
        assert!(angles.fix.contains(&Coordinate::Dihedral([0, 1, 2, 7])));
        assert!((angles.change[0].value - 90.0).abs() < 1e-9);

        let last = ring_closure_schedule(13, &ctx, 0, &[(0, -1, 1.35)]);
        assert_eq!(last.release.len(), 3);
        assert_eq!(
            last.change,
            vec![TargetedCoordinate {
                coordinate: Coordinate::Bond([0, 7]),
                value: 1.35
            }]
        );

        let done = ring_closure_schedule(14, &ctx, 0, &[(0, -1, 1.35)]);
        assert!(done.fix.is_empty());
        assert!(done.is_unguided());
    }

    #[test]
    fn context_resolves_negative_positions() {
        let propyl = fixtures::propyl_radical();
        let instance = [0, 1, 2, 7];
        let ctx = FamilyContext {
            reactant: &propyl,
            instance: &instance,
            geometry: propyl.geometry(),
            max_step: 14,
        };
        assert_eq!(ctx.atom(-1), 7);
        assert_eq!(ctx.atom(-2), 2);
        assert_eq!(ctx.element(-1), "H");
        assert_eq!(ctx.element(0), "C");
    }

    #[test]
    fn equivalent_sites_collapse_to_the_first() {
        let ethane = fixtures::ethane();
        assert_eq!(distinct_sites(&ethane, vec![0, 1, 2, 5]), vec![0, 2]);
    }

    #[test]
    fn dedup_helpers_keep_first_occurrences() {
        let list = vec![vec![0, 1, 2], vec![0, 3, 2], vec![1, 2], vec![1, 2]];
        assert_eq!(
            dedup_by_ends(list.clone()),
            vec![vec![0, 1, 2], vec![1, 2]]
        );
        assert_eq!(dedup_exact(list).len(), 3);
    }
}
