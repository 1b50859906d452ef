use crate::core::models::ids::FragmentId;
use crate::core::models::structure::{Chemid, Structure};
use slotmap::SlotMap;
use std::collections::HashMap;

/// A product fragment shared by every reaction instance of one exploration.
#[derive(Debug, Clone)]
pub struct FragmentRecord {
    /// Geometry as cut from the reaction product.
    pub initial: Structure,
    /// Result of the well optimization, with energy, ZPE and frequencies.
    pub optimized: Option<Structure>,
    /// Result of the optional high-level refinement.
    pub refined: Option<Structure>,
}

impl FragmentRecord {
    pub fn chemid(&self) -> &Chemid {
        self.initial.chemid()
    }

    /// Name of the well optimization job of this fragment.
    pub fn job_name(&self) -> String {
        well_job_name(self.chemid())
    }

    /// The most refined structure available.
    pub fn best(&self) -> &Structure {
        self.refined
            .as_ref()
            .or(self.optimized.as_ref())
            .unwrap_or(&self.initial)
    }
}

pub fn well_job_name(chemid: &Chemid) -> String {
    format!("{chemid}_well")
}

/// Fragments keyed by chemid, so a species reached by several reactions is
/// optimized once.
#[derive(Debug, Default)]
pub struct FragmentStore {
    fragments: SlotMap<FragmentId, FragmentRecord>,
    by_chemid: HashMap<Chemid, FragmentId>,
}

impl FragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of the fragment with this chemid, inserting it first if
    /// it is new. The boolean is true for a fresh insertion.
    pub fn register(&mut self, structure: Structure) -> (FragmentId, bool) {
        if let Some(&id) = self.by_chemid.get(structure.chemid()) {
            return (id, false);
        }
        let chemid = structure.chemid().clone();
        let id = self.fragments.insert(FragmentRecord {
            initial: structure,
            optimized: None,
            refined: None,
        });
        self.by_chemid.insert(chemid, id);
        (id, true)
    }

    pub fn get(&self, id: FragmentId) -> Option<&FragmentRecord> {
        self.fragments.get(id)
    }

    pub fn get_mut(&mut self, id: FragmentId) -> Option<&mut FragmentRecord> {
        self.fragments.get_mut(id)
    }

    pub fn find(&self, chemid: &Chemid) -> Option<FragmentId> {
        self.by_chemid.get(chemid).copied()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FragmentId, &FragmentRecord)> {
        self.fragments.iter()
    }
}
