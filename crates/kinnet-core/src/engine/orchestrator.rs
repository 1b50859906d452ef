use super::backend::QcBackend;
use super::config::ExplorationConfig;
use super::error::EngineError;
use super::finder::Candidate;
use super::fragments::FragmentStore;
use super::instance::{InstanceState, ReactionInstance, ReactionRecord, TickContext};
use super::molecular::{MolecularData, write_molecular_data};
use super::progress::{Progress, ProgressReporter};
use super::refine::Optimizer;
use super::snapshot::{SNAPSHOT_FILE, write_snapshot};
use super::summary::{summary_path, write_summary};
use super::wells::WellList;
use crate::core::chem::characterize::Characterizer;
use crate::core::models::ids::InstanceId;
use crate::core::models::structure::Structure;
use slotmap::SlotMap;
use std::fs;
use std::path::PathBuf;
use std::thread;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub active: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Instances that waited on an unreadable result during this tick.
    pub deferred: usize,
}

/// Drives every reaction instance of one reactant until all are terminal.
///
/// Instances advance one at a time within a tick; the sleep between ticks in
/// [`run`](Self::run) is the only place the orchestrator waits.
pub struct SpeciesOrchestrator<'a> {
    reactant: Structure,
    instances: SlotMap<InstanceId, ReactionInstance>,
    fragments: FragmentStore,
    backend: &'a dyn QcBackend,
    characterizer: &'a dyn Characterizer,
    optimizer: Option<&'a dyn Optimizer>,
    config: &'a ExplorationConfig,
    wells: Option<&'a WellList>,
    barrier_threshold: f64,
}

impl<'a> SpeciesOrchestrator<'a> {
    /// `reactant` must carry the energy of its optimized well.
    pub fn new(
        reactant: Structure,
        config: &'a ExplorationConfig,
        backend: &'a dyn QcBackend,
        characterizer: &'a dyn Characterizer,
    ) -> Self {
        Self {
            reactant,
            instances: SlotMap::with_key(),
            fragments: FragmentStore::new(),
            backend,
            characterizer,
            optimizer: None,
            config,
            wells: None,
            barrier_threshold: config.thresholds.barrier_threshold,
        }
    }

    pub fn with_optimizer(mut self, optimizer: &'a dyn Optimizer) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn with_wells(mut self, wells: &'a WellList) -> Self {
        self.wells = Some(wells);
        self
    }

    /// Overrides the configured barrier threshold, as wells found during a
    /// network exploration carry their own.
    pub fn with_barrier_threshold(mut self, threshold: f64) -> Self {
        self.barrier_threshold = threshold;
        self
    }

    pub fn add_candidates(&mut self, candidates: impl IntoIterator<Item = Candidate>) {
        for candidate in candidates {
            let instance = ReactionInstance::new(
                candidate.family,
                candidate.atoms,
                &self.reactant,
                self.config.search.scan_step,
            );
            debug!(instance = %instance.name(), "Created reaction instance");
            self.instances.insert(instance);
        }
    }

    pub fn reactant(&self) -> &Structure {
        &self.reactant
    }

    pub fn instances(&self) -> impl Iterator<Item = &ReactionInstance> {
        self.instances.values()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn fragments(&self) -> &FragmentStore {
        &self.fragments
    }

    fn species_dir(&self) -> PathBuf {
        self.config.workdir.join(self.reactant.chemid().as_str())
    }

    /// Advances every non-terminal instance once and rewrites the snapshot.
    pub fn tick(&mut self) -> Result<TickSummary, EngineError> {
        let mut summary = TickSummary::default();
        let mut ctx = TickContext {
            backend: self.backend,
            characterizer: self.characterizer,
            optimizer: self.optimizer,
            config: self.config,
            reactant: &self.reactant,
            fragments: &mut self.fragments,
            wells: self.wells,
            barrier_threshold: self.barrier_threshold,
        };
        for instance in self.instances.values_mut() {
            if instance.is_terminal() {
                continue;
            }
            if let Err(reason) = instance.advance(&mut ctx) {
                debug!(instance = %instance.name(), %reason, "Waiting for artifact");
                summary.deferred += 1;
            }
        }
        for instance in self.instances.values() {
            match instance.state() {
                InstanceState::Success => summary.succeeded += 1,
                InstanceState::Failed => summary.failed += 1,
                _ => summary.active += 1,
            }
        }

        let dir = self.species_dir();
        fs::create_dir_all(&dir).map_err(|source| EngineError::Io {
            path: dir.clone(),
            source,
        })?;
        write_snapshot(&dir.join(SNAPSHOT_FILE), self.instances.values())?;
        Ok(summary)
    }

    /// Ticks until every instance is terminal, then writes the species
    /// summary and returns the successful reactions.
    #[instrument(skip_all, name = "species_orchestration", fields(reactant = %self.reactant.chemid()))]
    pub fn run(&mut self, reporter: &ProgressReporter) -> Result<Vec<ReactionRecord>, EngineError> {
        info!(instances = self.instances.len(), "Starting reaction search");
        reporter.report(Progress::TaskStart {
            total_steps: self.instances.len() as u64,
        });
        let mut finished = 0;
        loop {
            let summary = self.tick()?;
            reporter.report(Progress::Tick {
                active: summary.active,
                succeeded: summary.succeeded,
                failed: summary.failed,
            });
            for _ in finished..summary.succeeded + summary.failed {
                reporter.report(Progress::TaskIncrement);
            }
            finished = summary.succeeded + summary.failed;
            if summary.active == 0 {
                break;
            }
            if !self.config.tick_interval.is_zero() {
                thread::sleep(self.config.tick_interval);
            }
        }
        reporter.report(Progress::TaskFinish);

        let chemid = self.reactant.chemid();
        write_summary(
            &summary_path(&self.config.workdir, chemid),
            chemid,
            self.instances.values(),
        )?;
        self.store_molecular_data()?;
        let records: Vec<ReactionRecord> = self
            .instances
            .values()
            .filter_map(|instance| instance.record().cloned())
            .collect();
        info!(
            reactions = records.len(),
            failed = self.instances.len() - records.len(),
            "Reaction search finished"
        );
        Ok(records)
    }

    /// Keeps the stationary points of every successful reaction. The reactant
    /// is stored at the level its barriers were taken against.
    fn store_molecular_data(&self) -> Result<(), EngineError> {
        let workdir = &self.config.workdir;
        let mut reference = None;
        let succeeded = self
            .instances
            .values()
            .filter(|instance| instance.state() == InstanceState::Success);
        for instance in succeeded {
            if let Some(ts) = instance.final_transition_state() {
                write_molecular_data(workdir, instance.name(), &MolecularData::from_structure(ts))?;
            }
            for &id in instance.products() {
                if let Some(record) = self.fragments.get(id) {
                    let best = record.best();
                    write_molecular_data(
                        workdir,
                        best.chemid().as_str(),
                        &MolecularData::from_structure(best),
                    )?;
                }
            }
            reference = reference.or(instance.refined_reactant());
        }
        let reactant = reference.unwrap_or(&self.reactant);
        write_molecular_data(
            workdir,
            self.reactant.chemid().as_str(),
            &MolecularData::from_structure(reactant),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::characterize::GraphCharacterizer;
    use crate::engine::config::test_config;
    use crate::engine::instance::tests::{
        MockBackend, MockResult, OneStepFamily, reactant, script_success,
    };
    use crate::engine::molecular::read_molecular_data;
    use crate::engine::snapshot::read_snapshot;
    use crate::engine::summary::read_summary;
    use crate::families::ReactionFamily;
    use nalgebra::Point3;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn candidates() -> Vec<Candidate> {
        let family: Arc<dyn ReactionFamily> = Arc::new(OneStepFamily);
        vec![
            Candidate {
                family: Arc::clone(&family),
                atoms: vec![0, 1, 2],
            },
            Candidate {
                family,
                atoms: vec![2, 1, 0],
            },
        ]
    }

    #[test]
    fn run_finishes_every_instance_and_writes_the_summary() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());
        let backend = MockBackend::default();
        let characterizer = GraphCharacterizer::default();
        let mut orchestrator =
            SpeciesOrchestrator::new(reactant(), &config, &backend, &characterizer);
        orchestrator.add_candidates(candidates());
        let names: Vec<String> = orchestrator.instances().map(|i| i.name().to_string()).collect();
        script_success(&backend, &names[0], -1.45);
        script_success(&backend, &names[1], -1.2);

        let records = orchestrator.run(&ProgressReporter::new()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, names[0]);
        let chemid = orchestrator.reactant().chemid().clone();
        let read = read_summary(&summary_path(dir.path(), &chemid)).unwrap();
        assert_eq!(read, records);

        let rows = read_snapshot(&dir.path().join(chemid.as_str()).join(SNAPSHOT_FILE)).unwrap();
        let states: Vec<&str> = rows.iter().map(|r| r.state.as_str()).collect();
        assert_eq!(states, vec!["success", "failed"]);
    }

    #[test]
    fn stationary_points_of_successful_reactions_are_stored() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());
        let backend = MockBackend::default();
        let characterizer = GraphCharacterizer::default();
        let mut orchestrator =
            SpeciesOrchestrator::new(reactant(), &config, &backend, &characterizer);
        orchestrator.add_candidates(candidates());
        let names: Vec<String> = orchestrator.instances().map(|i| i.name().to_string()).collect();
        script_success(&backend, &names[0], -1.45);
        script_success(&backend, &names[1], -1.2);

        orchestrator.run(&ProgressReporter::new()).unwrap();

        let ts = read_molecular_data(dir.path(), &names[0]).unwrap();
        assert_eq!(ts.frequencies, vec![-900.0, 400.0]);
        assert_eq!(ts.multiplicity, 2);
        assert!(read_molecular_data(dir.path(), &names[1]).is_err());
        let chemid = orchestrator.reactant().chemid().clone();
        assert_eq!(read_molecular_data(dir.path(), chemid.as_str()).unwrap().atoms.len(), 3);
        let atom = crate::engine::instance::tests::hydrogens(&[0.0]);
        assert!(read_molecular_data(dir.path(), atom.chemid().as_str()).unwrap().is_atom());
    }

    #[test]
    fn a_waiting_instance_does_not_hold_back_the_others() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());
        let backend = MockBackend::default();
        let characterizer = GraphCharacterizer::default();
        let mut orchestrator =
            SpeciesOrchestrator::new(reactant(), &config, &backend, &characterizer);
        orchestrator.add_candidates(candidates());
        let names: Vec<String> = orchestrator.instances().map(|i| i.name().to_string()).collect();
        script_success(&backend, &names[0], -1.45);
        backend.script(
            format!("{}_step0", names[1]),
            MockResult::normal(Vec::<Point3<f64>>::new(), -1.49),
        );

        let mut last = TickSummary::default();
        for _ in 0..20 {
            last = orchestrator.tick().unwrap();
        }

        assert_eq!(last.succeeded, 1);
        assert_eq!(last.active, 1);
        assert_eq!(last.deferred, 1);
    }

    #[test]
    fn progress_reports_one_increment_per_finished_instance() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());
        let backend = MockBackend::default();
        let characterizer = GraphCharacterizer::default();
        let mut orchestrator =
            SpeciesOrchestrator::new(reactant(), &config, &backend, &characterizer);
        orchestrator.add_candidates(candidates());
        let names: Vec<String> = orchestrator.instances().map(|i| i.name().to_string()).collect();
        for name in &names {
            script_success(&backend, name, -1.2);
        }

        let increments = std::sync::atomic::AtomicUsize::new(0);
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if matches!(event, Progress::TaskIncrement) {
                increments.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }));
        let records = orchestrator.run(&reporter).unwrap();
        drop(reporter);

        assert!(records.is_empty());
        assert_eq!(increments.into_inner(), 2);
    }
}
