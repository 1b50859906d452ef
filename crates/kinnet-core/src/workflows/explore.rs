use crate::core::chem::characterize::Characterizer;
use crate::core::models::structure::Structure;
use crate::engine::backend::{JobKind, JobRequest, JobStatus, QcBackend, ensure_submitted};
use crate::engine::config::ExplorationConfig;
use crate::engine::error::EngineError;
use crate::engine::finder::find_candidates;
use crate::engine::fragments::well_job_name;
use crate::engine::instance::ReactionRecord;
use crate::engine::orchestrator::SpeciesOrchestrator;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::refine::Optimizer;
use crate::engine::wells::WellList;
use crate::families::{FamilyRegistry, ReactionFamily};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, instrument, warn};

/// The external collaborators an exploration talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub backend: &'a dyn QcBackend,
    pub characterizer: &'a dyn Characterizer,
    pub optimizer: Option<&'a dyn Optimizer>,
}

/// Settings that differ between a standalone run and one well of a network.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExploreOptions<'a> {
    /// Well list new wells are published to when network mode is on.
    pub wells: Option<&'a WellList>,
    /// Barrier threshold carried by the well entry, if adjusted.
    pub barrier_threshold: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ExplorationResult {
    /// The optimized reactant, with energy and zero-point energy.
    pub reactant: Structure,
    pub reactions: Vec<ReactionRecord>,
}

#[instrument(skip_all, name = "exploration_workflow", fields(reactant = %structure.chemid()))]
pub fn run(
    structure: &Structure,
    config: &ExplorationConfig,
    collaborators: Collaborators<'_>,
    options: ExploreOptions<'_>,
    reporter: &ProgressReporter,
) -> Result<ExplorationResult, EngineError> {
    let families = FamilyRegistry::standard()
        .select(&config.search.families, &config.search.skip_families)?;
    info!(families = families.len(), "Selected reaction families");
    run_with_families(structure, &families, config, collaborators, options, reporter)
}

pub(crate) fn run_with_families(
    structure: &Structure,
    families: &[Arc<dyn ReactionFamily>],
    config: &ExplorationConfig,
    collaborators: Collaborators<'_>,
    options: ExploreOptions<'_>,
    reporter: &ProgressReporter,
) -> Result<ExplorationResult, EngineError> {
    // === Phase 1: Reactant well optimization ===
    reporter.report(Progress::PhaseStart {
        name: "Reactant optimization",
    });
    let job = submit_reactant(structure, collaborators.backend)?;
    let reactant = loop {
        if let Some(reactant) = poll_reactant(structure, &job, collaborators)? {
            break reactant;
        }
        if !config.tick_interval.is_zero() {
            thread::sleep(config.tick_interval);
        }
    };
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Reaction search ===
    reporter.report(Progress::PhaseStart {
        name: "Reaction search",
    });
    let candidates = find_candidates(&reactant, families);
    reporter.report(Progress::Message(format!(
        "Found {} candidate reactions",
        candidates.len()
    )));
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Orchestration ===
    reporter.report(Progress::PhaseStart {
        name: "Reaction pipeline",
    });
    let mut orchestrator = SpeciesOrchestrator::new(
        reactant.clone(),
        config,
        collaborators.backend,
        collaborators.characterizer,
    );
    if let Some(optimizer) = collaborators.optimizer {
        orchestrator = orchestrator.with_optimizer(optimizer);
    }
    if let Some(wells) = options.wells {
        orchestrator = orchestrator.with_wells(wells);
    }
    if let Some(threshold) = options.barrier_threshold {
        orchestrator = orchestrator.with_barrier_threshold(threshold);
    }
    orchestrator.add_candidates(candidates);
    let reactions = orchestrator.run(reporter)?;
    reporter.report(Progress::PhaseFinish);

    info!(reactions = reactions.len(), "Exploration complete");
    Ok(ExplorationResult {
        reactant,
        reactions,
    })
}

/// Submits the optimization of the reactant well. Its energy is the
/// reference for every barrier of the exploration.
fn submit_reactant(structure: &Structure, backend: &dyn QcBackend) -> Result<String, EngineError> {
    let job = well_job_name(structure.chemid());
    ensure_submitted(backend, &JobRequest::new(&job, JobKind::WellOpt, structure))?;
    info!(%job, "Optimizing the reactant well");
    Ok(job)
}

fn poll_reactant(
    structure: &Structure,
    job: &str,
    collaborators: Collaborators<'_>,
) -> Result<Option<Structure>, EngineError> {
    match collaborators.backend.status(job) {
        JobStatus::Error => Err(EngineError::ReactantFailed {
            job: job.to_string(),
        }),
        JobStatus::Normal => Err(EngineError::ReactantWithoutFrequencies {
            job: job.to_string(),
        }),
        JobStatus::NormalFreq => {
            match load_reactant(structure, job, collaborators) {
                Ok(reactant) => Ok(Some(reactant)),
                Err(e) => {
                    debug!(%job, error = %e, "Reactant result not readable yet");
                    Ok(None)
                }
            }
        }
        JobStatus::Absent | JobStatus::Running => Ok(None),
    }
}

fn load_reactant(
    structure: &Structure,
    job: &str,
    collaborators: Collaborators<'_>,
) -> Result<Structure, EngineError> {
    let backend = collaborators.backend;
    let geometry = backend.geometry(job)?;
    let energy = backend.energy(job)?;
    let mut reactant = structure.with_geometry(geometry, collaborators.characterizer)?;
    if reactant.chemid() != structure.chemid() {
        warn!(
            from = %structure.chemid(),
            to = %reactant.chemid(),
            "Reactant changed identity during optimization; continuing with the optimized species"
        );
    }
    reactant.energy = Some(energy);
    reactant.zpe = Some(backend.zero_point_energy(job)?);
    reactant.frequencies = Some(backend.frequencies(job)?);
    Ok(reactant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::characterize::GraphCharacterizer;
    use crate::engine::backend::JobStatus;
    use crate::engine::config::test_config;
    use crate::engine::instance::tests::{
        MockBackend, MockResult, OneStepFamily, reactant, script_success,
    };
    use crate::engine::summary::{read_summary, summary_path};
    use crate::families::FamilySelection;
    use nalgebra::Point3;
    use tempfile::tempdir;

    fn line(positions: &[f64]) -> Vec<Point3<f64>> {
        positions.iter().map(|&x| Point3::new(x, 0.0, 0.0)).collect()
    }

    fn script_reactant_well(backend: &MockBackend, structure: &Structure) {
        backend.script(
            well_job_name(structure.chemid()),
            MockResult::normal(line(&[0.0, 0.74, 5.0]), -1.5).with_frequencies(0.01, vec![4400.0]),
        );
    }

    #[test]
    fn exploration_runs_every_phase() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());
        let backend = MockBackend::default();
        let characterizer = GraphCharacterizer::default();
        let structure = reactant();
        script_reactant_well(&backend, &structure);
        let family: Arc<dyn ReactionFamily> = Arc::new(OneStepFamily);
        let name = crate::engine::finder::instance_name(structure.chemid(), family.name(), &[0, 1, 2]);
        script_success(&backend, &name, -1.45);

        let phases = std::sync::Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { name } = event {
                phases.lock().unwrap().push(name);
            }
        }));
        let collaborators = Collaborators {
            backend: &backend,
            characterizer: &characterizer,
            optimizer: None,
        };
        let result = run_with_families(
            &structure,
            &[family],
            &config,
            collaborators,
            ExploreOptions::default(),
            &reporter,
        )
        .unwrap();
        drop(reporter);

        assert_eq!(result.reactant.energy, Some(-1.5));
        assert_eq!(result.reactant.zpe, Some(0.01));
        assert_eq!(result.reactions.len(), 1);
        assert_eq!(
            phases.into_inner().unwrap(),
            vec!["Reactant optimization", "Reaction search", "Reaction pipeline"]
        );
        let stored = read_summary(&summary_path(dir.path(), structure.chemid())).unwrap();
        assert_eq!(stored, result.reactions);
    }

    #[test]
    fn failed_reactant_optimization_stops_the_exploration() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());
        let backend = MockBackend::default();
        let characterizer = GraphCharacterizer::default();
        let structure = reactant();
        backend.script(
            well_job_name(structure.chemid()),
            MockResult {
                status: JobStatus::Error,
                ..MockResult::normal(Vec::new(), 0.0)
            },
        );
        let collaborators = Collaborators {
            backend: &backend,
            characterizer: &characterizer,
            optimizer: None,
        };

        let result = run(
            &structure,
            &config,
            collaborators,
            ExploreOptions::default(),
            &ProgressReporter::new(),
        );

        assert!(matches!(result, Err(EngineError::ReactantFailed { .. })));
    }

    #[test]
    fn reactant_well_without_frequencies_stops_the_exploration() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());
        let backend = MockBackend::default();
        let characterizer = GraphCharacterizer::default();
        let structure = reactant();
        backend.script(
            well_job_name(structure.chemid()),
            MockResult::normal(line(&[0.0, 0.74, 5.0]), -1.5),
        );
        let collaborators = Collaborators {
            backend: &backend,
            characterizer: &characterizer,
            optimizer: None,
        };

        let result = run(
            &structure,
            &config,
            collaborators,
            ExploreOptions::default(),
            &ProgressReporter::new(),
        );

        assert!(matches!(result, Err(EngineError::ReactantWithoutFrequencies { .. })));
    }

    #[test]
    fn unknown_family_is_rejected_before_any_job() {
        let dir = tempdir().unwrap();
        let mut config = test_config(dir.path().to_path_buf());
        config.search.families = FamilySelection::Only(vec!["no_such_family".to_string()]);
        let backend = MockBackend::default();
        let characterizer = GraphCharacterizer::default();
        let structure = reactant();
        let collaborators = Collaborators {
            backend: &backend,
            characterizer: &characterizer,
            optimizer: None,
        };

        let result = run(
            &structure,
            &config,
            collaborators,
            ExploreOptions::default(),
            &ProgressReporter::new(),
        );

        assert!(matches!(result, Err(EngineError::UnknownFamily(_))));
        assert!(!backend.was_submitted(&well_job_name(structure.chemid())));
    }
}
