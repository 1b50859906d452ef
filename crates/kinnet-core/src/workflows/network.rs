use crate::engine::backend::{JobStatus, QcBackend};
use crate::engine::error::EngineError;
use crate::engine::fragments::well_job_name;
use crate::engine::molecular::{MolecularData, read_molecular_data};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::refine::high_level_job_name;
use crate::engine::summary::{read_summary, summary_path};
use crate::engine::wells::WellList;
use crate::network::error::NetworkError;
use crate::network::export::{self, ExportOptions};
use crate::network::graph::{NodeKind, ReactionNetwork, SpeciesResult};
use crate::network::mess::{self, MessParameters};
use crate::network::query::{Query, Selection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum NetworkWorkflowError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Where and how the selected network is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkOutputs {
    pub title: String,
    pub options: ExportOptions,
    pub text: Option<PathBuf>,
    pub json: Option<PathBuf>,
    /// Master-equation input.
    pub mess: Option<PathBuf>,
    pub mess_parameters: MessParameters,
}

#[derive(Debug, Clone)]
pub struct NetworkReport {
    pub network: ReactionNetwork,
    pub selection: Selection,
}

/// Reads the results of every explored well, in well-list order.
///
/// A well energy is electronic plus zero-point energy, from the high-level
/// refinement of the well when one finished, so that it matches the level of
/// the barriers its exploration recorded. A well without a summary or without
/// a readable well energy has not been explored to completion and is skipped.
pub fn collect_species(
    workdir: &Path,
    wells: &WellList,
    backend: &dyn QcBackend,
) -> Result<Vec<SpeciesResult>, EngineError> {
    let mut species = Vec::new();
    for entry in wells.entries()? {
        let path = summary_path(workdir, &entry.chemid);
        if !path.exists() {
            warn!(chemid = %entry.chemid, "No summary for well, skipping");
            continue;
        }
        let mut job = well_job_name(&entry.chemid);
        let refined = high_level_job_name(&job);
        if backend.status(&refined) == JobStatus::NormalFreq {
            job = refined;
        }
        let energy = match backend
            .energy(&job)
            .and_then(|energy| Ok(energy + backend.zero_point_energy(&job)?))
        {
            Ok(energy) => energy,
            Err(e) => {
                warn!(chemid = %entry.chemid, %job, error = %e, "No well energy, skipping");
                continue;
            }
        };
        let reactions = read_summary(&path)?;
        species.push(SpeciesResult {
            reactant: entry.chemid,
            energy,
            reactions,
        });
    }
    Ok(species)
}

/// Reads the stored molecular data of every selected stationary point. Points
/// without data are left out; the master-equation writer names them.
pub fn collect_molecular_data(
    workdir: &Path,
    network: &ReactionNetwork,
    selection: &Selection,
) -> HashMap<String, MolecularData> {
    let mut keys: Vec<&str> = Vec::new();
    for node in selection.nodes(network) {
        let node = network.node(node);
        match node.kind {
            NodeKind::Well => keys.push(&node.name),
            NodeKind::Bimolecular => keys.extend(node.name.split('_')),
        }
    }
    keys.extend(selection.reactions.iter().map(|&e| network.edges()[e].name.as_str()));

    let mut data = HashMap::new();
    for key in keys {
        if data.contains_key(key) {
            continue;
        }
        match read_molecular_data(workdir, key) {
            Ok(molecule) => {
                data.insert(key.to_string(), molecule);
            }
            Err(e) => warn!(%key, error = %e, "No molecular data"),
        }
    }
    data
}

#[instrument(skip_all, name = "network_workflow")]
pub fn run(
    workdir: &Path,
    wells: &WellList,
    backend: &dyn QcBackend,
    query: &Query,
    outputs: &NetworkOutputs,
    reporter: &ProgressReporter,
) -> Result<NetworkReport, NetworkWorkflowError> {
    reporter.report(Progress::PhaseStart {
        name: "Network assembly",
    });
    let species = collect_species(workdir, wells, backend)?;
    let network = ReactionNetwork::assemble(&species)?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Selection" });
    let selection = network.select(query)?;
    info!(
        reactions = selection.reactions.len(),
        highlighted = selection.highlight.len(),
        "Selected reactions"
    );
    reporter.report(Progress::PhaseFinish);

    if let Some(path) = &outputs.text {
        export::write_text(path, &network, &selection, &outputs.title, outputs.options)?;
        info!(path = %path.display(), "Wrote network");
    }
    if let Some(path) = &outputs.json {
        export::write_json(path, &network, &selection, &outputs.title, outputs.options)?;
        info!(path = %path.display(), "Wrote network");
    }
    if let Some(path) = &outputs.mess {
        let data = collect_molecular_data(workdir, &network, &selection);
        mess::write_mess(path, &network, &selection, &outputs.mess_parameters, &data)?;
        info!(path = %path.display(), "Wrote master-equation input");
    }
    Ok(NetworkReport { network, selection })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::structure::Chemid;
    use crate::engine::instance::tests::{MockBackend, MockResult};
    use crate::engine::instance::ReactionRecord;
    use crate::engine::molecular::write_molecular_data;
    use crate::engine::summary;
    use crate::engine::wells::WellEntry;
    use crate::network::graph::tests::{hartree, reaction};
    use std::fs;
    use tempfile::tempdir;

    fn write_records(workdir: &Path, chemid: &str, records: &[ReactionRecord]) {
        summary::tests::write_records(&summary_path(workdir, &Chemid::new(chemid)), records);
    }

    fn list(wells: &WellList, chemids: &[&str]) {
        for chemid in chemids {
            wells
                .append(&WellEntry {
                    chemid: Chemid::new(*chemid),
                    threshold: None,
                })
                .unwrap();
        }
    }

    fn well_energy(backend: &MockBackend, chemid: &str, kcal: f64) {
        backend.preexisting(
            well_job_name(&Chemid::new(chemid)),
            MockResult::normal(Vec::new(), hartree(kcal)),
        );
    }

    #[test]
    fn unexplored_wells_are_skipped() {
        let dir = tempdir().unwrap();
        let wells = WellList::new(dir.path());
        list(&wells, &["A", "B", "C"]);
        let backend = MockBackend::default();
        well_energy(&backend, "A", 0.0);
        well_energy(&backend, "B", -2.0);
        write_records(dir.path(), "A", &[reaction("A", &["B"], 12.0, -2.0)]);
        write_records(dir.path(), "B", &[reaction("B", &["C"], 20.0, -4.0)]);

        let species = collect_species(dir.path(), &wells, &backend).unwrap();

        let names: Vec<_> = species.iter().map(|s| s.reactant.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(species[0].reactions.len(), 1);
    }

    #[test]
    fn refined_well_energy_takes_precedence() {
        let dir = tempdir().unwrap();
        let wells = WellList::new(dir.path());
        list(&wells, &["A"]);
        let backend = MockBackend::default();
        backend.preexisting(
            well_job_name(&Chemid::new("A")),
            MockResult::normal(Vec::new(), -1.0).with_frequencies(0.02, vec![500.0]),
        );
        backend.preexisting(
            high_level_job_name(&well_job_name(&Chemid::new("A"))),
            MockResult::normal(Vec::new(), -1.2).with_frequencies(0.01, vec![510.0]),
        );
        write_records(dir.path(), "A", &[reaction("A", &["B"], 12.0, -2.0)]);

        let species = collect_species(dir.path(), &wells, &backend).unwrap();

        assert!((species[0].energy - -1.19).abs() < 1e-12);
    }

    #[test]
    fn unfinished_refinement_falls_back_to_the_screening_well() {
        let dir = tempdir().unwrap();
        let wells = WellList::new(dir.path());
        list(&wells, &["A"]);
        let backend = MockBackend::default();
        backend.preexisting(
            well_job_name(&Chemid::new("A")),
            MockResult::normal(Vec::new(), -1.0).with_frequencies(0.02, vec![500.0]),
        );
        backend.preexisting(
            high_level_job_name(&well_job_name(&Chemid::new("A"))),
            MockResult {
                status: JobStatus::Running,
                ..MockResult::normal(Vec::new(), 0.0)
            },
        );
        write_records(dir.path(), "A", &[reaction("A", &["B"], 12.0, -2.0)]);

        let species = collect_species(dir.path(), &wells, &backend).unwrap();

        assert!((species[0].energy - -0.98).abs() < 1e-12);
    }

    #[test]
    fn network_is_selected_and_exported() {
        let dir = tempdir().unwrap();
        let wells = WellList::new(dir.path());
        list(&wells, &["A", "B"]);
        let backend = MockBackend::default();
        well_energy(&backend, "A", 0.0);
        well_energy(&backend, "B", -2.0);
        write_records(dir.path(), "A", &[reaction("A", &["B"], 12.0, -2.0)]);
        write_records(dir.path(), "B", &[reaction("B", &["A"], 9.0, 0.0)]);
        let outputs = NetworkOutputs {
            title: "demo".to_string(),
            text: Some(dir.path().join("network.txt")),
            ..NetworkOutputs::default()
        };

        let report = run(
            dir.path(),
            &wells,
            &backend,
            &Query::All,
            &outputs,
            &ProgressReporter::new(),
        )
        .unwrap();

        assert_eq!(report.network.edges().len(), 1);
        let text = fs::read_to_string(dir.path().join("network.txt")).unwrap();
        assert!(text.contains("B_to_A 9.00 B A\n"));
    }

    #[test]
    fn master_equation_input_uses_the_stored_molecular_data() {
        let dir = tempdir().unwrap();
        let wells = WellList::new(dir.path());
        list(&wells, &["A", "B"]);
        let backend = MockBackend::default();
        well_energy(&backend, "A", 0.0);
        well_energy(&backend, "B", -2.0);
        write_records(dir.path(), "A", &[reaction("A", &["B"], 12.0, -2.0)]);
        write_records(dir.path(), "B", &[reaction("B", &["A"], 9.0, 0.0)]);
        for (key, frequencies) in [
            ("A", vec![1000.0]),
            ("B", vec![1100.0]),
            ("B_to_A", vec![-1200.0, 800.0]),
        ] {
            let molecule = MolecularData {
                atoms: vec!["H".to_string(), "H".to_string()],
                geometry: vec![[0.0, 0.0, 0.0], [0.74, 0.0, 0.0]],
                frequencies,
                multiplicity: 1,
            };
            write_molecular_data(dir.path(), key, &molecule).unwrap();
        }
        let outputs = NetworkOutputs {
            mess: Some(dir.path().join("mess.inp")),
            ..NetworkOutputs::default()
        };

        run(
            dir.path(),
            &wells,
            &backend,
            &Query::All,
            &outputs,
            &ProgressReporter::new(),
        )
        .unwrap();

        let input = fs::read_to_string(dir.path().join("mess.inp")).unwrap();
        assert!(input.contains("Reactant w_1\n"));
        assert!(input.contains("Barrier rxn_1 w_2 w_1 ! B_to_A\n"));
        assert!(input.contains("ImaginaryFrequency[1/cm] 1200.00\n"));
    }

    #[test]
    fn master_equation_input_needs_molecular_data() {
        let dir = tempdir().unwrap();
        let wells = WellList::new(dir.path());
        list(&wells, &["A"]);
        let backend = MockBackend::default();
        well_energy(&backend, "A", 0.0);
        write_records(dir.path(), "A", &[reaction("A", &["B"], 12.0, -2.0)]);
        let outputs = NetworkOutputs {
            mess: Some(dir.path().join("mess.inp")),
            ..NetworkOutputs::default()
        };

        let result = run(
            dir.path(),
            &wells,
            &backend,
            &Query::All,
            &outputs,
            &ProgressReporter::new(),
        );

        assert!(matches!(
            result,
            Err(NetworkWorkflowError::Network(NetworkError::MissingMolecularData(_)))
        ));
        assert!(!dir.path().join("mess.inp").exists());
    }
}
