use super::load_structure;
use crate::cli::ExploreArgs;
use crate::config::build_config;
use crate::error::{CliError, Result};
use crate::ui::{CliProgressHandler, UiEvent};
use kinnet::core::chem::characterize::GraphCharacterizer;
use kinnet::core::models::structure::Chemid;
use kinnet::engine::backend::FileBackend;
use kinnet::engine::progress::ProgressReporter;
use kinnet::engine::refine::{BackendOptimizer, Optimizer};
use kinnet::engine::wells::WellList;
use kinnet::workflows::explore::{self, Collaborators, ExploreOptions};
use tokio::sync::mpsc;
use tracing::info;

/// Directory under the working directory where job files are exchanged.
pub const JOBS_DIR: &str = "jobs";

pub async fn run(args: ExploreArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    let app_config = build_config(&args.exploration)?;
    let config = app_config.core_config;
    let characterizer = GraphCharacterizer::default();
    let wells = WellList::new(&config.workdir);

    let (structure, threshold) = match (&args.input, &args.chemid) {
        (Some(input), _) => {
            info!("Loading reactant from {:?}", input);
            let structure = load_structure(input, &characterizer)?;
            wells.register(&structure, config.thresholds.barrier_threshold)?;
            (structure, None)
        }
        (None, Some(chemid)) => {
            let chemid = Chemid::new(chemid.as_str());
            info!("Loading well {} from the well list", chemid);
            let entry = wells
                .entries()?
                .into_iter()
                .find(|e| e.chemid == chemid)
                .ok_or_else(|| CliError::Argument(format!("Well {} is not on the well list", chemid)))?;
            let structure = wells
                .load_geometry(&chemid)?
                .into_structure(&characterizer)
                .map_err(|e| CliError::KinnetCore(e.into()))?;
            (structure, args.exploration.barrier_threshold.or(entry.threshold))
        }
        (None, None) => {
            return Err(CliError::Argument(
                "Either --input or --chemid is required".to_string(),
            ));
        }
    };

    let backend = FileBackend::new(config.workdir.join(JOBS_DIR))
        .map_err(|e| CliError::KinnetCore(e.into()))?;
    let optimizer = config.refinement.high_level.then(|| {
        BackendOptimizer::new(
            &backend,
            &characterizer,
            config.refinement.conformer_search,
            config.refinement.conformer_seed,
        )
    });
    let collaborators = Collaborators {
        backend: &backend,
        characterizer: &characterizer,
        optimizer: optimizer.as_ref().map(|o| o as &dyn Optimizer),
    };
    let options = ExploreOptions {
        wells: config.network_mode.then_some(&wells),
        barrier_threshold: threshold,
    };

    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Exploring the reactions of {}...", structure.chemid());
    info!("Invoking the core exploration workflow...");

    let result = tokio::task::block_in_place(|| {
        explore::run(&structure, &config, collaborators, options, &reporter)
    })?;

    info!(
        "Workflow finished with {} verified reaction(s).",
        result.reactions.len()
    );

    if result.reactions.is_empty() {
        println!("Warning: no reaction passed validation.");
    } else {
        println!("✓ {} reaction(s) found:", result.reactions.len());
        for record in &result.reactions {
            let products: Vec<&str> = record.products.iter().map(Chemid::as_str).collect();
            println!(
                "  {:<50} {:>8.2} kcal/mol  -> {}",
                record.name,
                record.barrier,
                products.join(" + ")
            );
        }
    }

    Ok(())
}
