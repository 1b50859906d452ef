use super::explore::JOBS_DIR;
use crate::cli::{NetworkArgs, QueryArgs};
use crate::error::{CliError, Result};
use crate::ui::{CliProgressHandler, UiEvent};
use kinnet::engine::backend::FileBackend;
use kinnet::engine::progress::ProgressReporter;
use kinnet::engine::wells::WellList;
use kinnet::network::export::ExportOptions;
use kinnet::network::mess::MessParameters;
use kinnet::network::query::Query;
use kinnet::workflows::network::{self, NetworkOutputs};
use tokio::sync::mpsc;
use tracing::info;

pub const NETWORK_FILE: &str = "network.txt";

fn query_from_args(args: &QueryArgs) -> Query {
    match (&args.from, &args.to) {
        (Some(from), Some(to)) if args.all_paths => Query::AllPaths {
            from: from.clone(),
            to: to.clone(),
        },
        (Some(from), Some(to)) => Query::LowestPath {
            from: from.clone(),
            to: to.clone(),
        },
        _ => {
            if let Some(well) = &args.well {
                Query::Well(well.clone())
            } else if let Some(temperature) = args.temperature {
                Query::Temperature(temperature)
            } else if let Some(threshold) = args.barrier_below {
                Query::BarrierBelow(threshold)
            } else {
                Query::All
            }
        }
    }
}

pub async fn run(args: NetworkArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    if !args.workdir.is_dir() {
        return Err(CliError::Argument(format!(
            "Working directory {:?} does not exist",
            args.workdir
        )));
    }
    let wells = WellList::new(&args.workdir);
    let backend = FileBackend::new(args.workdir.join(JOBS_DIR))
        .map_err(|e| CliError::KinnetCore(e.into()))?;
    let query = query_from_args(&args.query);
    let outputs = NetworkOutputs {
        title: args.title.clone(),
        options: ExportOptions {
            short_names: args.short_names,
        },
        text: Some(
            args.output
                .clone()
                .unwrap_or_else(|| args.workdir.join(NETWORK_FILE)),
        ),
        json: args.json.clone(),
        mess: args.mess.clone(),
        mess_parameters: MessParameters::default(),
    };

    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Assembling the network with query {:?}", query);
    let report = tokio::task::block_in_place(|| {
        network::run(&args.workdir, &wells, &backend, &query, &outputs, &reporter)
    })?;

    println!(
        "✓ Network of {} well(s), {} bimolecular product(s) and {} reaction(s).",
        report.network.wells().count(),
        report.network.bimolecular().count(),
        report.network.edges().len()
    );
    println!("  {} reaction(s) selected.", report.selection.reactions.len());
    for path in [&outputs.text, &outputs.json, &outputs.mess].into_iter().flatten() {
        println!("  Written to {}", path.display());
    }

    Ok(())
}
