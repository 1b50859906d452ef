use super::load_structure;
use crate::cli::PesArgs;
use crate::config::{build_config, resolved_file_config};
use crate::error::Result;
use crate::ui::{CliProgressHandler, UiEvent};
use kinnet::core::chem::characterize::GraphCharacterizer;
use kinnet::engine::progress::ProgressReporter;
use kinnet::engine::wells::WellList;
use kinnet::workflows::pes::{self, PesConfig, ProcessLauncher};
use std::ffi::OsString;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::info;

/// Merged configuration handed to every well exploration.
pub const RESOLVED_CONFIG_FILE: &str = "kinnet.toml";
pub const LOG_DIR: &str = "logs";

/// Arguments of the `explore` invocation of one well; the launcher appends the
/// chemid and the threshold of the well.
fn child_args(workdir: &Path, config_path: &Path, verbose: u8) -> Vec<OsString> {
    let mut args = vec![
        OsString::from("explore"),
        OsString::from("--config"),
        config_path.as_os_str().to_owned(),
        OsString::from("--workdir"),
        workdir.as_os_str().to_owned(),
        OsString::from("--network-mode"),
    ];
    if verbose > 0 {
        args.push(OsString::from(format!("-{}", "v".repeat(verbose as usize))));
    }
    args
}

pub async fn run(args: PesArgs, verbose: u8, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    let mut app_config = build_config(&args.exploration)?;
    app_config.core_config.network_mode = true;
    if let Some(jobs) = args.simultaneous_jobs {
        app_config.simultaneous_jobs = jobs;
    }
    let config = &app_config.core_config;
    std::fs::create_dir_all(&config.workdir)?;
    std::fs::create_dir_all(config.workdir.join(LOG_DIR))?;

    let config_path = config.workdir.join(RESOLVED_CONFIG_FILE);
    resolved_file_config(&app_config).write_to_file(&config_path)?;
    info!("Wrote the merged configuration to {:?}", config_path);

    let characterizer = GraphCharacterizer::default();
    info!("Loading root structure from {:?}", &args.input);
    let root = load_structure(&args.input, &characterizer)?;

    let wells = WellList::new(&config.workdir);
    let mut launcher = ProcessLauncher::current_exe(child_args(&config.workdir, &config_path, verbose.max(1)))?
        .with_log_dir(config.workdir.join(LOG_DIR));
    let pes_config = PesConfig {
        simultaneous_jobs: app_config.simultaneous_jobs,
        poll_interval: config.tick_interval,
        barrier_threshold: config.thresholds.barrier_threshold,
    };

    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Exploring the surface of {} with up to {} simultaneous well(s)...",
        root.chemid(),
        pes_config.simultaneous_jobs
    );
    let summary = tokio::task::block_in_place(|| {
        pes::run(&root, &wells, &mut launcher, &pes_config, &reporter)
    })?;

    println!("✓ Explored {} well(s):", summary.explored.len());
    for chemid in &summary.explored {
        println!("  {}", chemid);
    }
    println!(
        "Run 'kinnet network --workdir {}' to assemble the network.",
        config.workdir.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_arguments_run_in_network_mode() {
        let args = child_args(Path::new("run"), Path::new("run/kinnet.toml"), 2);
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "explore",
                "--config",
                "run/kinnet.toml",
                "--workdir",
                "run",
                "--network-mode",
                "-vv"
            ]
        );
    }
}
