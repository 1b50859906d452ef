//! Exploration of a whole potential energy surface.
//!
//! Every well on the shared well list gets its own exploration process. Those
//! processes publish the wells they find to the same list, which the
//! coordinator polls until every listed well has been explored.

use crate::core::models::structure::{Chemid, Structure};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::wells::{WellEntry, WellList};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const PES_SUMMARY_FILE: &str = "pes_summary.txt";

/// Starts and watches the exploration of single wells.
pub trait SpeciesLauncher {
    fn launch(&mut self, entry: &WellEntry) -> Result<(), EngineError>;
    /// Whether the exploration of `chemid` is still running. Called only for
    /// launched wells.
    fn is_running(&mut self, chemid: &Chemid) -> Result<bool, EngineError>;
}

/// Launches every well as a child process of `program`.
///
/// The child is invoked as `program <base_args> --chemid <chemid>`, followed by
/// `--barrier-threshold <value>` when the entry carries one. With a log
/// directory, each child logs to `<dir>/<chemid>.log` and its console output
/// is discarded.
#[derive(Debug)]
pub struct ProcessLauncher {
    program: PathBuf,
    base_args: Vec<OsString>,
    log_dir: Option<PathBuf>,
    children: HashMap<Chemid, Child>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, base_args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            base_args,
            log_dir: None,
            children: HashMap::new(),
        }
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Launches children from the running executable.
    pub fn current_exe(base_args: Vec<OsString>) -> Result<Self, EngineError> {
        let program = std::env::current_exe().map_err(|source| EngineError::Io {
            path: PathBuf::from("current executable"),
            source,
        })?;
        Ok(Self::new(program, base_args))
    }

    fn command(&self, entry: &WellEntry) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.base_args)
            .arg("--chemid")
            .arg(entry.chemid.as_str())
            .stdin(Stdio::null());
        if let Some(threshold) = entry.threshold {
            command.arg("--barrier-threshold").arg(threshold.to_string());
        }
        if let Some(dir) = &self.log_dir {
            command
                .arg("--log-file")
                .arg(dir.join(format!("{}.log", entry.chemid)))
                .stdout(Stdio::null())
                .stderr(Stdio::null());
        }
        command
    }
}

impl SpeciesLauncher for ProcessLauncher {
    fn launch(&mut self, entry: &WellEntry) -> Result<(), EngineError> {
        let child = self
            .command(entry)
            .spawn()
            .map_err(|source| EngineError::Io {
                path: self.program.clone(),
                source,
            })?;
        info!(chemid = %entry.chemid, pid = child.id(), "Launched well exploration");
        self.children.insert(entry.chemid.clone(), child);
        Ok(())
    }

    fn is_running(&mut self, chemid: &Chemid) -> Result<bool, EngineError> {
        let Some(child) = self.children.get_mut(chemid) else {
            return Ok(false);
        };
        match child.try_wait() {
            Ok(None) => Ok(true),
            Ok(Some(status)) => {
                if !status.success() {
                    warn!(%chemid, %status, "Well exploration exited with failure");
                }
                self.children.remove(chemid);
                Ok(false)
            }
            Err(source) => Err(EngineError::Io {
                path: self.program.clone(),
                source,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PesConfig {
    /// Maximum number of wells explored at the same time.
    pub simultaneous_jobs: usize,
    pub poll_interval: Duration,
    /// Threshold of the root well.
    pub barrier_threshold: f64,
}

impl Default for PesConfig {
    fn default() -> Self {
        Self {
            simultaneous_jobs: 5,
            poll_interval: Duration::from_secs(1),
            barrier_threshold: 100.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PesSummary {
    /// Wells in the order their explorations finished.
    pub explored: Vec<Chemid>,
}

#[instrument(skip_all, name = "pes_workflow", fields(root = %root.chemid()))]
pub fn run(
    root: &Structure,
    wells: &WellList,
    launcher: &mut dyn SpeciesLauncher,
    config: &PesConfig,
    reporter: &ProgressReporter,
) -> Result<PesSummary, EngineError> {
    let cap = config.simultaneous_jobs.max(1);
    if wells.register(root, config.barrier_threshold)? {
        info!("Registered the root well");
    }

    reporter.report(Progress::PhaseStart {
        name: "Surface exploration",
    });
    let mut launched = 0;
    let mut running: Vec<Chemid> = Vec::new();
    let mut summary = PesSummary::default();
    let mut known = 0;

    loop {
        let entries = wells.entries()?;
        if entries.len() > known {
            info!(new = entries.len() - known, total = entries.len(), "Found new wells");
            reporter.report(Progress::TaskStart {
                total_steps: entries.len() as u64,
            });
            known = entries.len();
        }

        let mut still_running = Vec::with_capacity(running.len());
        for chemid in running.drain(..) {
            if launcher.is_running(&chemid)? {
                still_running.push(chemid);
            } else {
                info!(%chemid, "Finished well exploration");
                summary.explored.push(chemid);
                reporter.report(Progress::TaskIncrement);
            }
        }
        running = still_running;

        while running.len() < cap && launched < entries.len() {
            let entry = &entries[launched];
            launcher.launch(entry)?;
            running.push(entry.chemid.clone());
            launched += 1;
        }

        write_status(&wells_dir(wells), &entries, &running, &summary)?;
        if running.is_empty() && launched == entries.len() {
            break;
        }
        if !config.poll_interval.is_zero() {
            thread::sleep(config.poll_interval);
        }
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    info!(wells = summary.explored.len(), "Surface exploration complete");
    Ok(summary)
}

fn wells_dir(wells: &WellList) -> PathBuf {
    wells
        .path()
        .parent()
        .map_or_else(PathBuf::new, Path::to_path_buf)
}

/// Writes one line per listed well with its current state.
fn write_status(
    dir: &Path,
    entries: &[WellEntry],
    running: &[Chemid],
    summary: &PesSummary,
) -> Result<(), EngineError> {
    let mut text = String::new();
    for entry in entries {
        let state = if summary.explored.contains(&entry.chemid) {
            "finished"
        } else if running.contains(&entry.chemid) {
            "running"
        } else {
            "waiting"
        };
        let _ = writeln!(text, "{}\t{state}", entry.chemid);
    }
    let path = dir.join(PES_SUMMARY_FILE);
    fs::write(&path, text).map_err(|source| EngineError::Io { path, source })
}
