//! The seam between the engine and whatever runs the electronic-structure jobs.
//!
//! The engine only ever submits named jobs and polls them. [`FileBackend`]
//! implements the protocol through a shared directory so that any external
//! driver (a queue wrapper, a script around a QC code) can serve the jobs.

use crate::core::models::structure::Structure;
use crate::families::ConstraintSet;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("result of job '{job}' is unavailable: {reason}")]
    Unavailable { job: String, reason: String },
    #[error("I/O error for job '{job}' at '{path}': {source}")]
    Io {
        job: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode request for job '{job}': {message}")]
    Encode { job: String, message: String },
}

impl BackendError {
    pub fn job(&self) -> &str {
        match self {
            BackendError::Unavailable { job, .. }
            | BackendError::Io { job, .. }
            | BackendError::Encode { job, .. } => job,
        }
    }

    pub fn unavailable(job: &str, reason: impl Into<String>) -> Self {
        BackendError::Unavailable {
            job: job.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Absent,
    Running,
    Normal,
    /// Finished normally and includes a frequency calculation.
    NormalFreq,
    Error,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Normal | JobStatus::NormalFreq | JobStatus::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// First constrained optimization of a transition-state search.
    PreOpt0,
    /// Intermediate constrained optimization.
    PreOpt,
    /// Unconstrained saddle-point optimization.
    SaddleOpt,
    /// Constrained scan point.
    Scan,
    Freq,
    IrcForward,
    IrcReverse,
    /// Minimization from an IRC endpoint.
    IrcProduct,
    /// Minimization of a well, including frequencies.
    WellOpt,
    /// Reoptimization at the high level of theory, including frequencies.
    HighLevel,
    RingConformer,
}

/// Everything a driver needs to run one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub name: String,
    pub kind: JobKind,
    pub charge: i32,
    pub multiplicity: u32,
    pub atoms: Vec<String>,
    pub geometry: Vec<[f64; 3]>,
    #[serde(default)]
    pub constraints: ConstraintSet,
}

impl JobRequest {
    pub fn new(name: impl Into<String>, kind: JobKind, structure: &Structure) -> Self {
        Self {
            name: name.into(),
            kind,
            charge: structure.charge(),
            multiplicity: structure.multiplicity(),
            atoms: structure.atoms().to_vec(),
            geometry: structure.geometry().iter().map(|p| [p.x, p.y, p.z]).collect(),
            constraints: ConstraintSet::default(),
        }
    }

    pub fn with_geometry(mut self, geometry: &[Point3<f64>]) -> Self {
        self.geometry = geometry.iter().map(|p| [p.x, p.y, p.z]).collect();
        self
    }

    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub name: String,
    pub kind: JobKind,
}

/// Job submission and result retrieval.
///
/// `status` never fails: anything that cannot be read is reported as
/// [`JobStatus::Absent`] or [`JobStatus::Running`]. Result accessors fail with
/// [`BackendError::Unavailable`] when the artifact is missing or unreadable.
pub trait QcBackend: Send + Sync {
    fn submit(&self, request: &JobRequest) -> Result<JobHandle, BackendError>;
    fn status(&self, job: &str) -> JobStatus;
    fn geometry(&self, job: &str) -> Result<Vec<Point3<f64>>, BackendError>;
    /// Electronic energy in Hartree.
    fn energy(&self, job: &str) -> Result<f64, BackendError>;
    /// Zero-point energy in Hartree.
    fn zero_point_energy(&self, job: &str) -> Result<f64, BackendError>;
    /// Frequencies in cm^-1; imaginary modes are negative.
    fn frequencies(&self, job: &str) -> Result<Vec<f64>, BackendError>;
    fn remove_artifacts(&self, job: &str) -> Result<(), BackendError>;
}

/// Submits `request` unless a job of that name is already known to the backend.
pub fn ensure_submitted(
    backend: &dyn QcBackend,
    request: &JobRequest,
) -> Result<JobHandle, BackendError> {
    if backend.status(&request.name) == JobStatus::Absent {
        backend.submit(request)
    } else {
        Ok(JobHandle {
            name: request.name.clone(),
            kind: request.kind,
        })
    }
}

/// Result file written by the external driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub status: JobStatus,
    #[serde(default)]
    pub geometry: Vec<[f64; 3]>,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub zpe: Option<f64>,
    #[serde(default)]
    pub frequencies: Vec<f64>,
}

/// Directory-based job exchange.
///
/// For a job `name` inside the exchange directory:
///
/// - `name.job.toml` is the request written by [`QcBackend::submit`],
/// - `name.log` is created by the driver once it picks the job up,
/// - `name.result.toml` holds the [`JobResult`] when the job is done.
///
/// Deleting `name.log` makes the job look absent again, so it is resubmitted.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| BackendError::Io {
            job: String::new(),
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn request_path(&self, job: &str) -> PathBuf {
        self.root.join(format!("{job}.job.toml"))
    }

    pub fn log_path(&self, job: &str) -> PathBuf {
        self.root.join(format!("{job}.log"))
    }

    pub fn result_path(&self, job: &str) -> PathBuf {
        self.root.join(format!("{job}.result.toml"))
    }

    fn read_result(&self, job: &str) -> Result<JobResult, BackendError> {
        let path = self.result_path(job);
        let text = fs::read_to_string(&path)
            .map_err(|e| BackendError::unavailable(job, format!("cannot read result: {e}")))?;
        toml::from_str(&text)
            .map_err(|e| BackendError::unavailable(job, format!("malformed result: {e}")))
    }

    fn finished_result(&self, job: &str) -> Result<JobResult, BackendError> {
        let result = self.read_result(job)?;
        if result.status.is_finished() {
            Ok(result)
        } else {
            Err(BackendError::unavailable(job, "job has not finished"))
        }
    }
}

impl QcBackend for FileBackend {
    fn submit(&self, request: &JobRequest) -> Result<JobHandle, BackendError> {
        let text = toml::to_string(request).map_err(|e| BackendError::Encode {
            job: request.name.clone(),
            message: e.to_string(),
        })?;
        let path = self.request_path(&request.name);
        fs::write(&path, text).map_err(|source| BackendError::Io {
            job: request.name.clone(),
            path,
            source,
        })?;
        debug!(job = %request.name, kind = ?request.kind, "Submitted job request");
        Ok(JobHandle {
            name: request.name.clone(),
            kind: request.kind,
        })
    }

    fn status(&self, job: &str) -> JobStatus {
        if !self.log_path(job).exists() {
            return JobStatus::Absent;
        }
        match self.read_result(job) {
            Ok(result) if result.status.is_finished() => result.status,
            _ => JobStatus::Running,
        }
    }

    fn geometry(&self, job: &str) -> Result<Vec<Point3<f64>>, BackendError> {
        let result = self.finished_result(job)?;
        if result.geometry.is_empty() {
            return Err(BackendError::unavailable(job, "result has no geometry"));
        }
        Ok(result
            .geometry
            .iter()
            .map(|&[x, y, z]| Point3::new(x, y, z))
            .collect())
    }

    fn energy(&self, job: &str) -> Result<f64, BackendError> {
        self.finished_result(job)?
            .energy
            .ok_or_else(|| BackendError::unavailable(job, "result has no energy"))
    }

    fn zero_point_energy(&self, job: &str) -> Result<f64, BackendError> {
        self.finished_result(job)?
            .zpe
            .ok_or_else(|| BackendError::unavailable(job, "result has no zero-point energy"))
    }

    fn frequencies(&self, job: &str) -> Result<Vec<f64>, BackendError> {
        let result = self.finished_result(job)?;
        if result.status != JobStatus::NormalFreq {
            return Err(BackendError::unavailable(job, "job did not compute frequencies"));
        }
        Ok(result.frequencies)
    }

    fn remove_artifacts(&self, job: &str) -> Result<(), BackendError> {
        for path in [
            self.request_path(job),
            self.log_path(job),
            self.result_path(job),
        ] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(BackendError::Io {
                        job: job.to_string(),
                        path,
                        source,
                    });
                }
            }
        }
        Ok(())
    }
}
