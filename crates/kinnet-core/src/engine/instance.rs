//! One reaction instance: a family applied to one atom tuple of the reactant,
//! driven tick by tick from the first constrained optimization to a verified
//! product.
//!
//! Every tick looks at the current state, polls the backend and either stays,
//! moves forward, or fails. A result that is not readable yet never fails an
//! instance; it is reported as [`ArtifactUnavailable`] and retried on the next
//! tick with the state unchanged.

use super::backend::{BackendError, JobKind, JobRequest, JobStatus, QcBackend, ensure_submitted};
use super::config::ExplorationConfig;
use super::error::{ArtifactUnavailable, ReactionFailure};
use super::finder::instance_name;
use super::fragments::{FragmentStore, well_job_name};
use super::frequency;
use super::irc::{self, IrcEndpoint};
use super::refine::{Optimizer, RefineStatus, high_level_job_name};
use super::wells::WellList;
use crate::core::chem::characterize::Characterizer;
use crate::core::models::ids::FragmentId;
use crate::core::models::structure::{Chemid, Structure};
use crate::core::utils::units::relative_kcal;
use crate::families::{FamilyContext, ReactionFamily};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// First step of skip families whose instance is too short to need the
/// ring-flattening dihedral steps.
pub const SKIPPED_STEPS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceState {
    TsSearching,
    FreqChecking,
    IrcRunning,
    IrcProductRunning,
    ProductIdentified,
    ProductRefining,
    ProductFreqChecking,
    TsAndProductOptimizing,
    Finalizing,
    Success,
    Failed,
}

impl InstanceState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TsSearching => "ts_searching",
            Self::FreqChecking => "freq_checking",
            Self::IrcRunning => "irc_running",
            Self::IrcProductRunning => "irc_product_running",
            Self::ProductIdentified => "product_identified",
            Self::ProductRefining => "product_refining",
            Self::ProductFreqChecking => "product_freq_checking",
            Self::TsAndProductOptimizing => "ts_and_product_optimizing",
            Self::Finalizing => "finalizing",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful instance, as written to the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub reactant: Chemid,
    pub family: String,
    pub name: String,
    /// Chemids of the product fragments, sorted.
    pub products: Vec<Chemid>,
    /// kcal/mol relative to the reactant, electronic energies at the level of
    /// `ts_energy`.
    pub barrier: f64,
    /// Hartree.
    pub ts_energy: f64,
    /// Hartree.
    pub ts_zpe: f64,
    /// Sum over the product fragments of electronic plus zero-point energy, Hartree.
    pub product_energy: f64,
}

/// Everything an instance needs from its surroundings during one tick.
pub struct TickContext<'a> {
    pub backend: &'a dyn QcBackend,
    pub characterizer: &'a dyn Characterizer,
    pub optimizer: Option<&'a dyn Optimizer>,
    pub config: &'a ExplorationConfig,
    /// Optimized reactant, with its energy.
    pub reactant: &'a Structure,
    pub fragments: &'a mut FragmentStore,
    /// Shared well list; new wells are published only when present.
    pub wells: Option<&'a WellList>,
    /// Barrier threshold of this exploration, kcal/mol.
    pub barrier_threshold: f64,
}

enum TickError {
    Defer(ArtifactUnavailable),
    Fail(ReactionFailure),
}

impl From<BackendError> for TickError {
    fn from(err: BackendError) -> Self {
        Self::Defer(err.into())
    }
}

impl From<ReactionFailure> for TickError {
    fn from(failure: ReactionFailure) -> Self {
        Self::Fail(failure)
    }
}

fn defer(job: &str, reason: impl Into<String>) -> TickError {
    TickError::Defer(ArtifactUnavailable {
        job: job.to_string(),
        reason: reason.into(),
    })
}

fn invalid(err: impl fmt::Display) -> TickError {
    TickError::Fail(ReactionFailure::InvalidStructure {
        reason: err.to_string(),
    })
}

type TickResult = Result<(), TickError>;

pub struct ReactionInstance {
    name: String,
    family: Arc<dyn ReactionFamily>,
    atoms: Vec<usize>,
    max_step: usize,
    step: usize,
    state: InstanceState,
    started: bool,
    geometry: Vec<Point3<f64>>,
    pending: Option<JobRequest>,
    scan_energies: Vec<f64>,
    scan_peak: Option<Vec<Point3<f64>>>,
    ts: Option<Structure>,
    refined_ts: Option<Structure>,
    refined_reactant: Option<Structure>,
    product: Option<Structure>,
    products: Vec<FragmentId>,
    barrier: Option<f64>,
    redirects: usize,
    failure: Option<ReactionFailure>,
    record: Option<ReactionRecord>,
}

impl fmt::Debug for ReactionInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactionInstance")
            .field("name", &self.name)
            .field("family", &self.family.name())
            .field("state", &self.state)
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}

impl ReactionInstance {
    /// Scan families end their schedule at `scan_step` instead of their own
    /// maximum.
    pub fn new(
        family: Arc<dyn ReactionFamily>,
        atoms: Vec<usize>,
        reactant: &Structure,
        scan_step: usize,
    ) -> Self {
        let max_step = if family.scan() {
            scan_step
        } else {
            family.max_step()
        };
        Self {
            name: instance_name(reactant.chemid(), family.name(), &atoms),
            family,
            atoms,
            max_step,
            step: 0,
            state: InstanceState::TsSearching,
            started: false,
            geometry: reactant.geometry().to_vec(),
            pending: None,
            scan_energies: Vec::new(),
            scan_peak: None,
            ts: None,
            refined_ts: None,
            refined_reactant: None,
            product: None,
            products: Vec::new(),
            barrier: None,
            redirects: 0,
            failure: None,
            record: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family_name(&self) -> &'static str {
        self.family.name()
    }

    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn max_step(&self) -> usize {
        self.max_step
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn barrier(&self) -> Option<f64> {
        self.barrier
    }

    /// The confirmed saddle point at the screening level.
    pub fn transition_state(&self) -> Option<&Structure> {
        self.ts.as_ref()
    }

    /// The saddle point at the level its record was computed at.
    pub fn final_transition_state(&self) -> Option<&Structure> {
        self.refined_ts.as_ref().or(self.ts.as_ref())
    }

    /// The reactant at the high level, once refined.
    pub fn refined_reactant(&self) -> Option<&Structure> {
        self.refined_reactant.as_ref()
    }

    pub fn products(&self) -> &[FragmentId] {
        &self.products
    }

    pub fn failure(&self) -> Option<&ReactionFailure> {
        self.failure.as_ref()
    }

    pub fn record(&self) -> Option<&ReactionRecord> {
        self.record.as_ref()
    }

    /// Runs one tick. Terminal instances are left untouched.
    pub fn advance(&mut self, ctx: &mut TickContext<'_>) -> Result<(), ArtifactUnavailable> {
        let result = match self.state {
            InstanceState::TsSearching => self.search_saddle_point(ctx),
            InstanceState::FreqChecking => self.check_frequencies(ctx),
            InstanceState::IrcRunning => self.run_irc(ctx),
            InstanceState::IrcProductRunning => self.optimize_irc_endpoints(ctx),
            InstanceState::ProductIdentified => self.register_products(ctx),
            InstanceState::ProductRefining => self.optimize_products(ctx),
            InstanceState::ProductFreqChecking => self.check_product_frequencies(ctx),
            InstanceState::TsAndProductOptimizing => self.refine_stationary_points(ctx),
            InstanceState::Finalizing => self.finalize(ctx),
            InstanceState::Success | InstanceState::Failed => Ok(()),
        };
        match result {
            Ok(()) => Ok(()),
            Err(TickError::Defer(reason)) => {
                debug!(instance = %self.name, state = %self.state, %reason, "Deferred");
                Err(reason)
            }
            Err(TickError::Fail(failure)) => {
                self.fail(ctx, failure);
                Ok(())
            }
        }
    }

    fn transition(&mut self, next: InstanceState) {
        debug!(instance = %self.name, from = %self.state, to = %next, "State transition");
        self.state = next;
    }

    fn fail(&mut self, ctx: &TickContext<'_>, failure: ReactionFailure) {
        info!(instance = %self.name, state = %self.state, reason = %failure, "Reaction failed");
        if ctx.config.delete_intermediate_files {
            for job in self.job_names() {
                if let Err(e) = ctx.backend.remove_artifacts(&job) {
                    warn!(instance = %self.name, %job, error = %e, "Could not remove job artifacts");
                }
            }
        }
        self.failure = Some(failure);
        self.state = InstanceState::Failed;
    }

    fn step_job_name(&self, step: usize) -> String {
        format!("{}_step{}", self.name, step)
    }

    fn freq_job_name(&self) -> String {
        format!("{}_freq", self.name)
    }

    fn irc_job_names(&self) -> [String; 2] {
        [
            format!("{}_IRC_F", self.name),
            format!("{}_IRC_R", self.name),
        ]
    }

    /// Every job this instance may have started.
    fn job_names(&self) -> Vec<String> {
        let mut jobs: Vec<String> = (0..self.max_step).map(|k| self.step_job_name(k)).collect();
        jobs.push(self.name.clone());
        jobs.push(self.freq_job_name());
        for irc in self.irc_job_names() {
            jobs.push(format!("{irc}_prod"));
            jobs.push(irc);
        }
        jobs
    }

    fn search_saddle_point(&mut self, ctx: &mut TickContext<'_>) -> TickResult {
        if !self.started && self.pending.is_none() {
            match ctx.backend.status(&self.name) {
                JobStatus::NormalFreq => {
                    info!(instance = %self.name, "Reusing finished saddle-point search");
                    self.started = true;
                    self.step = self.max_step + 1;
                    self.transition(InstanceState::FreqChecking);
                    return Ok(());
                }
                JobStatus::Error => {
                    return Err(ReactionFailure::JobError {
                        job: self.name.clone(),
                    }
                    .into());
                }
                _ => {}
            }
            if self.step == 0 && self.family.skip() && self.atoms.len() < 4 {
                self.step = SKIPPED_STEPS.min(self.max_step);
            }
        }

        if let Some(request) = &self.pending {
            let job = request.name.clone();
            let kind = request.kind;
            match ctx.backend.status(&job) {
                JobStatus::Absent => {
                    ctx.backend.submit(request)?;
                    return Ok(());
                }
                JobStatus::Running => return Ok(()),
                JobStatus::Error => return Err(ReactionFailure::JobError { job }.into()),
                JobStatus::Normal | JobStatus::NormalFreq => {
                    let geometry = ctx.backend.geometry(&job)?;
                    if kind == JobKind::Scan {
                        let energy = ctx.backend.energy(&job)?;
                        self.record_scan_point(energy, geometry);
                    } else {
                        self.geometry = geometry;
                    }
                    self.pending = None;
                }
            }
        }

        if self.step > self.max_step {
            self.transition(InstanceState::FreqChecking);
            return Ok(());
        }

        let family_ctx = FamilyContext {
            reactant: ctx.reactant,
            instance: &self.atoms,
            geometry: &self.geometry,
            max_step: self.max_step,
        };
        let constraints = self.family.constraints(self.step, &family_ctx);
        // The family may move the schedule; the job runs at the step it returns.
        let step = constraints.next_step;
        let (job, kind) = if step >= self.max_step {
            (self.name.clone(), JobKind::SaddleOpt)
        } else if self.family.scan() {
            (self.step_job_name(step), JobKind::Scan)
        } else if !self.started {
            (self.step_job_name(step), JobKind::PreOpt0)
        } else {
            (self.step_job_name(step), JobKind::PreOpt)
        };

        let request = JobRequest::new(job, kind, ctx.reactant)
            .with_geometry(&self.geometry)
            .with_constraints(constraints);
        ensure_submitted(ctx.backend, &request)?;
        debug!(instance = %self.name, job = %request.name, step, "Submitted search step");
        self.started = true;
        self.step = step + 1;
        self.pending = Some(request);
        Ok(())
    }

    /// Once the scan energy drops the maximum has been passed; the saddle-point
    /// search starts from the highest point seen.
    fn record_scan_point(&mut self, energy: f64, geometry: Vec<Point3<f64>>) {
        let passed_maximum = self
            .scan_energies
            .last()
            .is_some_and(|&previous| energy < previous);
        self.scan_energies.push(energy);
        if passed_maximum && self.step < self.max_step {
            debug!(instance = %self.name, step = self.step, "Scan passed the energy maximum");
            self.geometry = self.scan_peak.take().unwrap_or(geometry);
            self.step = self.max_step;
        } else {
            self.scan_peak = Some(geometry.clone());
            self.geometry = geometry;
        }
    }

    fn check_frequencies(&mut self, ctx: &mut TickContext<'_>) -> TickResult {
        if self.ts.is_none() {
            let geometry = ctx.backend.geometry(&self.name)?;
            let energy = ctx.backend.energy(&self.name)?;
            let mut ts = ctx
                .reactant
                .with_geometry(geometry, ctx.characterizer)
                .map_err(invalid)?;
            ts.energy = Some(energy);
            self.ts = Some(ts);
        }
        let Some(ts) = self.ts.as_ref() else {
            return Err(defer(&self.name, "saddle point not loaded"));
        };

        let job = self.freq_job_name();
        ensure_submitted(ctx.backend, &JobRequest::new(&job, JobKind::Freq, ts))?;
        match ctx.backend.status(&job) {
            JobStatus::Absent | JobStatus::Running => return Ok(()),
            JobStatus::Error => return Err(ReactionFailure::JobError { job }.into()),
            JobStatus::Normal => return Err(ReactionFailure::MissingFrequencies { job }.into()),
            JobStatus::NormalFreq => {}
        }
        let frequencies = ctx.backend.frequencies(&job)?;
        let zpe = ctx.backend.zero_point_energy(&job)?;
        frequency::check_saddle_point(&frequencies, ctx.config.thresholds.imaginary_threshold)?;

        let Some(reactant_energy) = ctx.reactant.energy else {
            return Err(defer(&self.name, "reactant energy is not known"));
        };
        let Some(ts_energy) = ts.energy else {
            return Err(defer(&self.name, "saddle-point energy is not known"));
        };
        let barrier = relative_kcal(ts_energy, reactant_energy);

        if let Some(ts) = self.ts.as_mut() {
            ts.zpe = Some(zpe);
            ts.frequencies = Some(frequencies);
        }
        self.barrier = Some(barrier);
        if barrier > ctx.barrier_threshold {
            return Err(ReactionFailure::BarrierTooHigh {
                barrier,
                threshold: ctx.barrier_threshold,
            }
            .into());
        }
        debug!(instance = %self.name, barrier, "Saddle point confirmed");
        self.transition(InstanceState::IrcRunning);
        Ok(())
    }

    fn run_irc(&mut self, ctx: &mut TickContext<'_>) -> TickResult {
        let Some(ts) = self.ts.as_ref() else {
            return Err(defer(&self.name, "saddle point not loaded"));
        };
        let [forward, reverse] = self.irc_job_names();
        ensure_submitted(ctx.backend, &JobRequest::new(&forward, JobKind::IrcForward, ts))?;
        ensure_submitted(ctx.backend, &JobRequest::new(&reverse, JobKind::IrcReverse, ts))?;

        let statuses = [ctx.backend.status(&forward), ctx.backend.status(&reverse)];
        if !statuses.iter().all(|s| s.is_finished()) {
            return Ok(());
        }
        if statuses.iter().all(|&s| s == JobStatus::Error) {
            return Err(ReactionFailure::JobError { job: forward }.into());
        }
        self.transition(InstanceState::IrcProductRunning);
        Ok(())
    }

    fn optimize_irc_endpoints(&mut self, ctx: &mut TickContext<'_>) -> TickResult {
        let mut finished = Vec::with_capacity(2);
        let mut waiting = false;
        for irc in self.irc_job_names() {
            if ctx.backend.status(&irc) == JobStatus::Error {
                finished.push(None);
                continue;
            }
            let job = format!("{irc}_prod");
            let geometry = ctx.backend.geometry(&irc)?;
            let request =
                JobRequest::new(&job, JobKind::IrcProduct, ctx.reactant).with_geometry(&geometry);
            ensure_submitted(ctx.backend, &request)?;
            match ctx.backend.status(&job) {
                JobStatus::Absent | JobStatus::Running => waiting = true,
                JobStatus::Error => finished.push(None),
                JobStatus::Normal | JobStatus::NormalFreq => finished.push(Some(job)),
            }
        }
        if waiting {
            return Ok(());
        }

        let mut endpoints = Vec::with_capacity(2);
        for job in finished {
            let endpoint = match job {
                None => IrcEndpoint::Invalid,
                Some(job) => {
                    let geometry = ctx.backend.geometry(&job)?;
                    let energy = ctx.backend.energy(&job)?;
                    let mut structure = ctx
                        .reactant
                        .with_geometry(geometry, ctx.characterizer)
                        .map_err(invalid)?;
                    structure.energy = Some(energy);
                    irc::classify_endpoint(structure, ctx.reactant)
                }
            };
            endpoints.push(endpoint);
        }
        let reverse = endpoints.pop().unwrap_or(IrcEndpoint::Invalid);
        let forward = endpoints.pop().unwrap_or(IrcEndpoint::Invalid);
        let product = irc::resolve_product(forward, reverse)?;
        debug!(instance = %self.name, product = %product.chemid(), "Reaction path resolved");
        // The saddle point carries every bond that breaks or forms on the path.
        if let Some(ts) = self.ts.as_ref() {
            let bonds = ctx
                .reactant
                .bond_matrix()
                .union(product.bond_matrix())
                .map_err(invalid)?;
            self.ts = Some(ts.with_connectivity(&bonds).map_err(invalid)?);
        }
        self.product = Some(product);
        self.transition(InstanceState::ProductIdentified);
        Ok(())
    }

    fn register_products(&mut self, ctx: &mut TickContext<'_>) -> TickResult {
        let Some(product) = self.product.as_ref() else {
            return Err(defer(&self.name, "product not resolved"));
        };
        let pieces = product.fragments(ctx.characterizer).map_err(invalid)?;
        self.products = pieces
            .into_iter()
            .map(|piece| ctx.fragments.register(piece).0)
            .collect();
        for &id in &self.products {
            submit_well_job(ctx, id)?;
        }
        self.transition(InstanceState::ProductRefining);
        Ok(())
    }

    /// Waits for every fragment's well optimization. A fragment whose optimized
    /// structure is a different species is replaced by the fragments of that
    /// species, at most `max_product_redirects` times.
    fn optimize_products(&mut self, ctx: &mut TickContext<'_>) -> TickResult {
        let mut waiting = false;
        let mut index = 0;
        while index < self.products.len() {
            let id = self.products[index];
            let Some(optimized) = fetch_optimized(ctx, id)? else {
                waiting = true;
                index += 1;
                continue;
            };
            let Some(record) = ctx.fragments.get(id) else {
                return Err(invalid("unknown product fragment"));
            };
            if optimized.chemid() == record.chemid() {
                index += 1;
                continue;
            }

            self.redirects += 1;
            let limit = ctx.config.search.max_product_redirects;
            if self.redirects > limit {
                return Err(ReactionFailure::ProductDiverged { redirects: limit }.into());
            }
            info!(
                instance = %self.name,
                from = %record.chemid(),
                to = %optimized.chemid(),
                "Product optimized to a different species"
            );
            let pieces = optimized.fragments(ctx.characterizer).map_err(invalid)?;
            let replacements: Vec<FragmentId> = pieces
                .into_iter()
                .map(|piece| ctx.fragments.register(piece).0)
                .collect();
            for &replacement in &replacements {
                submit_well_job(ctx, replacement)?;
            }
            self.products.splice(index..=index, replacements);
        }
        if !waiting {
            self.transition(InstanceState::ProductFreqChecking);
        }
        Ok(())
    }

    fn check_product_frequencies(&mut self, ctx: &mut TickContext<'_>) -> TickResult {
        for &id in &self.products {
            let Some(record) = ctx.fragments.get(id) else {
                return Err(invalid("unknown product fragment"));
            };
            let Some(optimized) = record.optimized.as_ref() else {
                return Err(invalid("product fragment was never optimized"));
            };
            let Some(frequencies) = optimized.frequencies.as_deref() else {
                return Err(ReactionFailure::MissingFrequencies {
                    job: record.job_name(),
                }
                .into());
            };
            frequency::check_minimum(frequencies, ctx.config.thresholds.imaginary_threshold)?;
        }
        self.transition(InstanceState::TsAndProductOptimizing);
        Ok(())
    }

    /// Refines the reactant, the saddle point and every product fragment at
    /// the high level, so that the final energies share one level of theory.
    fn refine_stationary_points(&mut self, ctx: &mut TickContext<'_>) -> TickResult {
        let optimizer = match ctx.optimizer {
            Some(optimizer) if ctx.config.refinement.high_level => optimizer,
            _ => {
                self.transition(InstanceState::Finalizing);
                return Ok(());
            }
        };

        let mut waiting = false;
        if self.refined_reactant.is_none() {
            let job = well_job_name(ctx.reactant.chemid());
            match refine_with(optimizer, &job, ctx.reactant)? {
                Some(refined) => self.refined_reactant = Some(refined),
                None => waiting = true,
            }
        }
        if self.refined_ts.is_none() {
            let Some(ts) = self.ts.as_ref() else {
                return Err(defer(&self.name, "saddle point not loaded"));
            };
            match refine_with(optimizer, &self.name, ts)? {
                Some(refined) => self.refined_ts = Some(refined),
                None => waiting = true,
            }
        }

        for &id in &self.products {
            let Some(record) = ctx.fragments.get(id) else {
                return Err(invalid("unknown product fragment"));
            };
            if record.refined.is_some() {
                continue;
            }
            let Some(optimized) = record.optimized.clone() else {
                return Err(invalid("product fragment was never optimized"));
            };
            match refine_with(optimizer, &record.job_name(), &optimized)? {
                Some(refined) => {
                    if let Some(record) = ctx.fragments.get_mut(id) {
                        record.refined = Some(refined);
                    }
                }
                None => waiting = true,
            }
        }
        if !waiting {
            self.transition(InstanceState::Finalizing);
        }
        Ok(())
    }

    fn finalize(&mut self, ctx: &mut TickContext<'_>) -> TickResult {
        let threshold = ctx.config.thresholds.imaginary_threshold;
        // Barrier and well depth are taken against the reactant at the level
        // the saddle point ended on.
        let (ts, ts_job, reference) = match (&self.refined_ts, &self.refined_reactant) {
            (Some(ts), Some(reactant)) => (ts, high_level_job_name(&self.name), reactant),
            _ => match self.ts.as_ref() {
                Some(ts) => (ts, self.freq_job_name(), ctx.reactant),
                None => return Err(defer(&self.name, "saddle point not loaded")),
            },
        };
        let (Some(frequencies), Some(ts_zpe)) = (ts.frequencies.as_deref(), ts.zpe) else {
            return Err(ReactionFailure::MissingFrequencies { job: ts_job }.into());
        };
        let found = frequency::imaginary_count(frequencies, threshold);
        if found > 1 {
            return Err(ReactionFailure::WrongImaginaryFrequencyCount { expected: 1, found }.into());
        }
        let Some(ts_energy) = ts.energy else {
            return Err(defer(&ts_job, "saddle-point energy is not known"));
        };
        let Some(reference_energy) = reference.energy else {
            return Err(defer(&self.name, "reactant energy is not known"));
        };
        let barrier = relative_kcal(ts_energy, reference_energy);

        let mut products = Vec::with_capacity(self.products.len());
        let mut product_energy = 0.0;
        for &id in &self.products {
            let Some(record) = ctx.fragments.get(id) else {
                return Err(invalid("unknown product fragment"));
            };
            let best = record.best();
            let job = if record.refined.is_some() {
                high_level_job_name(&record.job_name())
            } else {
                record.job_name()
            };
            let (Some(frequencies), Some(zpe)) = (best.frequencies.as_deref(), best.zpe) else {
                return Err(ReactionFailure::MissingFrequencies { job }.into());
            };
            frequency::check_minimum(frequencies, threshold)?;
            let Some(energy) = best.energy else {
                return Err(defer(&job, "product energy is not known"));
            };
            product_energy += energy + zpe;
            products.push(best.chemid().clone());
        }
        products.sort();

        if ctx.config.network_mode && self.products.len() == 1 {
            if let (Some(wells), Some(record)) = (ctx.wells, ctx.fragments.get(self.products[0])) {
                let Some(reference_total) = reference.total_energy() else {
                    return Err(ReactionFailure::MissingFrequencies {
                        job: well_job_name(ctx.reactant.chemid()),
                    }
                    .into());
                };
                let depth = relative_kcal(product_energy, reference_total);
                wells
                    .register(record.best(), ctx.barrier_threshold - depth)
                    .map_err(|e| defer(&self.name, e.to_string()))?;
            }
        }

        info!(
            instance = %self.name,
            barrier = format_args!("{barrier:.2}"),
            products = ?products.iter().map(Chemid::as_str).collect::<Vec<_>>(),
            "Reaction succeeded"
        );
        self.record = Some(ReactionRecord {
            reactant: ctx.reactant.chemid().clone(),
            family: self.family.name().to_string(),
            name: self.name.clone(),
            products,
            barrier,
            ts_energy,
            ts_zpe,
            product_energy,
        });
        self.transition(InstanceState::Success);
        Ok(())
    }
}

/// Polls one refinement; `None` while it is running.
fn refine_with(
    optimizer: &dyn Optimizer,
    name: &str,
    structure: &Structure,
) -> Result<Option<Structure>, TickError> {
    match optimizer.refine(name, structure)? {
        RefineStatus::Running => Ok(None),
        RefineStatus::Done(refined) => Ok(Some(refined)),
        RefineStatus::Failed => Err(ReactionFailure::JobError {
            job: high_level_job_name(name),
        }
        .into()),
    }
}

fn submit_well_job(ctx: &TickContext<'_>, id: FragmentId) -> Result<(), TickError> {
    let Some(record) = ctx.fragments.get(id) else {
        return Err(invalid("unknown product fragment"));
    };
    if record.optimized.is_none() {
        let request = JobRequest::new(record.job_name(), JobKind::WellOpt, &record.initial);
        ensure_submitted(ctx.backend, &request)?;
    }
    Ok(())
}

/// The optimized structure of a fragment, loading it from the backend once
/// its well job has finished. `None` while the job is still running.
fn fetch_optimized(ctx: &mut TickContext<'_>, id: FragmentId) -> Result<Option<Structure>, TickError> {
    let Some(record) = ctx.fragments.get(id) else {
        return Err(invalid("unknown product fragment"));
    };
    if let Some(optimized) = &record.optimized {
        return Ok(Some(optimized.clone()));
    }
    let job = record.job_name();
    let request = JobRequest::new(&job, JobKind::WellOpt, &record.initial);
    ensure_submitted(ctx.backend, &request)?;
    // A single atom has no vibrations to compute.
    let with_frequencies = match ctx.backend.status(&job) {
        JobStatus::Absent | JobStatus::Running => return Ok(None),
        JobStatus::Error => return Err(ReactionFailure::JobError { job }.into()),
        JobStatus::Normal if record.initial.natoms() > 1 => {
            return Err(ReactionFailure::MissingFrequencies { job }.into());
        }
        JobStatus::Normal => false,
        JobStatus::NormalFreq => true,
    };
    let geometry = ctx.backend.geometry(&job)?;
    let energy = ctx.backend.energy(&job)?;
    let mut optimized = record
        .initial
        .with_geometry(geometry, ctx.characterizer)
        .map_err(invalid)?;
    optimized.energy = Some(energy);
    if with_frequencies {
        optimized.zpe = Some(ctx.backend.zero_point_energy(&job)?);
        optimized.frequencies = Some(ctx.backend.frequencies(&job)?);
    } else {
        optimized.zpe = Some(0.0);
        optimized.frequencies = Some(Vec::new());
    }
    if let Some(record) = ctx.fragments.get_mut(id) {
        record.optimized = Some(optimized.clone());
    }
    Ok(Some(optimized))
}
