use super::backend::{BackendError, JobKind, JobRequest, JobStatus, QcBackend, ensure_submitted};
use crate::core::chem::characterize::Characterizer;
use crate::core::conformers::generate_ring_conformers;
use crate::core::models::structure::Structure;
use crate::families::{ConstraintSet, Coordinate, TargetedCoordinate};
use nalgebra::Point3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum RefineStatus {
    Running,
    Done(Structure),
    Failed,
}

/// Job that refines the stationary point `name` at the high level.
pub fn high_level_job_name(name: &str) -> String {
    format!("{name}_high")
}

/// Improves a stationary point, polled once per tick until it is done.
pub trait Optimizer: Send + Sync {
    fn refine(&self, name: &str, structure: &Structure) -> Result<RefineStatus, BackendError>;
}

/// Refinement through the QC backend: an optional ring-conformer search, then
/// one high-level job started from the lowest conformer.
pub struct BackendOptimizer<'a> {
    backend: &'a dyn QcBackend,
    characterizer: &'a dyn Characterizer,
    conformer_search: bool,
    seed: u64,
}

impl<'a> BackendOptimizer<'a> {
    pub fn new(
        backend: &'a dyn QcBackend,
        characterizer: &'a dyn Characterizer,
        conformer_search: bool,
        seed: u64,
    ) -> Self {
        Self {
            backend,
            characterizer,
            conformer_search,
            seed,
        }
    }

    /// Lowest-energy ring conformer, `Ok(None)` while conformer jobs are running.
    fn best_conformer(
        &self,
        name: &str,
        structure: &Structure,
    ) -> Result<Option<Vec<Point3<f64>>>, BackendError> {
        // A fixed seed keeps the dihedral selection identical between polls.
        let mut rng = StdRng::seed_from_u64(self.seed);
        let search = generate_ring_conformers(structure, &mut rng);

        let mut best: Option<(f64, Vec<Point3<f64>>)> = None;
        let mut running = false;
        for (k, plan) in search.variants.iter().enumerate() {
            let job = format!("{name}_rc_{k}");
            let mut constraints = ConstraintSet::new(0);
            constraints.change = plan
                .dihedrals
                .iter()
                .zip(&plan.values)
                .map(|(&atoms, &value)| TargetedCoordinate {
                    coordinate: Coordinate::Dihedral(atoms),
                    value,
                })
                .collect();
            let request =
                JobRequest::new(&job, JobKind::RingConformer, structure).with_constraints(constraints);
            ensure_submitted(self.backend, &request)?;

            match self.backend.status(&job) {
                JobStatus::Normal | JobStatus::NormalFreq => {
                    let energy = self.backend.energy(&job)?;
                    if best.as_ref().is_none_or(|(lowest, _)| energy < *lowest) {
                        best = Some((energy, self.backend.geometry(&job)?));
                    }
                }
                JobStatus::Error => {}
                JobStatus::Absent | JobStatus::Running => running = true,
            }
        }
        if running {
            return Ok(None);
        }
        Ok(Some(
            best.map(|(_, geometry)| geometry)
                .unwrap_or_else(|| structure.geometry().to_vec()),
        ))
    }
}

impl Optimizer for BackendOptimizer<'_> {
    fn refine(&self, name: &str, structure: &Structure) -> Result<RefineStatus, BackendError> {
        let start = if self.conformer_search && !structure.rings().is_empty() {
            match self.best_conformer(name, structure)? {
                Some(geometry) => geometry,
                None => return Ok(RefineStatus::Running),
            }
        } else {
            structure.geometry().to_vec()
        };

        let job = high_level_job_name(name);
        let request = JobRequest::new(&job, JobKind::HighLevel, structure).with_geometry(&start);
        ensure_submitted(self.backend, &request)?;

        match self.backend.status(&job) {
            JobStatus::Error => Ok(RefineStatus::Failed),
            JobStatus::Normal => {
                warn!(%job, "High-level job finished without frequencies");
                Ok(RefineStatus::Failed)
            }
            JobStatus::NormalFreq => {
                let geometry = self.backend.geometry(&job)?;
                let mut refined = structure
                    .with_geometry(geometry, self.characterizer)
                    .map_err(|e| BackendError::unavailable(&job, e.to_string()))?;
                refined.energy = Some(self.backend.energy(&job)?);
                refined.zpe = Some(self.backend.zero_point_energy(&job)?);
                refined.frequencies = Some(self.backend.frequencies(&job)?);
                Ok(RefineStatus::Done(refined))
            }
            JobStatus::Absent | JobStatus::Running => Ok(RefineStatus::Running),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::characterize::GraphCharacterizer;
    use crate::core::chem::fixtures;
    use crate::engine::backend::FileBackend;
    use std::fs;
    use tempfile::tempdir;

    fn finish(backend: &FileBackend, job: &str, energy: f64, geometry: &[Point3<f64>]) {
        let coords: Vec<String> = geometry
            .iter()
            .map(|p| format!("[{:.4}, {:.4}, {:.4}]", p.x, p.y, p.z))
            .collect();
        fs::write(backend.log_path(job), "").unwrap();
        fs::write(
            backend.result_path(job),
            format!(
                "status = \"normal_freq\"\ngeometry = [{}]\nenergy = {energy:?}\nzpe = 0.05\nfrequencies = [120.0]\n",
                coords.join(", ")
            ),
        )
        .unwrap();
    }

    #[test]
    fn high_level_job_is_polled_until_done() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let characterizer = GraphCharacterizer::default();
        let optimizer = BackendOptimizer::new(&backend, &characterizer, false, 0);
        let ethane = fixtures::ethane();

        assert_eq!(optimizer.refine("eth", &ethane).unwrap(), RefineStatus::Running);
        assert!(backend.request_path("eth_high").exists());

        finish(&backend, "eth_high", -79.5, ethane.geometry());
        let RefineStatus::Done(refined) = optimizer.refine("eth", &ethane).unwrap() else {
            panic!("refinement should be done");
        };
        assert_eq!(refined.energy, Some(-79.5));
        assert_eq!(refined.zpe, Some(0.05));
    }

    #[test]
    fn conformer_search_starts_high_level_from_the_lowest_conformer() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let characterizer = GraphCharacterizer::default();
        let optimizer = BackendOptimizer::new(&backend, &characterizer, true, 11);
        let ring = fixtures::cyclobutane();

        assert_eq!(optimizer.refine("cb", &ring).unwrap(), RefineStatus::Running);
        for k in 0..3 {
            assert!(backend.request_path(&format!("cb_rc_{k}")).exists());
        }
        assert!(!backend.request_path("cb_high").exists());

        let mut shifted = ring.geometry().to_vec();
        shifted[0].z += 0.5;
        finish(&backend, "cb_rc_0", -156.0, ring.geometry());
        finish(&backend, "cb_rc_1", -156.2, &shifted);
        fs::write(backend.log_path("cb_rc_2"), "").unwrap();
        fs::write(backend.result_path("cb_rc_2"), "status = \"error\"\n").unwrap();

        assert_eq!(optimizer.refine("cb", &ring).unwrap(), RefineStatus::Running);
        let text = fs::read_to_string(backend.request_path("cb_high")).unwrap();
        let request: JobRequest = toml::from_str(&text).unwrap();
        assert!((request.geometry[0][2] - shifted[0].z).abs() < 1e-3);
    }

    #[test]
    fn failed_high_level_job_reports_failure() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let characterizer = GraphCharacterizer::default();
        let optimizer = BackendOptimizer::new(&backend, &characterizer, false, 0);
        fs::write(backend.log_path("x_high"), "").unwrap();
        fs::write(backend.result_path("x_high"), "status = \"error\"\n").unwrap();
        assert_eq!(
            optimizer.refine("x", &fixtures::ethane()).unwrap(),
            RefineStatus::Failed
        );
    }

    #[test]
    fn high_level_job_without_frequencies_is_a_failure() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        let characterizer = GraphCharacterizer::default();
        let optimizer = BackendOptimizer::new(&backend, &characterizer, false, 0);
        let ethane = fixtures::ethane();
        let coords: Vec<String> = ethane
            .geometry()
            .iter()
            .map(|p| format!("[{:.4}, {:.4}, {:.4}]", p.x, p.y, p.z))
            .collect();
        fs::write(backend.log_path("eth_high"), "").unwrap();
        fs::write(
            backend.result_path("eth_high"),
            format!("status = \"normal\"\ngeometry = [{}]\nenergy = -79.5\n", coords.join(", ")),
        )
        .unwrap();

        assert_eq!(optimizer.refine("eth", &ethane).unwrap(), RefineStatus::Failed);
    }
}
