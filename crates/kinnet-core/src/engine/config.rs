use crate::families::FamilySelection;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for {parameter}: {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdConfig {
    /// Highest accepted barrier in kcal/mol, relative to the reactant.
    pub barrier_threshold: f64,
    /// A frequency counts as imaginary below the negative of this value (cm^-1).
    pub imaginary_threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub families: FamilySelection,
    pub skip_families: Vec<String>,
    /// Last step of scan families.
    pub scan_step: usize,
    pub max_product_redirects: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementConfig {
    pub high_level: bool,
    pub conformer_search: bool,
    pub conformer_seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplorationConfig {
    /// Directory holding job artifacts, snapshots, summaries and the well list.
    pub workdir: PathBuf,
    pub thresholds: ThresholdConfig,
    pub search: SearchConfig,
    pub refinement: RefinementConfig,
    pub tick_interval: Duration,
    /// Whether new product wells are published for further exploration.
    pub network_mode: bool,
    pub delete_intermediate_files: bool,
}

#[derive(Default)]
pub struct ExplorationConfigBuilder {
    workdir: Option<PathBuf>,
    barrier_threshold: Option<f64>,
    imaginary_threshold: Option<f64>,
    families: Option<FamilySelection>,
    skip_families: Vec<String>,
    scan_step: Option<usize>,
    max_product_redirects: Option<usize>,
    high_level: bool,
    conformer_search: bool,
    conformer_seed: u64,
    tick_interval: Option<Duration>,
    network_mode: bool,
    delete_intermediate_files: bool,
}

impl ExplorationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workdir(mut self, path: PathBuf) -> Self {
        self.workdir = Some(path);
        self
    }
    pub fn barrier_threshold(mut self, kcal_mol: f64) -> Self {
        self.barrier_threshold = Some(kcal_mol);
        self
    }
    pub fn imaginary_threshold(mut self, wavenumber: f64) -> Self {
        self.imaginary_threshold = Some(wavenumber);
        self
    }
    pub fn families(mut self, selection: FamilySelection) -> Self {
        self.families = Some(selection);
        self
    }
    pub fn skip_families(mut self, names: Vec<String>) -> Self {
        self.skip_families = names;
        self
    }
    pub fn scan_step(mut self, step: usize) -> Self {
        self.scan_step = Some(step);
        self
    }
    pub fn max_product_redirects(mut self, n: usize) -> Self {
        self.max_product_redirects = Some(n);
        self
    }
    pub fn high_level(mut self, enabled: bool) -> Self {
        self.high_level = enabled;
        self
    }
    pub fn conformer_search(mut self, enabled: bool) -> Self {
        self.conformer_search = enabled;
        self
    }
    pub fn conformer_seed(mut self, seed: u64) -> Self {
        self.conformer_seed = seed;
        self
    }
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }
    pub fn network_mode(mut self, enabled: bool) -> Self {
        self.network_mode = enabled;
        self
    }
    pub fn delete_intermediate_files(mut self, enabled: bool) -> Self {
        self.delete_intermediate_files = enabled;
        self
    }

    pub fn build(self) -> Result<ExplorationConfig, ConfigError> {
        let thresholds = ThresholdConfig {
            barrier_threshold: self
                .barrier_threshold
                .ok_or(ConfigError::MissingParameter("barrier_threshold"))?,
            imaginary_threshold: self
                .imaginary_threshold
                .ok_or(ConfigError::MissingParameter("imaginary_threshold"))?,
        };
        if thresholds.imaginary_threshold < 0.0 {
            return Err(ConfigError::InvalidValue {
                parameter: "imaginary_threshold",
                reason: "must not be negative".to_string(),
            });
        }

        let scan_step = self
            .scan_step
            .ok_or(ConfigError::MissingParameter("scan_step"))?;
        if scan_step == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "scan_step",
                reason: "must be at least 1".to_string(),
            });
        }
        let search = SearchConfig {
            families: self.families.unwrap_or_default(),
            skip_families: self.skip_families,
            scan_step,
            max_product_redirects: self
                .max_product_redirects
                .ok_or(ConfigError::MissingParameter("max_product_redirects"))?,
        };

        // Conformers are searched only on the way to a high-level refinement.
        if self.conformer_search && !self.high_level {
            return Err(ConfigError::InvalidValue {
                parameter: "conformer_search",
                reason: "requires high_level".to_string(),
            });
        }

        Ok(ExplorationConfig {
            workdir: self
                .workdir
                .ok_or(ConfigError::MissingParameter("workdir"))?,
            thresholds,
            search,
            refinement: RefinementConfig {
                high_level: self.high_level,
                conformer_search: self.conformer_search,
                conformer_seed: self.conformer_seed,
            },
            tick_interval: self
                .tick_interval
                .ok_or(ConfigError::MissingParameter("tick_interval"))?,
            network_mode: self.network_mode,
            delete_intermediate_files: self.delete_intermediate_files,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_config(workdir: PathBuf) -> ExplorationConfig {
    ExplorationConfigBuilder::new()
        .workdir(workdir)
        .barrier_threshold(100.0)
        .imaginary_threshold(50.0)
        .scan_step(30)
        .max_product_redirects(3)
        .tick_interval(Duration::ZERO)
        .build()
        .expect("test configuration is complete")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_reports_the_first_missing_parameter() {
        let err = ExplorationConfigBuilder::new()
            .workdir(PathBuf::from("/tmp"))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("barrier_threshold"));
    }

    #[test]
    fn defaults_select_all_families() {
        let config = test_config(PathBuf::from("/tmp"));
        assert_eq!(config.search.families, FamilySelection::All);
        assert!(!config.refinement.high_level);
        assert!(!config.network_mode);
    }

    #[test]
    fn zero_scan_step_is_rejected() {
        let err = ExplorationConfigBuilder::new()
            .workdir(PathBuf::from("/tmp"))
            .barrier_threshold(100.0)
            .imaginary_threshold(50.0)
            .scan_step(0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                parameter: "scan_step",
                ..
            }
        ));
    }

    #[test]
    fn conformer_search_requires_high_level() {
        let builder = || {
            ExplorationConfigBuilder::new()
                .workdir(PathBuf::from("/tmp"))
                .barrier_threshold(100.0)
                .imaginary_threshold(50.0)
                .scan_step(30)
                .max_product_redirects(3)
                .tick_interval(Duration::ZERO)
                .conformer_search(true)
        };

        assert_eq!(
            builder().build().unwrap_err(),
            ConfigError::InvalidValue {
                parameter: "conformer_search",
                reason: "requires high_level".to_string(),
            }
        );
        let config = builder().high_level(true).build().unwrap();
        assert!(config.refinement.conformer_search);
    }
}
