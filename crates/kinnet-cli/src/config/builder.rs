use super::defaults::DefaultsConfig;
use super::file::{
    FileConfig, FileRefinementConfig, FileRunConfig, FileSearchConfig, FileThresholdConfig,
};
use super::models::AppConfig;
use crate::cli::ExplorationArgs;
use crate::error::{CliError, Result};
use kinnet::engine::config as core_config;
use kinnet::families::FamilySelection;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub fn build_config(args: &ExplorationArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let thresholds = file_config.thresholds.take().unwrap_or_default();
    let search = file_config.search.take().unwrap_or_default();
    let refinement = file_config.refinement.take().unwrap_or_default();
    let run = file_config.run.take().unwrap_or_default();

    let workdir = args
        .workdir
        .clone()
        .or(file_config.workdir)
        .unwrap_or_else(|| PathBuf::from(&defaults.workdir));
    let barrier_threshold = args
        .barrier_threshold
        .or(thresholds.barrier_threshold)
        .unwrap_or(defaults.barrier_threshold);
    let scan_step = args
        .scan_step
        .or(search.scan_step)
        .unwrap_or(defaults.scan_step);
    let families = match args.families.clone().or(search.families) {
        Some(names) => FamilySelection::Only(names),
        None => FamilySelection::All,
    };
    let skip_families = args
        .skip_families
        .clone()
        .or(search.skip_families)
        .unwrap_or_default();

    let tick_interval_secs = run
        .tick_interval_secs
        .unwrap_or(defaults.tick_interval_secs);
    let tick_interval = Duration::try_from_secs_f64(tick_interval_secs).map_err(|_| {
        CliError::Config(format!(
            "`run.tick-interval-secs` must be a non-negative number, got {}",
            tick_interval_secs
        ))
    })?;

    let core_config = core_config::ExplorationConfigBuilder::new()
        .workdir(workdir)
        .barrier_threshold(barrier_threshold)
        .imaginary_threshold(
            thresholds
                .imaginary_threshold
                .unwrap_or(defaults.imaginary_threshold),
        )
        .families(families)
        .skip_families(skip_families)
        .scan_step(scan_step)
        .max_product_redirects(
            search
                .max_product_redirects
                .unwrap_or(defaults.max_product_redirects),
        )
        .high_level(args.high_level || refinement.high_level.unwrap_or(false))
        .conformer_search(args.conformer_search || refinement.conformer_search.unwrap_or(false))
        .conformer_seed(refinement.conformer_seed.unwrap_or(defaults.conformer_seed))
        .tick_interval(tick_interval)
        .network_mode(args.network_mode || run.network_mode.unwrap_or(false))
        .delete_intermediate_files(
            args.delete_intermediate_files || run.delete_intermediate_files.unwrap_or(false),
        )
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        core_config,
        simultaneous_jobs: run.simultaneous_jobs.unwrap_or(defaults.simultaneous_jobs),
    })
}

/// The fully merged configuration as a file, so other processes can run
/// with exactly the same settings.
pub fn resolved_file_config(config: &AppConfig) -> FileConfig {
    let core = &config.core_config;
    let families = match &core.search.families {
        FamilySelection::All => None,
        FamilySelection::Only(names) => Some(names.clone()),
    };
    FileConfig {
        workdir: Some(core.workdir.clone()),
        thresholds: Some(FileThresholdConfig {
            barrier_threshold: Some(core.thresholds.barrier_threshold),
            imaginary_threshold: Some(core.thresholds.imaginary_threshold),
        }),
        search: Some(FileSearchConfig {
            families,
            skip_families: Some(core.search.skip_families.clone()),
            scan_step: Some(core.search.scan_step),
            max_product_redirects: Some(core.search.max_product_redirects),
        }),
        refinement: Some(FileRefinementConfig {
            high_level: Some(core.refinement.high_level),
            conformer_search: Some(core.refinement.conformer_search),
            conformer_seed: Some(core.refinement.conformer_seed),
        }),
        run: Some(FileRunConfig {
            tick_interval_secs: Some(core.tick_interval.as_secs_f64()),
            network_mode: Some(core.network_mode),
            delete_intermediate_files: Some(core.delete_intermediate_files),
            simultaneous_jobs: Some(config.simultaneous_jobs),
        }),
    }
}

fn parse_value<T: FromStr>(key: &str, value_str: &str, kind: &str) -> Result<T> {
    value_str.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value_str))
    })
}

fn parse_list(value_str: &str) -> Vec<String> {
    value_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "workdir" => config.workdir = Some(PathBuf::from(value_str)),
            "thresholds.barrier-threshold" => {
                config
                    .thresholds
                    .get_or_insert_with(Default::default)
                    .barrier_threshold = Some(parse_value(key, value_str, "float")?);
            }
            "thresholds.imaginary-threshold" => {
                config
                    .thresholds
                    .get_or_insert_with(Default::default)
                    .imaginary_threshold = Some(parse_value(key, value_str, "float")?);
            }
            "search.families" => {
                config.search.get_or_insert_with(Default::default).families =
                    Some(parse_list(value_str));
            }
            "search.skip-families" => {
                config
                    .search
                    .get_or_insert_with(Default::default)
                    .skip_families = Some(parse_list(value_str));
            }
            "search.scan-step" => {
                config.search.get_or_insert_with(Default::default).scan_step =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "search.max-product-redirects" => {
                config
                    .search
                    .get_or_insert_with(Default::default)
                    .max_product_redirects = Some(parse_value(key, value_str, "integer")?);
            }
            "refinement.high-level" => {
                config
                    .refinement
                    .get_or_insert_with(Default::default)
                    .high_level = Some(parse_value(key, value_str, "boolean")?);
            }
            "refinement.conformer-search" => {
                config
                    .refinement
                    .get_or_insert_with(Default::default)
                    .conformer_search = Some(parse_value(key, value_str, "boolean")?);
            }
            "refinement.conformer-seed" => {
                config
                    .refinement
                    .get_or_insert_with(Default::default)
                    .conformer_seed = Some(parse_value(key, value_str, "integer")?);
            }
            "run.tick-interval-secs" => {
                config
                    .run
                    .get_or_insert_with(Default::default)
                    .tick_interval_secs = Some(parse_value(key, value_str, "float")?);
            }
            "run.network-mode" => {
                config.run.get_or_insert_with(Default::default).network_mode =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            "run.delete-intermediate-files" => {
                config
                    .run
                    .get_or_insert_with(Default::default)
                    .delete_intermediate_files = Some(parse_value(key, value_str, "boolean")?);
            }
            "run.simultaneous-jobs" => {
                config
                    .run
                    .get_or_insert_with(Default::default)
                    .simultaneous_jobs = Some(parse_value(key, value_str, "integer")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
