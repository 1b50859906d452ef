use kinnet::engine::config as core_config;

pub struct AppConfig {
    pub core_config: core_config::ExplorationConfig,
    pub simultaneous_jobs: usize,
}
