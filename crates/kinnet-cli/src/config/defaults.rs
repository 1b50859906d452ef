pub struct DefaultsConfig {
    pub workdir: String,
    pub barrier_threshold: f64,
    pub imaginary_threshold: f64,
    pub scan_step: usize,
    pub max_product_redirects: usize,
    pub conformer_seed: u64,
    pub tick_interval_secs: f64,
    pub simultaneous_jobs: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            workdir: ".".to_string(),
            barrier_threshold: 100.0,
            imaginary_threshold: 50.0,
            scan_step: 30,
            max_product_redirects: 3,
            conformer_seed: 0,
            tick_interval_secs: 1.0,
            simultaneous_jobs: 5,
        }
    }
}
