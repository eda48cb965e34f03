use std::sync::OnceLock;

static CONFIG: OnceLock<GlobalConfig> = OnceLock::new();

#[derive(Debug, Clone, Default)]
pub struct GlobalConfig {
    pub verbose: bool,
}

/// Sets the process-wide CLI flags. Later calls are ignored.
pub fn init_global_config(config: GlobalConfig) {
    let _ = CONFIG.set(config);
}

pub fn global_config() -> &'static GlobalConfig {
    CONFIG.get_or_init(GlobalConfig::default)
}
