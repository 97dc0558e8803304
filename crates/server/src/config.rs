use shared_types::AppConfig;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Default config path, relative to the working directory.
const CONFIG_PATH: &str = "config.toml";

fn config_path() -> String {
    std::env::var("DESIGNOPS_CONFIG").unwrap_or_else(|_| CONFIG_PATH.to_string())
}

/// Parse config file contents. Invalid TOML falls back to defaults.
pub fn parse_config(contents: &str, path: &str) -> AppConfig {
    toml::from_str(contents).unwrap_or_else(|e| {
        tracing::warn!(path, error = %e, "Failed to parse config, using defaults");
        AppConfig::default()
    })
}

/// Read the config file and store it in the global `OnceLock`. Safe to call
/// multiple times; only the first call has effect.
///
/// If the file is missing or unparseable, every setting takes its default.
pub fn load_config() -> &'static AppConfig {
    CONFIG.get_or_init(|| {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let config = parse_config(&contents, &path);
                tracing::info!(
                    path = %path,
                    features = ?config.features,
                    custom_guard = config.guard.is_some(),
                    "Loaded config"
                );
                config
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Config file not readable, using defaults");
                AppConfig::default()
            }
        }
    })
}
