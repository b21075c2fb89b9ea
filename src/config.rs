use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the phase coordinator
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Phase-change notification settings
    pub notifications: NotificationConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Bound of each workflow's phase-change queue. Changes arriving while the
    /// queue is full are dropped and counted.
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or `EnvFilter` directive
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { queue_capacity: 64 }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

const CONFIG_FILE_STEM: &str = "phase-coordinator";
const ENV_PREFIX: &str = "PHASE_COORDINATOR";

impl CoordinatorConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. `phase-coordinator.toml` in the working directory
    /// 3. Environment variables (`PHASE_COORDINATOR_NOTIFICATIONS__QUEUE_CAPACITY=...`)
    pub fn load() -> Result<Self> {
        Self::load_layered(Path::new(&format!("{CONFIG_FILE_STEM}.toml")))
    }

    /// Same layering as [`load`](Self::load) with an explicit file in place of
    /// the working-directory one. A missing file is skipped.
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut builder = Config::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load a specific file over the defaults, without environment overrides
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<CoordinatorConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = CoordinatorConfig::load_env_file();
        CoordinatorConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static CoordinatorConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let config = config()?;
    tracing::info!(
        queue_capacity = config.notifications.queue_capacity,
        "Configuration loaded successfully"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.notifications.queue_capacity, 64);
        assert_eq!(config.observability.log_level, "info");
        assert!(config.observability.json_logs);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coordinator.toml");

        let mut config = CoordinatorConfig::default();
        config.notifications.queue_capacity = 8;
        config.observability.json_logs = false;
        config.save_to_file(&path).unwrap();

        let loaded = CoordinatorConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[notifications]\nqueue_capacity = 3\n").unwrap();

        let loaded = CoordinatorConfig::load_from(&path).unwrap();
        assert_eq!(loaded.notifications.queue_capacity, 3);
        assert_eq!(loaded.observability, ObservabilityConfig::default());
    }

    // Only test in this binary that touches PHASE_COORDINATOR_* variables
    #[test]
    fn test_environment_overrides_file_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phase-coordinator.toml");
        std::fs::write(
            &path,
            "[notifications]\nqueue_capacity = 3\n\n[observability]\nlog_level = \"warn\"\n",
        )
        .unwrap();

        let from_file = CoordinatorConfig::load_layered(&path).unwrap();
        assert_eq!(from_file.notifications.queue_capacity, 3);
        assert_eq!(from_file.observability.log_level, "warn");
        assert!(from_file.observability.json_logs);

        std::env::set_var("PHASE_COORDINATOR_NOTIFICATIONS__QUEUE_CAPACITY", "17");
        let layered = CoordinatorConfig::load_layered(&path);
        let missing_file = CoordinatorConfig::load_layered(dir.path().join("absent.toml"));
        let working_dir = CoordinatorConfig::load();
        std::env::remove_var("PHASE_COORDINATOR_NOTIFICATIONS__QUEUE_CAPACITY");

        let layered = layered.unwrap();
        assert_eq!(layered.notifications.queue_capacity, 17);
        assert_eq!(layered.observability.log_level, "warn");

        let missing_file = missing_file.unwrap();
        assert_eq!(missing_file.notifications.queue_capacity, 17);
        assert_eq!(missing_file.observability, ObservabilityConfig::default());

        assert_eq!(working_dir.unwrap().notifications.queue_capacity, 17);
    }

    #[test]
    fn test_global_config_initializes() {
        CoordinatorConfig::load_env_file().unwrap();
        init_config().unwrap();
        assert!(config().unwrap().notifications.queue_capacity >= 1);
    }
}
