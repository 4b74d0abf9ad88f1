// Configuration source loading for native targets.
//
// Priority order:
// 1. Environment variables (SILVERSTEP_* prefix)
// 2. Config file path from SILVERSTEP_CONFIG
// 3. Inline config content from SILVERSTEP_CONFIG_CONTENT
// 4. Default config file (./silverstep.toml)
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::RuntimeConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_PATHS: [&str; 1] = ["./silverstep.toml"];

/// Load configuration using native environment/file access.
pub fn load_config() -> Result<RuntimeConfig> {
    let mut config = load_from_file()?.unwrap_or_default();
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file() -> Result<Option<RuntimeConfig>> {
    if let Ok(path) = env::var("SILVERSTEP_CONFIG") {
        return read_config_file(Path::new(&path)).map(Some);
    }

    if let Ok(content) = env::var("SILVERSTEP_CONFIG_CONTENT") {
        let config: RuntimeConfig = toml::from_str(&content)
            .context("Failed to parse inline config from SILVERSTEP_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_CONFIG_PATHS {
        let path = Path::new(path);
        if path.exists() {
            return read_config_file(path).map(Some);
        }
    }

    Ok(None)
}

fn read_config_file(path: &Path) -> Result<RuntimeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed. Not validated,
/// so callers can layer CLI overrides first.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let mut config = read_config_file(path.as_ref())?;
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    Ok(config)
}

/// Load configuration with graceful fallback to defaults.
pub fn load_or_default() -> Result<RuntimeConfig> {
    let mut config = match load_from_file() {
        Ok(Some(file_config)) => file_config,
        Ok(None) => RuntimeConfig::default(),
        Err(e) => {
            tracing::warn!("Ignoring unreadable config file: {:#}", e);
            RuntimeConfig::default()
        }
    };

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_missing_path_fails() {
        let err = load_from_file_path("/definitely/not/here/silverstep.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn load_from_path_parses_file() {
        let dir = env::temp_dir().join(format!("silverstep-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("silverstep.toml");
        std::fs::write(
            &path,
            "[storage]\nbackend = \"fs\"\n[storage.fs]\npath = \"/tmp/lake\"\n",
        )
        .unwrap();

        let config = load_from_file_path(&path).unwrap();
        assert_eq!(config.storage.fs.unwrap().path, "/tmp/lake");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
