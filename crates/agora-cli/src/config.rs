//! `agora.toml` loading.
//!
//! Every section is optional; missing values fall back to the defaults of
//! the library config types.

use agora_core::{AgoraError, AgoraResult};
use agora_orchestrator::{HubConfig, OrchestratorConfig, SimulationConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "agora.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgoraConfig {
    /// Target used by `run` and `plan` when `--target` is not given.
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_target() -> String {
    "https://example.com".to_string()
}

impl Default for AgoraConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            hub: HubConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Parse a config file. Read and parse failures map to [`AgoraError::Config`].
pub fn parse_config(path: &Path) -> AgoraResult<AgoraConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AgoraError::Config(format!("Failed to read config '{}': {e}", path.display()))
    })?;
    toml::from_str(&content).map_err(|e| {
        AgoraError::Config(format!("Failed to parse config '{}': {e}", path.display()))
    })
}

/// Load the explicit config path, or `agora.toml` in `dir` if it exists,
/// or fall back to defaults.
pub fn resolve_config(explicit: Option<&Path>, dir: &Path) -> AgoraResult<(AgoraConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((parse_config(path)?, Some(path.to_path_buf())));
    }
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    if candidate.is_file() {
        let config = parse_config(&candidate)?;
        return Ok((config, Some(candidate)));
    }
    Ok((AgoraConfig::default(), None))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_parse_all_sections() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tmp.as_file_mut(),
            r#"
target = "https://shop.example.org"

[hub]
activity_capacity = 50

[hub.report]
messages = 5

[orchestrator]
timeout_secs = 10

[simulation]
step_delay_ms = 0
"#
        )
        .unwrap();

        let config = parse_config(tmp.path()).unwrap();
        assert_eq!(config.target, "https://shop.example.org");
        assert_eq!(config.hub.activity_capacity, 50);
        assert_eq!(config.hub.event_capacity, 256);
        assert_eq!(config.hub.report.messages, 5);
        assert_eq!(config.hub.report.log_lines, 20);
        assert_eq!(config.orchestrator.timeout(), Duration::from_secs(10));
        assert_eq!(config.simulation.step_delay_ms, 0);
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp.as_file_mut()).unwrap();

        let config = parse_config(tmp.path()).unwrap();
        assert_eq!(config.target, "https://example.com");
        assert_eq!(config.orchestrator.timeout_secs, 60);
        assert_eq!(config.simulation.step_delay_ms, 150);
    }

    #[test]
    fn test_parse_invalid_toml_returns_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp.as_file_mut(), "{{{{invalid toml!!!!").unwrap();
        let err = parse_config(tmp.path()).unwrap_err();
        assert!(matches!(err, AgoraError::Config(_)));
        assert!(err.to_string().contains("Failed to parse config"), "unexpected error: {err}");
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = resolve_config(Some(&missing), dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"), "unexpected error: {err}");
    }

    #[test]
    fn test_resolve_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, path) = resolve_config(None, dir.path()).unwrap();
        assert!(path.is_none());
        assert_eq!(config.target, "https://example.com");
    }

    #[test]
    fn test_resolve_picks_up_default_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "target = \"https://found.example\"\n").unwrap();
        let (config, path) = resolve_config(None, dir.path()).unwrap();
        assert_eq!(config.target, "https://found.example");
        assert!(path.unwrap().ends_with(DEFAULT_CONFIG_FILE));
    }
}
