//! Bridge configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides the documents directory.
pub const DOCUMENTS_DIR_ENV: &str = "RESOLVE_BRIDGE_DOCUMENTS_DIR";

/// Global bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Documents directory override. `None` resolves to `~/Documents`.
    pub documents_dir: Option<PathBuf>,

    /// Name of the folder (under documents) that receives rendered media.
    pub output_folder: String,

    /// Render wait and output limits.
    pub render: RenderDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Render loop and output policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Delay between render-status polls.
    pub poll_interval_ms: u64,

    /// Number of polls before the render is reported as timed out.
    pub max_polls: u32,

    /// Rendered files larger than this are deleted and rejected.
    pub max_output_bytes: u64,

    /// Used when the timeline resolution cannot be read.
    pub fallback_width: u32,
    pub fallback_height: u32,

    /// Used when the timeline frame rate cannot be read.
    pub fallback_fps: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "warn", "debug", "resolve_bridge=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            documents_dir: None,
            output_folder: "sync. outputs".to_string(),
            render: RenderDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_polls: 180,
            max_output_bytes: 1024 * 1024 * 1024,
            fallback_width: 1920,
            fallback_height: 1080,
            fallback_fps: 24.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl RenderDefaults {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl BridgeConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        let mut config = Self::default();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(parsed) => config = parsed,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }

        if let Ok(dir) = std::env::var(DOCUMENTS_DIR_ENV) {
            if !dir.is_empty() {
                config.documents_dir = Some(PathBuf::from(dir));
            }
        }
        config
    }

    /// Documents directory that anchors the output folder.
    pub fn documents_dir(&self) -> PathBuf {
        self.documents_dir
            .clone()
            .unwrap_or_else(|| home_dir().join("Documents"))
    }

    /// Default output directory: `<documents>/<output_folder>`.
    pub fn output_dir(&self) -> PathBuf {
        self.documents_dir().join(&self.output_folder)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    base.join("resolve-bridge").join("config.json")
}

/// The current user's home directory.
pub fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_panel_contract() {
        let config = BridgeConfig::default();
        assert_eq!(config.output_folder, "sync. outputs");
        assert_eq!(config.render.max_polls, 180);
        assert_eq!(config.render.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.render.max_output_bytes, 1_073_741_824);
        assert_eq!(config.render.fallback_width, 1920);
        assert_eq!(config.render.fallback_height, 1080);
    }

    #[test]
    fn output_dir_uses_documents_override() {
        let config = BridgeConfig {
            documents_dir: Some(PathBuf::from("/data/docs")),
            ..BridgeConfig::default()
        };
        assert_eq!(
            config.output_dir(),
            PathBuf::from("/data/docs").join("sync. outputs")
        );
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"render": {"max_polls": 5}}"#).unwrap();
        assert_eq!(config.render.max_polls, 5);
        assert_eq!(config.render.poll_interval_ms, 1000);
        assert_eq!(config.output_folder, "sync. outputs");
        assert_eq!(config.logging.level, "warn");
    }
}
