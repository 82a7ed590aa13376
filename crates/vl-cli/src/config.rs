//! Configuration loading and management.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use vl_core::AlternationPolicy;

/// Default number of reports that may wait for delivery.
const DEFAULT_DELIVERY_QUEUE_CAPACITY: usize = 64;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory reports are delivered to.
    pub report_dir: PathBuf,

    /// How repeated joins or leaves are handled.
    pub alternation_policy: AlternationPolicy,

    /// Capacity of the report delivery queue.
    pub delivery_queue_capacity: usize,

    /// Display names by participant ID, used to label report rows.
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            report_dir: data_dir.join("reports"),
            alternation_policy: AlternationPolicy::default(),
            delivery_queue_capacity: DEFAULT_DELIVERY_QUEUE_CAPACITY,
            names: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Environment variables (VLOG_*) win over files.
        figment = figment.merge(Env::prefixed("VLOG_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for vlog.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("vlog"))
}

/// Returns the platform-specific data directory for vlog.
///
/// On Linux: `~/.local/share/vlog`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("vlog"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_vlog() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "vlog");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_reports() {
        let config = Config::default();
        assert_eq!(config.report_dir, dirs_data_path().unwrap().join("reports"));
        assert_eq!(config.alternation_policy, AlternationPolicy::Coalesce);
        assert_eq!(config.delivery_queue_capacity, 64);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vlog.toml");
        std::fs::write(
            &path,
            r#"
report_dir = "/srv/reports"
alternation_policy = "strict"

[names]
"1234" = "Ada"
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.report_dir, PathBuf::from("/srv/reports"));
        assert_eq!(config.alternation_policy, AlternationPolicy::Strict);
        assert_eq!(config.delivery_queue_capacity, 64);
        assert_eq!(config.names.get("1234").map(String::as_str), Some("Ada"));
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vlog.toml");
        std::fs::write(&path, "alternation_policy = \"lenient\"\n").unwrap();

        assert!(Config::load_from(Some(&path)).is_err());
    }
}
