use crate::query::diagnostics::RuleCode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const APP_NAME: &str = "dtsyntax";
const CONFIG_FILE: &str = "config.json";

/// Analyzer configuration stored in the app data directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Highlight noise words separately from search terms
    #[serde(default = "default_highlight_noise_words")]
    pub highlight_noise_words: bool,

    /// Mark unmatched parentheses and quotes when highlighting
    #[serde(default = "default_show_balance_errors")]
    pub show_balance_errors: bool,

    /// OR groups with more terms than this get an advisory
    #[serde(default = "default_max_or_terms")]
    pub max_or_terms: usize,

    /// Proximity distances above this are clamped by the fix engine
    #[serde(default = "default_max_proximity_distance")]
    pub max_proximity_distance: u32,

    /// Rule codes to leave out of validation, e.g. `"nested-parentheses"`
    #[serde(default)]
    pub disabled_rules: Vec<String>,
}

fn default_highlight_noise_words() -> bool {
    true
}

fn default_show_balance_errors() -> bool {
    true
}

fn default_max_or_terms() -> usize {
    10
}

fn default_max_proximity_distance() -> u32 {
    50
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            highlight_noise_words: default_highlight_noise_words(),
            show_balance_errors: default_show_balance_errors(),
            max_or_terms: default_max_or_terms(),
            max_proximity_distance: default_max_proximity_distance(),
            disabled_rules: Vec::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AnalyzerConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        for code in &config.disabled_rules {
            if RuleCode::from_code(code).is_none() {
                warn!(rule = %code, "unknown rule code in disabled_rules");
            }
        }
        Ok(config)
    }

    /// Write config as pretty JSON
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn is_rule_disabled(&self, rule: RuleCode) -> bool {
        self.disabled_rules.iter().any(|code| code == rule.as_str())
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_app_data_dir()?.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    Ok(base.join(APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = AnalyzerConfig::default();
        assert!(config.highlight_noise_words);
        assert!(config.show_balance_errors);
        assert_eq!(config.max_or_terms, 10);
        assert_eq!(config.max_proximity_distance, 50);
        assert!(config.disabled_rules.is_empty());
    }

    #[test]
    fn test_config_partial_json() {
        // Should use defaults for missing fields
        let json = r#"{"max_or_terms": 4, "disabled_rules": ["nested-parentheses"]}"#;
        let config: AnalyzerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.max_or_terms, 4);
        assert!(config.highlight_noise_words);
        assert!(config.is_rule_disabled(RuleCode::NestedParentheses));
        assert!(!config.is_rule_disabled(RuleCode::OperatorAtStart));
    }

    #[test]
    fn test_config_empty_json() {
        let config: AnalyzerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AnalyzerConfig::default());
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = AnalyzerConfig {
            show_balance_errors: false,
            max_proximity_distance: 25,
            ..AnalyzerConfig::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(AnalyzerConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_config_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();

        let err = AnalyzerConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
