use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::types::LanguageHint;

pub const ENDPOINT_ENV: &str = "PASTE_OCR_ENDPOINT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: EndpointConfig,
    pub languages: LanguageConfig,
    pub copy: CopyConfig,
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub base_url: String,
    pub path: String,
    /// Unset means the request waits for as long as the transport allows.
    pub timeout_secs: Option<u64>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            path: "/results".to_string(),
            timeout_secs: None,
        }
    }
}

impl EndpointConfig {
    pub fn url(&self) -> String {
        let path = self.path.trim_start_matches('/');
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    pub options: Vec<String>,
    pub default: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            options: vec!["eng".to_string(), "rus".to_string(), "rus+eng".to_string()],
            default: String::new(),
        }
    }
}

impl LanguageConfig {
    /// The empty code is always accepted and means "endpoint default".
    pub fn resolve(&self, code: &str) -> Option<LanguageHint> {
        let code = code.trim();
        if code.is_empty() || self.options.iter().any(|o| o == code) {
            Some(LanguageHint::new(code))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    pub label: String,
    pub confirmation: String,
    pub revert_after_ms: u64,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            label: "Copy text".to_string(),
            confirmation: "Text copied!".to_string(),
            revert_after_ms: 3000,
        }
    }
}

impl CopyConfig {
    pub fn revert_after(&self) -> Duration {
        Duration::from_millis(self.revert_after_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RacePolicy {
    /// Every response is applied in arrival order.
    #[default]
    LastResponseWins,
    /// Responses, captures and capture failures older than the displayed
    /// request are dropped.
    LatestRequestWins,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub race_policy: RacePolicy,
}

impl Config {
    /// Reads `path` when given; a missing path yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml_str(&raw)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => Self::default(),
        };

        config.apply_endpoint_override(std::env::var(ENDPOINT_ENV).ok());
        log::info!(
            "Config loaded: endpoint={}, languages={:?}, race_policy={:?}",
            config.endpoint.url(),
            config.languages.options,
            config.workflow.race_policy
        );
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_endpoint_override(&mut self, base_url: Option<String>) {
        if let Some(base_url) = base_url.filter(|u| !u.trim().is_empty()) {
            log::debug!("Endpoint overridden: {}", base_url);
            self.endpoint.base_url = base_url;
        }
    }

    pub fn default_language(&self) -> LanguageHint {
        LanguageHint::new(self.languages.default.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_page() {
        let config = Config::default();
        assert_eq!(config.endpoint.url(), "http://127.0.0.1:5000/results");
        assert_eq!(config.endpoint.timeout_secs, None);
        assert_eq!(config.copy.revert_after(), Duration::from_millis(3000));
        assert_eq!(config.copy.confirmation, "Text copied!");
        assert_eq!(config.workflow.race_policy, RacePolicy::LastResponseWins);
        assert!(config.default_language().is_default());
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config = Config::from_toml_str(
            r#"
            [endpoint]
            base_url = "http://ocr.local:8080/"

            [workflow]
            race_policy = "latest_request_wins"
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoint.url(), "http://ocr.local:8080/results");
        assert_eq!(config.workflow.race_policy, RacePolicy::LatestRequestWins);
        assert_eq!(config.languages.options.len(), 3);
        assert_eq!(config.copy.label, "Copy text");
    }

    #[test]
    fn unknown_race_policy_is_an_error() {
        assert!(Config::from_toml_str("[workflow]\nrace_policy = \"first\"").is_err());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[languages]\noptions = [\"deu\"]\ndefault = \"deu\"").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.languages.options, vec!["deu".to_string()]);
        assert_eq!(config.default_language().as_str(), "deu");
    }

    #[test]
    fn load_missing_file_fails_with_context() {
        let err = Config::load(Some(Path::new("/nonexistent/paste-ocr.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn endpoint_override_ignores_blank_values() {
        let mut config = Config::default();
        config.apply_endpoint_override(Some("  ".to_string()));
        assert_eq!(config.endpoint.base_url, "http://127.0.0.1:5000");
        config.apply_endpoint_override(Some("http://other:9000".to_string()));
        assert_eq!(config.endpoint.url(), "http://other:9000/results");
    }

    #[test]
    fn language_resolution() {
        let languages = LanguageConfig::default();
        assert_eq!(languages.resolve("rus").unwrap().as_str(), "rus");
        assert!(languages.resolve("").unwrap().is_default());
        assert!(languages.resolve("klingon").is_none());
    }
}
