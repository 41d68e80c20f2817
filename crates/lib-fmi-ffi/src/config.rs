//! Dispatch configuration.
//!
//! Settings applied when a unit is instantiated. Files may be TOML or JSON;
//! every field has a default, so an empty file is a valid configuration.

use crate::diagnostics::Severity;
use crate::error::{FmiError, FmiResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Instance name passed to `fmi2Instantiate` and used as module name
    /// in diagnostic records. Defaults to the model identifier.
    #[serde(default)]
    pub module_name: Option<String>,

    /// Least severe record a sink built by
    /// [`TracingSink::from_config`](crate::diagnostics::TracingSink::from_config) keeps.
    #[serde(default = "default_threshold")]
    pub log_threshold: Severity,

    /// Ask the unit to show its own user interface, if it has one.
    #[serde(default)]
    pub visible: bool,

    /// Let the unit call the logger callback.
    #[serde(default)]
    pub logging_on: bool,

    /// Categories enabled through `fmi2SetDebugLogging` right after
    /// instantiation. Empty means none are set explicitly.
    #[serde(default)]
    pub debug_categories: Vec<String>,

    /// Deadline for calls made through
    /// [`call_protected`](crate::watchdog::call_protected); none runs them inline.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

fn default_threshold() -> Severity {
    Severity::Verbose
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            module_name: None,
            log_threshold: default_threshold(),
            visible: false,
            logging_on: false,
            debug_categories: Vec::new(),
            deadline_ms: None,
        }
    }
}

impl DispatchConfig {
    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> FmiResult<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FmiError::config(&label, format!("cannot read file: {e}")))?;

        let config: DispatchConfig = if path.extension().map_or(false, |e| e == "json") {
            serde_json::from_str(&content).map_err(|e| FmiError::config(&label, e.to_string()))?
        } else {
            // Assume TOML
            toml::from_str(&content).map_err(|e| FmiError::config(&label, e.to_string()))?
        };

        config.validate().map_err(|message| FmiError::config(&label, message))?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.module_name {
            if name.trim().is_empty() {
                return Err("module_name must not be empty".to_string());
            }
            if name.contains('\0') {
                return Err("module_name must not contain NUL".to_string());
            }
        }
        if self.deadline_ms == Some(0) {
            return Err("deadline_ms must be positive".to_string());
        }
        Ok(())
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}", std::process::id(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_toml() {
        let path = write_temp(
            "dispatch.toml",
            r#"
module_name = "ball"
log_threshold = "debug"
logging_on = true
debug_categories = ["logEvents", "logStatusError"]
deadline_ms = 250
"#,
        );
        let config = DispatchConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.module_name.as_deref(), Some("ball"));
        assert_eq!(config.log_threshold, Severity::Debug);
        assert!(config.logging_on);
        assert!(!config.visible);
        assert_eq!(config.debug_categories.len(), 2);
        assert_eq!(config.deadline(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_load_json_defaults() {
        let path = write_temp("dispatch.json", "{}");
        let config = DispatchConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config, DispatchConfig::default());
    }

    #[test]
    fn test_rejects_invalid() {
        let path = write_temp("bad-dispatch.toml", "deadline_ms = 0\n");
        let err = DispatchConfig::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, FmiError::Config { .. }));

        let path = write_temp("bad-threshold.json", r#"{"log_threshold": "chatty"}"#);
        assert!(DispatchConfig::load(&path).is_err());
        std::fs::remove_file(&path).ok();

        assert!(DispatchConfig::load("/nonexistent/dispatch.toml").is_err());
    }
}
