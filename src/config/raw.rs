//! Raw configuration document as read from config.yaml
//!
//! Only the shapes that are always well-typed are decoded by serde. The
//! loose parts (`processes`, `if`, `then`, `forProcesses`) stay as YAML
//! values so the validator can report exactly which block is wrong.

use serde::Deserialize;
use serde_yaml::Value;

use crate::constants::DEFAULT_INTERVAL_MS;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawConfig {
    pub interval: u64,
    pub logging: bool,
    pub logging_interval: Option<u64>,
    pub detailed_logging: bool,
    pub console_logging: bool,
    pub log_level: Option<String>,
    pub detect_config_change: bool,
    pub ignore_processes: Option<Vec<String>>,
    pub affinities: Option<Vec<RawAffinity>>,
    pub profiles: Option<Vec<Value>>,
    pub win_control_affinity: Option<String>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_MS,
            logging: true,
            logging_interval: None,
            detailed_logging: false,
            console_logging: false,
            log_level: Some("info".to_string()),
            detect_config_change: true,
            ignore_processes: None,
            affinities: None,
            profiles: None,
            win_control_affinity: None,
        }
    }
}

impl RawConfig {
    /// Parses a YAML document. An empty document yields the defaults.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        let blank = text
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#') || line == "---");
        if blank {
            return Ok(Self::default());
        }

        let config: Option<RawConfig> = serde_yaml::from_str(text)?;
        Ok(config.unwrap_or_default())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAffinity {
    pub name: String,
    pub ranges: Vec<Vec<u32>>,
}

/// A profile or a nested `then` override before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawProfile {
    pub name: Option<String>,
    pub processes: Option<Value>,
    pub cmd: Option<Vec<String>>,
    pub affinity: Option<String>,
    pub cpu_priority: Option<String>,
    pub page_priority: Option<String>,
    pub io_priority: Option<String>,
    pub termination_delay: Option<u64>,
    pub suspension_delay: Option<u64>,
    pub resume_delay: Option<u64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "if")]
    pub conditions: Option<Value>,
}

impl RawProfile {
    /// Keys defined (non-null) on this profile, in document spelling.
    pub fn keys(&self) -> Vec<&'static str> {
        let present = [
            ("name", self.name.is_some()),
            ("processes", self.processes.is_some()),
            ("cmd", self.cmd.is_some()),
            ("affinity", self.affinity.is_some()),
            ("cpuPriority", self.cpu_priority.is_some()),
            ("pagePriority", self.page_priority.is_some()),
            ("ioPriority", self.io_priority.is_some()),
            ("terminationDelay", self.termination_delay.is_some()),
            ("suspensionDelay", self.suspension_delay.is_some()),
            ("resumeDelay", self.resume_delay.is_some()),
            ("type", self.kind.is_some()),
            ("if", self.conditions.is_some()),
        ];

        present
            .into_iter()
            .filter(|(_, defined)| *defined)
            .map(|(key, _)| key)
            .collect()
    }
}
