//! Validated rule model
//!
//! Profiles are plain values. Condition overrides are patches folded over a
//! clone of the matched profile's settings, never over the canonical list.

use std::collections::HashSet;
use std::time::Duration;

use crate::policy::{CpuPriority, IoPriority, PagePriority};

/// A resolved affinity preset: name, mask and diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinitySetting {
    pub preset: String,
    pub mask: usize,
    pub graph: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileKind {
    #[default]
    Standard,
    Fallback,
    Fullscreen,
}

impl ProfileKind {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "standard" => Some(ProfileKind::Standard),
            "fallback" => Some(ProfileKind::Fallback),
            "fullscreen" => Some(ProfileKind::Fullscreen),
            _ => None,
        }
    }
}

/// The actions a profile (or an override) asks for.
/// `None` leaves the attribute untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSettings {
    pub affinity: Option<AffinitySetting>,
    pub cpu_priority: Option<CpuPriority>,
    pub page_priority: Option<PagePriority>,
    pub io_priority: Option<IoPriority>,
    pub termination_delay: Option<Duration>,
    pub suspension_delay: Option<Duration>,
    pub resume_delay: Option<Duration>,
}

impl ProfileSettings {
    /// Folds `patch` over these settings: every attribute the patch defines wins.
    ///
    /// Termination and suspension are only kept when the patch asks for them
    /// itself; an override never inherits a kill or suspend from its parent.
    pub fn merge(&self, patch: &ProfileSettings) -> ProfileSettings {
        ProfileSettings {
            affinity: patch.affinity.clone().or_else(|| self.affinity.clone()),
            cpu_priority: patch.cpu_priority.or(self.cpu_priority),
            page_priority: patch.page_priority.or(self.page_priority),
            io_priority: patch.io_priority.or(self.io_priority),
            termination_delay: patch.termination_delay,
            suspension_delay: patch.suspension_delay,
            resume_delay: patch.resume_delay.or(self.resume_delay),
        }
    }
}

/// Nested `then` profile of a condition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub settings: ProfileSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    /// One of `for_processes` is running
    Running,
    /// The foreground window is a genuine fullscreen app
    FullscreenOverrideActive,
    /// The process itself (or one of `for_processes`) owns the foreground window
    Active,
}

impl ConditionKind {
    pub const OPTIONS: [&'static str; 3] = ["running", "fullscreenOverrideActive", "active"];

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "running" => Some(ConditionKind::Running),
            "fullscreenOverrideActive" => Some(ConditionKind::FullscreenOverrideActive),
            "active" => Some(ConditionKind::Active),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionAction {
    Disable,
    Override(ProfilePatch),
}

/// An `if` entry of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub kind: ConditionKind,
    pub for_processes: Option<HashSet<String>>,
    pub then: ConditionAction,
}

impl Condition {
    pub fn lists(&self, process: &str) -> bool {
        self.for_processes
            .as_ref()
            .is_some_and(|names| names.contains(process))
    }
}

/// A validated top-level profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessProfile {
    pub name: String,
    pub processes: HashSet<String>,
    pub cmd: Vec<String>,
    pub kind: ProfileKind,
    pub settings: ProfileSettings,
    pub conditions: Vec<Condition>,
}

impl ProcessProfile {
    /// Returns the first `cmd` substring contained in `cmdline`.
    pub fn cmd_match(&self, cmdline: &str) -> Option<&str> {
        self.cmd
            .iter()
            .find(|pattern| cmdline.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

/// A named group of cores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinityPreset {
    pub name: String,
    pub ranges: Vec<crate::policy::CoreRange>,
}

/// Log related switches of the configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    pub enabled: bool,
    pub interval: Option<Duration>,
    pub detailed: bool,
    pub console: bool,
    pub level: Option<String>,
}

/// A validated configuration, ready for enforcement.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub interval: Duration,
    pub logging: LoggingOptions,
    pub detect_config_change: bool,
    pub ignore_processes: HashSet<String>,
    pub affinities: Vec<AffinityPreset>,
    /// Evaluation order: plain profiles, conditional ones, fallback, fullscreen
    pub profiles: Vec<ProcessProfile>,
    pub self_affinity: Option<AffinitySetting>,
    /// Mask granted to the foreground process
    pub full_affinity: usize,
    /// At least one profile matches on command lines
    pub needs_cmdline: bool,
}

impl AppConfig {
    pub fn has_profile_kind(&self, kind: ProfileKind) -> bool {
        self.profiles.iter().any(|profile| profile.kind == kind)
    }

    pub fn processes_configured(&self) -> usize {
        self.profiles.iter().map(|profile| profile.processes.len()).sum()
    }
}

/// Normalizes a process name the way snapshots are matched:
/// lowercase with the `.exe` suffix stripped.
pub fn normalize_process_name(name: &str) -> String {
    let lower = name.to_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}
