//! Per-tick enforcement digest
//!
//! Collects which profile touched which processes during a tick and renders
//! it as the multi-line block written to the session log. Rendering has no
//! effect on enforcement.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::ProfileSettings;

/// Processes of one executable name affected under a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectedProcess {
    pub name: String,
    pub pids: Vec<u32>,
    /// The `cmd` substring that matched, when matching was by command line
    pub cmd_trigger: Option<String>,
}

/// Everything a tick did under one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
    pub profile: String,
    pub disabled: bool,
    /// Name of the override (or `override`) that replaced the settings
    pub replaced_by: Option<String>,
    pub condition_reason: Option<String>,
    pub settings: ProfileSettings,
    pub affected: Vec<AffectedProcess>,
}

impl DigestEntry {
    fn new(record: &DigestRecord<'_>) -> Self {
        Self {
            profile: record.profile.to_string(),
            disabled: record.disabled,
            replaced_by: record.replaced_by.clone(),
            condition_reason: record.condition_reason.clone(),
            settings: ProfileSettings::default(),
            affected: Vec::new(),
        }
    }

    /// Later processes overwrite the attributes they define.
    fn absorb(&mut self, settings: &ProfileSettings) {
        let current = &mut self.settings;
        if settings.affinity.is_some() {
            current.affinity = settings.affinity.clone();
        }
        current.cpu_priority = settings.cpu_priority.or(current.cpu_priority);
        current.page_priority = settings.page_priority.or(current.page_priority);
        current.io_priority = settings.io_priority.or(current.io_priority);
        current.termination_delay = settings.termination_delay.or(current.termination_delay);
        current.suspension_delay = settings.suspension_delay.or(current.suspension_delay);
        current.resume_delay = settings.resume_delay.or(current.resume_delay);
    }

    fn attributes(&self) -> Vec<String> {
        let settings = &self.settings;
        let millis = |delay: Duration| delay.as_millis().to_string();
        let mut attributes = Vec::new();

        if let Some(delay) = settings.suspension_delay {
            attributes.push(format!("suspensionDelay: {}", millis(delay)));
        }
        if let Some(delay) = settings.resume_delay {
            attributes.push(format!("resumeDelay: {}", millis(delay)));
        }
        if let Some(delay) = settings.termination_delay {
            attributes.push(format!("terminationDelay: {}", millis(delay)));
        }
        if let Some(priority) = settings.cpu_priority {
            attributes.push(format!("cpuPriority: {}", priority));
        }
        if let Some(priority) = settings.page_priority {
            attributes.push(format!("pagePriority: {}", priority));
        }
        if let Some(priority) = settings.io_priority {
            attributes.push(format!("ioPriority: {}", priority));
        }
        if let Some(affinity) = &settings.affinity {
            attributes.push(format!("affinityName: {}", affinity.preset));
        }

        attributes
    }

    fn render(&self, failed_pids: &HashSet<u32>, lines: &mut Vec<String>) {
        let prefix = if self.disabled {
            "[disabled] ".to_string()
        } else if let Some(name) = &self.replaced_by {
            format!("[{}] ", name)
        } else {
            String::new()
        };

        lines.push(format!("{}{} -> {}", prefix, self.profile, self.attributes().join(", ")));

        if let Some(affinity) = &self.settings.affinity {
            if !affinity.graph.is_empty() {
                lines.push(affinity.graph.clone());
            }
        }

        if let Some(reason) = &self.condition_reason {
            let kind = if self.disabled { "Disabled" } else { "Override" };
            lines.push(format!("{} reason: {}", kind, reason));
        }

        let mut failed = Vec::new();
        let mut succeeded = Vec::new();

        for process in &self.affected {
            let (bad, good): (Vec<u32>, Vec<u32>) = process.pids.iter().partition(|pid| failed_pids.contains(*pid));
            if !good.is_empty() {
                succeeded.push((process, good));
            }
            if !bad.is_empty() {
                failed.push((process, bad));
            }
        }

        if !succeeded.is_empty() {
            lines.push(String::new());
            lines.push("Affected:".to_string());
            for (process, pids) in succeeded {
                lines.push(format!("- {} ({})", process.name, join_pids(&pids)));
                if let Some(pattern) = &process.cmd_trigger {
                    lines.push(format!("  Triggered by command line wildcard rule: '{}'", pattern));
                }
            }
        }

        if !failed.is_empty() {
            lines.push(String::new());
            lines.push("Failed:".to_string());
            for (process, pids) in failed {
                lines.push(format!("- {} ({})", process.name, join_pids(&pids)));
            }
        }
    }
}

/// One process handled during a tick.
#[derive(Debug, Clone)]
pub struct DigestRecord<'a> {
    pub profile: &'a str,
    pub process: &'a str,
    pub pid: u32,
    pub disabled: bool,
    pub replaced_by: Option<String>,
    pub condition_reason: Option<String>,
    pub cmd_trigger: Option<&'a str>,
    pub settings: &'a ProfileSettings,
}

/// Digest of a whole tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Digest {
    /// Name of the foreground process, if any
    pub active_window: Option<String>,
    pub entries: Vec<DigestEntry>,
    pub failed_pids: HashSet<u32>,
    pub fullscreen_pid: Option<u32>,
}

impl Digest {
    /// Adds a handled process. The first record of a profile decides its
    /// disabled / override annotation.
    pub fn record(&mut self, record: DigestRecord<'_>) {
        let index = match self.entries.iter().position(|entry| entry.profile == record.profile) {
            Some(index) => index,
            None => {
                self.entries.push(DigestEntry::new(&record));
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[index];
        entry.absorb(record.settings);

        match entry.affected.iter_mut().find(|process| process.name == record.process) {
            Some(process) => process.pids.push(record.pid),
            None => entry.affected.push(AffectedProcess {
                name: record.process.to_string(),
                pids: vec![record.pid],
                cmd_trigger: record.cmd_trigger.map(str::to_string),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the per-profile blocks, separated by blank lines.
    pub fn render(&self, detailed: bool) -> String {
        let mut lines = Vec::new();

        if detailed {
            if let Some(name) = &self.active_window {
                lines.push(format!("Active window: {}", name));
            }
        }

        for entry in &self.entries {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            entry.render(&self.failed_pids, &mut lines);
        }

        lines.join("\n")
    }
}

fn join_pids(pids: &[u32]) -> String {
    pids.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AffinitySetting;
    use crate::policy::{CpuPriority, IoPriority};

    fn record<'a>(profile: &'a str, process: &'a str, pid: u32, settings: &'a ProfileSettings) -> DigestRecord<'a> {
        DigestRecord {
            profile,
            process,
            pid,
            disabled: false,
            replaced_by: None,
            condition_reason: None,
            cmd_trigger: None,
            settings,
        }
    }

    #[test]
    fn test_render_affected_and_failed() {
        let settings = ProfileSettings {
            cpu_priority: Some(CpuPriority::BelowNormal),
            io_priority: Some(IoPriority::Low),
            affinity: Some(AffinitySetting {
                preset: "firstTwo".to_string(),
                mask: 0b11,
                graph: "[ 0| 1|--|--]".to_string(),
            }),
            ..Default::default()
        };

        let mut digest = Digest::default();
        digest.record(record("services", "svchost", 10, &settings));
        digest.record(record("services", "svchost", 11, &settings));
        digest.record(record("services", "searchindexer", 12, &settings));
        digest.failed_pids.insert(11);

        let expected = "services -> cpuPriority: belowNormal, ioPriority: low, affinityName: firstTwo\n\
                        [ 0| 1|--|--]\n\
                        \n\
                        Affected:\n\
                        - svchost (10)\n\
                        - searchindexer (12)\n\
                        \n\
                        Failed:\n\
                        - svchost (11)";
        assert_eq!(digest.render(false), expected);
    }

    #[test]
    fn test_render_override_with_reason_and_cmd_trigger() {
        let settings = ProfileSettings {
            cpu_priority: Some(CpuPriority::Idle),
            suspension_delay: Some(Duration::from_millis(500)),
            ..Default::default()
        };

        let mut digest = Digest::default();
        digest.record(DigestRecord {
            replaced_by: Some("quiet".to_string()),
            condition_reason: Some("game is running".to_string()),
            cmd_trigger: Some("--type=renderer"),
            ..record("browsers", "chrome", 5, &settings)
        });

        let rendered = digest.render(false);
        assert!(rendered.starts_with("[quiet] browsers -> suspensionDelay: 500, cpuPriority: idle\n"));
        assert!(rendered.contains("Override reason: game is running"));
        assert!(rendered.contains("- chrome (5)\n  Triggered by command line wildcard rule: '--type=renderer'"));
    }

    #[test]
    fn test_render_disabled_and_active_window() {
        let settings = ProfileSettings::default();
        let mut digest = Digest {
            active_window: Some("steam".to_string()),
            ..Default::default()
        };
        digest.record(DigestRecord {
            disabled: true,
            condition_reason: Some("Process 'steam' is active".to_string()),
            ..record("launchers", "steam", 3, &settings)
        });

        let rendered = digest.render(true);
        assert!(rendered.starts_with("Active window: steam\n\n[disabled] launchers -> "));
        assert!(rendered.contains("Disabled reason: Process 'steam' is active"));
        assert!(!digest.render(false).contains("Active window"));
    }

    #[test]
    fn test_later_records_overwrite_defined_attributes() {
        let first = ProfileSettings {
            cpu_priority: Some(CpuPriority::Normal),
            ..Default::default()
        };
        let second = ProfileSettings {
            cpu_priority: Some(CpuPriority::High),
            ..Default::default()
        };

        let mut digest = Digest::default();
        digest.record(record("p", "a", 1, &first));
        digest.record(record("p", "b", 2, &second));
        digest.record(record("p", "c", 3, &ProfileSettings::default()));

        assert_eq!(digest.entries.len(), 1);
        assert_eq!(digest.entries[0].settings.cpu_priority, Some(CpuPriority::High));
        assert_eq!(digest.entries[0].affected.len(), 3);
    }
}
