//! Configuration validation and normalization
//!
//! Turns a [`RawConfig`] into an [`AppConfig`]: unique profile names, one
//! owner per process name, resolved affinities and priorities, validated
//! `if` blocks and the final evaluation order.

use std::collections::HashSet;
use std::time::Duration;

use serde_yaml::Value;
use tracing::warn;

use crate::policy::{CoreRange, CpuPriority, CpuTopology, IoPriority, PagePriority};

use super::error::{ConfigError, ConfigResult};
use super::profile::{
    normalize_process_name, AffinityPreset, AffinitySetting, AppConfig, Condition, ConditionAction,
    ConditionKind, LoggingOptions, ProcessProfile, ProfileKind, ProfilePatch, ProfileSettings,
};
use super::raw::{RawAffinity, RawConfig, RawProfile};

/// Keys a `then` override may define even when its parent does not.
const PARENTLESS_OVERRIDE_KEYS: [&str; 2] = ["terminationDelay", "suspensionDelay"];

/// Validates configuration documents against one processor topology.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    topology: CpuTopology,
}

/// Names and process assignments seen so far in one validation pass.
#[derive(Default)]
struct Registry {
    profile_names: HashSet<String>,
    processes: HashSet<String>,
}

impl Validator {
    pub fn new(topology: CpuTopology) -> Self {
        Self { topology }
    }

    /// Validates `raw` and produces the ordered rule set.
    pub fn validate(&self, raw: RawConfig) -> ConfigResult<AppConfig> {
        let affinities = raw
            .affinities
            .unwrap_or_default()
            .into_iter()
            .map(|preset| self.parse_preset(preset))
            .collect::<ConfigResult<Vec<_>>>()?;

        let self_affinity = match raw.win_control_affinity.as_deref() {
            None | Some("") => None,
            Some(name) => {
                let preset = affinities
                    .iter()
                    .find(|preset| preset.name == name)
                    .ok_or_else(|| ConfigError::UnknownSelfAffinity {
                        preset: name.to_string(),
                    })?;
                Some(self.resolve_preset(preset))
            }
        };

        let ignore_processes = raw
            .ignore_processes
            .unwrap_or_default()
            .iter()
            .map(|name| normalize_process_name(name))
            .collect();

        let mut registry = Registry::default();
        let mut plain = Vec::new();
        let mut conditional = Vec::new();
        let mut fallback: Option<ProcessProfile> = None;
        let mut fullscreen: Option<ProcessProfile> = None;

        for (index, value) in raw.profiles.unwrap_or_default().into_iter().enumerate() {
            let profile = self.validate_profile(&affinities, &mut registry, index, value)?;

            match profile.kind {
                ProfileKind::Fallback => {
                    if fallback.is_some() {
                        return Err(ConfigError::MultipleFallback { profile: profile.name });
                    }
                    fallback = Some(profile);
                }
                ProfileKind::Fullscreen => {
                    if fullscreen.is_some() {
                        return Err(ConfigError::MultipleFullscreen { profile: profile.name });
                    }
                    fullscreen = Some(profile);
                }
                ProfileKind::Standard if !profile.conditions.is_empty() => conditional.push(profile),
                ProfileKind::Standard => plain.push(profile),
            }
        }

        let full_affinity = fullscreen
            .as_ref()
            .and_then(|profile| profile.settings.affinity.as_ref())
            .map(|affinity| affinity.mask)
            .unwrap_or_else(|| self.topology.full_mask());

        let mut profiles = plain;
        profiles.extend(conditional);
        profiles.extend(fallback);
        profiles.extend(fullscreen);

        let needs_cmdline = profiles.iter().any(|profile| !profile.cmd.is_empty());

        Ok(AppConfig {
            interval: Duration::from_millis(raw.interval),
            logging: LoggingOptions {
                enabled: raw.logging,
                interval: raw.logging_interval.map(Duration::from_millis),
                detailed: raw.detailed_logging,
                console: raw.console_logging,
                level: raw.log_level,
            },
            detect_config_change: raw.detect_config_change,
            ignore_processes,
            affinities,
            profiles,
            self_affinity,
            full_affinity,
            needs_cmdline,
        })
    }

    fn parse_preset(&self, raw: RawAffinity) -> ConfigResult<AffinityPreset> {
        let mut ranges = Vec::with_capacity(raw.ranges.len());

        for entry in &raw.ranges {
            let range = match entry.as_slice() {
                [core] => CoreRange::single(*core),
                [start, end] => CoreRange::span(*start, *end),
                _ => {
                    return Err(ConfigError::InvalidPreset {
                        preset: raw.name,
                        reason: "every range must be [core] or [start, end]",
                    })
                }
            };

            if range.last() >= self.topology.logical_cores {
                return Err(ConfigError::PresetOutOfRange {
                    preset: raw.name,
                    core: range.last(),
                    total: self.topology.logical_cores,
                });
            }

            ranges.push(range);
        }

        Ok(AffinityPreset {
            name: raw.name,
            ranges,
        })
    }

    fn resolve_preset(&self, preset: &AffinityPreset) -> AffinitySetting {
        let translated = self.topology.translate(&preset.ranges);
        AffinitySetting {
            preset: preset.name.clone(),
            mask: translated.mask,
            graph: translated.graph,
        }
    }

    fn validate_profile(
        &self,
        affinities: &[AffinityPreset],
        registry: &mut Registry,
        index: usize,
        value: Value,
    ) -> ConfigResult<ProcessProfile> {
        let label = value
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Profile #{}", index + 1));

        let raw: RawProfile = serde_yaml::from_value(value).map_err(|source| ConfigError::Malformed {
            profile: label,
            source,
        })?;

        let name = match raw.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(ConfigError::MissingName { index: index + 1 }),
        };

        if !registry.profile_names.insert(name.clone()) {
            return Err(ConfigError::DuplicateName { profile: name });
        }

        let kind = match raw.kind.as_deref() {
            None => ProfileKind::Standard,
            Some(key) => ProfileKind::from_key(key).ok_or_else(|| ConfigError::InvalidType {
                profile: name.clone(),
            })?,
        };

        let processes = match &raw.processes {
            Some(Value::Sequence(entries)) => {
                let mut processes = HashSet::with_capacity(entries.len());

                for entry in entries {
                    let process = entry
                        .as_str()
                        .map(normalize_process_name)
                        .ok_or_else(|| ConfigError::InvalidProperty {
                            profile: name.clone(),
                            property: "processes",
                            reason: "should be an array of process names",
                        })?;

                    if !registry.processes.insert(process.clone()) {
                        return Err(ConfigError::DuplicateProcess { profile: name, process });
                    }

                    processes.insert(process);
                }

                processes
            }
            Some(_) => {
                return Err(ConfigError::InvalidProperty {
                    profile: name,
                    property: "processes",
                    reason: "should be an array of process names",
                })
            }
            None if raw.cmd.is_none() && kind == ProfileKind::Standard => {
                return Err(ConfigError::MissingProperty {
                    profile: name,
                    property: "processes",
                })
            }
            None => HashSet::new(),
        };

        let conditions = match &raw.conditions {
            None => Vec::new(),
            Some(Value::Sequence(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.validate_condition(affinities, &name, &raw, i + 1, item))
                .collect::<ConfigResult<Vec<_>>>()?,
            Some(_) => return Err(ConfigError::ConditionsNotArray { profile: name }),
        };

        let settings = self.resolve_settings(affinities, &name, &raw);

        Ok(ProcessProfile {
            name,
            processes,
            cmd: raw.cmd.unwrap_or_default(),
            kind,
            settings,
            conditions,
        })
    }

    fn validate_condition(
        &self,
        affinities: &[AffinityPreset],
        profile: &str,
        parent: &RawProfile,
        index: usize,
        item: &Value,
    ) -> ConfigResult<Condition> {
        let fail = |reason: String| ConfigError::Condition {
            profile: profile.to_string(),
            index,
            reason,
        };

        let kind = match item.get("condition") {
            None | Some(Value::Null) => {
                return Err(fail("required 'condition' property is not defined.".to_string()))
            }
            Some(value) => value.as_str().and_then(ConditionKind::from_key).ok_or_else(|| {
                fail(format!(
                    "'condition' value is invalid. Possible options are: {}",
                    ConditionKind::OPTIONS.join(", ")
                ))
            })?,
        };

        let then = match item.get("then") {
            None | Some(Value::Null) => {
                return Err(fail("required 'then' property is not defined.".to_string()))
            }
            Some(Value::String(action)) if action == "disable" => None,
            Some(Value::String(_)) => {
                return Err(fail("'then' is a string, but the value is not 'disable'.".to_string()))
            }
            Some(value @ Value::Mapping(_)) => Some(value.clone()),
            Some(_) => {
                return Err(fail("the 'then' value is not a string or keyed object.".to_string()))
            }
        };

        let for_processes = match item.get("forProcesses") {
            None | Some(Value::Null) => None,
            Some(Value::Sequence(entries)) => Some(
                entries
                    .iter()
                    .map(|entry| entry.as_str().map(normalize_process_name))
                    .collect::<Option<HashSet<_>>>()
                    .ok_or_else(|| fail("'forProcesses' must be an array of strings.".to_string()))?,
            ),
            Some(_) => return Err(fail("'forProcesses' must be an array if defined.".to_string())),
        };

        if kind == ConditionKind::Running && for_processes.is_none() {
            return Err(fail(
                "'condition' value is 'running', but 'forProcesses' is not an array.".to_string(),
            ));
        }

        let then = match then {
            None => ConditionAction::Disable,
            Some(value) => {
                let child: RawProfile = serde_yaml::from_value(value).map_err(|source| ConfigError::Malformed {
                    profile: profile.to_string(),
                    source,
                })?;

                let patch = self.validate_override(affinities, profile, &child)?;

                let parent_keys = parent.keys();
                let missing = parent_keys
                    .iter()
                    .chain(child.keys().iter())
                    .filter(|key| !PARENTLESS_OVERRIDE_KEYS.contains(key))
                    .any(|key| !parent_keys.contains(key));

                if missing {
                    return Err(fail(
                        "'then' child cannot have keys the parent does not have.".to_string(),
                    ));
                }

                ConditionAction::Override(patch)
            }
        };

        Ok(Condition {
            kind,
            for_processes,
            then,
        })
    }

    /// Validates a nested `then` profile. Nested profiles select nothing on
    /// their own, so they cannot carry `processes` or another `if` block.
    fn validate_override(
        &self,
        affinities: &[AffinityPreset],
        profile: &str,
        child: &RawProfile,
    ) -> ConfigResult<ProfilePatch> {
        if child.processes.is_some() {
            return Err(ConfigError::ChildProperty {
                profile: profile.to_string(),
                property: "processes",
            });
        }

        if child.conditions.is_some() {
            return Err(ConfigError::ChildProperty {
                profile: profile.to_string(),
                property: "if",
            });
        }

        Ok(ProfilePatch {
            name: child.name.clone(),
            settings: self.resolve_settings(affinities, profile, child),
        })
    }

    fn resolve_settings(&self, affinities: &[AffinityPreset], profile: &str, raw: &RawProfile) -> ProfileSettings {
        let affinity = raw.affinity.as_deref().and_then(|name| {
            let preset = affinities.iter().find(|preset| preset.name == name);
            if preset.is_none() {
                warn!("[{}] affinity preset '{}' is not defined, affinity left untouched", profile, name);
            }
            preset.map(|preset| self.resolve_preset(preset))
        });

        ProfileSettings {
            affinity,
            cpu_priority: resolve_key(profile, "cpuPriority", raw.cpu_priority.as_deref(), CpuPriority::from_key),
            page_priority: resolve_key(profile, "pagePriority", raw.page_priority.as_deref(), PagePriority::from_key),
            io_priority: resolve_key(profile, "ioPriority", raw.io_priority.as_deref(), IoPriority::from_key),
            termination_delay: raw.termination_delay.map(Duration::from_millis),
            suspension_delay: raw.suspension_delay.map(Duration::from_millis),
            resume_delay: raw.resume_delay.map(Duration::from_millis),
        }
    }
}

/// Looks `key` up in a priority table; unknown keys resolve to `None`.
fn resolve_key<T>(profile: &str, property: &str, key: Option<&str>, lookup: fn(&str) -> Option<T>) -> Option<T> {
    let key = key?;
    let resolved = lookup(key);
    if resolved.is_none() {
        warn!("[{}] unknown {} value '{}', attribute left untouched", profile, property, key);
    }
    resolved
}
