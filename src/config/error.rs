//! Configuration errors
//!
//! Every variant names the profile at fault so the message alone is enough
//! to find the offending block in config.yaml.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration file is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("[Profile #{index}] Misconfiguration found - missing required property 'name'.")]
    MissingName { index: usize },

    #[error("[{profile}] Misconfiguration found - the 'name' property must be a unique identifier.")]
    DuplicateName { profile: String },

    #[error(
        "[{profile}] Misconfiguration found - the process '{process}' is either duplicated in a profile \
         or handled in multiple profiles. A process can only be handled by one profile."
    )]
    DuplicateProcess { profile: String, process: String },

    #[error("[{profile}] Misconfiguration found - missing required property '{property}'.")]
    MissingProperty { profile: String, property: &'static str },

    #[error("[{profile}] Misconfiguration found - '{property}' {reason}.")]
    InvalidProperty {
        profile: String,
        property: &'static str,
        reason: &'static str,
    },

    #[error("[{profile}] Misconfiguration found - {source}")]
    Malformed {
        profile: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("[{profile}] 'if' block misconfiguration: 'if' should be an array of conditional objects.")]
    ConditionsNotArray { profile: String },

    #[error("[{profile}] 'if' block misconfiguration ({index}): {reason}")]
    Condition {
        profile: String,
        index: usize,
        reason: String,
    },

    #[error("[{profile}] Misconfiguration found - child profiles cannot have a '{property}' value defined.")]
    ChildProperty { profile: String, property: &'static str },

    #[error("[{profile}] The profile type must be one of the following values: 'standard', 'fallback', or 'fullscreen'.")]
    InvalidType { profile: String },

    #[error("[{profile}] Multiple fallback profiles found. Only one profile can be set as fallback in a configuration.")]
    MultipleFallback { profile: String },

    #[error(
        "[{profile}] Multiple fullscreen profiles found. Only one profile can be designated for \
         fullscreen optimization in a configuration."
    )]
    MultipleFullscreen { profile: String },

    #[error("winControlAffinity does not reference a defined affinity preset name.")]
    UnknownSelfAffinity { preset: String },

    #[error("affinity preset '{preset}' is malformed: {reason}")]
    InvalidPreset { preset: String, reason: &'static str },

    #[error("affinity preset '{preset}' selects core {core}, but the system only has {total} logical processors.")]
    PresetOutOfRange { preset: String, core: u32, total: u32 },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
