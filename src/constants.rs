//! Centralized constants for the daemon
//!
//! Magic numbers, file locations and lookup lists used across the policy
//! engine and the native layer.

// ============================================================================
// Application Info
// ============================================================================

/// Name shown in the startup banner
pub const DISPLAY_NAME: &str = "WinControl";

/// Column width of the startup banner
pub const BANNER_WIDTH: usize = 80;

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Application version from Cargo.toml
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Files and Directories
// ============================================================================

/// Directory under the roaming config dir holding config and logs
pub const CONFIG_DIR_NAME: &str = "WinControl";

pub const CONFIG_FILE_NAME: &str = "config.yaml";

pub const LOG_DIR_NAME: &str = "logs";

/// Prefix of the daily rolling log files
pub const LOG_FILE_PREFIX: &str = "session";

/// Template written when no configuration file exists yet
pub const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config.yaml");

// ============================================================================
// Timing (milliseconds)
// ============================================================================

/// Polling interval used when the configuration does not set one
pub const DEFAULT_INTERVAL_MS: u64 = 60_000;

/// Delay of the resume scheduled when a suspending condition turns off
pub const AUTO_RESUME_DELAY_MS: u64 = 1;

// ============================================================================
// Logging
// ============================================================================

/// Target of log lines that are written regardless of the configured level
pub const IMPORTANT_TARGET: &str = "important";

// ============================================================================
// Fullscreen Detection
// ============================================================================

/// Processes whose windows report as fullscreen without being games:
/// explorer when the taskbar thumbnail menu has focus, the terminal when focused.
pub const FALSE_POSITIVE_FULLSCREEN_APPS: [&str; 2] = ["explorer", "windowsterminal"];
