//! Priority levels understood by the policy engine
//!
//! Configuration files name priorities with camelCase keys; the native
//! layer wants the numeric codes Windows uses. Each enum here is the
//! static lookup table between the two.

use std::fmt;

// ============================================================================
// CPU priority class
// ============================================================================

/// Windows process priority classes.
///
/// # Levels (lowest to highest)
/// * `Idle` - Runs only when system is idle
/// * `BelowNormal` - Lower than normal priority
/// * `Normal` - Default priority for most applications
/// * `AboveNormal` - Higher than normal priority
/// * `High` - Significantly more CPU time
/// * `RealTime` - Highest priority, can affect system stability
/// * `BackgroundBegin` - Background processing mode (lowers I/O and page priority too)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuPriority {
    Idle,
    BelowNormal,
    Normal,
    AboveNormal,
    High,
    RealTime,
    BackgroundBegin,
}

impl CpuPriority {
    const TABLE: [(&'static str, CpuPriority, u32); 7] = [
        ("idle", CpuPriority::Idle, 64),
        ("belowNormal", CpuPriority::BelowNormal, 16384),
        ("normal", CpuPriority::Normal, 32),
        ("aboveNormal", CpuPriority::AboveNormal, 32768),
        ("high", CpuPriority::High, 128),
        ("realTime", CpuPriority::RealTime, 256),
        ("processModeBackgroundBegin", CpuPriority::BackgroundBegin, 1048576),
    ];

    /// Resolves a configuration key such as `belowNormal`.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::TABLE.iter().find(|(k, _, _)| *k == key).map(|(_, p, _)| *p)
    }

    /// Resolves a priority class value returned by `GetPriorityClass`.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::TABLE.iter().find(|(_, _, c)| *c == code).map(|(_, p, _)| *p)
    }

    /// The priority class value `SetPriorityClass` expects
    pub fn code(self) -> u32 {
        Self::TABLE.iter().find(|(_, p, _)| *p == self).map(|(_, _, c)| *c).unwrap_or(32)
    }

    pub fn key(self) -> &'static str {
        Self::TABLE.iter().find(|(_, p, _)| *p == self).map(|(k, _, _)| *k).unwrap_or("normal")
    }
}

impl fmt::Display for CpuPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// Memory page priority
// ============================================================================

/// Memory page priority (`MEMORY_PRIORITY_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PagePriority {
    Idle = 1,
    Low = 2,
    Medium = 3,
    BelowNormal = 4,
    Normal = 5,
}

impl PagePriority {
    const TABLE: [(&'static str, PagePriority); 5] = [
        ("idle", PagePriority::Idle),
        ("low", PagePriority::Low),
        ("medium", PagePriority::Medium),
        ("belowNormal", PagePriority::BelowNormal),
        ("normal", PagePriority::Normal),
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Self::TABLE.iter().find(|(k, _)| *k == key).map(|(_, p)| *p)
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::TABLE.iter().find(|(_, p)| *p as u32 == code).map(|(_, p)| *p)
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn key(self) -> &'static str {
        Self::TABLE.iter().find(|(_, p)| *p == self).map(|(k, _)| *k).unwrap_or("normal")
    }
}

impl fmt::Display for PagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// I/O priority
// ============================================================================

/// I/O priority hint (`IO_PRIORITY_HINT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoPriority {
    Idle = 0,
    Low = 1,
    Normal = 2,
    High = 3,
}

impl IoPriority {
    const TABLE: [(&'static str, IoPriority); 4] = [
        ("idle", IoPriority::Idle),
        ("low", IoPriority::Low),
        ("normal", IoPriority::Normal),
        ("high", IoPriority::High),
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Self::TABLE.iter().find(|(k, _)| *k == key).map(|(_, p)| *p)
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::TABLE.iter().find(|(_, p)| *p as u32 == code).map(|(_, p)| *p)
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn key(self) -> &'static str {
        Self::TABLE.iter().find(|(_, p)| *p == self).map(|(k, _)| *k).unwrap_or("normal")
    }
}

impl fmt::Display for IoPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
