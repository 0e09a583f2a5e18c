//! Enforcement state carried between ticks

use std::collections::HashSet;
use std::time::{Instant, SystemTime};

use crate::policy::CpuPriority;

/// What a fullscreen process looked like before it was boosted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullscreenOriginalState {
    /// `None` when the priority class could not be read or is not a known class
    pub cpu_priority: Option<CpuPriority>,
    /// System affinity mask at boost time
    pub affinity: Option<usize>,
}

/// Engine state for one configuration lifetime.
///
/// Dropped and rebuilt from scratch whenever the configuration is reloaded.
#[derive(Debug, Default)]
pub struct EnforcementState {
    /// Pid currently running with the fullscreen boost
    pub fullscreen_optimized_pid: Option<u32>,
    /// Snapshot restored once the boosted pid leaves fullscreen
    pub fullscreen_original_state: Option<FullscreenOriginalState>,
    /// Pids whose setters failed during the current tick
    pub failed_pids: HashSet<u32>,
    /// Pids suspended by a condition override, resumed when it turns off
    pub temp_suspended_pids: HashSet<u32>,
    pub last_config_mtime: Option<SystemTime>,
    pub last_log_time: Option<Instant>,
}

impl EnforcementState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the boost when the boosted process is gone.
    pub fn clear_exited_boost(&mut self, running: impl Fn(u32) -> bool) {
        if let Some(pid) = self.fullscreen_optimized_pid {
            if !running(pid) {
                self.fullscreen_optimized_pid = None;
                self.fullscreen_original_state = None;
            }
        }
    }

    pub fn is_fullscreen_optimized(&self, pid: u32) -> bool {
        self.fullscreen_optimized_pid == Some(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_exited_boost() {
        let mut state = EnforcementState::new();
        state.fullscreen_optimized_pid = Some(42);
        state.fullscreen_original_state = Some(FullscreenOriginalState::default());

        state.clear_exited_boost(|pid| pid == 42);
        assert!(state.is_fullscreen_optimized(42));

        state.clear_exited_boost(|_| false);
        assert_eq!(state.fullscreen_optimized_pid, None);
        assert_eq!(state.fullscreen_original_state, None);
    }
}
