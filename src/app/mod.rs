//! The enforcement daemon
//!
//! [`Daemon`] owns the loaded configuration and the [`PolicyEngine`] built
//! from it, and drives the strictly sequential loop:
//! stat config -> snapshot -> evaluate -> log digest -> sleep.

pub mod cli;
pub mod engine;
pub mod report;
pub mod state;
pub mod timers;

#[cfg(test)]
pub(crate) mod testing;

pub use cli::Args;
pub use engine::{PolicyEngine, TickReport};
pub use timers::{ActionScheduler, TimerRuntime};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use tracing::{error, info, warn};

use crate::config::profile::LoggingOptions;
use crate::config::{self, AppConfig, ConfigResult, ProfileKind};
use crate::constants::DEFAULT_INTERVAL_MS;
use crate::important;
use crate::logging::LogHandle;
use crate::policy::{CpuPriority, CpuTopology, Privilege, ProcessControl, ProcessSnapshotter, SnapshotError};

use state::EnforcementState;

/// Outcome of one pass of the loop.
#[derive(Debug)]
pub enum Step {
    Enforced(TickReport),
    /// A configuration was (re)loaded instead of enforcing
    Reloaded,
    /// The last load failed and the file has not changed since
    WaitingForConfig,
}

/// Values shown in the "Config info" block and the console banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSummary {
    pub config_file: PathBuf,
    pub interval: Duration,
    pub logging_interval: Duration,
    pub hyperthreading: bool,
    pub debug_privileges: bool,
    pub elevated: bool,
    pub fallback_profile: bool,
    pub fullscreen_profile: bool,
    pub physical_cores: u32,
    pub affinity_presets: usize,
    pub profiles: usize,
    pub processes: usize,
}

impl ConfigSummary {
    fn new(config: &AppConfig, config_file: &Path, topology: CpuTopology, debug_privileges: bool, elevated: bool) -> Self {
        Self {
            config_file: config_file.to_path_buf(),
            interval: config.interval,
            logging_interval: config.logging.interval.unwrap_or(config.interval),
            hyperthreading: topology.hyperthreading(),
            debug_privileges,
            elevated,
            fallback_profile: config.has_profile_kind(ProfileKind::Fallback),
            fullscreen_profile: config.has_profile_kind(ProfileKind::Fullscreen),
            physical_cores: topology.physical_cores,
            affinity_presets: config.affinities.len(),
            profiles: config.profiles.len(),
            processes: config.processes_configured(),
        }
    }

    /// Label / value pairs in display order
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mark = |flag: bool| if flag { "✓" } else { "✗" }.to_string();

        vec![
            ("Configuration file", self.config_file.display().to_string()),
            ("Polling rate", format!("{}ms", self.interval.as_millis())),
            ("Logging rate", format!("{}ms", self.logging_interval.as_millis())),
            ("Hyperthreading", mark(self.hyperthreading)),
            ("Debug Privileges", mark(self.debug_privileges)),
            ("Elevated", mark(self.elevated)),
            ("Fallback profile present", mark(self.fallback_profile)),
            ("Fullscreen profile present", mark(self.fullscreen_profile)),
            ("Physical core count", self.physical_cores.to_string()),
            ("CPU affinity presets", self.affinity_presets.to_string()),
            ("Process profiles", self.profiles.to_string()),
            ("Processes configured", self.processes.to_string()),
        ]
    }
}

/// The long-running enforcement loop and everything it owns.
pub struct Daemon {
    config_path: PathBuf,
    topology: CpuTopology,
    control: Arc<dyn ProcessControl>,
    snapshotter: Arc<dyn ProcessSnapshotter>,
    scheduler: Arc<dyn ActionScheduler>,
    logging: Option<LogHandle>,
    console_flag: bool,
    elevated: bool,
    can_debug: bool,
    self_pid: u32,
    engine: Option<PolicyEngine>,
    summary: Option<ConfigSummary>,
    /// Modification time of a file that failed validation
    rejected_mtime: Option<SystemTime>,
}

impl Daemon {
    pub fn new(
        config_path: PathBuf,
        topology: CpuTopology,
        control: Arc<dyn ProcessControl>,
        snapshotter: Arc<dyn ProcessSnapshotter>,
        scheduler: Arc<dyn ActionScheduler>,
    ) -> Self {
        Self {
            config_path,
            topology,
            control,
            snapshotter,
            scheduler,
            logging: None,
            console_flag: false,
            elevated: false,
            can_debug: false,
            self_pid: std::process::id(),
            engine: None,
            summary: None,
            rejected_mtime: None,
        }
    }

    /// Lets each load re-apply the configuration's logging switches.
    pub fn with_logging(mut self, handle: LogHandle, console_flag: bool) -> Self {
        self.logging = Some(handle);
        self.console_flag = console_flag;
        self
    }

    pub fn with_elevation(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    pub fn with_self_pid(mut self, pid: u32) -> Self {
        self.self_pid = pid;
        self
    }

    pub fn engine(&self) -> Option<&PolicyEngine> {
        self.engine.as_ref()
    }

    pub fn summary(&self) -> Option<&ConfigSummary> {
        self.summary.as_ref()
    }

    /// Drops the daemon's own priority to idle and enables the privileges
    /// needed to touch elevated processes and raise I/O priority.
    pub fn prepare_process(&mut self) {
        if !self.control.set_priority_class(self.self_pid, CpuPriority::Idle.code()) {
            warn!("Could not lower own priority to idle");
        }

        self.can_debug = self.control.adjust_privilege(Privilege::Debug)
            && self.control.adjust_privilege(Privilege::IncreaseBasePriority);

        if !self.can_debug {
            warn!("Debug privileges unavailable, elevated processes will not be modified");
        }
    }

    /// Loads and validates the configuration, replacing any previous engine.
    ///
    /// On failure the daemon keeps no engine and waits for the file to change.
    pub fn load(&mut self) -> ConfigResult<()> {
        self.engine = None;
        self.summary = None;

        let mtime = modified(&self.config_path).ok();
        let config = match config::load(&self.config_path, self.topology) {
            Ok(config) => config,
            Err(e) => {
                self.rejected_mtime = mtime;
                return Err(e);
            }
        };
        self.rejected_mtime = None;

        if let Some(logging) = &self.logging {
            logging.apply(&config.logging, self.console_flag);
        }

        if let Some(affinity) = &config.self_affinity {
            if !self.control.set_processor_affinity(self.self_pid, affinity.mask) {
                warn!("Could not apply affinity preset '{}' to own process", affinity.preset);
            }
        }

        let summary = ConfigSummary::new(&config, &self.config_path, self.topology, self.can_debug, self.elevated);
        important!("====================== Config info ======================");
        for (label, value) in summary.entries() {
            important!("{}: {}", label, value);
        }
        important!("=========================================================");

        let mut engine = PolicyEngine::new(config, Arc::clone(&self.control), Arc::clone(&self.scheduler))
            .with_self_pid(self.self_pid);
        engine.state_mut().last_config_mtime = mtime;

        self.engine = Some(engine);
        self.summary = Some(summary);
        Ok(())
    }

    fn reload(&mut self) -> Step {
        match self.load() {
            Ok(()) => Step::Reloaded,
            Err(e) => {
                error!("{}", e);
                Step::WaitingForConfig
            }
        }
    }

    /// Runs one pass: reloads when the file changed, otherwise enforces.
    pub fn step(&mut self) -> Result<Step, SnapshotError> {
        let mtime = modified(&self.config_path)?;

        let Some(engine) = self.engine.as_mut() else {
            if self.rejected_mtime == Some(mtime) {
                return Ok(Step::WaitingForConfig);
            }
            return Ok(self.reload());
        };

        let changed = engine.state().last_config_mtime.is_some_and(|last| last != mtime);
        if changed && engine.config().detect_config_change {
            important!("Configuration changed, reloading...");
            return Ok(self.reload());
        }
        engine.state_mut().last_config_mtime = Some(mtime);

        let started = Instant::now();
        let processes = self.snapshotter.snapshot(engine.config().needs_cmdline)?;
        let report = engine.tick(processes);
        log_digest(engine, &report, started);

        Ok(Step::Enforced(report))
    }

    /// Time to sleep between passes
    pub fn interval(&self) -> Duration {
        self.engine
            .as_ref()
            .map(|engine| engine.config().interval)
            .unwrap_or(Duration::from_millis(DEFAULT_INTERVAL_MS))
    }

    /// Loops forever. Errors of a pass are logged and the next pass still runs.
    pub fn run(&mut self) -> ! {
        loop {
            match self.step() {
                Ok(Step::Reloaded) => continue,
                Ok(_) => {}
                Err(e) => error!("{}", e),
            }
            thread::sleep(self.interval());
        }
    }
}

fn modified(path: &Path) -> std::io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// Whether this tick's digest is written, updating the last log time if so.
fn should_log(logging: &LoggingOptions, state: &mut EnforcementState, now: Instant) -> bool {
    if !logging.enabled {
        return false;
    }

    let due = match (logging.interval, state.last_log_time) {
        (Some(interval), Some(last)) => now.duration_since(last) > interval,
        _ => true,
    };

    if due {
        state.last_log_time = Some(now);
    }
    due
}

fn log_digest(engine: &mut PolicyEngine, report: &TickReport, started: Instant) {
    let logging = engine.config().logging.clone();
    if !should_log(&logging, engine.state_mut(), started) {
        return;
    }

    if !report.digest.is_empty() {
        info!("\n{}", report.digest.render(logging.detailed));
    }
    info!("Finished process enforcement in {}ms", started.elapsed().as_millis());
    match report.digest.fullscreen_pid {
        Some(pid) => info!("Fullscreen PID: {}", pid),
        None => info!("Fullscreen PID: none"),
    }
    info!("=========================================================");
}
