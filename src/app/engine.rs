//! The enforcement tick
//!
//! One tick walks a process snapshot, finds the profile governing each
//! process, resolves its conditions and applies the resulting settings in a
//! fixed order:
//!
//! terminate > cpu priority > page priority > io priority > affinity > suspend > resume
//!
//! Termination, suspension and resumption are delayed and handed to the
//! [`ActionScheduler`]; the setters run inline and the first failing setter
//! abandons the remaining steps for that process until the next tick.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{
    normalize_process_name, AffinitySetting, AppConfig, Condition, ConditionAction, ConditionKind,
    ProcessProfile, ProfileKind, ProfileSettings,
};
use crate::constants::{AUTO_RESUME_DELAY_MS, FALSE_POSITIVE_FULLSCREEN_APPS};
use crate::policy::{CpuPriority, IoPriority, PagePriority, ProcessControl, ProcessSnapshot};

use super::report::{Digest, DigestRecord};
use super::state::{EnforcementState, FullscreenOriginalState};
use super::timers::{ActionScheduler, DelayedAction, DelayedKind};

/// Preset name shown for the affinity restored after a fullscreen boost
const RESTORED_AFFINITY_NAME: &str = "preBoost";

// ============================================================================
// Actions
// ============================================================================

/// One desired change to a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Terminate(Duration),
    SetCpuPriority(CpuPriority),
    SetPagePriority(PagePriority),
    SetIoPriority(IoPriority),
    SetAffinity(usize),
    Suspend(Duration),
    Resume(Duration),
}

impl Action {
    /// Orders the effective settings of a process into actions.
    ///
    /// A termination replaces everything else. Suspension wins over resumption.
    pub fn plan(settings: &ProfileSettings) -> Vec<Action> {
        if let Some(delay) = settings.termination_delay {
            return vec![Action::Terminate(delay)];
        }

        let mut actions = Vec::new();
        actions.extend(settings.cpu_priority.map(Action::SetCpuPriority));
        actions.extend(settings.page_priority.map(Action::SetPagePriority));
        actions.extend(settings.io_priority.map(Action::SetIoPriority));
        actions.extend(settings.affinity.as_ref().map(|affinity| Action::SetAffinity(affinity.mask)));

        if let Some(delay) = settings.suspension_delay {
            actions.push(Action::Suspend(delay));
        } else if let Some(delay) = settings.resume_delay {
            actions.push(Action::Resume(delay));
        }

        actions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedAction {
    pub pid: u32,
    pub action: Action,
}

/// Result of one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Every action attempted or scheduled, in evaluation order
    pub actions: Vec<PlannedAction>,
    pub digest: Digest,
}

impl TickReport {
    pub fn actions_for(&self, pid: u32) -> Vec<Action> {
        self.actions
            .iter()
            .filter(|planned| planned.pid == pid)
            .map(|planned| planned.action)
            .collect()
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Facts about the current snapshot shared by every process evaluation.
struct TickView<'a> {
    /// Normalized names in snapshot order
    names: Vec<&'a str>,
    active_pid: u32,
    active_name: Option<&'a str>,
    /// Foreground window is fullscreen and not a known false positive
    valid_fullscreen: bool,
}

enum Verdict<'p> {
    Skip,
    Disabled {
        profile: &'p ProcessProfile,
        reason: String,
        /// Set when the process was suspended by an override
        resume_delay: Option<Duration>,
    },
    Enforce(Decision<'p>),
}

struct Decision<'p> {
    profile: &'p ProcessProfile,
    settings: ProfileSettings,
    replaced_by: Option<String>,
    condition_reason: Option<String>,
    cmd_trigger: Option<&'p str>,
}

/// Applies a validated configuration to process snapshots.
pub struct PolicyEngine {
    config: AppConfig,
    state: EnforcementState,
    control: Arc<dyn ProcessControl>,
    scheduler: Arc<dyn ActionScheduler>,
    self_pid: u32,
}

impl PolicyEngine {
    pub fn new(config: AppConfig, control: Arc<dyn ProcessControl>, scheduler: Arc<dyn ActionScheduler>) -> Self {
        Self {
            config,
            state: EnforcementState::new(),
            control,
            scheduler,
            self_pid: std::process::id(),
        }
    }

    /// Overrides the pid treated as the daemon itself.
    pub fn with_self_pid(mut self, pid: u32) -> Self {
        self.self_pid = pid;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> &EnforcementState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EnforcementState {
        &mut self.state
    }

    /// Runs one enforcement pass over `processes`.
    pub fn tick(&mut self, mut processes: Vec<ProcessSnapshot>) -> TickReport {
        let Self {
            config,
            state,
            control,
            scheduler,
            self_pid,
        } = self;

        state.failed_pids.clear();

        for process in &mut processes {
            process.name = normalize_process_name(&process.name);
        }

        let window = control.active_window();
        let active_name = processes
            .iter()
            .find(|process| window.pid != 0 && process.pid == window.pid)
            .map(|process| process.name.as_str());
        let valid_fullscreen =
            window.is_fullscreen && active_name.is_some_and(|name| !FALSE_POSITIVE_FULLSCREEN_APPS.contains(&name));

        state.clear_exited_boost(|pid| processes.iter().any(|process| process.pid == pid));

        let view = TickView {
            names: processes.iter().map(|process| process.name.as_str()).collect(),
            active_pid: window.pid,
            active_name,
            valid_fullscreen,
        };

        let mut report = TickReport {
            actions: Vec::new(),
            digest: Digest {
                active_window: active_name.map(str::to_string),
                ..Default::default()
            },
        };

        for process in &processes {
            if process.pid == 0 || process.pid == *self_pid || config.ignore_processes.contains(&process.name) {
                continue;
            }

            match evaluate(config, state, control.as_ref(), &view, process) {
                Verdict::Skip => {}
                Verdict::Disabled {
                    profile,
                    reason,
                    resume_delay,
                } => {
                    if let Some(delay) = resume_delay {
                        apply(control.as_ref(), scheduler.as_ref(), state, process.pid, &[Action::Resume(delay)]);
                        report.actions.push(PlannedAction {
                            pid: process.pid,
                            action: Action::Resume(delay),
                        });
                    }

                    report.digest.record(DigestRecord {
                        profile: &profile.name,
                        process: &process.name,
                        pid: process.pid,
                        disabled: true,
                        replaced_by: None,
                        condition_reason: Some(reason),
                        cmd_trigger: None,
                        settings: &ProfileSettings::default(),
                    });
                }
                Verdict::Enforce(decision) => {
                    let planned = Action::plan(&decision.settings);
                    apply(control.as_ref(), scheduler.as_ref(), state, process.pid, &planned);

                    report.digest.record(DigestRecord {
                        profile: &decision.profile.name,
                        process: &process.name,
                        pid: process.pid,
                        disabled: false,
                        replaced_by: decision.replaced_by,
                        condition_reason: decision.condition_reason,
                        cmd_trigger: decision.cmd_trigger,
                        settings: &decision.settings,
                    });

                    report.actions.extend(planned.into_iter().map(|action| PlannedAction {
                        pid: process.pid,
                        action,
                    }));
                }
            }
        }

        report.digest.failed_pids = state.failed_pids.clone();
        report.digest.fullscreen_pid = state.fullscreen_optimized_pid;
        report
    }
}

/// Finds the governing profile of `process` and resolves its settings.
fn evaluate<'p>(
    config: &'p AppConfig,
    state: &mut EnforcementState,
    control: &dyn ProcessControl,
    view: &TickView<'_>,
    process: &ProcessSnapshot,
) -> Verdict<'p> {
    let is_active = process.pid == view.active_pid;
    let use_performance = is_active && view.valid_fullscreen;
    let is_optimized = state.is_fullscreen_optimized(process.pid);

    for profile in &config.profiles {
        let direct = profile.processes.contains(&process.name);
        let cmd_trigger = match (&process.cmdline, direct) {
            (Some(cmdline), false) => profile.cmd_match(cmdline),
            _ => None,
        };

        // The boosted pid bypasses the fallback so its restore runs through
        // the fullscreen profile.
        let caught = profile.kind == ProfileKind::Fallback && !use_performance && !is_optimized;
        let matched = direct || cmd_trigger.is_some() || caught;

        if !matched && profile.kind != ProfileKind::Fullscreen {
            continue;
        }

        let mut settings = profile.settings.clone();

        if is_active {
            if let Some(affinity) = settings.affinity.as_mut() {
                // The preset diagram no longer describes the mask
                affinity.mask = config.full_affinity;
                affinity.graph.clear();
            }
        }

        let mut boost_affected = false;

        if profile.kind == ProfileKind::Fullscreen {
            if use_performance && state.fullscreen_optimized_pid.is_none() {
                let original = FullscreenOriginalState {
                    cpu_priority: control.get_priority_class(process.pid).and_then(CpuPriority::from_code),
                    affinity: control.get_processor_affinity(process.pid).map(|(_, system)| system),
                };

                info!("Priority boosting fullscreen window {} ({})", process.name, process.pid);

                state.fullscreen_optimized_pid = Some(process.pid);
                state.fullscreen_original_state = Some(original);
                boost_affected = true;
            } else if is_optimized && !use_performance {
                let original = state.fullscreen_original_state.take().unwrap_or_default();
                let preset = settings
                    .affinity
                    .as_ref()
                    .map(|affinity| affinity.preset.clone())
                    .unwrap_or_else(|| RESTORED_AFFINITY_NAME.to_string());

                settings.cpu_priority = original.cpu_priority;
                settings.affinity = original.affinity.map(|mask| AffinitySetting {
                    preset,
                    mask,
                    graph: String::new(),
                });
                settings.page_priority = Some(PagePriority::Normal);
                settings.io_priority = Some(IoPriority::Normal);

                info!(
                    "Resetting priority boost for previously fullscreen window {} ({})",
                    process.name, process.pid
                );

                state.fullscreen_optimized_pid = None;
                boost_affected = true;
            }
        }

        let mut replaced_by = None;
        let mut condition_reason = None;

        if !profile.conditions.is_empty() {
            let reasons: Vec<Option<String>> = profile
                .conditions
                .iter()
                .map(|condition| active_reason(condition, &process.name, view))
                .collect();

            let disabled_by = profile
                .conditions
                .iter()
                .zip(&reasons)
                .find_map(|(condition, reason)| match (&condition.then, reason) {
                    (ConditionAction::Disable, Some(reason)) => Some(reason.clone()),
                    _ => None,
                });

            if let Some(reason) = disabled_by {
                let resume_delay = state
                    .temp_suspended_pids
                    .remove(&process.pid)
                    .then(|| Duration::from_millis(AUTO_RESUME_DELAY_MS));
                return Verdict::Disabled {
                    profile,
                    reason,
                    resume_delay,
                };
            }

            for (condition, reason) in profile.conditions.iter().zip(reasons) {
                if let (ConditionAction::Override(patch), Some(reason)) = (&condition.then, reason) {
                    replaced_by = Some(patch.name.clone().unwrap_or_else(|| "override".to_string()));
                    condition_reason = Some(reason);
                    settings = settings.merge(&patch.settings);
                }
            }

            // Tracked on the settings folded from every condition
            if replaced_by.is_some() && settings.suspension_delay.is_some() {
                state.temp_suspended_pids.insert(process.pid);
            } else if state.temp_suspended_pids.remove(&process.pid) {
                settings.resume_delay = Some(Duration::from_millis(AUTO_RESUME_DELAY_MS));
            }
        }

        // The fullscreen profile is visited for every process so the boost
        // bookkeeping above runs; it only enforces on its own pid.
        let sustaining = profile.kind == ProfileKind::Fullscreen && use_performance && is_optimized;

        if !matched && !boost_affected && !sustaining {
            return Verdict::Skip;
        }

        return Verdict::Enforce(Decision {
            profile,
            settings,
            replaced_by,
            condition_reason,
            cmd_trigger,
        });
    }

    Verdict::Skip
}

/// Returns why `condition` holds for `process` this tick, or `None`.
fn active_reason(condition: &Condition, process: &str, view: &TickView<'_>) -> Option<String> {
    match condition.kind {
        // The last listed process in snapshot order names the reason
        ConditionKind::Running => view
            .names
            .iter()
            .rev()
            .find(|name| condition.lists(name))
            .map(|name| format!("{} is running", name)),
        ConditionKind::FullscreenOverrideActive => {
            let active = view.active_name?;
            let listed = condition.for_processes.is_none() || condition.lists(active);
            (view.valid_fullscreen && listed).then(|| format!("Active process '{}' is fullscreen", active))
        }
        ConditionKind::Active => {
            let active = view.active_name?;
            (active == process || condition.lists(active)).then(|| format!("Process '{}' is active", active))
        }
    }
}

/// Executes `actions` in order, stopping at the first failed setter.
fn apply(
    control: &dyn ProcessControl,
    scheduler: &dyn ActionScheduler,
    state: &mut EnforcementState,
    pid: u32,
    actions: &[Action],
) {
    let schedule = |kind, delay| {
        scheduler.schedule(DelayedAction { pid, kind, delay });
        true
    };

    for action in actions {
        let applied = match *action {
            Action::Terminate(delay) => schedule(DelayedKind::Terminate, delay),
            Action::SetCpuPriority(priority) => control.set_priority_class(pid, priority.code()),
            Action::SetPagePriority(priority) => control.set_page_priority(pid, priority.code()),
            Action::SetIoPriority(priority) => control.set_io_priority(pid, priority.code()),
            Action::SetAffinity(mask) => control.set_processor_affinity(pid, mask),
            Action::Suspend(delay) => schedule(DelayedKind::Suspend, delay),
            Action::Resume(delay) => schedule(DelayedKind::Resume, delay),
        };

        if !applied {
            state.failed_pids.insert(pid);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{snapshot, FakeControl, FakeProcess, RecordingScheduler, SELF_PID, SYSTEM_MASK, TOPOLOGY};
    use crate::config::parse;

    fn engine(yaml: &str) -> (PolicyEngine, Arc<FakeControl>, Arc<RecordingScheduler>) {
        let config = parse(yaml, TOPOLOGY).unwrap();
        let control = Arc::new(FakeControl::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let engine = PolicyEngine::new(config, control.clone(), scheduler.clone()).with_self_pid(SELF_PID);
        (engine, control, scheduler)
    }

    const SERVICES: &str = r#"
affinities:
  - name: firstCore
    ranges: [[0]]
profiles:
  - name: services
    processes: [svchost]
    affinity: firstCore
    cpuPriority: belowNormal
    pagePriority: low
    ioPriority: low
"#;

    #[test]
    fn test_matching_profile_applies_in_order() {
        let (mut engine, control, _) = engine(SERVICES);

        let report = engine.tick(snapshot(&[(10, "svchost.exe"), (11, "notepad.exe")]));

        assert_eq!(
            report.actions_for(10),
            vec![
                Action::SetCpuPriority(CpuPriority::BelowNormal),
                Action::SetPagePriority(PagePriority::Low),
                Action::SetIoPriority(IoPriority::Low),
                Action::SetAffinity(0b1_0001),
            ]
        );
        assert!(report.actions_for(11).is_empty());
        assert_eq!(
            control.process(10),
            FakeProcess {
                priority_class: 16384,
                affinity: 0b1_0001,
                page: 2,
                io: 1,
            }
        );
        assert!(report.digest.render(false).contains("- svchost (10)"));
    }

    #[test]
    fn test_ignored_and_own_processes_are_skipped() {
        let yaml = format!("ignoreProcesses: [SvcHost.exe]\n{}", SERVICES);
        let (mut engine, _, _) = engine(&yaml);
        let report = engine.tick(snapshot(&[(10, "svchost.exe")]));
        assert!(report.actions.is_empty());

        let (mut engine, _, _) = self::engine(SERVICES);
        let report = engine.tick(snapshot(&[(SELF_PID, "svchost.exe"), (0, "svchost")]));
        assert!(report.actions.is_empty());
    }

    #[test]
    fn test_command_line_match() {
        let (mut engine, _, _) = engine("profiles:\n  - name: renderers\n    cmd: ['--type=renderer']\n    cpuPriority: idle\n");

        let processes = vec![
            ProcessSnapshot::new(5, "chrome.exe").with_cmdline("chrome.exe --type=renderer --lang=en"),
            ProcessSnapshot::new(6, "chrome.exe").with_cmdline("chrome.exe"),
        ];
        let report = engine.tick(processes);

        assert_eq!(report.actions_for(5), vec![Action::SetCpuPriority(CpuPriority::Idle)]);
        assert!(report.actions_for(6).is_empty());
        let entry = &report.digest.entries[0];
        assert_eq!(entry.affected[0].cmd_trigger.as_deref(), Some("--type=renderer"));
    }

    #[test]
    fn test_active_process_gets_full_affinity() {
        let (mut engine, control, _) = engine(SERVICES);
        control.focus(10, false);

        let report = engine.tick(snapshot(&[(10, "svchost"), (12, "svchost")]));

        assert!(report.actions_for(10).contains(&Action::SetAffinity(0xFF)));
        assert!(report.actions_for(12).contains(&Action::SetAffinity(0b1_0001)));
    }

    #[test]
    fn test_active_process_digest_drops_preset_graph() {
        let (mut engine, control, _) = engine(SERVICES);

        let report = engine.tick(snapshot(&[(10, "svchost")]));
        let preset_graph = report.digest.entries[0].settings.affinity.as_ref().unwrap().graph.clone();
        assert!(!preset_graph.is_empty());

        control.focus(10, false);
        let report = engine.tick(snapshot(&[(10, "svchost")]));
        let affinity = report.digest.entries[0].settings.affinity.as_ref().unwrap();
        assert_eq!(affinity.mask, 0xFF);
        assert!(affinity.graph.is_empty());
        assert!(!report.digest.render(false).contains(&preset_graph));
    }

    #[test]
    fn test_disable_condition_skips_process() {
        let (mut engine, control, _) = engine(
            "profiles:\n  - name: launchers\n    processes: [steam]\n    cpuPriority: idle\n    if:\n      - condition: active\n        then: disable\n",
        );

        let report = engine.tick(snapshot(&[(3, "steam.exe")]));
        assert_eq!(report.actions_for(3), vec![Action::SetCpuPriority(CpuPriority::Idle)]);

        control.focus(3, false);
        let report = engine.tick(snapshot(&[(3, "steam.exe")]));
        assert!(report.actions_for(3).is_empty());

        let rendered = report.digest.render(false);
        assert!(rendered.starts_with("[disabled] launchers -> "));
        assert!(rendered.contains("Disabled reason: Process 'steam' is active"));
    }

    const BROWSERS: &str = r#"
profiles:
  - name: browsers
    processes: [firefox]
    cpuPriority: normal
    if:
      - condition: running
        forProcesses: [game.exe]
        then:
          name: quiet
          cpuPriority: idle
"#;

    #[test]
    fn test_override_condition_merges_over_profile() {
        let (mut engine, _, _) = engine(BROWSERS);

        let report = engine.tick(snapshot(&[(1, "firefox"), (2, "game.exe")]));
        assert_eq!(report.actions_for(1), vec![Action::SetCpuPriority(CpuPriority::Idle)]);
        let entry = &report.digest.entries[0];
        assert_eq!(entry.replaced_by.as_deref(), Some("quiet"));
        assert_eq!(entry.condition_reason.as_deref(), Some("game is running"));

        let report = engine.tick(snapshot(&[(1, "firefox")]));
        assert_eq!(report.actions_for(1), vec![Action::SetCpuPriority(CpuPriority::Normal)]);
        assert_eq!(report.digest.entries[0].replaced_by, None);
    }

    #[test]
    fn test_running_reason_names_last_listed_process() {
        let (mut engine, _, _) = engine(
            "profiles:\n  - name: browsers\n    processes: [firefox]\n    if:\n      - condition: running\n        forProcesses: [game, editor]\n        then:\n          cpuPriority: idle\n",
        );

        let report = engine.tick(snapshot(&[(1, "firefox"), (2, "editor.exe"), (3, "game.exe")]));
        assert_eq!(report.digest.entries[0].condition_reason.as_deref(), Some("game is running"));

        let report = engine.tick(snapshot(&[(1, "firefox"), (3, "game.exe"), (2, "editor.exe")]));
        assert_eq!(report.digest.entries[0].condition_reason.as_deref(), Some("editor is running"));
    }

    #[test]
    fn test_override_does_not_mutate_profile() {
        let (mut engine, _, _) = engine(BROWSERS);
        let before = engine.config().profiles.clone();
        engine.tick(snapshot(&[(1, "firefox"), (2, "game")]));
        assert_eq!(engine.config().profiles, before);
    }

    #[test]
    fn test_conditional_suspension_resumes_automatically() {
        let (mut engine, _, scheduler) = engine(
            r#"
profiles:
  - name: updater
    processes: [updater]
    cpuPriority: belowNormal
    if:
      - condition: running
        forProcesses: [game]
        then:
          suspensionDelay: 100
"#,
        );

        let report = engine.tick(snapshot(&[(7, "updater.exe"), (8, "game.exe")]));
        assert_eq!(
            report.actions_for(7),
            vec![
                Action::SetCpuPriority(CpuPriority::BelowNormal),
                Action::Suspend(Duration::from_millis(100)),
            ]
        );
        assert!(engine.state().temp_suspended_pids.contains(&7));
        assert_eq!(
            scheduler.take(),
            vec![DelayedAction {
                pid: 7,
                kind: DelayedKind::Suspend,
                delay: Duration::from_millis(100),
            }]
        );

        let report = engine.tick(snapshot(&[(7, "updater.exe")]));
        assert_eq!(
            report.actions_for(7),
            vec![
                Action::SetCpuPriority(CpuPriority::BelowNormal),
                Action::Resume(Duration::from_millis(AUTO_RESUME_DELAY_MS)),
            ]
        );
        assert!(engine.state().temp_suspended_pids.is_empty());
        assert_eq!(scheduler.take()[0].kind, DelayedKind::Resume);

        let report = engine.tick(snapshot(&[(7, "updater.exe")]));
        assert_eq!(report.actions_for(7), vec![Action::SetCpuPriority(CpuPriority::BelowNormal)]);
        assert!(scheduler.take().is_empty());
    }

    #[test]
    fn test_suspension_survives_later_inactive_condition() {
        let (mut engine, _, scheduler) = engine(
            r#"
profiles:
  - name: updater
    processes: [updater]
    cpuPriority: belowNormal
    if:
      - condition: running
        forProcesses: [game]
        then:
          suspensionDelay: 100
      - condition: running
        forProcesses: [never]
        then:
          cpuPriority: idle
"#,
        );

        let report = engine.tick(snapshot(&[(7, "updater.exe"), (8, "game.exe")]));
        assert_eq!(
            report.actions_for(7),
            vec![
                Action::SetCpuPriority(CpuPriority::BelowNormal),
                Action::Suspend(Duration::from_millis(100)),
            ]
        );
        assert!(engine.state().temp_suspended_pids.contains(&7));

        // Still suspending on the next tick
        engine.tick(snapshot(&[(7, "updater.exe"), (8, "game.exe")]));
        assert!(engine.state().temp_suspended_pids.contains(&7));
        scheduler.take();

        let report = engine.tick(snapshot(&[(7, "updater.exe")]));
        assert_eq!(
            report.actions_for(7),
            vec![
                Action::SetCpuPriority(CpuPriority::BelowNormal),
                Action::Resume(Duration::from_millis(AUTO_RESUME_DELAY_MS)),
            ]
        );
        assert!(engine.state().temp_suspended_pids.is_empty());
        assert_eq!(
            scheduler.take(),
            vec![DelayedAction {
                pid: 7,
                kind: DelayedKind::Resume,
                delay: Duration::from_millis(AUTO_RESUME_DELAY_MS),
            }]
        );
    }

    #[test]
    fn test_disable_condition_resumes_suspended_process() {
        let (mut engine, control, scheduler) = engine(
            r#"
profiles:
  - name: updater
    processes: [updater]
    cpuPriority: belowNormal
    if:
      - condition: running
        forProcesses: [game]
        then:
          suspensionDelay: 100
      - condition: active
        then: disable
"#,
        );

        engine.tick(snapshot(&[(7, "updater.exe"), (8, "game.exe")]));
        assert!(engine.state().temp_suspended_pids.contains(&7));
        scheduler.take();

        control.focus(7, false);
        let report = engine.tick(snapshot(&[(7, "updater.exe"), (8, "game.exe")]));

        assert_eq!(
            report.actions_for(7),
            vec![Action::Resume(Duration::from_millis(AUTO_RESUME_DELAY_MS))]
        );
        assert!(engine.state().temp_suspended_pids.is_empty());
        assert_eq!(scheduler.take()[0].kind, DelayedKind::Resume);
        assert!(report.digest.entries[0].disabled);

        let report = engine.tick(snapshot(&[(7, "updater.exe"), (8, "game.exe")]));
        assert!(report.actions_for(7).is_empty());
        assert!(scheduler.take().is_empty());
    }

    #[test]
    fn test_termination_short_circuits_other_settings() {
        let (mut engine, control, scheduler) =
            engine("profiles:\n  - name: kill\n    processes: [bloat]\n    terminationDelay: 500\n    cpuPriority: idle\n");

        let report = engine.tick(snapshot(&[(9, "bloat.exe")]));

        assert_eq!(report.actions_for(9), vec![Action::Terminate(Duration::from_millis(500))]);
        assert_eq!(control.process(9), FakeProcess::default());
        assert_eq!(scheduler.take()[0].kind, DelayedKind::Terminate);
    }

    #[test]
    fn test_failed_setter_aborts_and_resets_next_tick() {
        let (mut engine, control, _) = engine(SERVICES);
        control.failing.lock().unwrap().insert(10);

        let report = engine.tick(snapshot(&[(10, "svchost"), (11, "svchost")]));
        assert!(report.digest.failed_pids.contains(&10));
        assert_eq!(control.process(10), FakeProcess::default());
        assert_eq!(control.process(11).priority_class, 16384);

        let rendered = report.digest.render(false);
        assert!(rendered.contains("Affected:\n- svchost (11)"));
        assert!(rendered.contains("Failed:\n- svchost (10)"));

        control.failing.lock().unwrap().clear();
        let report = engine.tick(snapshot(&[(10, "svchost")]));
        assert!(report.digest.failed_pids.is_empty());
        assert_eq!(control.process(10).priority_class, 16384);
    }

    #[test]
    fn test_tick_is_idempotent() {
        let (mut engine, control, _) = engine(BROWSERS);
        control.focus(1, false);
        let processes = snapshot(&[(1, "firefox"), (2, "game"), (3, "other")]);

        let first = engine.tick(processes.clone());
        let second = engine.tick(processes);

        assert_eq!(first.actions, second.actions);
        assert_eq!(first.digest, second.digest);
    }

    const BOOST: &str = r#"
profiles:
  - name: rest
    type: fallback
    cpuPriority: belowNormal
  - name: boost
    type: fullscreen
    cpuPriority: high
"#;

    #[test]
    fn test_fallback_catches_unmatched_processes() {
        let (mut engine, _, _) = engine(BOOST);
        let report = engine.tick(snapshot(&[(30, "random.exe")]));
        assert_eq!(report.actions_for(30), vec![Action::SetCpuPriority(CpuPriority::BelowNormal)]);
        assert_eq!(report.digest.entries[0].profile, "rest");
    }

    #[test]
    fn test_fullscreen_boost_round_trip() {
        let (mut engine, control, _) = engine(BOOST);
        control.processes.lock().unwrap().insert(
            20,
            FakeProcess {
                priority_class: CpuPriority::AboveNormal.code(),
                ..Default::default()
            },
        );
        let processes = snapshot(&[(20, "game.exe"), (30, "other.exe")]);

        control.focus(20, true);
        let report = engine.tick(processes.clone());
        assert_eq!(report.actions_for(20), vec![Action::SetCpuPriority(CpuPriority::High)]);
        assert_eq!(engine.state().fullscreen_optimized_pid, Some(20));
        assert_eq!(
            engine.state().fullscreen_original_state,
            Some(FullscreenOriginalState {
                cpu_priority: Some(CpuPriority::AboveNormal),
                affinity: Some(SYSTEM_MASK),
            })
        );
        assert_eq!(control.process(20).priority_class, CpuPriority::High.code());
        assert_eq!(report.digest.fullscreen_pid, Some(20));

        // Still fullscreen: boost is kept without a new snapshot
        let report = engine.tick(processes.clone());
        assert_eq!(report.actions_for(20), vec![Action::SetCpuPriority(CpuPriority::High)]);
        assert_eq!(
            engine.state().fullscreen_original_state.map(|state| state.cpu_priority),
            Some(Some(CpuPriority::AboveNormal))
        );

        control.focus(30, false);
        let report = engine.tick(processes.clone());
        assert_eq!(
            report.actions_for(20),
            vec![
                Action::SetCpuPriority(CpuPriority::AboveNormal),
                Action::SetPagePriority(PagePriority::Normal),
                Action::SetIoPriority(IoPriority::Normal),
                Action::SetAffinity(SYSTEM_MASK),
            ]
        );
        assert_eq!(control.process(20).priority_class, CpuPriority::AboveNormal.code());
        assert_eq!(control.process(20).affinity, SYSTEM_MASK);
        assert_eq!(engine.state().fullscreen_optimized_pid, None);
        assert_eq!(engine.state().fullscreen_original_state, None);

        // Back under the fallback once restored
        let report = engine.tick(processes);
        assert_eq!(report.actions_for(20), vec![Action::SetCpuPriority(CpuPriority::BelowNormal)]);
    }

    #[test]
    fn test_fullscreen_false_positive_is_not_boosted() {
        let (mut engine, control, _) = engine(BOOST);
        control.focus(40, true);

        let report = engine.tick(snapshot(&[(40, "explorer.exe")]));

        assert_eq!(engine.state().fullscreen_optimized_pid, None);
        assert_eq!(report.actions_for(40), vec![Action::SetCpuPriority(CpuPriority::BelowNormal)]);
    }

    #[test]
    fn test_boost_cleared_when_process_exits() {
        let (mut engine, control, _) = engine(BOOST);
        control.focus(20, true);
        engine.tick(snapshot(&[(20, "game")]));
        assert_eq!(engine.state().fullscreen_optimized_pid, Some(20));

        control.focus(0, false);
        engine.tick(snapshot(&[(30, "other")]));
        assert_eq!(engine.state().fullscreen_optimized_pid, None);
        assert_eq!(engine.state().fullscreen_original_state, None);
    }

    #[test]
    fn test_fullscreen_override_condition() {
        let (mut engine, control, _) = engine(
            r#"
profiles:
  - name: browsers
    processes: [firefox]
    cpuPriority: normal
    if:
      - condition: fullscreenOverrideActive
        forProcesses: [game]
        then:
          cpuPriority: idle
"#,
        );

        control.focus(2, true);
        let report = engine.tick(snapshot(&[(1, "firefox"), (2, "game")]));
        assert_eq!(report.actions_for(1), vec![Action::SetCpuPriority(CpuPriority::Idle)]);
        assert_eq!(
            report.digest.entries[0].condition_reason.as_deref(),
            Some("Active process 'game' is fullscreen")
        );

        control.focus(3, true);
        let report = engine.tick(snapshot(&[(1, "firefox"), (3, "movie")]));
        assert_eq!(report.actions_for(1), vec![Action::SetCpuPriority(CpuPriority::Normal)]);
    }

    #[test]
    fn test_plan_prefers_suspension_over_resume() {
        let settings = ProfileSettings {
            io_priority: Some(IoPriority::Idle),
            suspension_delay: Some(Duration::from_millis(5)),
            resume_delay: Some(Duration::from_millis(1)),
            ..Default::default()
        };
        assert_eq!(
            Action::plan(&settings),
            vec![
                Action::SetIoPriority(IoPriority::Idle),
                Action::Suspend(Duration::from_millis(5)),
            ]
        );
    }
}
