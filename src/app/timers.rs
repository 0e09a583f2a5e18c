//! Delayed one-shot process actions
//!
//! Termination, suspension and resumption delays each become a task on a
//! small tokio runtime: sleep, then run the native call on the blocking pool.
//! Scheduled actions are never cancelled: if the pid exits in the meantime
//! the native call fails and the failure is logged.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use crate::policy::ProcessControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayedKind {
    Terminate,
    Suspend,
    Resume,
}

impl fmt::Display for DelayedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DelayedKind::Terminate => "termination",
            DelayedKind::Suspend => "suspension",
            DelayedKind::Resume => "resumption",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayedAction {
    pub pid: u32,
    pub kind: DelayedKind,
    pub delay: Duration,
}

/// Accepts delayed actions from the policy engine.
pub trait ActionScheduler: Send + Sync {
    fn schedule(&self, action: DelayedAction);
}

/// Fires delayed actions against a [`ProcessControl`] from a private runtime.
///
/// Dropping it shuts the runtime down; actions still sleeping are dropped.
pub struct TimerRuntime {
    runtime: Runtime,
    control: Arc<dyn ProcessControl>,
}

impl TimerRuntime {
    pub fn start(control: Arc<dyn ProcessControl>) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(4)
            .thread_name("wincontrol-timers")
            .enable_time()
            .build()?;

        Ok(Self { runtime, control })
    }
}

impl ActionScheduler for TimerRuntime {
    fn schedule(&self, action: DelayedAction) {
        let control = Arc::clone(&self.control);

        self.runtime.spawn(async move {
            tokio::time::sleep(action.delay).await;

            let fired = tokio::task::spawn_blocking(move || fire(control.as_ref(), action)).await;
            if let Err(e) = fired {
                warn!("Delayed {} of pid {} did not run: {}", action.kind, action.pid, e);
            }
        });
    }
}

fn fire(control: &dyn ProcessControl, action: DelayedAction) {
    let DelayedAction { pid, kind, .. } = action;

    let succeeded = match kind {
        DelayedKind::Terminate => control.terminate_process(pid),
        DelayedKind::Suspend => control.suspend_process(pid),
        DelayedKind::Resume => control.resume_process(pid),
    };

    if succeeded {
        debug!("Delayed {} of pid {} done", kind, pid);
    } else {
        warn!("Delayed {} of pid {} failed", kind, pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ActiveWindow, Privilege};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Instant;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(DelayedKind, u32)>>,
    }

    impl Recorder {
        fn record(&self, kind: DelayedKind, pid: u32) -> bool {
            self.calls.lock().unwrap().push((kind, pid));
            pid != 0
        }
    }

    impl ProcessControl for Recorder {
        fn get_priority_class(&self, _: u32) -> Option<u32> { None }
        fn set_priority_class(&self, _: u32, _: u32) -> bool { true }
        fn get_processor_affinity(&self, _: u32) -> Option<(usize, usize)> { None }
        fn set_processor_affinity(&self, _: u32, _: usize) -> bool { true }
        fn get_page_priority(&self, _: u32) -> Option<u32> { None }
        fn set_page_priority(&self, _: u32, _: u32) -> bool { true }
        fn get_io_priority(&self, _: u32) -> Option<u32> { None }
        fn set_io_priority(&self, _: u32, _: u32) -> bool { true }
        fn terminate_process(&self, pid: u32) -> bool { self.record(DelayedKind::Terminate, pid) }
        fn suspend_process(&self, pid: u32) -> bool { self.record(DelayedKind::Suspend, pid) }
        fn resume_process(&self, pid: u32) -> bool { self.record(DelayedKind::Resume, pid) }
        fn adjust_privilege(&self, _: Privilege) -> bool { true }
        fn active_window(&self) -> ActiveWindow { ActiveWindow::default() }
    }

    fn wait_for_calls(recorder: &Recorder, count: usize) -> Vec<(DelayedKind, u32)> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let calls = recorder.calls.lock().unwrap().clone();
            if calls.len() >= count || Instant::now() > deadline {
                return calls;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn action(pid: u32, kind: DelayedKind, millis: u64) -> DelayedAction {
        DelayedAction {
            pid,
            kind,
            delay: Duration::from_millis(millis),
        }
    }

    #[test]
    fn test_actions_fire_in_deadline_order() {
        let recorder = Arc::new(Recorder::default());
        let timers = TimerRuntime::start(recorder.clone()).unwrap();

        timers.schedule(action(1, DelayedKind::Terminate, 300));
        timers.schedule(action(2, DelayedKind::Suspend, 150));
        timers.schedule(action(3, DelayedKind::Resume, 1));

        let calls = wait_for_calls(&recorder, 3);
        assert_eq!(
            calls,
            vec![
                (DelayedKind::Resume, 3),
                (DelayedKind::Suspend, 2),
                (DelayedKind::Terminate, 1)
            ]
        );
    }

    #[test]
    fn test_failed_action_does_not_stop_runtime() {
        let recorder = Arc::new(Recorder::default());
        let timers = TimerRuntime::start(recorder.clone()).unwrap();

        timers.schedule(action(0, DelayedKind::Suspend, 0));
        assert_eq!(wait_for_calls(&recorder, 1).len(), 1);

        timers.schedule(action(7, DelayedKind::Resume, 5));
        let calls = wait_for_calls(&recorder, 2);
        assert_eq!(calls[1], (DelayedKind::Resume, 7));
    }

    #[test]
    fn test_drop_discards_pending_actions() {
        let recorder = Arc::new(Recorder::default());
        let timers = TimerRuntime::start(recorder.clone()).unwrap();
        timers.schedule(action(9, DelayedKind::Terminate, 3_600_000));
        drop(timers);
        assert!(recorder.calls.lock().unwrap().is_empty());
    }
}
