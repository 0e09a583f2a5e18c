//! WinControl - Windows process policy daemon
//!
//! Polls the running processes and enforces CPU affinity, CPU priority,
//! memory page priority and I/O priority rules from a YAML configuration,
//! using raw Win32 and NT API calls via the `windows` crate.
//!
//! Usage:
//! - wincontrol: Run with `<config dir>\WinControl\config.yaml`
//! - wincontrol --check: Validate the configuration and exit
//! - wincontrol --once: Run a single enforcement pass
//! - wincontrol --console: Mirror the session log to the console

mod app;
mod config;
mod constants;
mod logging;
mod policy;
#[cfg(windows)]
mod system;
mod ui;

use anyhow::Result;
use clap::Parser;

use app::Args;

#[cfg(windows)]
fn main() -> Result<()> {
    use std::sync::Arc;

    use anyhow::{bail, Context};
    use tracing::error;

    use app::{Daemon, Step, TimerRuntime};
    use system::WinPlatform;

    let args = Args::parse();
    let config_path = args.config_path();

    config::ensure_default(&config_path)?;

    let log_handle = logging::init(&config::log_dir(), args.console, args.log_level.as_deref())?;

    let topology = system::detect_topology().context("cannot determine processor topology")?;
    let elevated = system::is_elevated();

    let platform = Arc::new(WinPlatform::new());
    let timers = Arc::new(TimerRuntime::start(platform.clone()).context("cannot start timer runtime")?);

    let mut daemon = Daemon::new(config_path, topology, platform.clone(), platform, timers)
        .with_logging(log_handle, args.console)
        .with_elevation(elevated);

    daemon.prepare_process();

    if let Err(e) = daemon.load() {
        if args.check || args.once {
            bail!(e);
        }
        error!("{}", e);
    }

    if let Some(summary) = daemon.summary() {
        ui::print_banner(summary, elevated)?;
    }

    if args.check {
        return Ok(());
    }

    if args.once {
        return match daemon.step()? {
            Step::Enforced(report) => {
                println!("Enforcement pass done: {} actions", report.actions.len());
                Ok(())
            }
            _ => bail!("configuration changed during startup"),
        };
    }

    daemon.run()
}

#[cfg(not(windows))]
fn main() -> Result<()> {
    let args = Args::parse();
    anyhow::bail!(
        "{} {} only runs on Windows (configuration: {})",
        constants::APP_NAME,
        constants::APP_VERSION,
        args.config_path().display()
    )
}
