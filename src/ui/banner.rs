//! Startup banner printed to the console

use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
};

use crate::app::ConfigSummary;
use crate::constants::{APP_VERSION, BANNER_WIDTH, DISPLAY_NAME};

use super::utils::truncate_string;

/// Width of the label column
const LABEL_WIDTH: usize = 28;

/// Writes the title bar and the configuration summary.
///
/// `✓` / `✗` values are coloured green / red, everything else is plain.
pub fn render_banner<W: Write>(out: &mut W, summary: &ConfigSummary, elevated: bool) -> io::Result<()> {
    let indicator = if elevated {
        ("[Administrator]", Color::Green)
    } else {
        ("[User]", Color::Yellow)
    };

    let title = format!(" {} {}", DISPLAY_NAME, APP_VERSION);
    let spacing = BANNER_WIDTH.saturating_sub(title.len() + indicator.0.len() + 1);

    queue!(
        out,
        SetBackgroundColor(Color::DarkBlue),
        SetForegroundColor(Color::White),
        Print(title),
        Print(format!("{:spacing$}", "", spacing = spacing)),
        SetForegroundColor(indicator.1),
        Print(indicator.0),
        Print(" "),
        ResetColor,
        Print("\r\n")
    )?;

    let value_width = BANNER_WIDTH.saturating_sub(LABEL_WIDTH);

    for (label, value) in summary.entries() {
        let color = match value.as_str() {
            "✓" => Color::Green,
            "✗" => Color::Red,
            _ => Color::White,
        };

        queue!(
            out,
            SetForegroundColor(Color::Cyan),
            Print(format!(" {:<width$}", label, width = LABEL_WIDTH - 1)),
            SetForegroundColor(color),
            Print(truncate_string(&value, value_width)),
            ResetColor,
            Print("\r\n")
        )?;
    }

    out.flush()
}

/// Prints the banner to stdout.
pub fn print_banner(summary: &ConfigSummary, elevated: bool) -> io::Result<()> {
    render_banner(&mut io::stdout(), summary, elevated)
}
