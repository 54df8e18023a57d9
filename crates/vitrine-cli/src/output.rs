//! Output format selection and shared printing helpers.

use anyhow::Result;
use clap::ValueEnum;
use is_terminal::IsTerminal;
use serde::Serialize;

/// Output format for CLI results.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted text (default for terminals).
    #[default]
    Text,
    /// JSON for machine consumption (default for pipes).
    Json,
}

impl OutputFormat {
    /// Check if this format is machine-readable.
    #[must_use]
    pub const fn is_machine_readable(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Returns `Text` for interactive terminals, `Json` for pipes and redirects.
    #[must_use]
    pub fn detect() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Text
        } else {
            Self::Json
        }
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
