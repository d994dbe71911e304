//! Operator-facing output
//!
//! Progress is logged through `tracing`; the lines the operator has to act
//! on (restore command, boot script, fatal errors) are printed here with a
//! fixed prefix.

use std::sync::atomic::{AtomicBool, Ordering};

/// Status message prefixes
pub mod status {
    pub const INFO: &str = "[*] Info:";
    pub const WARNING: &str = "[!] Warning:";
    pub const ERROR: &str = "[!] Error:";
}

static QUIET: AtomicBool = AtomicBool::new(false);

/// Output settings derived from global flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub quiet: bool,
    pub verbose: u8,
}

impl OutputConfig {
    pub fn new(quiet: bool, verbose: u8) -> Self {
        Self { quiet, verbose }
    }

    /// Make these settings visible to the print helpers
    pub fn apply_global(self) {
        QUIET.store(self.quiet, Ordering::Relaxed);
    }

    /// Default `tracing` filter directive for these flags
    pub fn log_directive(self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Whether `--quiet` is active
pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Print an informational line; suppressed by `--quiet`
pub fn print_info(message: &str) {
    if !is_quiet() {
        println!("{} {message}", status::INFO);
    }
}

/// Print a warning to stderr
pub fn print_warning(message: &str) {
    eprintln!("{} {message}", status::WARNING);
}

/// Print an error to stderr
pub fn print_error(message: &str) {
    eprintln!("{} {message}", status::ERROR);
}

/// Render an error and its causes on one line
///
/// A cause already spelled out by its parent's message is not repeated.
pub fn format_error_chain(error: &anyhow::Error) -> String {
    let mut rendered = String::new();
    for cause in error.chain() {
        let text = cause.to_string();
        if rendered.ends_with(&text) {
            continue;
        }
        if !rendered.is_empty() {
            rendered.push_str(": ");
        }
        rendered.push_str(&text);
    }
    rendered
}

/// Print a fatal error
pub fn display_error(error: &anyhow::Error) {
    print_error(&format_error_chain(error));
}
