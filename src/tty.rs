//! Terminal detection for CLI output.

use std::io::{self, IsTerminal};

pub fn is_stderr_tty() -> bool {
    io::stderr().is_terminal()
}

/// Print status message to stderr if running in a terminal.
pub fn status(message: &str) {
    if is_stderr_tty() {
        eprintln!("{}", message);
    }
}

// log_status! macro is defined in lib.rs (#[macro_export]) and available crate-wide.
