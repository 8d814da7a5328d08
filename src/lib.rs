/// Macro for prefixed status logging to stderr (only when stderr is a terminal).
///
/// Usage:
/// ```ignore
/// log_status!("build", "({}/{}) {}", idx, total, label);
/// log_status!(phase.as_str(), "cache present, nothing to do");
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        if ::std::io::IsTerminal::is_terminal(&::std::io::stderr()) {
            eprintln!("[{}] {}", $prefix, format_args!($($arg)*));
        }
    };
}

pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Users can write `devdocs::config` instead of `devdocs::core::config`
pub use core::*;
pub use utils::*;
