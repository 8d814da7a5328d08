//! Generic utility primitives with zero domain knowledge.
//!
//! - `artifact` - Artifact path expansion with glob support
//! - `command` - Shell command construction and output capture
//! - `io` - File I/O with consistent error handling
//! - `shell` - Shell escaping and quoting
//! - `template` - String template rendering

pub mod artifact;
pub mod command;
pub mod io;
pub mod shell;
pub mod template;
