//! The four pipeline phases.
//!
//! Each phase compiles a [`PhasePlan`] from the config, the run context and
//! the current filesystem state. Planning has no side effects.

pub mod build;
pub mod deploy;
pub mod install;
pub mod setup;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::action::Action;
use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Install,
    Build,
    Deploy,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Setup, Phase::Install, Phase::Build, Phase::Deploy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Install => "install",
            Phase::Build => "build",
            Phase::Deploy => "deploy",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Setup => "Environment setup",
            Phase::Install => "Dependency installation",
            Phase::Build => "Build & test",
            Phase::Deploy => "Deployment",
        }
    }

    /// The phase this one depends on.
    pub fn needs(&self) -> Option<Phase> {
        match self {
            Phase::Setup => None,
            Phase::Install => Some(Phase::Setup),
            Phase::Build => Some(Phase::Install),
            Phase::Deploy => Some(Phase::Build),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Phase::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                Error::validation_invalid_argument(
                    "phase",
                    format!("Unknown phase '{}'", s),
                    Some(s.to_string()),
                    Some(Phase::ALL.iter().map(|p| p.as_str().to_string()).collect()),
                )
            })
    }
}

/// Ordered actions for one phase plus the reasons anything was left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhasePlan {
    pub phase: Phase,
    /// False when the phase's condition excludes it entirely (e.g. deploy off the primary branch).
    pub selected: bool,
    pub actions: Vec<Action>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl PhasePlan {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            selected: true,
            actions: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn not_selected(phase: Phase, reason: impl Into<String>) -> Self {
        Self {
            phase,
            selected: false,
            actions: Vec::new(),
            notes: vec![reason.into()],
        }
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn labels(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.label()).collect()
    }

    /// Command lines of all `Command` actions, in order.
    pub fn commands(&self) -> Vec<&str> {
        self.actions.iter().filter_map(|a| a.command_line()).collect()
    }
}

pub fn plan(phase: Phase, config: &PipelineConfig, ctx: &RunContext) -> Result<PhasePlan> {
    match phase {
        Phase::Setup => setup::plan(config, ctx),
        Phase::Install => install::plan(config, ctx),
        Phase::Build => build::plan(config, ctx),
        Phase::Deploy => deploy::plan(config, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_chain_in_order() {
        assert_eq!(Phase::Setup.needs(), None);
        assert_eq!(Phase::Install.needs(), Some(Phase::Setup));
        assert_eq!(Phase::Build.needs(), Some(Phase::Install));
        assert_eq!(Phase::Deploy.needs(), Some(Phase::Build));
    }

    #[test]
    fn parse_phase_names() {
        assert_eq!("deploy".parse::<Phase>().unwrap(), Phase::Deploy);
        let err = "publish".parse::<Phase>().unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
        assert_eq!(err.details["tried"][0], "setup");
    }
}
