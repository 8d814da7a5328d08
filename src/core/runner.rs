//! Phase execution and full pipeline runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::artifacts::{self, PathReport};
use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::executor::{ActionExecutor, ActionResult};
use crate::phases::{self, Phase, PhasePlan};
use crate::pipeline::{
    self, PipelineRunResult, PipelineRunStatus, PipelineStep, PipelineStepExecutor,
    PipelineStepResult,
};

/// What happened inside one phase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReport {
    pub phase: Phase,
    pub selected: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    pub planned: usize,
    pub actions: Vec<ActionResult>,
}

impl PhaseReport {
    fn from_plan(plan: &PhasePlan) -> Self {
        Self {
            phase: plan.phase,
            selected: plan.selected,
            notes: plan.notes.clone(),
            planned: plan.actions.len(),
            actions: Vec::with_capacity(plan.actions.len()),
        }
    }
}

/// Execute a plan action by action. Stops at the first error and returns
/// it alongside the results gathered so far.
pub fn execute_plan(
    plan: &PhasePlan,
    ctx: &RunContext,
    executor: &dyn ActionExecutor,
) -> (PhaseReport, Option<Error>) {
    let mut report = PhaseReport::from_plan(plan);
    let total = plan.actions.len();

    for (idx, action) in plan.actions.iter().enumerate() {
        log_status!(plan.phase.as_str(), "({}/{}) {}", idx + 1, total, action.label());
        tracing::info!(
            phase = %plan.phase,
            label = action.label(),
            kind = action.kind(),
            timeout_secs = ?action.timeout_secs(),
            "action"
        );

        match executor.execute(action, ctx.env()) {
            Ok(result) => {
                for warning in &result.warnings {
                    log_status!(plan.phase.as_str(), "warning: {}", warning);
                }
                report.actions.push(result);
            }
            Err(err) => {
                log_status!(plan.phase.as_str(), "{} failed: {}", action.label(), err.message);
                return (report, Some(err));
            }
        }
    }

    (report, None)
}

/// Runs pipeline steps by planning and executing their phase.
pub struct PhaseRunner<'a> {
    pub config: &'a PipelineConfig,
    pub ctx: &'a RunContext,
    pub executor: &'a dyn ActionExecutor,
}

impl PipelineStepExecutor for PhaseRunner<'_> {
    fn execute_step(&self, step: &PipelineStep) -> Result<PipelineStepResult> {
        let plan = phases::plan(step.phase, self.config, self.ctx)?;

        if !plan.selected {
            log_status!(step.phase.as_str(), "{}", plan.notes.join("; "));
            let mut result = PipelineStepResult::new(step, PipelineRunStatus::NotSelected);
            result.warnings = plan.notes.clone();
            return Ok(result);
        }

        if plan.actions.is_empty() {
            log_status!(step.phase.as_str(), "{}", plan.notes.join("; "));
        }

        let (report, error) = execute_plan(&plan, self.ctx, self.executor);
        let warnings: Vec<String> = report
            .actions
            .iter()
            .flat_map(|a| a.warnings.iter().cloned())
            .collect();
        let data = serde_json::to_value(&report)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize phase report".to_string())))?;

        let mut result = match error {
            Some(err) => PipelineStepResult::failed(step, &err),
            None => PipelineStepResult::new(step, PipelineRunStatus::Success),
        };
        result.warnings = warnings;
        result.data = Some(data);
        Ok(result)
    }
}

/// Outcome of `devdocs run` / `devdocs phase`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub branch: String,
    pub primary: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub pipeline: PipelineRunResult,
    pub artifacts: Vec<PathReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        !self.pipeline.is_failure()
    }
}

/// Steps for a run: all four phases, or one phase on its own.
pub fn steps_for(only: Option<Phase>) -> Vec<PipelineStep> {
    match only {
        Some(phase) => {
            let mut step = PipelineStep::for_phase(phase);
            step.needs.clear();
            vec![step]
        }
        None => pipeline::default_steps(),
    }
}

pub fn run_pipeline(
    config: &PipelineConfig,
    ctx: &RunContext,
    executor: &dyn ActionExecutor,
    only: Option<Phase>,
) -> Result<RunReport> {
    tracing::info!(
        run_id = %ctx.run_id,
        branch = %ctx.branch,
        primary = ctx.is_primary(),
        "pipeline start"
    );

    let runner = PhaseRunner {
        config,
        ctx,
        executor,
    };
    let result = pipeline::run(&steps_for(only), &runner, "steps")?;
    let artifacts = artifacts::artifact_report(config, &ctx.layout.workdir)?;
    let finished_at = Utc::now();

    tracing::info!(run_id = %ctx.run_id, status = ?result.status, "pipeline finished");

    Ok(RunReport {
        run_id: ctx.run_id,
        branch: ctx.branch.clone(),
        primary: ctx.is_primary(),
        started_at: ctx.started_at,
        finished_at,
        duration_ms: (finished_at - ctx.started_at).num_milliseconds(),
        pipeline: result,
        artifacts,
    })
}

/// Plans for every phase, in pipeline order, without executing anything.
pub fn plan_all(config: &PipelineConfig, ctx: &RunContext) -> Result<Vec<PhasePlan>> {
    let order = pipeline::plan_run(&pipeline::default_steps(), "steps")?;
    order
        .steps
        .iter()
        .map(|step| phases::plan(step.phase, config, ctx))
        .collect()
}
