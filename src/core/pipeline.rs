//! Step ordering and run bookkeeping.
//!
//! Steps declare `needs` edges and are run one at a time in dependency
//! order. A step whose dependency failed or was skipped is itself skipped;
//! a step that was not selected for this run still satisfies its dependents.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::error::{Error, Hint, Result};
use crate::phases::Phase;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStep {
    pub id: String,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
}

impl PipelineStep {
    pub fn for_phase(phase: Phase) -> Self {
        Self {
            id: phase.as_str().to_string(),
            phase,
            label: Some(phase.label().to_string()),
            needs: phase
                .needs()
                .map(|p| vec![p.as_str().to_string()])
                .unwrap_or_default(),
        }
    }
}

/// The four phases with their dependency edges.
pub fn default_steps() -> Vec<PipelineStep> {
    Phase::ALL.iter().copied().map(PipelineStep::for_phase).collect()
}

pub trait PipelineStepExecutor {
    fn execute_step(&self, step: &PipelineStep) -> Result<PipelineStepResult>;
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunPlan {
    pub steps: Vec<PipelineStep>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStepResult {
    pub id: String,
    pub phase: Phase,
    pub status: PipelineRunStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl PipelineStepResult {
    pub fn new(step: &PipelineStep, status: PipelineRunStatus) -> Self {
        Self {
            id: step.id.clone(),
            phase: step.phase,
            status,
            warnings: Vec::new(),
            hints: Vec::new(),
            data: None,
            error: None,
            error_code: None,
        }
    }

    pub fn failed(step: &PipelineStep, err: &Error) -> Self {
        Self {
            hints: err.hints.clone(),
            error: Some(err.message.clone()),
            error_code: Some(err.code.as_str().to_string()),
            ..Self::new(step, PipelineRunStatus::Failed)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunResult {
    pub steps: Vec<PipelineStepResult>,
    pub status: PipelineRunStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PipelineRunSummary>,
}

impl PipelineRunResult {
    pub fn step(&self, id: &str) -> Option<&PipelineStepResult> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self.status,
            PipelineRunStatus::Failed | PipelineRunStatus::PartialSuccess
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunSummary {
    pub total_steps: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_selected: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineRunStatus {
    Success,
    PartialSuccess,
    Failed,
    /// Not run because a dependency did not succeed.
    Skipped,
    /// Excluded by its branch condition; counts as satisfied for dependents.
    NotSelected,
}

impl PipelineRunStatus {
    fn satisfies_dependents(self) -> bool {
        matches!(
            self,
            PipelineRunStatus::Success
                | PipelineRunStatus::PartialSuccess
                | PipelineRunStatus::NotSelected
        )
    }
}

pub fn plan_run(steps: &[PipelineStep], field: &str) -> Result<PipelineRunPlan> {
    let (ordered, warnings) = order_steps(steps, field)?;
    Ok(PipelineRunPlan {
        steps: ordered,
        warnings,
    })
}

fn order_steps(steps: &[PipelineStep], field: &str) -> Result<(Vec<PipelineStep>, Vec<String>)> {
    if steps.len() <= 1 {
        return Ok((steps.to_vec(), Vec::new()));
    }

    let mut id_index = HashMap::new();
    for (idx, step) in steps.iter().enumerate() {
        if id_index.contains_key(&step.id) {
            return Err(Error::validation_invalid_argument(
                field,
                format!("Duplicate step id '{}'", step.id),
                None,
                None,
            ));
        }
        id_index.insert(step.id.clone(), idx);
    }

    let mut indegree = vec![0usize; steps.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];

    for (idx, step) in steps.iter().enumerate() {
        for need in &step.needs {
            let Some(&parent_idx) = id_index.get(need) else {
                return Err(Error::validation_invalid_argument(
                    field,
                    format!("Step '{}' depends on unknown step '{}'", step.id, need),
                    None,
                    None,
                ));
            };
            indegree[idx] += 1;
            dependents[parent_idx].push(idx);
        }
    }

    let mut queue: VecDeque<usize> = indegree
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(idx, _)| idx)
        .collect();

    let mut ordered = Vec::with_capacity(steps.len());
    while let Some(idx) = queue.pop_front() {
        ordered.push(steps[idx].clone());
        for &child in &dependents[idx] {
            indegree[child] -= 1;
            if indegree[child] == 0 {
                queue.push_back(child);
            }
        }
    }

    if ordered.len() != steps.len() {
        let pending: Vec<String> = steps
            .iter()
            .enumerate()
            .filter(|(idx, _)| indegree[*idx] > 0)
            .map(|(_, step)| step.id.clone())
            .collect();
        return Err(Error::validation_invalid_argument(
            field,
            "Steps contain a cycle".to_string(),
            None,
            Some(pending),
        ));
    }

    let reordered = ordered.iter().zip(steps).any(|(a, b)| a.id != b.id);
    let mut warnings = Vec::new();
    if reordered {
        warnings.push("Steps reordered based on dependencies".to_string());
    }

    Ok((ordered, warnings))
}

/// Run `steps` sequentially in dependency order.
///
/// A step error is recorded as a failed result rather than returned;
/// only an invalid step graph makes this function fail.
pub fn run(
    steps: &[PipelineStep],
    executor: &dyn PipelineStepExecutor,
    field: &str,
) -> Result<PipelineRunResult> {
    let plan = plan_run(steps, field)?;
    let mut results: Vec<PipelineStepResult> = Vec::with_capacity(plan.steps.len());
    let mut status_map: HashMap<String, PipelineRunStatus> = HashMap::new();

    for step in &plan.steps {
        let blocker = step.needs.iter().find(|need| {
            status_map
                .get(need.as_str())
                .is_some_and(|status| !status.satisfies_dependents())
        });

        let result = match blocker {
            Some(dep) => {
                tracing::debug!(step = %step.id, dependency = %dep, "skipping step");
                let mut skipped = PipelineStepResult::new(step, PipelineRunStatus::Skipped);
                skipped
                    .warnings
                    .push(format!("Skipped because '{}' did not succeed", dep));
                skipped
            }
            None => execute_single_step(step, executor),
        };

        status_map.insert(result.id.clone(), result.status);
        results.push(result);
    }

    let status = derive_overall_status(&results);
    let summary = build_summary(&results, status);

    Ok(PipelineRunResult {
        steps: results,
        status,
        warnings: plan.warnings,
        summary: Some(summary),
    })
}

fn execute_single_step(step: &PipelineStep, executor: &dyn PipelineStepExecutor) -> PipelineStepResult {
    match executor.execute_step(step) {
        Ok(mut result) => {
            if result.status == PipelineRunStatus::Success {
                result.error = None;
                result.error_code = None;
            }
            result
        }
        Err(err) => {
            tracing::warn!(step = %step.id, code = err.code.as_str(), "step failed: {}", err.message);
            PipelineStepResult::failed(step, &err)
        }
    }
}

fn derive_overall_status(results: &[PipelineStepResult]) -> PipelineRunStatus {
    let has = |status: PipelineRunStatus| results.iter().any(|r| r.status == status);

    if has(PipelineRunStatus::Failed) {
        if has(PipelineRunStatus::Success) {
            return PipelineRunStatus::PartialSuccess;
        }
        return PipelineRunStatus::Failed;
    }
    if !results.is_empty() && results.iter().all(|r| r.status == PipelineRunStatus::NotSelected) {
        return PipelineRunStatus::NotSelected;
    }
    PipelineRunStatus::Success
}

fn build_summary(results: &[PipelineStepResult], status: PipelineRunStatus) -> PipelineRunSummary {
    let count = |status: PipelineRunStatus| results.iter().filter(|r| r.status == status).count();

    let next_actions = match status {
        PipelineRunStatus::PartialSuccess | PipelineRunStatus::Failed => {
            vec![
                "Fix the issue and re-run (completed phases are skipped or repeated safely)"
                    .to_string(),
            ]
        }
        _ => Vec::new(),
    };

    PipelineRunSummary {
        total_steps: results.len(),
        succeeded: count(PipelineRunStatus::Success),
        failed: count(PipelineRunStatus::Failed),
        skipped: count(PipelineRunStatus::Skipped),
        not_selected: count(PipelineRunStatus::NotSelected),
        next_actions,
    }
}
