use clap::Args;
use serde::Serialize;

use devdocs::phases::PhasePlan;
use devdocs::runner;

use super::{CmdResult, PipelineArgs};

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Serialize)]
pub struct PlanOutput {
    pub command: &'static str,
    pub branch: String,
    pub primary: bool,
    pub config_path: String,
    pub config_exists: bool,
    pub plans: Vec<PhasePlan>,
}

pub fn run(args: PlanArgs) -> CmdResult<PlanOutput> {
    let (loaded, ctx) = super::load_context(&args.pipeline)?;
    let plans = runner::plan_all(&loaded.config, &ctx)?;

    Ok((
        PlanOutput {
            command: "plan",
            branch: ctx.branch.clone(),
            primary: ctx.is_primary(),
            config_path: loaded.config_path.to_string_lossy().to_string(),
            config_exists: loaded.config_path.exists(),
            plans,
        },
        0,
    ))
}
