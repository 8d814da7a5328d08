use crate::action::{Action, CommandSpec};
use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::error::Result;
use crate::paths;

use super::{Phase, PhasePlan};

/// Publish the built HTML into the output repository. Primary branch only.
pub fn plan(config: &PipelineConfig, ctx: &RunContext) -> Result<PhasePlan> {
    if !ctx.is_primary() {
        return Ok(PhasePlan::not_selected(
            Phase::Deploy,
            format!(
                "skipped: branch '{}' is not '{}'",
                ctx.branch, ctx.primary_branch
            ),
        ));
    }

    let deploy = &config.deploy;
    let layout = &ctx.layout;
    let checkout = &layout.deploy_checkout;
    let mut plan = PhasePlan::new(Phase::Deploy);

    if !checkout.exists() {
        let target = paths::display(checkout);
        plan.push(Action::command(CommandSpec::program(
            "clone output repository",
            "git",
            &["clone", deploy.repo_url.as_str(), target.as_str()],
        )));
    }

    plan.push(Action::command(CommandSpec::program(
        "git user.email",
        "git",
        &["config", "--global", "user.email", deploy.user_email.as_str()],
    )));
    plan.push(Action::command(CommandSpec::program(
        "git user.name",
        "git",
        &["config", "--global", "user.name", deploy.user_name.as_str()],
    )));

    let git = |label: &str, args: &[&str]| {
        Action::command(CommandSpec::program(label, "git", args).in_dir(checkout))
    };

    plan.push(git("checkout", &["checkout", deploy.branch.as_str()]));
    plan.push(git(
        "pull",
        &["pull", deploy.remote.as_str(), deploy.branch.as_str()],
    ));
    plan.push(Action::CopyTree {
        label: "copy build output".to_string(),
        source: layout.deploy_source.clone(),
        destination: layout.deploy_target.clone(),
    });
    plan.push(git("stage", &["add", "-A"]));
    plan.push(git(
        "commit",
        &["commit", "-m", deploy.commit_message.as_str()],
    ));
    plan.push(git(
        "push",
        &["push", deploy.remote.as_str(), deploy.branch.as_str()],
    ));

    Ok(plan)
}
