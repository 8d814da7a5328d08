use crate::action::{Action, CommandSpec};
use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::error::Result;
use crate::paths;

use super::{Phase, PhasePlan};

/// Install source checkouts in development mode, pip packages, then the project.
/// Runs on every branch.
pub fn plan(config: &PipelineConfig, ctx: &RunContext) -> Result<PhasePlan> {
    let deps = &config.dependencies;
    let layout = &ctx.layout;
    let mut plan = PhasePlan::new(Phase::Install);

    for source in &deps.sources {
        let checkout = layout.checkouts_dir.join(&source.name);

        if checkout.join(".git").exists() {
            plan.push(Action::command(
                CommandSpec::program(format!("update {}", source.name), "git", &["pull"])
                    .in_dir(&checkout),
            ));
        } else {
            let target = paths::display(&checkout);
            plan.push(Action::command(
                CommandSpec::program(
                    format!("clone {}", source.name),
                    "git",
                    &["clone", source.url.as_str(), target.as_str()],
                )
                .in_dir(&layout.checkouts_dir),
            ));
        }

        if let Some(requirements) = &source.requirements {
            plan.push(Action::command(
                CommandSpec::program(
                    format!("{} requirements", source.name),
                    "pip",
                    &["install", "-r", requirements.as_str()],
                )
                .in_dir(&checkout),
            ));
        }

        plan.push(Action::command(
            CommandSpec::program(
                format!("develop {}", source.name),
                "python",
                &["setup.py", "develop"],
            )
            .in_dir(&checkout),
        ));
    }

    if !deps.pip_packages.is_empty() {
        let mut args: Vec<&str> = vec!["install"];
        args.extend(deps.pip_packages.iter().map(String::as_str));
        plan.push(Action::command(CommandSpec::program(
            "pip packages",
            "pip",
            &args,
        )));
    }

    if deps.develop_project {
        plan.push(Action::command(
            CommandSpec::program("develop project", "python", &["setup.py", "develop"])
                .in_dir(&layout.workdir),
        ));
    }

    Ok(plan)
}
