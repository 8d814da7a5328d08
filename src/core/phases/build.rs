use crate::action::{Action, CommandSpec, DisplaySpec};
use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::error::Result;
use crate::paths;
use crate::utils::template::{self, TemplateVars};

use super::{Phase, PhasePlan};

/// Display server, primary-only dataset fetches, and the documentation builds.
pub fn plan(config: &PipelineConfig, ctx: &RunContext) -> Result<PhasePlan> {
    let layout = &ctx.layout;
    let docs = &config.docs;
    let mut plan = PhasePlan::new(Phase::Build);

    if config.display.enabled {
        plan.push(Action::StartDisplay {
            label: format!("start display {}", config.display.id),
            spec: DisplaySpec {
                program: config.display.program.clone(),
                display_id: config.display.id.clone(),
                screen: config.display.screen.clone(),
                args: config.display.args.clone(),
                pidfile: layout.display_pidfile.clone(),
            },
        });
    } else {
        plan.note("display server disabled");
    }

    if ctx.is_primary() {
        plan.push(Action::CreateDir {
            label: "create data dir".to_string(),
            path: layout.data_dir.clone(),
        });

        let prefix = paths::display(&layout.prefix);
        let data_dir = paths::display(&layout.data_dir);
        let workdir = paths::display(&layout.workdir);
        let context_vars = [
            (TemplateVars::BRANCH, ctx.branch.as_str()),
            (TemplateVars::PREFIX, prefix.as_str()),
            (TemplateVars::ENV_NAME, config.setup.env_name.as_str()),
            (TemplateVars::DATA_DIR, data_dir.as_str()),
            (TemplateVars::WORKDIR, workdir.as_str()),
        ];

        for name in &config.datasets.names {
            let command = template::render(
                &config.datasets.fetch_template,
                &[(TemplateVars::DATASET, name.as_str())],
            );
            plan.push(Action::command(CommandSpec::new(
                format!("fetch {}", name),
                template::render(&command, &context_vars),
            )));
        }

        if let Some(diagnostics) = &config.datasets.diagnostics {
            plan.push(Action::command(CommandSpec::new(
                "sys_info",
                template::render(diagnostics, &context_vars),
            )));
        }

        plan.push(Action::command(
            CommandSpec::program(
                format!("make {}", docs.full_target),
                &docs.make,
                &[docs.full_target.as_str()],
            )
            .in_dir(&layout.workdir),
        ));

        plan.push(Action::command(
            CommandSpec::program(
                format!("make {}", docs.extended_target),
                &docs.make,
                &[docs.extended_target.as_str()],
            )
            .in_dir(&layout.doc_dir)
            .with_timeout(docs.extended_timeout_secs, docs.on_timeout),
        ));
    } else {
        plan.note(format!(
            "datasets and extended build skipped: branch '{}' is not '{}'",
            ctx.branch, ctx.primary_branch
        ));
        plan.push(Action::command(
            CommandSpec::program(
                format!("make {}", docs.dev_target),
                &docs.make,
                &[docs.dev_target.as_str()],
            )
            .in_dir(&layout.doc_dir),
        ));
    }

    Ok(plan)
}
