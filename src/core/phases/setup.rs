use crate::action::{Action, CommandSpec};
use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::error::Result;
use crate::paths;

use super::{Phase, PhasePlan};

/// Provision the Python distribution unless its prefix already exists.
pub fn plan(config: &PipelineConfig, ctx: &RunContext) -> Result<PhasePlan> {
    let layout = &ctx.layout;
    let mut plan = PhasePlan::new(Phase::Setup);

    if layout.prefix.exists() {
        plan.note(format!(
            "cache present at {}, nothing to do",
            paths::display(&layout.prefix)
        ));
        return Ok(plan);
    }

    let setup = &config.setup;
    let installer = paths::display(&layout.installer_path);
    let prefix = paths::display(&layout.prefix);
    let conda = paths::display(&layout.prefix.join("bin").join("conda"));

    plan.push(Action::Download {
        label: "download installer".to_string(),
        url: setup.installer_url.clone(),
        destination: layout.installer_path.clone(),
    });
    plan.push(Action::MakeExecutable {
        label: "make installer executable".to_string(),
        path: layout.installer_path.clone(),
    });
    plan.push(Action::command(CommandSpec::program(
        "run installer",
        &installer,
        &["-b", "-p", prefix.as_str()],
    )));

    if setup.update_manager {
        plan.push(Action::command(CommandSpec::program(
            "update conda",
            &conda,
            &["update", "--yes", "--quiet", "conda"],
        )));
    }

    let python = format!("python={}", setup.python_version);
    let mut args: Vec<&str> = vec!["create", "-n", &setup.env_name, "--yes", &python];
    args.extend(setup.packages.iter().map(String::as_str));
    plan.push(Action::command(CommandSpec::program(
        format!("create {} environment", setup.env_name),
        &conda,
        &args,
    )));

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn fixture(root: &Path) -> (PipelineConfig, RunContext) {
        let mut config = PipelineConfig::default();
        config.setup.prefix = root.join("miniconda").to_string_lossy().to_string();
        config.setup.installer_path = root.join("miniconda.sh").to_string_lossy().to_string();
        let ctx = RunContext::new(&config, "feature-x", root).unwrap();
        (config, ctx)
    }

    #[test]
    fn existing_prefix_means_no_actions() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("miniconda")).unwrap();
        let (config, ctx) = fixture(dir.path());

        let plan = plan(&config, &ctx).unwrap();
        assert!(plan.actions.is_empty());
        assert!(plan.selected);
        assert!(plan.notes[0].contains("nothing to do"));
    }

    #[test]
    fn fresh_machine_installs_and_creates_env() {
        let dir = tempfile::tempdir().unwrap();
        let (config, ctx) = fixture(dir.path());

        let plan = plan(&config, &ctx).unwrap();
        let kinds: Vec<&str> = plan.actions.iter().map(|a| a.kind()).collect();
        assert_eq!(
            kinds,
            vec!["download", "make_executable", "command", "command", "command"]
        );

        let commands = plan.commands();
        assert!(commands[0].ends_with(&format!(
            "miniconda.sh -b -p {}",
            dir.path().join("miniconda").display()
        )));
        assert!(commands[1].ends_with("bin/conda update --yes --quiet conda"));
        assert!(commands[2].contains("create -n circleenv --yes python=2.7 pip numpy scipy"));
        assert!(commands[2].ends_with("pandas"));
    }

    #[test]
    fn manager_update_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let (mut config, ctx) = fixture(dir.path());
        config.setup.update_manager = false;

        let plan = plan(&config, &ctx).unwrap();
        assert_eq!(plan.commands().len(), 2);
    }
}
