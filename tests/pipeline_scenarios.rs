mod common;

use std::fs;

use common::{Machine, RecordingExecutor};
use devdocs::action::Action;
use devdocs::pipeline::PipelineRunStatus;
use devdocs::runner;
use devdocs::{Phase, RunContext};

#[test]
fn feature_branch_builds_without_datasets_or_deploy() {
    let machine = Machine::new();
    machine.warm_caches();
    let config = machine.config();
    let ctx = RunContext::new(&config, "feature-x", &machine.workdir()).unwrap();
    let executor = RecordingExecutor::new();

    let report = runner::run_pipeline(&config, &ctx, &executor, None).unwrap();

    assert!(report.succeeded());
    assert_eq!(report.pipeline.status, PipelineRunStatus::Success);
    let commands = executor.commands();
    assert!(commands.iter().any(|c| c == "make html_dev-noplot"));
    assert!(!commands.iter().any(|c| c.contains("mne.datasets")));
    assert!(!commands.iter().any(|c| c.contains("test-doc")));
    assert!(!commands.iter().any(|c| c == "make html_dev"));
    assert!(!commands.iter().any(|c| c.starts_with("git push")));
    assert_eq!(
        report.pipeline.step("deploy").unwrap().status,
        PipelineRunStatus::NotSelected
    );
}

#[test]
fn feature_branch_installs_even_when_setup_is_cached() {
    let machine = Machine::new();
    machine.warm_caches();
    let config = machine.config();
    let ctx = RunContext::new(&config, "feature-x", &machine.workdir()).unwrap();
    let executor = RecordingExecutor::new();

    runner::run_pipeline(&config, &ctx, &executor, None).unwrap();

    let labels = executor.labels();
    assert!(!labels.iter().any(|l| l == "download installer"));
    assert!(labels.iter().any(|l| l == "develop sphinx-gallery"));
    assert!(labels.iter().any(|l| l == "pip packages"));
}

#[test]
fn cold_machine_provisions_environment_first() {
    let machine = Machine::new();
    let config = machine.config();
    let ctx = RunContext::new(&config, "feature-x", &machine.workdir()).unwrap();
    let executor = RecordingExecutor::new();
    // The installer is never really downloaded; chmod needs a file.
    machine.write("miniconda.sh", "#!/bin/sh\n");

    runner::run_pipeline(&config, &ctx, &executor, None).unwrap();

    let labels = executor.labels();
    assert_eq!(labels[0], "download installer");
    assert_eq!(labels[1], "make installer executable");
    assert_eq!(labels[2], "run installer");
    assert_eq!(labels[4], "create circleenv environment");
    assert!(executor.commands()[2].contains("python=2.7"));
}

#[test]
fn master_runs_datasets_full_build_and_deploy() {
    let machine = Machine::new();
    machine.warm_caches();
    machine.write("mne-python/doc/_build/html/index.html", "<html>new</html>");
    machine.write("mne-python/doc/_build/html/auto_examples/plot.html", "plot");
    machine.write("mne-tools.github.io/dev/index.html", "<html>old</html>");
    machine.write("mne-tools.github.io/dev/removed.html", "stale");
    let config = machine.config();
    let ctx = RunContext::new(&config, "master", &machine.workdir()).unwrap();
    let executor = RecordingExecutor::new();

    let report = runner::run_pipeline(&config, &ctx, &executor, None).unwrap();
    assert!(report.succeeded());
    assert!(report.primary);

    let commands = executor.commands();
    let fetches = commands.iter().filter(|c| c.contains("mne.datasets.")).count();
    assert_eq!(fetches, 7);
    assert!(commands.iter().any(|c| c.contains("mne.sys_info()")));
    assert!(commands.iter().any(|c| c == "make test-doc"));
    assert!(!commands.iter().any(|c| c == "make html_dev-noplot"));

    let extended = executor
        .actions
        .borrow()
        .iter()
        .find(|a| a.command_line() == Some("make html_dev"))
        .cloned()
        .unwrap();
    assert_eq!(extended.timeout_secs(), Some(1500));

    assert!(commands.contains(&"git commit -m 'Automated update of dev docs.'".to_string()));
    assert_eq!(commands.last().unwrap(), "git push origin master");

    let dev = machine.path("mne-tools.github.io/dev");
    assert_eq!(fs::read_to_string(dev.join("index.html")).unwrap(), "<html>new</html>");
    assert!(dev.join("auto_examples/plot.html").exists());
    assert_eq!(fs::read_to_string(dev.join("removed.html")).unwrap(), "stale");

    assert_eq!(report.artifacts.len(), 1);
    assert_eq!(report.artifacts[0].files, Some(2));
}

#[test]
fn master_creates_the_dataset_directory() {
    let machine = Machine::new();
    fs::create_dir_all(machine.path("miniconda")).unwrap();
    fs::create_dir_all(machine.path("mne-tools.github.io")).unwrap();
    machine.write("mne-python/doc/_build/html/index.html", "");
    let config = machine.config();
    let ctx = RunContext::new(&config, "master", &machine.workdir()).unwrap();
    let executor = RecordingExecutor::new();

    runner::run_pipeline(&config, &ctx, &executor, None).unwrap();

    assert!(machine.path("mne_data").is_dir());
}

#[test]
fn commands_see_the_pipeline_environment() {
    let machine = Machine::new();
    machine.warm_caches();
    let config = machine.config();
    let ctx = RunContext::new(&config, "feature-x", &machine.workdir()).unwrap();
    let executor = RecordingExecutor::new();

    runner::run_pipeline(&config, &ctx, &executor, Some(Phase::Build)).unwrap();

    let env = executor.env.borrow();
    let get = |key: &str| env.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
    assert_eq!(get("DISPLAY").as_deref(), Some(":99.0"));
    assert_eq!(
        get("MNE_DATA"),
        Some(machine.path("mne_data").to_string_lossy().to_string())
    );
    let path = get("PATH").unwrap();
    let first = std::env::split_paths(&path).next().unwrap();
    assert_eq!(first, machine.path("miniconda/envs/circleenv/bin"));
}

#[test]
fn failed_install_skips_build_and_deploy() {
    let machine = Machine::new();
    machine.warm_caches();
    let config = machine.config();
    let ctx = RunContext::new(&config, "master", &machine.workdir()).unwrap();
    let executor = RecordingExecutor::failing_on("pip packages");

    let report = runner::run_pipeline(&config, &ctx, &executor, None).unwrap();

    assert!(!report.succeeded());
    assert_eq!(report.pipeline.status, PipelineRunStatus::PartialSuccess);
    let install = report.pipeline.step("install").unwrap();
    assert_eq!(install.status, PipelineRunStatus::Failed);
    assert_eq!(install.error.as_deref(), Some("pip packages failed"));
    assert_eq!(
        report.pipeline.step("build").unwrap().status,
        PipelineRunStatus::Skipped
    );
    assert_eq!(
        report.pipeline.step("deploy").unwrap().status,
        PipelineRunStatus::Skipped
    );
    assert!(!executor.labels().iter().any(|l| l.starts_with("make")));
}

#[test]
fn failed_dataset_fetch_aborts_the_build() {
    let machine = Machine::new();
    machine.warm_caches();
    let config = machine.config();
    let ctx = RunContext::new(&config, "master", &machine.workdir()).unwrap();
    let executor = RecordingExecutor::failing_on("fetch spm_face");

    let report = runner::run_pipeline(&config, &ctx, &executor, None).unwrap();

    let labels = executor.labels();
    assert_eq!(labels.last().unwrap(), "fetch spm_face");
    assert!(!labels.iter().any(|l| l == "fetch somato"));
    let build = report.pipeline.step("build").unwrap();
    assert_eq!(build.status, PipelineRunStatus::Failed);
    // Completed actions are kept in the step data.
    assert_eq!(build.data.as_ref().unwrap()["actions"].as_array().unwrap().len(), 5);
}

#[test]
fn dry_run_plans_without_executing() {
    let machine = Machine::new();
    let config = machine.config();
    let ctx = RunContext::new(&config, "master", &machine.workdir()).unwrap();

    let plans = runner::plan_all(&config, &ctx).unwrap();

    assert_eq!(plans.len(), 4);
    assert!(plans.iter().all(|p| p.selected));
    let deploy = &plans[3];
    assert_eq!(deploy.labels()[0], "clone output repository");
    assert!(deploy
        .actions
        .iter()
        .any(|a| matches!(a, Action::CopyTree { .. })));
    assert!(!machine.path("mne_data").exists());
}
