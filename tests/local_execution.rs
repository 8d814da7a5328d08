mod common;

use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use common::Machine;
use devdocs::config::PipelineConfig;
use devdocs::pipeline::PipelineRunStatus;
use devdocs::runner;
use devdocs::{LocalExecutor, Phase, RunContext, TimeoutPolicy};

/// A `make` stand-in that logs its target and hangs on `html_dev`.
fn fake_make(machine: &Machine) -> String {
    let log = machine.path("make.log");
    let script = format!(
        "#!/bin/sh\necho \"$1 $DISPLAY\" >> {}\nif [ \"$1\" = html_dev ]; then sleep 5; fi\n",
        log.display()
    );
    machine.write("bin/make", &script);
    let path = machine.path("bin/make");
    #[cfg(unix)]
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().to_string()
}

fn build_config(machine: &Machine, policy: TimeoutPolicy) -> PipelineConfig {
    let mut config = machine.config();
    config.docs.make = fake_make(machine);
    config.docs.extended_timeout_secs = 1;
    config.docs.on_timeout = policy;
    config.display.enabled = false;
    config.datasets.names.clear();
    config.datasets.diagnostics = None;
    config
}

#[cfg(unix)]
#[test]
fn extended_build_timeout_fails_the_phase() {
    let machine = Machine::new();
    let config = build_config(&machine, TimeoutPolicy::Fail);
    let ctx = RunContext::new(&config, "master", &machine.workdir()).unwrap();

    let report =
        runner::run_pipeline(&config, &ctx, &LocalExecutor::new(false), Some(Phase::Build)).unwrap();

    let build = report.pipeline.step("build").unwrap();
    assert_eq!(build.status, PipelineRunStatus::Failed);
    assert_eq!(build.error_code.as_deref(), Some("command.timeout"));
    assert!(!report.succeeded());

    let log = fs::read_to_string(machine.path("make.log")).unwrap();
    assert_eq!(log.lines().collect::<Vec<_>>(), vec!["test-doc :99.0", "html_dev :99.0"]);
}

#[cfg(unix)]
#[test]
fn extended_build_timeout_can_warn() {
    let machine = Machine::new();
    let config = build_config(&machine, TimeoutPolicy::Warn);
    let ctx = RunContext::new(&config, "master", &machine.workdir()).unwrap();

    let report =
        runner::run_pipeline(&config, &ctx, &LocalExecutor::new(false), Some(Phase::Build)).unwrap();

    let build = report.pipeline.step("build").unwrap();
    assert_eq!(build.status, PipelineRunStatus::Success);
    assert!(!build.warnings.is_empty());
    assert!(report.succeeded());
}

#[cfg(unix)]
#[test]
fn feature_branch_runs_the_quick_build_only() {
    let machine = Machine::new();
    let config = build_config(&machine, TimeoutPolicy::Fail);
    let ctx = RunContext::new(&config, "feature-x", &machine.workdir()).unwrap();

    let report =
        runner::run_pipeline(&config, &ctx, &LocalExecutor::new(false), Some(Phase::Build)).unwrap();

    assert!(report.succeeded());
    let log = fs::read_to_string(machine.path("make.log")).unwrap();
    assert_eq!(log.trim(), "html_dev-noplot :99.0");
}
