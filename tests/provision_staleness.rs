// tests/provision_staleness.rs

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use multirun::config::Config;
use multirun::engine::Event;
use multirun::env::marker::TIMESTAMP;
use multirun::env::{Context, Provisioner, RealProvisioner, venv_path};
use multirun::fs::FileSystem;
use multirun::fs::mock::MockFileSystem;
use multirun::timing::Timings;
use multirun::types::Builder;
use multirun::version::Version;
use multirun_test_utils::fake_probe::FakeProbe;
use multirun_test_utils::{collect_events, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn pip_context(root: &Path, interpreter: &str) -> Context {
    let version = "3.12.1".parse().expect("valid version");
    let venv = venv_path(root, &version);
    Context::new(version, Some(interpreter.into()), venv, Builder::Pip)
}

async fn provision(
    probe: FakeProbe,
    fs: &MockFileSystem,
    context: Context,
    config: Config,
) -> Vec<Event> {
    let provisioner = RealProvisioner::new(Arc::new(probe), Arc::new(fs.clone()), Arc::new(Timings::new()));
    let (tx, rx) = mpsc::channel(16);
    with_timeout(provisioner.provision(Arc::new(context), Arc::new(config), tx)).await;
    collect_events(rx).await
}

fn messages(events: &[Event]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::VenvCreate { message, .. } => Some(message.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn fresh_environment_is_reused() -> TestResult {
    let root = Path::new("/project");
    let fs = MockFileSystem::new();
    let context = pip_context(root, "/usr/bin/python3.12");
    fs.add_file(root.join("pyproject.toml"), "[project]\n");
    fs.add_file(root.join("requirements.txt"), "pytest\n");
    fs.add_file(context.venv.join(TIMESTAMP), "1\n");

    let venv_python = context.bin_dir().join("python");
    let probe = FakeProbe::new().with_file(&venv_python.to_string_lossy(), Some("3.12.1"));

    let events = provision(probe, &fs, context, Config::new(root)).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::VenvReady { context } => {
            assert_eq!(context.interpreter.as_deref(), Some(venv_python.as_path()));
            assert_eq!(context.version.to_string(), "3.12.1");
        }
        other => panic!("expected VenvReady, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn newer_requirements_trigger_a_rebuild() -> TestResult {
    let root = Path::new("/project");
    let fs = MockFileSystem::new();
    let context = pip_context(root, "/nonexistent/python3.12");
    fs.add_file(context.venv.join(TIMESTAMP), "1\n");
    fs.add_file(root.join("requirements-dev.txt"), "ruff\n");

    let events = provision(FakeProbe::new(), &fs, context, Config::new(root)).await;

    assert_eq!(messages(&events), ["creating virtualenv"]);
    assert!(
        matches!(events.last(), Some(Event::VenvError { error, .. }) if error.contains("python3.12")),
        "unexpected events: {events:?}"
    );
    Ok(())
}

#[tokio::test]
async fn missing_marker_provisions_and_records_a_new_one() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let fs = MockFileSystem::new();
    let version: Version = "3.13".parse()?;
    let context = Context::new(version.clone(), None, venv_path(root, &version), Builder::Uv);
    let marker = context.venv.join(TIMESTAMP);

    // `true` stands in for the installer so every phase succeeds.
    let probe = FakeProbe::new().with_tool("uv", "true");

    let events = provision(probe, &fs, context, Config::new(root)).await;

    assert_eq!(
        messages(&events),
        ["creating virtualenv", "installing requirements", "installing project"]
    );
    assert!(matches!(events.last(), Some(Event::VenvReady { .. })));
    assert!(fs.is_file(&marker));
    Ok(())
}
