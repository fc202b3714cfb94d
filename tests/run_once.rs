// tests/run_once.rs

use std::error::Error;
use std::sync::Arc;

use multirun::dag::resolve_jobs;
use multirun::engine::Engine;
use multirun::render::LineRenderer;
use multirun::run_once;
use multirun::timing::Timings;
use multirun_test_utils::builders::{ConfigBuilder, JobBuilder, context};
use multirun_test_utils::fake_provisioner::FakeProvisioner;
use multirun_test_utils::with_timeout;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn failures_are_rendered_with_their_output() -> TestResult {
    let dir = tempfile::tempdir()?;
    let config = Arc::new(
        ConfigBuilder::new(dir.path())
            .with_job(JobBuilder::new("check", &["sh -c 'echo broken >&2; exit 2'"]).build())
            .build(),
    );
    let jobs = resolve_jobs(&["check".to_string()], &config)?;
    let engine = Arc::new(Engine::new(Arc::new(FakeProvisioner::new()), Arc::new(Timings::new())));
    let mut renderer = LineRenderer::new(Vec::new());

    let code = with_timeout(run_once(
        &engine,
        jobs,
        vec![context(dir.path(), "3.11")],
        Arc::clone(&config),
        &mut renderer,
    ))
    .await?;

    let output = String::from_utf8(renderer.into_inner())?;
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(code, 1);
    assert_eq!(lines[0], "3.11> creating virtualenv");
    assert_eq!(lines[1], "3.11> ready");
    assert!(lines[3].starts_with("3.11 check> ") && lines[3].ends_with(" FAIL"), "{output}");
    assert!(lines.contains(&"  exit code: 2"), "{output}");
    assert!(lines.contains(&"    broken"), "{output}");
    assert_eq!(lines.last(), Some(&"FAIL"));
    Ok(())
}

#[tokio::test]
async fn successful_runs_exit_zero_and_stay_quiet() -> TestResult {
    let dir = tempfile::tempdir()?;
    let config = Arc::new(
        ConfigBuilder::new(dir.path())
            .with_job(JobBuilder::new("check", &["echo hidden"]).build())
            .build(),
    );
    let jobs = resolve_jobs(&["check".to_string()], &config)?;
    let engine = Arc::new(Engine::new(Arc::new(FakeProvisioner::new()), Arc::new(Timings::new())));
    let mut renderer = LineRenderer::new(Vec::new());

    let code = with_timeout(run_once(
        &engine,
        jobs,
        vec![context(dir.path(), "3.11")],
        config,
        &mut renderer,
    ))
    .await?;

    let output = String::from_utf8(renderer.into_inner())?;
    assert_eq!(code, 0);
    assert!(!output.contains("hidden"), "{output}");
    assert!(output.lines().last().is_some_and(|l| l.ends_with(" OK")), "{output}");
    Ok(())
}

#[test]
fn clean_removes_the_state_directory_only() -> TestResult {
    use multirun::clean;
    use multirun::config::Config;
    use multirun::fs::FileSystem;
    use multirun::fs::mock::MockFileSystem;
    use std::path::Path;

    let fs = MockFileSystem::new();
    fs.add_file("/project/pyproject.toml", "[project]\n");
    fs.add_file("/project/.multirun/venv/3.11/multirun.timestamp", "1\n");

    clean(&Config::new("/project"), &fs)?;

    assert!(!fs.exists(Path::new("/project/.multirun")));
    assert!(!fs.exists(Path::new("/project/.multirun/venv/3.11/multirun.timestamp")));
    assert!(fs.is_file(Path::new("/project/pyproject.toml")));
    Ok(())
}
