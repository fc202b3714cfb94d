// tests/resolve_contexts.rs

use std::path::PathBuf;

use multirun::config::Config;
use multirun::env::{resolve_contexts, select_builder};
use multirun::errors::MultirunError;
use multirun::types::{Builder, Options};
use multirun_test_utils::builders::ConfigBuilder;
use multirun_test_utils::fake_probe::FakeProbe;

fn versions(config_versions: &[&str], builder: Builder) -> Config {
    config_versions
        .iter()
        .fold(ConfigBuilder::new("/project"), |b, v| b.with_version(v))
        .with_builder(builder)
        .build()
}

fn host() -> FakeProbe {
    FakeProbe::new()
        .with_runtime("python3.12", "/usr/bin/python3.12", "3.12.1")
        .with_runtime("python3.10", "/opt/py/bin/python3.10", "3.10.13")
        .with_runtime("python3", "/usr/bin/python3", "3.12.1")
}

#[tokio::test]
async fn pip_contexts_carry_the_probed_interpreter() {
    let config = versions(&["3.12", "3.10"], Builder::Pip);
    let contexts = resolve_contexts(&config, &Options::default(), &host()).await.unwrap();

    let found: Vec<(String, Option<PathBuf>)> = contexts
        .iter()
        .map(|c| (c.version.to_string(), c.interpreter.clone()))
        .collect();
    assert_eq!(
        found,
        [
            ("3.12.1".to_string(), Some(PathBuf::from("/usr/bin/python3.12"))),
            ("3.10.13".to_string(), Some(PathBuf::from("/opt/py/bin/python3.10"))),
        ]
    );
    assert_eq!(contexts[0].venv, PathBuf::from("/project/.multirun/venv/3.12.1"));
    assert!(contexts.iter().all(|c| c.builder == Builder::Pip && !c.live));
}

#[tokio::test]
async fn missing_versions_are_skipped() {
    let config = versions(&["3.13", "3.12", "3.8"], Builder::Pip);
    let contexts = resolve_contexts(&config, &Options::default(), &host()).await.unwrap();

    let found: Vec<String> = contexts.iter().map(|c| c.version.to_string()).collect();
    assert_eq!(found, ["3.12.1"]);
}

#[tokio::test]
async fn python_option_filters_contexts() {
    let config = versions(&["3.12", "3.10"], Builder::Pip);
    let options = Options {
        python: Some("3.10".parse().unwrap()),
        ..Options::default()
    };
    let contexts = resolve_contexts(&config, &options, &host()).await.unwrap();

    let found: Vec<String> = contexts.iter().map(|c| c.version.to_string()).collect();
    assert_eq!(found, ["3.10.13"]);
}

#[tokio::test]
async fn live_mode_uses_the_host_interpreter() {
    let config = versions(&["3.12", "3.10"], Builder::Pip);
    let options = Options {
        live: true,
        ..Options::default()
    };
    let contexts = resolve_contexts(&config, &options, &host()).await.unwrap();

    assert_eq!(contexts.len(), 1);
    assert!(contexts[0].live);
    assert_eq!(contexts[0].version.to_string(), "3.12.1");
    assert_eq!(contexts[0].interpreter, None);
}

#[tokio::test]
async fn no_versions_configured_means_live() {
    let config = ConfigBuilder::new("/project").with_builder(Builder::Pip).build();
    let contexts = resolve_contexts(&config, &Options::default(), &host()).await.unwrap();
    assert_eq!(contexts.len(), 1);
    assert!(contexts[0].live);
}

#[tokio::test]
async fn live_mode_without_any_interpreter_fails() {
    let config = ConfigBuilder::new("/project").build();
    let err = resolve_contexts(&config, &Options::default(), &FakeProbe::new())
        .await
        .unwrap_err();
    assert!(matches!(err, MultirunError::NoRuntime));
}

#[tokio::test]
async fn uv_contexts_are_not_probed() {
    let probe = FakeProbe::new().with_tool("uv", "/usr/local/bin/uv");
    let config = versions(&["3.13", "3.11"], Builder::Auto);
    let contexts = resolve_contexts(&config, &Options::default(), &probe).await.unwrap();

    let found: Vec<String> = contexts.iter().map(|c| c.version.to_string()).collect();
    assert_eq!(found, ["3.13", "3.11"]);
    assert!(contexts.iter().all(|c| c.builder == Builder::Uv && c.interpreter.is_none()));
    assert!(probe.version_calls().is_empty());
}

#[test]
fn explicit_uv_must_be_installed() {
    let err = select_builder(Builder::Uv, &FakeProbe::new()).unwrap_err();
    assert!(matches!(err, MultirunError::BuilderUnavailable(ref name) if name == "uv"));

    assert_eq!(select_builder(Builder::Auto, &FakeProbe::new()).unwrap(), Builder::Pip);
    let with_uv = FakeProbe::new().with_tool("uv", "/usr/local/bin/uv");
    assert_eq!(select_builder(Builder::Pip, &with_uv).unwrap(), Builder::Pip);
    assert_eq!(select_builder(Builder::Auto, &with_uv).unwrap(), Builder::Uv);
}
