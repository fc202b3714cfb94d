// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod env;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod render;
pub mod timing;
pub mod types;
pub mod version;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{Config, Job, load_config};
use crate::dag::resolve_jobs;
use crate::engine::{Engine, Event};
use crate::env::{
    Context, RealProvisioner, RuntimeCache, RuntimeProbe, STATE_DIR, SystemProbe, resolve_contexts,
};
use crate::fs::{FileSystem, RealFileSystem};
use crate::render::{LineRenderer, Renderer};
use crate::timing::Timings;
use crate::types::Options;
use crate::watch::{ActivityClock, IgnoreRules, WatchController, spawn_watcher};

/// High-level entry point used by `main.rs`; returns the process exit code.
///
/// This wires together:
/// - config loading
/// - job and runtime resolution
/// - provisioning + engine
/// - (optional) file watcher and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let options = args.options();
    let config = load_config(args.config.as_deref()).context("loading configuration")?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    if args.list {
        print_jobs(&config);
        return Ok(0);
    }

    let names = requested_jobs(&options, &config);
    if names.is_empty() {
        warn!("no jobs to run");
        print_jobs(&config);
        return Ok(1);
    }

    if options.clean {
        clean(&config, fs.as_ref())?;
    }

    let jobs = resolve_jobs(&names, &config)?;
    info!(jobs = ?names, "running jobs");

    let timings = Arc::new(Timings::new());
    let probe: Arc<dyn RuntimeProbe> = Arc::new(SystemProbe::new(Arc::new(RuntimeCache::new())));
    let provisioner = Arc::new(RealProvisioner::new(
        Arc::clone(&probe),
        Arc::clone(&fs),
        Arc::clone(&timings),
    ));
    let engine = Arc::new(Engine::new(provisioner, Arc::clone(&timings)));
    let config = Arc::new(config);
    let mut renderer = LineRenderer::new(std::io::stdout());

    let status = if options.watch {
        run_watch(config, options.clone(), probe, engine, fs, &mut renderer).await?
    } else {
        let contexts = {
            let _timer = timings.start("resolve contexts");
            resolve_contexts(&config, &options, probe.as_ref()).await?
        };
        run_once(&engine, jobs, contexts, config, &mut renderer).await?
    };

    if options.benchmark {
        println!("\nbenchmark timings:\n------------------");
        for timing in timings.drain() {
            println!("  {timing}");
        }
    }

    Ok(status)
}

/// Jobs named on the command line, or the configured defaults.
pub fn requested_jobs(options: &Options, config: &Config) -> Vec<String> {
    if options.jobs.is_empty() {
        config.default.clone()
    } else {
        options.jobs.clone()
    }
}

/// Run the queue once, rendering every event. Returns the exit code.
pub async fn run_once<R: Renderer>(
    engine: &Arc<Engine>,
    jobs: Vec<Arc<Job>>,
    contexts: Vec<Context>,
    config: Arc<Config>,
    renderer: &mut R,
) -> Result<i32> {
    let (tx, mut rx) = mpsc::channel::<Event>(64);
    let handle = {
        let engine = Arc::clone(engine);
        tokio::spawn(async move { engine.run(jobs, contexts, config, tx).await })
    };

    while let Some(event) = rx.recv().await {
        renderer.render(&event);
    }

    let outcome = handle.await.context("engine task failed")??;
    debug!(?outcome, "run finished");
    if outcome.success() {
        Ok(0)
    } else {
        renderer.render(&Event::Fail);
        Ok(1)
    }
}

async fn run_watch<R: Renderer>(
    config: Arc<Config>,
    options: Options,
    probe: Arc<dyn RuntimeProbe>,
    engine: Arc<Engine>,
    fs: Arc<dyn FileSystem>,
    renderer: &mut R,
) -> Result<i32> {
    let clock = Arc::new(ActivityClock::new());
    let rules = IgnoreRules::for_project(&config.root, fs.as_ref())?;
    let _watcher = spawn_watcher(
        config.root.clone(),
        &config.effective_watch_paths(),
        rules,
        Arc::clone(&clock),
    )?;

    let mut controller = WatchController::new(config, options, probe, engine, clock, fs);
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("shutdown requested");
    };
    Ok(controller.run(renderer, shutdown).await)
}

/// Remove every environment and marker under the project state directory.
pub fn clean(config: &Config, fs: &dyn FileSystem) -> Result<()> {
    let state = config.root.join(STATE_DIR);
    if fs.exists(&state) {
        println!("Cleaning {} ...", state.display());
        fs.remove_dir_all(&state)?;
    }
    Ok(())
}

/// Print configured jobs and their commands.
fn print_jobs(config: &Config) {
    println!("available jobs:");
    for (name, job) in &config.jobs {
        let marker = if config.default.contains(name) { " (default)" } else { "" };
        println!("  {name}{marker}");
        for cmd in &job.run {
            println!("      {cmd}");
        }
        if !job.requires.is_empty() {
            println!("      requires: {}", job.requires.join(", "));
        }
    }
}
