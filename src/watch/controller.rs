// src/watch/controller.rs

//! Debounce / cancel / restart loop around the engine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, error, info, warn};

use crate::config::{Config, Job, parse_config};
use crate::dag::resolve_jobs;
use crate::engine::{Engine, Event};
use crate::env::{Context, RuntimeProbe, resolve_contexts};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::render::Renderer;
use crate::types::Options;
use crate::watch::activity::ActivityClock;
use crate::watch::hash::{file_fingerprint, fingerprint};

/// Quiet period required after the last change before acting on it.
pub const DEBOUNCE: Duration = Duration::from_millis(100);
/// Poll interval of the watch loop.
pub const POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Resolving,
    Running,
    Debouncing,
    Cancelling,
    Stopped,
}

type Plan = (Vec<Arc<Job>>, Vec<Context>);

/// How a single run ended.
enum RunEnd {
    Completed { failed: bool },
    Cancelled { failed: bool },
    Stopped,
}

/// Supervises engine runs in watch mode.
pub struct WatchController {
    config: Arc<Config>,
    fingerprint: Option<blake3::Hash>,
    options: Options,
    probe: Arc<dyn RuntimeProbe>,
    engine: Arc<Engine>,
    clock: Arc<ActivityClock>,
    fs: Arc<dyn FileSystem>,
    state: WatchState,
    debounce: Duration,
    poll: Duration,
}

impl WatchController {
    pub fn new(
        config: Arc<Config>,
        options: Options,
        probe: Arc<dyn RuntimeProbe>,
        engine: Arc<Engine>,
        clock: Arc<ActivityClock>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let fingerprint = file_fingerprint(fs.as_ref(), &config.pyproject_path());
        Self {
            config,
            fingerprint,
            options,
            probe,
            engine,
            clock,
            fs,
            state: WatchState::Idle,
            debounce: DEBOUNCE,
            poll: POLL,
        }
    }

    pub fn with_intervals(mut self, debounce: Duration, poll: Duration) -> Self {
        self.debounce = debounce;
        self.poll = poll;
        self
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Run until `shutdown` resolves; returns the last exit status.
    pub async fn run<R, S>(&mut self, renderer: &mut R, shutdown: S) -> i32
    where
        R: Renderer,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut status = 0;
        let mut plan: Option<Plan> = None;

        loop {
            self.state = WatchState::Resolving;
            if self.clock.take_config_changed() && self.reload_config() {
                info!("configuration changed, re-resolving");
                plan = None;
            }

            let started = self.clock.now();

            if plan.is_none() {
                match self.resolve().await {
                    Ok(resolved) => plan = Some(resolved),
                    Err(err) => {
                        error!(error = %err, "cannot start run");
                        renderer.render(&Event::Fail);
                        status = 1;
                    }
                }
            }

            if let Some((jobs, contexts)) = &plan {
                renderer.render(&Event::Reset);
                match self.run_once(jobs.clone(), contexts.clone(), started, renderer, &mut shutdown).await {
                    RunEnd::Stopped => {
                        self.state = WatchState::Stopped;
                        return status;
                    }
                    RunEnd::Completed { failed } => {
                        status = if failed { 1 } else { 0 };
                        if failed {
                            renderer.render(&Event::Fail);
                        }
                    }
                    RunEnd::Cancelled { failed } => {
                        if failed {
                            status = 1;
                            renderer.render(&Event::Fail);
                        }
                        continue;
                    }
                }
            }

            self.state = WatchState::Idle;
            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        self.state = WatchState::Stopped;
                        return status;
                    }
                    _ = sleep(self.poll) => {
                        if self.clock.activity_since(started) && self.clock.quiet_for(self.debounce) {
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn run_once<R, S>(
        &mut self,
        jobs: Vec<Arc<Job>>,
        contexts: Vec<Context>,
        started: u64,
        renderer: &mut R,
        shutdown: &mut std::pin::Pin<&mut S>,
    ) -> RunEnd
    where
        R: Renderer,
        S: Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::channel(64);
        let engine = Arc::clone(&self.engine);
        let config = Arc::clone(&self.config);
        let mut handle = tokio::spawn(async move { engine.run(jobs, contexts, config, tx).await });
        self.state = WatchState::Running;

        let mut ticker = interval(self.poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failed = false;

        loop {
            tokio::select! {
                _ = shutdown.as_mut() => {
                    handle.abort();
                    return RunEnd::Stopped;
                }
                event = rx.recv() => match event {
                    Some(event) => {
                        failed |= event.is_failure();
                        renderer.render(&event);
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if self.clock.activity_since(started) {
                        self.state = WatchState::Debouncing;
                        if self.clock.quiet_for(self.debounce) {
                            self.state = WatchState::Cancelling;
                            debug!("changes detected, cancelling run");
                            handle.abort();
                            let _ = (&mut handle).await;
                            return RunEnd::Cancelled { failed };
                        }
                    }
                }
            }
        }

        match handle.await {
            Ok(Ok(outcome)) => {
                debug!(?outcome, "run finished");
                RunEnd::Completed {
                    failed: failed || !outcome.success(),
                }
            }
            Ok(Err(err)) => {
                error!(error = %err, "run aborted");
                RunEnd::Completed { failed: true }
            }
            Err(err) => {
                warn!(error = %err, "run task did not finish");
                RunEnd::Completed { failed: true }
            }
        }
    }

    async fn resolve(&self) -> Result<Plan> {
        let names = if self.options.jobs.is_empty() {
            self.config.default.clone()
        } else {
            self.options.jobs.clone()
        };
        let jobs = resolve_jobs(&names, &self.config)?;
        let _timer = self.engine.timings().start("resolve contexts");
        let contexts = resolve_contexts(&self.config, &self.options, self.probe.as_ref()).await?;
        Ok((jobs, contexts))
    }

    /// Re-read the config file. Returns whether the active config changed.
    ///
    /// Unchanged bytes are not re-parsed; unparsable files keep the previous
    /// config.
    fn reload_config(&mut self) -> bool {
        let path = self.config.pyproject_path();
        let contents = match self.fs.read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(error = %err, "cannot read config, keeping previous");
                return false;
            }
        };

        let hash = fingerprint(contents.as_bytes());
        if self.fingerprint == Some(hash) {
            debug!("config bytes unchanged");
            return false;
        }
        self.fingerprint = Some(hash);

        match parse_config(&contents, &self.config.root) {
            Ok(config) if config != *self.config => {
                self.config = Arc::new(config);
                true
            }
            Ok(_) => false,
            Err(err) => {
                warn!(error = %err, "invalid config, keeping previous");
                false
            }
        }
    }
}
