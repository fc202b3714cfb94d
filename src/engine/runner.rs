// src/engine/runner.rs

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{Config, Job};
use crate::env::{Context, Provisioner};
use crate::errors::{MultirunError, Result};
use crate::exec::{Step, check_job, prepare_job};
use crate::timing::Timings;

use super::event::{Event, EventSender};
use super::fanin::FanIn;

/// Knobs for one [`Engine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Run contexts one after another instead of concurrently.
    pub serial: bool,
}

/// Tally of a finished (not cancelled) run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub results: usize,
    pub failures: usize,
    pub venv_errors: usize,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.failures == 0 && self.venv_errors == 0
    }
}

/// Runs a job queue across contexts and reports everything as events.
pub struct Engine {
    provisioner: Arc<dyn Provisioner>,
    timings: Arc<Timings>,
    options: EngineOptions,
}

/// Result of provisioning all contexts.
enum Prepared {
    Ready(Vec<Arc<Context>>),
    Failed(usize),
}

impl Engine {
    pub fn new(provisioner: Arc<dyn Provisioner>, timings: Arc<Timings>) -> Self {
        Self {
            provisioner,
            timings,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn timings(&self) -> &Arc<Timings> {
        &self.timings
    }

    /// Provision every context, then run `jobs` in queue order.
    ///
    /// Job failures are reported through `events` and tallied in the
    /// returned [`RunOutcome`]; only setup problems (no contexts, template
    /// errors) are errors. Templates are checked for every queued job before
    /// any environment is provisioned. Processing stops after the first job
    /// with a failed step, and no job runs at all if any environment fails
    /// to provision.
    pub async fn run(
        &self,
        jobs: Vec<Arc<Job>>,
        mut contexts: Vec<Context>,
        config: Arc<Config>,
        events: EventSender,
    ) -> Result<RunOutcome> {
        let _timer = self.timings.start("run");

        if contexts.is_empty() {
            return Err(MultirunError::NoRuntime);
        }
        if jobs.is_empty() {
            return Ok(RunOutcome::default());
        }
        if jobs.iter().all(|job| job.once) {
            debug!("only once-jobs requested, using a single context");
            contexts.truncate(1);
        }

        for job in &jobs {
            let targets = if job.once { &contexts[..1] } else { &contexts[..] };
            check_job(job, targets, &config)?;
        }

        let ready = match self.prepare_contexts(&contexts, &config, &events).await {
            Prepared::Ready(ready) => ready,
            Prepared::Failed(venv_errors) => {
                return Ok(RunOutcome {
                    venv_errors,
                    ..RunOutcome::default()
                });
            }
        };
        if ready.is_empty() {
            return Err(MultirunError::NoRuntime);
        }

        let mut outcome = RunOutcome::default();
        let mut once_done: HashSet<String> = HashSet::new();

        for job in &jobs {
            if job.once && once_done.contains(&job.name) {
                debug!(job = %job.name, "once-job already ran");
                continue;
            }

            let targets = if job.once { &ready[..1] } else { &ready[..] };
            let plans = targets
                .iter()
                .map(|context| prepare_job(job, context, &config))
                .collect::<Result<Vec<_>>>()?;

            let _job_timer = self.timings.start(format!("job {}", job.name));
            let failed = self
                .run_job(job, plans, &config.root, &events, &mut outcome, &mut once_done)
                .await;
            if failed {
                info!(job = %job.name, "job failed, stopping");
                break;
            }
        }

        Ok(outcome)
    }

    /// Run provisioning for all contexts concurrently, forwarding progress.
    ///
    /// Stops at the first `VenvError`; remaining provisioners are aborted.
    async fn prepare_contexts(
        &self,
        contexts: &[Context],
        config: &Arc<Config>,
        events: &EventSender,
    ) -> Prepared {
        let _timer = self.timings.start("prepare contexts");
        let mut fanin = FanIn::new();
        for context in contexts {
            let provisioner = Arc::clone(&self.provisioner);
            let context = Arc::new(context.clone());
            let config = Arc::clone(config);
            fanin.spawn(move |tx| provisioner.provision(context, config, tx));
        }

        let mut ready: HashMap<PathBuf, Arc<Context>> = HashMap::new();
        while let Some(event) = fanin.next().await {
            match &event {
                Event::VenvReady { context } => {
                    ready.insert(context.venv.clone(), Arc::clone(context));
                }
                Event::VenvError { context, error } => {
                    warn!(context = %context.version, %error, "environment failed");
                    let _ = events.send(event).await;
                    return Prepared::Failed(1);
                }
                _ => {}
            }
            let _ = events.send(event).await;
        }

        let ordered = contexts
            .iter()
            .filter_map(|context| {
                let found = ready.remove(&context.venv);
                if found.is_none() {
                    warn!(context = %context.version, "provisioner finished without a ready event");
                }
                found
            })
            .collect();
        Prepared::Ready(ordered)
    }

    /// Run one job on its target contexts. Returns whether any step failed.
    async fn run_job(
        &self,
        job: &Arc<Job>,
        plans: Vec<Vec<Arc<Step>>>,
        cwd: &std::path::Path,
        events: &EventSender,
        outcome: &mut RunOutcome,
        once_done: &mut HashSet<String>,
    ) -> bool {
        let mut fanin = FanIn::new();
        let parallel = job.parallel;

        if self.options.serial {
            let timings = Arc::clone(&self.timings);
            let cwd = cwd.to_path_buf();
            fanin.spawn(move |tx| async move {
                for steps in plans {
                    run_on_context(steps, parallel, cwd.clone(), Arc::clone(&timings), tx.clone()).await;
                }
            });
        } else {
            for steps in plans {
                let timings = Arc::clone(&self.timings);
                let cwd = cwd.to_path_buf();
                fanin.spawn(move |tx| run_on_context(steps, parallel, cwd, timings, tx));
            }
        }

        let mut failed = false;
        while let Some(event) = fanin.next().await {
            match &event {
                Event::Start { .. } if job.once => {
                    once_done.insert(job.name.clone());
                }
                Event::Result { result, context, .. } => {
                    outcome.results += 1;
                    if result.error() {
                        debug!(job = %job.name, context = %context.version, exit_code = result.exit_code, "step failed");
                        outcome.failures += 1;
                        failed = true;
                    }
                }
                _ => {}
            }
            let _ = events.send(event).await;
        }
        failed
    }
}

/// Run one job's steps for one context.
///
/// Sequential steps stop at the first failure; parallel steps all run.
async fn run_on_context(
    steps: Vec<Arc<Step>>,
    parallel: bool,
    cwd: PathBuf,
    timings: Arc<Timings>,
    tx: EventSender,
) {
    let Some(first) = steps.first() else {
        return;
    };
    let _timer = timings.start(format!("job {} on {}", first.job.name, first.context.version));

    if parallel {
        let mut fanin = FanIn::new();
        for step in steps {
            let cwd = cwd.clone();
            fanin.spawn(move |tx| async move {
                run_step(&step, &cwd, &tx).await;
            });
        }
        while let Some(event) = fanin.next().await {
            let _ = tx.send(event).await;
        }
    } else {
        for step in &steps {
            if !run_step(step, &cwd, &tx).await {
                break;
            }
        }
    }
}

/// Emit `Start`, run, emit `Result`. Returns whether the step succeeded.
async fn run_step(step: &Arc<Step>, cwd: &std::path::Path, tx: &EventSender) -> bool {
    let context = Arc::clone(&step.context);
    let _ = tx
        .send(Event::Start {
            context: Arc::clone(&context),
            step: Arc::clone(step),
        })
        .await;

    let result = step.run(cwd).await;
    let success = result.success();
    let _ = tx
        .send(Event::Result {
            context,
            step: Arc::clone(step),
            result,
        })
        .await;
    success
}
