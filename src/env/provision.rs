// src/env/provision.rs

//! Building and refreshing per-context environments.
//!
//! The engine only sees the [`Provisioner`] trait; [`RealProvisioner`] runs
//! the builder commands, tests substitute a fake that emits scripted events.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::{debug, error, info};

use crate::config::{Config, PYPROJECT};
use crate::engine::{Event, EventSender};
use crate::exec::run_checked;
use crate::fs::FileSystem;
use crate::timing::Timings;
use crate::types::{BoxFuture, Builder};

use super::context::Context;
use super::marker::{needs_update, project_requirements, write_marker};
use super::probe::RuntimeProbe;
use super::resolver::{UV, host_runtime};

/// Prepares one context's environment, reporting progress as events.
///
/// Implementations send zero or more `VenvCreate` events followed by
/// exactly one `VenvReady` (carrying the finalized context) or `VenvError`.
pub trait Provisioner: Send + Sync {
    fn provision(
        &self,
        context: Arc<Context>,
        config: Arc<Config>,
        events: EventSender,
    ) -> BoxFuture<'static, ()>;
}

/// A named provisioning phase and the commands it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub message: &'static str,
    pub commands: Vec<Vec<String>>,
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn project_spec(config: &Config) -> String {
    let root = path_arg(&config.root);
    if config.extras.is_empty() {
        root
    } else {
        format!("{root}[{}]", config.extras.join(","))
    }
}

/// Commands that (re)build `context`'s environment.
///
/// `interpreter` is the runtime the environment is created from; for `uv`
/// it may be `None`, in which case `uv` locates (or downloads) the version
/// itself.
pub fn provision_plan(
    context: &Context,
    config: &Config,
    interpreter: Option<&Path>,
    requirements: &[PathBuf],
    install_project: bool,
    uv: &str,
) -> Vec<Phase> {
    let venv = path_arg(&context.venv);
    let venv_python = path_arg(&context.venv_python());
    let prompt = format!("multirun-{}", context.version);
    let requirement_args = requirements
        .iter()
        .flat_map(|r| ["-r".to_string(), path_arg(r)]);

    let mut phases = Vec::new();
    match context.builder {
        Builder::Uv => {
            let python = interpreter
                .map(path_arg)
                .unwrap_or_else(|| context.version.to_string());
            phases.push(Phase {
                message: "creating virtualenv",
                commands: vec![vec![
                    uv.into(), "venv".into(), "--clear".into(), "--python".into(), python,
                    "--prompt".into(), prompt, venv,
                ]],
            });
            let install = |extra: Vec<String>| {
                let mut argv: Vec<String> = vec![
                    uv.into(), "pip".into(), "install".into(), "--python".into(),
                    venv_python.clone(), "-U".into(),
                ];
                argv.extend(extra);
                argv
            };
            phases.push(Phase {
                message: "installing requirements",
                commands: if requirements.is_empty() {
                    Vec::new()
                } else {
                    vec![install(requirement_args.collect())]
                },
            });
            phases.push(Phase {
                message: "installing project",
                commands: if install_project {
                    vec![install(vec!["-e".into(), project_spec(config)])]
                } else {
                    Vec::new()
                },
            });
        }
        Builder::Pip | Builder::Auto => {
            let python = interpreter.map(path_arg).unwrap_or_else(|| "python".to_string());
            phases.push(Phase {
                message: "creating virtualenv",
                commands: vec![vec![
                    python, "-m".into(), "venv".into(), "--clear".into(), "--prompt".into(),
                    prompt, venv,
                ]],
            });
            let pip = |extra: Vec<String>| {
                let mut argv: Vec<String> = vec![
                    venv_python.clone(), "-m".into(), "pip".into(), "install".into(), "-U".into(),
                ];
                argv.extend(extra);
                argv
            };
            phases.push(Phase {
                message: "upgrading pip",
                commands: vec![pip(vec!["pip".into()])],
            });
            phases.push(Phase {
                message: "installing requirements",
                commands: if requirements.is_empty() {
                    Vec::new()
                } else {
                    vec![pip(requirement_args.collect())]
                },
            });
            phases.push(Phase {
                message: "installing project",
                commands: if install_project {
                    vec![pip(vec!["-e".into(), project_spec(config)])]
                } else {
                    Vec::new()
                },
            });
        }
    }
    phases
}

/// Provisioner that runs `venv`/`pip` or `uv` as subprocesses.
#[derive(Clone)]
pub struct RealProvisioner {
    probe: Arc<dyn RuntimeProbe>,
    fs: Arc<dyn FileSystem>,
    timings: Arc<Timings>,
}

impl RealProvisioner {
    pub fn new(probe: Arc<dyn RuntimeProbe>, fs: Arc<dyn FileSystem>, timings: Arc<Timings>) -> Self {
        Self { probe, fs, timings }
    }

    /// Interpreter to build the environment from.
    async fn base_interpreter(&self, context: &Context) -> Result<Option<PathBuf>> {
        if let Some(path) = &context.interpreter {
            return Ok(Some(path.clone()));
        }
        if context.live {
            let (path, _) = host_runtime(self.probe.as_ref())
                .await
                .ok_or_else(|| anyhow!("no host interpreter found"))?;
            return Ok(Some(path));
        }
        match context.builder {
            Builder::Uv => Ok(None),
            _ => Err(anyhow!("no interpreter for Python {}", context.version)),
        }
    }

    /// Point the context at the environment's own interpreter, if present.
    async fn finalize(&self, context: &Context) -> Context {
        match self.probe.which("python", Some(&context.bin_dir())) {
            Some(python) => {
                let version = self.probe.version(&python).await;
                context.with_interpreter(python, version)
            }
            None => context.clone(),
        }
    }

    async fn prepare(&self, context: &Context, config: &Config, events: &EventSender) -> Result<Context> {
        if !needs_update(context, config, self.fs.as_ref()) {
            debug!(venv = %context.venv.display(), "reusing existing environment");
            return Ok(self.finalize(context).await);
        }

        info!(venv = %context.venv.display(), builder = %context.builder, "preparing environment");
        let interpreter = self.base_interpreter(context).await?;
        let requirements = project_requirements(config, self.fs.as_ref());
        let install_project =
            self.fs.is_file(&config.root.join(PYPROJECT)) || self.fs.is_file(&config.root.join("setup.py"));
        let uv = self
            .probe
            .which(UV, None)
            .map(|p| path_arg(&p))
            .unwrap_or_else(|| UV.to_string());

        let shared = Arc::new(context.clone());
        let plan = provision_plan(context, config, interpreter.as_deref(), &requirements, install_project, &uv);
        for phase in plan {
            let _ = events
                .send(Event::VenvCreate {
                    context: Arc::clone(&shared),
                    message: phase.message.to_string(),
                })
                .await;
            for argv in &phase.commands {
                run_checked(argv, None, Some(&config.root)).await?;
            }
        }

        write_marker(context, self.fs.as_ref())?;
        Ok(self.finalize(context).await)
    }
}

impl Provisioner for RealProvisioner {
    fn provision(
        &self,
        context: Arc<Context>,
        config: Arc<Config>,
        events: EventSender,
    ) -> BoxFuture<'static, ()> {
        let this = self.clone();
        Box::pin(async move {
            let _timer = this.timings.start(format!("prepare environment {}", context.version));
            match this.prepare(&context, &config, &events).await {
                Ok(ready) => {
                    let _ = events
                        .send(Event::VenvReady {
                            context: Arc::new(ready),
                        })
                        .await;
                }
                Err(err) => {
                    error!(context = %context.version, error = %err, "provisioning failed");
                    let _ = events
                        .send(Event::VenvError {
                            context,
                            error: format!("{err:#}"),
                        })
                        .await;
                }
            }
        })
    }
}
