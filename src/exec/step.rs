// src/exec/step.rs

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, Job};
use crate::env::Context;
use crate::errors::Result;

use super::command::{CommandResult, command_line, run_command};
use super::render::{check_template, render_command};

/// One rendered command bound to a job and a context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Step {
    pub argv: Vec<String>,
    pub job: Arc<Job>,
    pub context: Arc<Context>,
}

impl Step {
    /// Execute the command inside the step's environment.
    pub async fn run(&self, cwd: &Path) -> CommandResult {
        run_command(&self.argv, Some(&self.context), Some(cwd)).await
    }

    pub fn command_line(&self) -> String {
        command_line(&self.argv)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}> {}", self.context.version, self.job.name, self.command_line())
    }
}

/// Render every command of `job` for `context`, resolving programs inside
/// its environment.
///
/// Needs a provisioned context; template errors are caught earlier by
/// [`check_job`].
pub fn prepare_job(job: &Arc<Job>, context: &Arc<Context>, config: &Config) -> Result<Vec<Arc<Step>>> {
    job.run
        .iter()
        .map(|template| {
            Ok(Arc::new(Step {
                argv: render_command(template, context, config)?,
                job: Arc::clone(job),
                context: Arc::clone(context),
            }))
        })
        .collect()
}

/// Render every template of `job` for each of `contexts` and report the
/// first failure.
pub fn check_job(job: &Job, contexts: &[Context], config: &Config) -> Result<()> {
    for context in contexts {
        for template in &job.run {
            check_template(template, context, config)?;
        }
    }
    Ok(())
}
