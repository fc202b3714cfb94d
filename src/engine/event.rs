// src/engine/event.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::env::Context;
use crate::exec::{CommandResult, Step};

/// Everything observable about a run, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A new watch-mode run is starting; renderers should clear their state.
    Reset,
    /// The run finished with at least one failure.
    Fail,
    /// Provisioning progress for one context.
    VenvCreate { context: Arc<Context>, message: String },
    /// The environment is usable. Carries the finalized context.
    VenvReady { context: Arc<Context> },
    /// Provisioning failed; no jobs run for this context.
    VenvError { context: Arc<Context>, error: String },
    /// A step is about to run.
    Start { context: Arc<Context>, step: Arc<Step> },
    /// A step finished.
    Result {
        context: Arc<Context>,
        step: Arc<Step>,
        result: CommandResult,
    },
}

impl Event {
    pub fn context(&self) -> Option<&Arc<Context>> {
        match self {
            Event::Reset | Event::Fail => None,
            Event::VenvCreate { context, .. }
            | Event::VenvReady { context }
            | Event::VenvError { context, .. }
            | Event::Start { context, .. }
            | Event::Result { context, .. } => Some(context),
        }
    }

    /// Failed step results and provisioning errors.
    pub fn is_failure(&self) -> bool {
        match self {
            Event::VenvError { .. } => true,
            Event::Result { result, .. } => result.error(),
            _ => false,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Reset => f.write_str("reset"),
            Event::Fail => f.write_str("FAIL"),
            Event::VenvCreate { context, message } => write!(f, "{}> {message}", context.version),
            Event::VenvReady { context } => write!(f, "{}> ready", context.version),
            Event::VenvError { context, error } => write!(f, "{}> {error}", context.version),
            Event::Start { step, .. } => write!(f, "{step}"),
            Event::Result { step, result, .. } => {
                let status = if result.success() { "OK" } else { "FAIL" };
                write!(f, "{step} {status}")
            }
        }
    }
}

pub type EventSender = mpsc::Sender<Event>;
pub type EventReceiver = mpsc::Receiver<Event>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Job;
    use crate::types::Builder;

    #[test]
    fn display_matches_progress_lines() {
        let context = Arc::new(Context::new(
            "3.4".parse().unwrap(),
            None,
            "/p/.multirun/venv/3.4".into(),
            Builder::Pip,
        ));
        let step = Arc::new(Step {
            argv: vec!["/bin/echo".into(), "bar".into()],
            job: Arc::new(Job::new("foo", ["echo bar"])),
            context: Arc::clone(&context),
        });

        let create = Event::VenvCreate {
            context: Arc::clone(&context),
            message: "creating virtualenv".into(),
        };
        assert_eq!(create.to_string(), "3.4> creating virtualenv");
        assert_eq!(Event::VenvReady { context: Arc::clone(&context) }.to_string(), "3.4> ready");

        let start = Event::Start {
            context: Arc::clone(&context),
            step: Arc::clone(&step),
        };
        assert_eq!(start.to_string(), "3.4 foo> /bin/echo bar");

        let result = Event::Result {
            context,
            step,
            result: CommandResult {
                exit_code: 1,
                stdout: String::new(),
                stderr: String::new(),
            },
        };
        assert_eq!(result.to_string(), "3.4 foo> /bin/echo bar FAIL");
        assert!(result.is_failure());
        assert!(!start.is_failure());
    }
}
