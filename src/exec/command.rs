// src/exec/command.rs

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::env::Context;

/// Outcome of one subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn error(&self) -> bool {
        !self.success()
    }
}

/// A checked invocation exited non-zero.
#[derive(Debug, Clone, Error)]
#[error("command `{command}` failed with exit code {}: {}", .result.exit_code, .result.stderr.trim())]
pub struct CommandError {
    pub command: String,
    pub result: CommandResult,
}

/// Shell-quoted rendering of an argv, for display and error messages.
pub fn command_line<S: AsRef<str>>(argv: &[S]) -> String {
    shlex::try_join(argv.iter().map(AsRef::as_ref))
        .unwrap_or_else(|_| argv.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" "))
}

/// Run `argv` to completion, capturing stdout and stderr separately.
///
/// When `context` is given, its executable directory is prepended to `PATH`
/// and `VIRTUAL_ENV` points at its environment. Never fails: spawn errors
/// become exit code `-1` with the error text in `stderr`.
///
/// The child is killed if the returned future is dropped before it exits.
pub async fn run_command<S: AsRef<str>>(
    argv: &[S],
    context: Option<&Context>,
    cwd: Option<&Path>,
) -> CommandResult {
    let Some((program, args)) = argv.split_first() else {
        return CommandResult {
            exit_code: -1,
            stdout: String::new(),
            stderr: "empty command".to_string(),
        };
    };

    let mut cmd = Command::new(program.as_ref());
    cmd.args(args.iter().map(AsRef::as_ref))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }

    if let Some(context) = context {
        let mut paths = vec![context.bin_dir()];
        if let Some(existing) = std::env::var_os("PATH") {
            paths.extend(std::env::split_paths(&existing));
        }
        match std::env::join_paths(paths) {
            Ok(path) => {
                cmd.env("PATH", path);
            }
            Err(err) => warn!(error = %err, "could not extend PATH"),
        }
        cmd.env("VIRTUAL_ENV", OsString::from(context.venv.as_os_str()));
        cmd.env_remove("PYTHONHOME");
    }

    let command = command_line(argv);
    debug!(%command, "running command");

    match cmd.output().await {
        Ok(output) => {
            let exit_code = output.status.code().unwrap_or(-1);
            debug!(%command, exit_code, "command finished");
            CommandResult {
                exit_code,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
        }
        Err(err) => {
            warn!(%command, error = %err, "failed to spawn command");
            CommandResult {
                exit_code: -1,
                stdout: String::new(),
                stderr: format!("{}: {err}", program.as_ref()),
            }
        }
    }
}

/// Like [`run_command`], but a non-zero exit is an error.
pub async fn run_checked<S: AsRef<str>>(
    argv: &[S],
    context: Option<&Context>,
    cwd: Option<&Path>,
) -> Result<CommandResult, CommandError> {
    let result = run_command(argv, context, cwd).await;
    if result.error() {
        return Err(CommandError {
            command: command_line(argv),
            result,
        });
    }
    Ok(result)
}
