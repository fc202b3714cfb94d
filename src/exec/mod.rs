// src/exec/mod.rs

//! Command rendering and subprocess execution.
//!
//! - [`render`] turns templates into argv vectors.
//! - [`command`] runs a subprocess and captures its output.
//! - [`step`] binds a rendered command to a job and a context.

pub mod command;
pub mod render;
pub mod step;

pub use command::{CommandError, CommandResult, command_line, run_checked, run_command};
pub use render::{check_template, render_command, render_template, template_values, which};
pub use step::{Step, check_job, prepare_job};
