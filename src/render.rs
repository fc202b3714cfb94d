// src/render.rs

//! Minimal line-oriented event rendering.

use std::io::Write;

use crate::engine::Event;

/// Sink for the event stream.
pub trait Renderer: Send {
    fn render(&mut self, event: &Event);
}

/// Collects events; handy in tests and for post-processing.
impl Renderer for Vec<Event> {
    fn render(&mut self, event: &Event) {
        self.push(event.clone());
    }
}

/// Prints one line per event, plus captured output for failed steps and
/// for jobs with `show_output`.
pub struct LineRenderer<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> LineRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_event(&mut self, event: &Event) -> std::io::Result<()> {
        match event {
            Event::Reset => {}
            Event::Result { step, result, .. } => {
                writeln!(self.out, "{event}")?;
                if result.error() || step.job.show_output {
                    if result.error() {
                        writeln!(self.out, "  exit code: {}", result.exit_code)?;
                    }
                    for (label, text) in [("stdout", &result.stdout), ("stderr", &result.stderr)] {
                        if text.trim().is_empty() {
                            continue;
                        }
                        writeln!(self.out, "  {label}:")?;
                        for line in text.lines() {
                            writeln!(self.out, "    {line}")?;
                        }
                    }
                }
            }
            _ => writeln!(self.out, "{event}")?,
        }
        self.out.flush()
    }
}

impl<W: Write + Send> Renderer for LineRenderer<W> {
    fn render(&mut self, event: &Event) {
        if let Err(err) = self.write_event(event) {
            tracing::warn!(error = %err, "failed to render event");
        }
    }
}
