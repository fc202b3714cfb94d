// src/dag/resolve.rs

//! Expand requested job names into an execution queue.

use std::sync::Arc;

use tracing::debug;

use crate::config::{Config, Job};
use crate::errors::{MultirunError, Result};

/// Resolve `names` (plus their transitive `requires`) into an ordered,
/// de-duplicated queue where every job appears after its requirements.
///
/// Expansion is depth-first in request order, so the result is
/// deterministic for a fixed config. Unknown names fail with
/// [`MultirunError::UnknownJob`]; requirement cycles with
/// [`MultirunError::JobCycle`].
pub fn resolve_jobs(names: &[String], config: &Config) -> Result<Vec<Arc<Job>>> {
    let mut queue: Vec<Arc<Job>> = Vec::new();
    let mut visiting: Vec<String> = Vec::new();

    for name in names {
        visit(&name.to_lowercase(), config, &mut visiting, &mut queue)?;
    }

    debug!(
        queue = ?queue.iter().map(|j| j.name.as_str()).collect::<Vec<_>>(),
        "resolved job queue"
    );
    Ok(queue)
}

fn visit(
    name: &str,
    config: &Config,
    visiting: &mut Vec<String>,
    queue: &mut Vec<Arc<Job>>,
) -> Result<()> {
    if queue.iter().any(|job| job.name == name) {
        return Ok(());
    }

    if let Some(pos) = visiting.iter().position(|n| n == name) {
        let mut path: Vec<&str> = visiting[pos..].iter().map(String::as_str).collect();
        path.push(name);
        return Err(MultirunError::JobCycle(path.join(" -> ")));
    }

    let job = config
        .jobs
        .get(name)
        .ok_or_else(|| MultirunError::UnknownJob(name.to_string()))?;

    visiting.push(name.to_string());
    for require in &job.requires {
        visit(&require.to_lowercase(), config, visiting, queue)?;
    }
    visiting.pop();

    queue.push(Arc::clone(job));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(jobs: &[(&str, &[&str])]) -> Config {
        let mut config = Config::new("/p");
        for (name, requires) in jobs {
            let mut job = Job::new(name, ["true"]);
            job.requires = requires.iter().map(|r| r.to_string()).collect();
            config.jobs.insert(job.name.clone(), Arc::new(job));
        }
        config
    }

    fn names(queue: &[Arc<Job>]) -> Vec<&str> {
        queue.iter().map(|j| j.name.as_str()).collect()
    }

    #[test]
    fn shared_requirement_is_queued_once() {
        let config = config(&[
            ("base", &[]),
            ("test", &["base"]),
            ("lint", &["base"]),
            ("all", &["test", "lint"]),
        ]);
        let queue = resolve_jobs(&["all".into(), "test".into()], &config).unwrap();
        assert_eq!(names(&queue), ["base", "test", "lint", "all"]);
    }

    #[test]
    fn names_are_case_folded() {
        let config = config(&[("test", &[])]);
        let queue = resolve_jobs(&["TEST".into()], &config).unwrap();
        assert_eq!(names(&queue), ["test"]);
    }

    #[test]
    fn cycle_is_reported_with_path() {
        let config = config(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        match resolve_jobs(&["a".into()], &config) {
            Err(MultirunError::JobCycle(path)) => assert_eq!(path, "a -> b -> c -> a"),
            other => panic!("expected a cycle, got {other:?}"),
        }
    }
}
