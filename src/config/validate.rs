// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{Config, Job, RawConfig, RawJob};
use crate::errors::{MultirunError, Result};
use crate::version::Version;

impl Config {
    /// Turn a deserialized `[tool.multirun]` table into a validated config.
    pub fn from_raw(raw: RawConfig, root: &Path) -> Result<Self> {
        let mut jobs = BTreeMap::new();
        for (name, raw_job) in raw.jobs {
            let job = parse_job(&name, raw_job);
            if jobs.contains_key(&job.name) {
                return Err(MultirunError::ConfigError(format!(
                    "tool.multirun.jobs: job {:?} is defined more than once",
                    job.name
                )));
            }
            jobs.insert(job.name.clone(), Arc::new(job));
        }

        let versions = parse_versions(raw.python_versions.into_vec())?;
        let values = parse_values(raw.values)?;

        let config = Config {
            root: root.to_path_buf(),
            jobs,
            default: raw.default.into_vec().iter().map(|d| d.to_lowercase()).collect(),
            values,
            versions,
            requirements: raw.requirements.into_vec(),
            extras: raw.extras.into_vec(),
            watch_paths: raw
                .watch_paths
                .into_vec()
                .into_iter()
                .map(|p| root.join(p))
                .collect(),
            builder: raw.builder,
        };

        validate_config(&config)?;
        Ok(config)
    }
}

fn parse_job(name: &str, raw: RawJob) -> Job {
    let mut job = Job::new(name, Vec::<String>::new());
    match raw {
        RawJob::Command(cmd) => job.run = vec![cmd],
        RawJob::Commands(cmds) => job.run = cmds,
        RawJob::Table(table) => {
            job.run = table.run.into_vec();
            job.requires = table
                .requires
                .into_vec()
                .iter()
                .map(|r| r.to_lowercase())
                .collect();
            job.once = table.once;
            job.parallel = table.parallel;
            job.show_output = table.show_output;
        }
    }
    job
}

/// Parse, de-duplicate and sort newest first.
fn parse_versions(raw: Vec<String>) -> Result<Vec<Version>> {
    let mut versions = BTreeSet::new();
    for value in raw {
        let version = value.parse::<Version>().map_err(|err| {
            MultirunError::ConfigError(format!("tool.multirun.python_versions: {err}"))
        })?;
        versions.insert(version);
    }
    Ok(versions.into_iter().rev().collect())
}

fn parse_values(raw: BTreeMap<String, toml::Value>) -> Result<BTreeMap<String, String>> {
    raw.into_iter()
        .map(|(key, value)| {
            let text = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Datetime(d) => d.to_string(),
                other => {
                    return Err(MultirunError::ConfigError(format!(
                        "tool.multirun.{key}: template values must be scalars; {} given",
                        other.type_str()
                    )));
                }
            };
            Ok((key, text))
        })
        .collect()
}

/// Check job references and the requirement graph.
pub fn validate_config(config: &Config) -> Result<()> {
    for name in &config.default {
        if !config.jobs.contains_key(name) {
            return Err(MultirunError::ConfigError(format!(
                "tool.multirun.default: undefined job {name:?}"
            )));
        }
    }

    for (name, job) in &config.jobs {
        for require in &job.requires {
            if !config.jobs.contains_key(require) {
                return Err(MultirunError::ConfigError(format!(
                    "tool.multirun.jobs.{name}.requires: undefined job {require:?}"
                )));
            }
        }
    }

    validate_requirement_graph(config)
}

fn validate_requirement_graph(config: &Config) -> Result<()> {
    // Edge direction: requirement -> dependent job.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in config.jobs.keys() {
        graph.add_node(name.as_str());
    }
    for (name, job) in &config.jobs {
        for require in &job.requires {
            graph.add_edge(require.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_) => Ok(()),
        Err(cycle) => Err(MultirunError::JobCycle(format!(
            "requirement cycle involving job {:?}",
            cycle.node_id()
        ))),
    }
}
