// tests/job_graph.rs

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use multirun::config::{Config, Job, validate_config};
use multirun::dag::resolve_jobs;
use multirun::errors::MultirunError;
use multirun_test_utils::builders::{ConfigBuilder, JobBuilder};

fn release_config() -> Config {
    ConfigBuilder::new("/project")
        .with_job(JobBuilder::new("test", &["pytest"]).build())
        .with_job(JobBuilder::new("lint", &["flake8"]).build())
        .with_job(
            JobBuilder::new("publish", &["twine upload dist/*"])
                .requires("test")
                .requires("lint")
                .once()
                .build(),
        )
        .with_default("test")
        .build()
}

fn names(queue: &[Arc<Job>]) -> Vec<&str> {
    queue.iter().map(|j| j.name.as_str()).collect()
}

#[test]
fn requirements_run_before_the_requested_job() {
    let config = release_config();
    let queue = resolve_jobs(&["publish".into()], &config).unwrap();
    assert_eq!(names(&queue), ["test", "lint", "publish"]);
}

#[test]
fn jobs_requested_twice_are_queued_once() {
    let config = release_config();
    let queue = resolve_jobs(&["lint".into(), "publish".into(), "LINT".into()], &config).unwrap();
    assert_eq!(names(&queue), ["lint", "test", "publish"]);
}

#[test]
fn unknown_job_is_reported_by_name() {
    let config = release_config();
    let err = resolve_jobs(&["deploy".into()], &config).unwrap_err();
    assert!(matches!(err, MultirunError::UnknownJob(ref name) if name == "deploy"));
    assert!(err.is_config_error());
}

#[test]
fn requirement_cycles_are_rejected() {
    let mut config = Config::new("/project");
    for (name, requires) in [("a", "b"), ("b", "c"), ("c", "a")] {
        let mut job = Job::new(name, ["true"]);
        job.requires.push(requires.to_string());
        config.jobs.insert(job.name.clone(), Arc::new(job));
    }

    let err = resolve_jobs(&["a".into()], &config).unwrap_err();
    assert!(matches!(err, MultirunError::JobCycle(ref path) if path == "a -> b -> c -> a"));

    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, MultirunError::JobCycle(_)));
}

/// Acyclic configs where job N may only require jobs 0..N.
fn dag_config_strategy(max_jobs: usize) -> impl Strategy<Value = Config> {
    (1..=max_jobs).prop_flat_map(|num_jobs| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..num_jobs), num_jobs)
            .prop_map(move |raw_deps| {
                let mut builder = ConfigBuilder::new("/project");
                for (i, potential) in raw_deps.into_iter().enumerate() {
                    let name = format!("job_{i}");
                    let mut job = JobBuilder::new(&name, &["true"]);
                    if i > 0 {
                        let deps: HashSet<usize> = potential.into_iter().map(|d| d % i).collect();
                        for dep in deps {
                            job = job.requires(&format!("job_{dep}"));
                        }
                    }
                    builder = builder.with_job(job.build());
                }
                builder.build()
            })
    })
}

proptest! {
    #[test]
    fn queue_respects_requirements_and_has_no_duplicates(
        config in dag_config_strategy(10),
        picks in proptest::collection::vec(0..10usize, 1..4),
    ) {
        let requested: Vec<String> = picks
            .into_iter()
            .map(|i| format!("job_{}", i % config.jobs.len()))
            .collect();
        let queue = resolve_jobs(&requested, &config).unwrap();
        let order = names(&queue);

        let unique: HashSet<&str> = order.iter().copied().collect();
        prop_assert_eq!(unique.len(), order.len());

        for name in &requested {
            prop_assert!(order.contains(&name.as_str()));
        }
        for (pos, job) in queue.iter().enumerate() {
            for dep in &job.requires {
                let dep_pos = order.iter().position(|n| n == dep);
                prop_assert!(matches!(dep_pos, Some(p) if p < pos));
            }
        }
    }
}
