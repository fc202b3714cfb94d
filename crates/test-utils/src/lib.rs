pub mod builders;
pub mod fake_probe;
pub mod fake_provisioner;

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt};

use multirun::engine::{Event, EventReceiver};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Drain a receiver until every sender is gone.
pub async fn collect_events(mut rx: EventReceiver) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Compact labels for asserting on event sequences, e.g. `start:lint@3.9`.
pub fn event_labels(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .map(|event| match event {
            Event::Reset => "reset".to_string(),
            Event::Fail => "fail".to_string(),
            Event::VenvCreate { context, .. } => format!("create@{}", context.version),
            Event::VenvReady { context } => format!("ready@{}", context.version),
            Event::VenvError { context, .. } => format!("venv-error@{}", context.version),
            Event::Start { context, step } => format!("start:{}@{}", step.job.name, context.version),
            Event::Result {
                context,
                step,
                result,
            } => {
                let status = if result.success() { "ok" } else { "fail" };
                format!("{status}:{}@{}", step.job.name, context.version)
            }
        })
        .collect()
}
