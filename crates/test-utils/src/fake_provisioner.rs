use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use multirun::config::Config;
use multirun::engine::{Event, EventSender};
use multirun::env::{Context, Provisioner};
use multirun::types::BoxFuture;

/// A fake provisioner that:
/// - records which contexts were provisioned
/// - emits `VenvCreate` then `VenvReady`, or `VenvError` for versions marked
///   as failing, without running any subprocess.
#[derive(Clone, Default)]
pub struct FakeProvisioner {
    failing: Arc<HashSet<String>>,
    delay: Duration,
    calls: Arc<Mutex<Vec<Context>>>,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail provisioning for contexts whose version renders as `version`.
    pub fn failing(mut self, version: &str) -> Self {
        let mut failing = (*self.failing).clone();
        failing.insert(version.to_string());
        self.failing = Arc::new(failing);
        self
    }

    /// Sleep between the progress event and the final event.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Context> {
        self.calls.lock().unwrap().clone()
    }
}

impl Provisioner for FakeProvisioner {
    fn provision(
        &self,
        context: Arc<Context>,
        _config: Arc<Config>,
        events: EventSender,
    ) -> BoxFuture<'static, ()> {
        self.calls.lock().unwrap().push((*context).clone());
        let fail = self.failing.contains(&context.version.to_string());
        let delay = self.delay;

        Box::pin(async move {
            let _ = events
                .send(Event::VenvCreate {
                    context: Arc::clone(&context),
                    message: "creating virtualenv".to_string(),
                })
                .await;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let event = if fail {
                Event::VenvError {
                    context,
                    error: "simulated provisioning failure".to_string(),
                }
            } else {
                Event::VenvReady { context }
            };
            let _ = events.send(event).await;
        })
    }
}
