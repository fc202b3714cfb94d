// src/engine/fanin.rs

//! Merge several concurrent producers into one stream, by readiness.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::warn;

const CAPACITY: usize = 64;

/// Fan-in of N producer tasks into one ordered consumer.
///
/// Every producer gets its own clone of a shared sender; items are yielded
/// in the order they become ready, so a producer's own items keep their
/// order but there is no ordering across producers.
///
/// All producers must be spawned before the first call to [`FanIn::next`].
/// Dropping the `FanIn` aborts any producer that is still running.
pub struct FanIn<T> {
    tx: Option<mpsc::Sender<T>>,
    rx: mpsc::Receiver<T>,
    tasks: JoinSet<()>,
}

impl<T: Send + 'static> Default for FanIn<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> FanIn<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(CAPACITY);
        Self {
            tx: Some(tx),
            rx,
            tasks: JoinSet::new(),
        }
    }

    /// Start a producer. It receives the sender to push items into.
    pub fn spawn<F, Fut>(&mut self, producer: F)
    where
        F: FnOnce(mpsc::Sender<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        match &self.tx {
            Some(tx) => {
                self.tasks.spawn(producer(tx.clone()));
            }
            None => warn!("producer spawned after draining started; ignored"),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Next ready item, or `None` once every producer has finished.
    pub async fn next(&mut self) -> Option<T> {
        self.tx.take();
        let item = self.rx.recv().await;
        if item.is_none() {
            while let Some(joined) = self.tasks.join_next().await {
                if let Err(err) = joined
                    && err.is_panic()
                {
                    warn!(error = %err, "producer task panicked");
                }
            }
        }
        item
    }
}
