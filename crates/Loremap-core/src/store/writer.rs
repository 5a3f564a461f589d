use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

use super::CacheStore;

enum CacheCommand {
    Set { key: String, value: String },
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget writes to a [`CacheStore`].
///
/// A single task drains the queue, so writes land in the order they were enqueued and
/// an older blob never overwrites a newer one. Failures are logged and counted.
#[derive(Clone)]
pub struct CacheWriter {
    tx: mpsc::UnboundedSender<CacheCommand>,
    failures: Arc<AtomicUsize>,
}

impl CacheWriter {
    pub fn spawn(cache: Arc<dyn CacheStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<CacheCommand>();
        let failures = Arc::new(AtomicUsize::new(0));
        let failures_clone = failures.clone();

        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                let result = match command {
                    CacheCommand::Set { key, value } => cache
                        .set(&key, &value)
                        .await
                        .map_err(|e| (key, e)),
                    CacheCommand::Flush(done) => {
                        let _ = done.send(());
                        Ok(())
                    }
                };
                if let Err((key, e)) = result {
                    failures_clone.fetch_add(1, Ordering::SeqCst);
                    warn!(key = %key, error = %e, "Failed to write cache entry");
                }
            }
        });

        Self { tx, failures }
    }

    pub fn set(&self, key: &str, value: String) {
        self.enqueue(CacheCommand::Set {
            key: key.to_string(),
            value,
        });
    }

    /// Resolves once every write queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.enqueue(CacheCommand::Flush(done));
        let _ = wait.await;
    }

    /// Number of writes that failed since the writer started.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    fn enqueue(&self, command: CacheCommand) {
        if self.tx.send(command).is_err() {
            error!("Cache writer task is gone; dropping write");
        }
    }
}
