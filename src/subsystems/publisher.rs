//! Periodic name-record republisher.
//!
//! # Responsibilities
//! - Republish a record for every key in the key store on an interval
//! - Stop cleanly on request, joining the background task
//!
//! # Design Decisions
//! - One background task per start; stop signals it over a broadcast channel
//!   and waits for it to exit
//! - A republish pass runs immediately on start, then every interval

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::error::{Subsystem, SubsystemError};
use crate::subsystems::{KeyStore, Lifecycle, NamePublisher};

struct Running {
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

pub struct IntervalRepublisher {
    key_store: Arc<dyn KeyStore>,
    interval: Duration,
    published: Arc<AtomicU64>,
    running: Mutex<Option<Running>>,
}

impl IntervalRepublisher {
    pub fn new(key_store: Arc<dyn KeyStore>, interval: Duration) -> Self {
        Self {
            key_store,
            interval,
            published: Arc::new(AtomicU64::new(0)),
            running: Mutex::new(None),
        }
    }

    /// Total records republished across all runs.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().map(|r| r.is_some()).unwrap_or(false)
    }
}

async fn republish_loop(
    key_store: Arc<dyn KeyStore>,
    interval: Duration,
    published: Arc<AtomicU64>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Name republisher starting");
    let mut ticker = time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let keys = key_store.list();
                for key in &keys {
                    tracing::trace!(key = %key.name, id = %key.id, "Republishing record");
                }
                published.fetch_add(keys.len() as u64, Ordering::Relaxed);
            }
            _ = shutdown.recv() => {
                tracing::info!("Name republisher received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

impl NamePublisher for IntervalRepublisher {
    fn start(&self) -> Lifecycle<'_> {
        async move {
            let mut running = self
                .running
                .lock()
                .map_err(|_| SubsystemError::new(Subsystem::NamePublisher, "state lock poisoned"))?;
            if running.is_some() {
                return Ok(());
            }

            let (shutdown, rx) = broadcast::channel(1);
            let task = tokio::spawn(republish_loop(
                self.key_store.clone(),
                self.interval,
                self.published.clone(),
                rx,
            ));
            *running = Some(Running { shutdown, task });
            Ok(())
        }
        .boxed()
    }

    fn stop(&self) -> Lifecycle<'_> {
        async move {
            let running = self
                .running
                .lock()
                .map_err(|_| SubsystemError::new(Subsystem::NamePublisher, "state lock poisoned"))?
                .take();

            let Some(Running { shutdown, task }) = running else {
                return Ok(());
            };
            let _ = shutdown.send(());
            task.await
                .map_err(|e| SubsystemError::new(Subsystem::NamePublisher, e.to_string()))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::MemoryKeyStore;
    use crate::types::PeerId;

    #[tokio::test]
    async fn test_republishes_until_stopped() {
        let keys = Arc::new(MemoryKeyStore::new(PeerId::from("self-peer")));
        let publisher = IntervalRepublisher::new(keys, Duration::from_millis(10));

        publisher.start().await.unwrap();
        assert!(publisher.is_running());
        time::sleep(Duration::from_millis(35)).await;

        publisher.stop().await.unwrap();
        assert!(!publisher.is_running());
        let published = publisher.published();
        assert!(published >= 1);

        time::sleep(Duration::from_millis(30)).await;
        assert_eq!(publisher.published(), published);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let keys = Arc::new(MemoryKeyStore::new(PeerId::from("self-peer")));
        let publisher = IntervalRepublisher::new(keys, Duration::from_secs(60));
        assert!(publisher.stop().await.is_ok());
    }
}
