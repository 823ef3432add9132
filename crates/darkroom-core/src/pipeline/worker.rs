//! Bounded event queue and the worker pool draining it.
//!
//! The [`Pipeline`] owns the only strong sender of the queue. Producer
//! handles hold a weak sender, so dropping the pipeline's sender during
//! [`Pipeline::shutdown`] closes the queue for everyone at once while the
//! workers keep draining what was already accepted.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::processor::EventProcessor;
use crate::config::PipelineConfig;
use crate::types::{EventReport, UploadEvent};

type ReportCallback = Arc<dyn Fn(EventReport) + Send + Sync>;

/// Create the bounded event queue with the configured capacity.
///
/// When the queue is full, `enqueue` waits, providing backpressure to the
/// notification side.
pub fn bounded_channel<T>(config: &PipelineConfig) -> (mpsc::Sender<T>, mpsc::Receiver<T>) {
    mpsc::channel(config.queue_capacity)
}

/// Why an event was not accepted. The event is handed back.
#[derive(Error, Debug)]
pub enum EnqueueError {
    #[error("event queue is full")]
    QueueFull(UploadEvent),

    #[error("event queue is closed")]
    Closed(UploadEvent),
}

impl EnqueueError {
    /// Take back the rejected event.
    pub fn into_event(self) -> UploadEvent {
        match self {
            EnqueueError::QueueFull(event) | EnqueueError::Closed(event) => event,
        }
    }
}

/// Counts of events finished by the workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub published: usize,
    pub quarantined: usize,
}

impl DrainSummary {
    pub fn total(&self) -> usize {
        self.published + self.quarantined
    }

    fn record(&mut self, report: &EventReport) {
        if report.is_published() {
            self.published += 1;
        } else {
            self.quarantined += 1;
        }
    }

    fn merge(&mut self, other: DrainSummary) {
        self.published += other.published;
        self.quarantined += other.quarantined;
    }
}

/// Cloneable producer side of the queue.
#[derive(Clone)]
pub struct PipelineHandle {
    sender: mpsc::WeakSender<UploadEvent>,
}

impl PipelineHandle {
    /// Enqueue an event, waiting for capacity.
    pub async fn enqueue(&self, event: UploadEvent) -> Result<(), EnqueueError> {
        let Some(sender) = self.sender.upgrade() else {
            return Err(EnqueueError::Closed(event));
        };
        sender
            .send(event)
            .await
            .map_err(|e| EnqueueError::Closed(e.0))
    }

    /// Enqueue an event without waiting.
    pub fn try_enqueue(&self, event: UploadEvent) -> Result<(), EnqueueError> {
        let Some(sender) = self.sender.upgrade() else {
            return Err(EnqueueError::Closed(event));
        };
        sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(event) => EnqueueError::QueueFull(event),
            mpsc::error::TrySendError::Closed(event) => EnqueueError::Closed(event),
        })
    }
}

/// A running worker pool.
pub struct Pipeline {
    sender: mpsc::Sender<UploadEvent>,
    workers: Vec<JoinHandle<DrainSummary>>,
}

impl Pipeline {
    /// Create the queue and spawn `config.workers` workers sharing it.
    ///
    /// `on_report` is called once per finished event, from the worker that
    /// processed it.
    pub fn start<F>(processor: Arc<EventProcessor>, config: &PipelineConfig, on_report: F) -> Self
    where
        F: Fn(EventReport) + Send + Sync + 'static,
    {
        let (sender, receiver) = bounded_channel(config);
        let receiver = Arc::new(Mutex::new(receiver));
        let on_report: ReportCallback = Arc::new(on_report);

        let workers = (0..config.workers.max(1))
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    processor.clone(),
                    receiver.clone(),
                    on_report.clone(),
                ))
            })
            .collect();

        tracing::debug!(
            workers = config.workers,
            capacity = config.queue_capacity,
            "Pipeline started"
        );
        Self { sender, workers }
    }

    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle {
            sender: self.sender.downgrade(),
        }
    }

    /// Stop accepting events, drain the queue and wait for every worker.
    pub async fn shutdown(self) -> DrainSummary {
        tracing::debug!("Pipeline shutting down, draining queue");
        drop(self.sender);

        let mut summary = DrainSummary::default();
        for worker in self.workers {
            match worker.await {
                Ok(stats) => summary.merge(stats),
                Err(e) => tracing::error!(error = %e, "Worker task failed"),
            }
        }
        tracing::info!(
            published = summary.published,
            quarantined = summary.quarantined,
            "Pipeline drained"
        );
        summary
    }
}

async fn run_worker(
    id: usize,
    processor: Arc<EventProcessor>,
    receiver: Arc<Mutex<mpsc::Receiver<UploadEvent>>>,
    on_report: ReportCallback,
) -> DrainSummary {
    let mut stats = DrainSummary::default();
    loop {
        // The lock is only held while waiting for the next event
        let next = receiver.lock().await.recv().await;
        let Some(event) = next else {
            break;
        };
        let report = processor.process(event).await;
        stats.record(&report);
        on_report(report);
    }
    tracing::trace!(worker = id, processed = stats.total(), "Worker exiting");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::test_images::jpeg_bytes;
    use crate::records::MemoryRecordStore;
    use crate::storage::{MemoryObjectStore, ObjectStore, StorageError, StorageResult};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Semaphore;

    /// Blocks every read until the test hands out permits.
    struct GatedStore {
        inner: MemoryObjectStore,
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl ObjectStore for GatedStore {
        async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>> {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            self.inner.get_object(key).await
        }

        async fn put_object(
            &self,
            key: &str,
            data: Vec<u8>,
            content_type: &str,
        ) -> StorageResult<()> {
            self.inner.put_object(key, data, content_type).await
        }

        async fn move_object(&self, from: &str, to: &str) -> StorageResult<()> {
            self.inner.move_object(from, to).await
        }

        async fn exists(&self, key: &str) -> StorageResult<bool> {
            self.inner.exists(key).await
        }

        async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
            self.inner.list(prefix).await
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.derivatives.tile_widths = vec![8];
        config.derivatives.thumbnail_widths = vec![];
        config.derivatives.blur_long_side = 4;
        config
    }

    fn event(n: usize) -> UploadEvent {
        UploadEvent::new(
            "gallery",
            format!("staging/00000000-0000-4000-8000-{n:012}.jpg"),
            0,
        )
    }

    #[tokio::test]
    async fn test_try_enqueue_reports_queue_full() {
        let mut config = test_config();
        config.pipeline.queue_capacity = 1;
        config.pipeline.workers = 1;

        let gate = Arc::new(Semaphore::new(0));
        let store = GatedStore {
            inner: MemoryObjectStore::new(),
            gate: gate.clone(),
        };
        let processor = Arc::new(EventProcessor::new(
            &config,
            Arc::new(store),
            Arc::new(MemoryRecordStore::new()),
        ));
        let pipeline = Pipeline::start(processor, &config.pipeline, |_| {});
        let handle = pipeline.handle();

        // The worker takes the first event and blocks on the gate; the second
        // one then occupies the only slot.
        handle.enqueue(event(1)).await.unwrap();
        handle.enqueue(event(2)).await.unwrap();

        let err = handle.try_enqueue(event(3)).unwrap_err();
        assert!(matches!(err, EnqueueError::QueueFull(_)));
        assert_eq!(err.into_event().key, event(3).key);

        gate.add_permits(16);
        let summary = pipeline.shutdown().await;
        // Nothing was staged, so both events fail to load
        assert_eq!(summary, DrainSummary { published: 0, quarantined: 2 });
    }

    #[tokio::test]
    async fn test_shutdown_drains_enqueued_events() {
        let mut config = test_config();
        config.pipeline.queue_capacity = 8;
        config.pipeline.workers = 2;

        let store = MemoryObjectStore::new();
        for n in 0..5 {
            store.insert(&event(n).key, jpeg_bytes(24, 16), "image/jpeg");
        }
        let processor = Arc::new(EventProcessor::new(
            &config,
            Arc::new(store.clone()),
            Arc::new(MemoryRecordStore::new()),
        ));

        let reports = Arc::new(StdMutex::new(Vec::new()));
        let sink = reports.clone();
        let pipeline = Pipeline::start(processor, &config.pipeline, move |report| {
            sink.lock().unwrap().push(report);
        });

        let handle = pipeline.handle();
        for n in 0..5 {
            handle.enqueue(event(n)).await.unwrap();
        }
        let summary = pipeline.shutdown().await;

        assert_eq!(summary, DrainSummary { published: 5, quarantined: 0 });
        assert_eq!(reports.lock().unwrap().len(), 5);
        assert!(store.list("staging").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_is_closed() {
        let config = test_config();
        let processor = Arc::new(EventProcessor::new(
            &config,
            Arc::new(MemoryObjectStore::new()),
            Arc::new(MemoryRecordStore::new()),
        ));
        let pipeline = Pipeline::start(processor, &config.pipeline, |_| {});
        let handle = pipeline.handle();
        let clone = handle.clone();

        assert_eq!(pipeline.shutdown().await.total(), 0);
        assert!(matches!(
            handle.try_enqueue(event(1)),
            Err(EnqueueError::Closed(_))
        ));
        assert!(matches!(
            clone.enqueue(event(2)).await,
            Err(EnqueueError::Closed(_))
        ));
    }
}
