//! JSON-lines event bus with background delivery.
//!
//! Sends are acknowledged immediately with a fresh event id and queued on an
//! unbounded channel; a spawned writer task appends each event to the sink as
//! one JSON line. `pending_deliveries` counts events queued but not yet
//! written, which is what the lifecycle drains before exiting. Events whose
//! write failed are counted by `failed_deliveries` instead of `written`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use etr_core::{
    DeliveryTracker, EnvironmentDefined, EventBus, EventHandle, SuiteFinished, SuiteStarted,
};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{ExecError, ExecResult};

pub const SUITE_STARTED: &str = "TestSuiteStarted";
pub const ENVIRONMENT_DEFINED: &str = "EnvironmentDefined";
pub const SUITE_FINISHED: &str = "TestSuiteFinished";

#[derive(Debug, Clone, Serialize)]
pub struct EventMeta {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: String,
    pub time: DateTime<Utc>,
}

/// One line of the event log.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub meta: EventMeta,
    /// Link type to target event or context id.
    pub links: BTreeMap<String, String>,
    pub data: serde_json::Value,
}

/// Writes events as JSON lines to an async sink.
pub struct JsonlEventBus {
    sender: mpsc::UnboundedSender<EventEnvelope>,
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    pending: AtomicUsize,
    written: AtomicUsize,
    failed: AtomicUsize,
}

impl JsonlEventBus {
    /// Start delivering to `sink` on a spawned task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<W>(sink: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        tokio::spawn(deliver(sink, receiver, counters.clone()));
        Self { sender, counters }
    }

    /// Append events to the file at `path`, creating it if needed.
    pub async fn to_file(path: &Path) -> ExecResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ExecError::io(parent))?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(ExecError::io(PathBuf::from(path)))?;
        Ok(Self::spawn(file))
    }

    /// Number of events written to the sink so far.
    pub fn written(&self) -> usize {
        self.counters.written.load(Ordering::SeqCst)
    }

    fn publish(
        &self,
        event_type: &str,
        links: BTreeMap<String, String>,
        data: &impl Serialize,
    ) -> ExecResult<EventHandle> {
        let envelope = EventEnvelope {
            meta: EventMeta {
                id: Uuid::new_v4(),
                event_type: event_type.to_string(),
                time: Utc::now(),
            },
            links,
            data: serde_json::to_value(data)?,
        };
        let handle = EventHandle {
            event_id: envelope.meta.id,
            event_type: event_type.to_string(),
        };

        self.counters.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(envelope).is_err() {
            self.counters.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(ExecError::TransportClosed);
        }
        debug!(event_id = %handle.event_id, event_type, "Event queued");
        Ok(handle)
    }
}

async fn deliver<W>(
    mut sink: W,
    mut receiver: mpsc::UnboundedReceiver<EventEnvelope>,
    counters: Arc<Counters>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(envelope) = receiver.recv().await {
        // Settle the outcome before the event stops counting as pending.
        match write_line(&mut sink, &envelope).await {
            Ok(()) => {
                counters.written.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                error!(event_id = %envelope.meta.id, error = %err, "Event could not be written");
            }
        }
        counters.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn write_line<W>(sink: &mut W, envelope: &EventEnvelope) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(envelope)?;
    line.push(b'\n');
    sink.write_all(&line).await?;
    sink.flush().await?;
    Ok(())
}

impl DeliveryTracker for JsonlEventBus {
    fn pending_deliveries(&self) -> usize {
        self.counters.pending.load(Ordering::SeqCst)
    }

    fn failed_deliveries(&self) -> usize {
        self.counters.failed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventBus for JsonlEventBus {
    async fn send_suite_started(&self, event: &SuiteStarted) -> anyhow::Result<EventHandle> {
        let mut links = BTreeMap::from([("CONTEXT".to_string(), event.context.clone())]);
        if let Some(main_suite_id) = &event.main_suite_id {
            links.insert("CAUSE".to_string(), main_suite_id.clone());
        }
        Ok(self.publish(SUITE_STARTED, links, event)?)
    }

    async fn send_environment_defined(
        &self,
        event: &EnvironmentDefined,
    ) -> anyhow::Result<EventHandle> {
        let links = BTreeMap::from([("CONTEXT".to_string(), event.context.to_string())]);
        Ok(self.publish(ENVIRONMENT_DEFINED, links, event)?)
    }

    async fn send_suite_finished(
        &self,
        started: &EventHandle,
        event: &SuiteFinished,
    ) -> anyhow::Result<EventHandle> {
        let links = BTreeMap::from([
            (
                "TEST_SUITE_EXECUTION".to_string(),
                started.event_id.to_string(),
            ),
            ("CONTEXT".to_string(), event.context.clone()),
        ]);
        Ok(self.publish(SUITE_FINISHED, links, event)?)
    }
}
