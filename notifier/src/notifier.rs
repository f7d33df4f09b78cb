//! Ordered, best-effort delivery of a diff.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chunk::{DEFAULT_MAX_CHUNK, NotificationBatch};
use crate::transport::ChatTransport;

/// Result of delivering one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// Number of chunks in the batch.
    pub chunks: usize,

    /// Chunks the transport accepted.
    pub delivered: usize,

    /// Indexes of chunks that failed, in order.
    pub failed: Vec<usize>,
}

impl DeliveryReport {
    /// True when every chunk was accepted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Chunks diffs and sends them through a [`ChatTransport`].
pub struct Notifier {
    transport: Arc<dyn ChatTransport>,
    max_chunk: usize,
}

impl Notifier {
    /// Create a notifier with the default chunk size.
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        let max_chunk = DEFAULT_MAX_CHUNK.min(transport.max_message_len());
        Self {
            transport,
            max_chunk,
        }
    }

    /// Set the maximum chunk size. Capped at what the transport accepts.
    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk.clamp(1, self.transport.max_message_len());
        self
    }

    /// Effective maximum chunk size.
    pub fn max_chunk(&self) -> usize {
        self.max_chunk
    }

    /// Split `diff` into the batch that [`notify`](Self::notify) would send.
    pub fn prepare(&self, diff: &str) -> NotificationBatch {
        NotificationBatch::from_text(diff, self.max_chunk)
    }

    /// Deliver `diff` as one or more messages.
    ///
    /// Chunks go out strictly in order; each send finishes (or fails) before
    /// the next begins. A failed chunk is logged and skipped. Nothing is sent
    /// for an empty diff.
    pub async fn notify(&self, diff: &str) -> DeliveryReport {
        let batch = self.prepare(diff);
        let mut report = DeliveryReport {
            chunks: batch.len(),
            ..Default::default()
        };

        if batch.is_empty() {
            debug!("Empty diff, nothing to send");
            return report;
        }

        for (index, chunk) in batch.iter().enumerate() {
            match self.transport.send(chunk).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        transport = self.transport.name(),
                        chunk = index + 1,
                        of = batch.len(),
                        error = %e,
                        "Failed to deliver chunk"
                    );
                    report.failed.push(index);
                }
            }
        }

        info!(
            "Delivered {}/{} chunk(s) via {}",
            report.delivered,
            report.chunks,
            self.transport.name()
        );
        report
    }
}
