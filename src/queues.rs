use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{error, warn};

struct TenantQueue {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    depth: Arc<AtomicUsize>,
}

// One FIFO queue per registered project, created up front at startup.
// Producers are the request handlers; each queue is drained by exactly one
// delivery worker holding the matching consumer.
pub struct TenantQueueRouter {
    queues: DashMap<u64, TenantQueue>,
}

pub struct TenantQueueConsumer {
    project_id: u64,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    depth: Arc<AtomicUsize>,
}

impl TenantQueueRouter {
    pub fn new(project_ids: impl IntoIterator<Item = u64>) -> (Self, Vec<TenantQueueConsumer>) {
        let queues = DashMap::new();
        let mut consumers = Vec::new();

        for project_id in project_ids {
            let (tx, rx) = mpsc::unbounded_channel();
            let depth = Arc::new(AtomicUsize::new(0));
            queues.insert(project_id, TenantQueue { tx, depth: depth.clone() });
            consumers.push(TenantQueueConsumer { project_id, rx, depth });
        }

        (Self { queues }, consumers)
    }

    // Append to the tail of the project's queue. Never blocks the caller;
    // callers must have authenticated the project id already.
    pub fn enqueue(&self, project_id: u64, envelope: Vec<u8>) {
        let Some(queue) = self.queues.get(&project_id) else {
            debug_assert!(false, "enqueue for unregistered project {project_id}");
            error!(project_id, "enqueue for unregistered project, dropping envelope");
            return;
        };

        if queue.tx.send(envelope).is_ok() {
            queue.depth.fetch_add(1, Ordering::Relaxed);
        } else {
            // consumer gone, delivery is best-effort
            warn!(project_id, "tenant queue consumer gone, dropping envelope");
        }
    }

    pub fn depth(&self, project_id: u64) -> usize {
        self.queues
            .get(&project_id)
            .map(|queue| queue.depth.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    // Sum over all tenant queues, read per queue without a global lock
    pub fn total_depth(&self) -> usize {
        self.queues
            .iter()
            .map(|queue| queue.value().depth.load(Ordering::Relaxed))
            .sum()
    }
}

impl TenantQueueConsumer {
    pub fn project_id(&self) -> u64 {
        self.project_id
    }

    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        let envelope = self.rx.recv().await;
        if envelope.is_some() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
        }
        envelope
    }
}
