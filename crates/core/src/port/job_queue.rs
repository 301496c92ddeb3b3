// Job Queue Port (Interface)

use crate::domain::{JobId, StrategyKey};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Queue payload: job id plus the minimal metadata a worker needs to dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub job_id: JobId,
    pub strategy: StrategyKey,
}

/// A leased queue item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message: QueueMessage,
    /// Lease token, required to acknowledge the item
    pub receipt: String,
    /// 1 on first delivery, incremented on every redelivery
    pub delivery_count: u32,
}

impl Delivery {
    pub fn job_id(&self) -> &str {
        &self.message.job_id
    }

    pub fn is_redelivery(&self) -> bool {
        self.delivery_count > 1
    }
}

/// Durable, at-least-once queue between submitters and workers.
///
/// A dequeued item is invisible to other consumers until its lease
/// (visibility timeout) expires; unacknowledged items are redelivered.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Durably append a message (returns once persisted)
    async fn enqueue(&self, message: &QueueMessage) -> Result<()>;

    /// Claim the oldest visible item, if any (non-blocking)
    async fn try_dequeue(&self) -> Result<Option<Delivery>>;

    /// Remove a delivered item.
    ///
    /// Returns false if the lease expired and the item was claimed again.
    async fn ack(&self, delivery: &Delivery) -> Result<bool>;

    /// Number of items not yet acknowledged (visible or leased)
    async fn depth(&self) -> Result<i64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use crate::port::TimeProvider;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct Item {
        seq: u64,
        message: QueueMessage,
        visible_at: i64,
        receipt: Option<String>,
        deliveries: u32,
    }

    /// In-memory JobQueue with the same lease semantics as the SQLite queue
    pub struct InMemoryJobQueue {
        items: Mutex<Vec<Item>>,
        next_seq: Mutex<u64>,
        time_provider: Arc<dyn TimeProvider>,
        visibility_timeout_ms: i64,
        fail_enqueue: AtomicBool,
    }

    impl InMemoryJobQueue {
        pub fn new(time_provider: Arc<dyn TimeProvider>, visibility_timeout_ms: i64) -> Self {
            Self {
                items: Mutex::new(Vec::new()),
                next_seq: Mutex::new(1),
                time_provider,
                visibility_timeout_ms,
                fail_enqueue: AtomicBool::new(false),
            }
        }

        /// Make every subsequent `enqueue` fail with AppError::Store
        pub fn set_fail_enqueue(&self, fail: bool) {
            self.fail_enqueue.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl JobQueue for InMemoryJobQueue {
        async fn enqueue(&self, message: &QueueMessage) -> Result<()> {
            if self.fail_enqueue.load(Ordering::SeqCst) {
                return Err(AppError::Store("queue unavailable".to_string()));
            }
            let mut next_seq = self.next_seq.lock().unwrap();
            let seq = *next_seq;
            *next_seq += 1;

            self.items.lock().unwrap().push(Item {
                seq,
                message: message.clone(),
                visible_at: self.time_provider.now_millis(),
                receipt: None,
                deliveries: 0,
            });
            Ok(())
        }

        async fn try_dequeue(&self) -> Result<Option<Delivery>> {
            let now = self.time_provider.now_millis();
            let mut items = self.items.lock().unwrap();

            let next = items
                .iter_mut()
                .filter(|item| item.visible_at <= now)
                .min_by_key(|item| item.seq);

            Ok(next.map(|item| {
                let receipt = uuid::Uuid::new_v4().to_string();
                item.visible_at = now + self.visibility_timeout_ms;
                item.receipt = Some(receipt.clone());
                item.deliveries += 1;
                Delivery {
                    message: item.message.clone(),
                    receipt,
                    delivery_count: item.deliveries,
                }
            }))
        }

        async fn ack(&self, delivery: &Delivery) -> Result<bool> {
            let mut items = self.items.lock().unwrap();
            let before = items.len();
            items.retain(|item| item.receipt.as_deref() != Some(delivery.receipt.as_str()));
            Ok(items.len() < before)
        }

        async fn depth(&self) -> Result<i64> {
            Ok(self.items.lock().unwrap().len() as i64)
        }
    }

}
