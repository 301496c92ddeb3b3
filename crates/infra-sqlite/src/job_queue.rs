// SQLite JobQueue Implementation
//
// Items are leased, not popped: a dequeue pushes `visible_at` forward by the
// visibility timeout and stamps a fresh lease token. Only the holder of the
// current token can delete the item.

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use docpipe_core::domain::StrategyKey;
use docpipe_core::error::Result;
use docpipe_core::port::{Delivery, JobQueue, QueueMessage, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

pub struct SqliteJobQueue {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
    visibility_timeout_ms: i64,
}

impl SqliteJobQueue {
    pub fn new(
        pool: SqlitePool,
        time_provider: Arc<dyn TimeProvider>,
        visibility_timeout_ms: i64,
    ) -> Self {
        Self {
            pool,
            time_provider,
            visibility_timeout_ms,
        }
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn enqueue(&self, message: &QueueMessage) -> Result<()> {
        let now = self.time_provider.now_millis();

        sqlx::query(
            r#"
            INSERT INTO queue_items (job_id, strategy, enqueued_at, visible_at, lease_token, deliveries)
            VALUES (?, ?, ?, ?, NULL, 0)
            "#,
        )
        .bind(&message.job_id)
        .bind(message.strategy.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn try_dequeue(&self) -> Result<Option<Delivery>> {
        let now = self.time_provider.now_millis();
        let lease_token = uuid::Uuid::new_v4().to_string();

        // Single statement: selection and lease commit together, so two
        // consumers can never hold the same item
        let row = sqlx::query_as::<_, QueueRow>(
            r#"
            UPDATE queue_items
            SET visible_at = ?, lease_token = ?, deliveries = deliveries + 1
            WHERE seq = (
                SELECT seq FROM queue_items
                WHERE visible_at <= ?
                ORDER BY seq ASC
                LIMIT 1
            )
            RETURNING job_id, strategy, lease_token, deliveries
            "#,
        )
        .bind(now + self.visibility_timeout_ms)
        .bind(&lease_token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| {
            debug!(job_id = %r.job_id, deliveries = r.deliveries, "Leased queue item");
            Delivery {
                message: QueueMessage {
                    job_id: r.job_id,
                    strategy: StrategyKey::new(r.strategy),
                },
                receipt: r.lease_token,
                delivery_count: r.deliveries as u32,
            }
        }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<bool> {
        let result = sqlx::query("DELETE FROM queue_items WHERE lease_token = ?")
            .bind(&delivery.receipt)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn depth(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM queue_items")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    job_id: String,
    strategy: String,
    lease_token: String,
    deliveries: i64,
}
