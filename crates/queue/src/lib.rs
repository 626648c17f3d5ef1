//! Invariant-preserving operations over [`orchestrator_store`], plus a best-effort lifecycle
//! event bus. Every operation here that touches more than one row is transactional at the Store
//! layer; this crate's job is validation, default-filling, and emitting events strictly after
//! the owning transaction has committed.

pub mod config;
pub mod errors;
pub mod events;

use std::{str::FromStr, sync::Arc};

use num_bigint::BigUint;
use orchestrator_store::{
    db::Db,
    types::{BatchId, InFlightBatch, Item, ItemId, Stats},
};
use tokio::sync::broadcast;
use tracing::instrument;

pub use config::QueueConfig;
pub use errors::QueueError;
pub use events::Event;

pub const COMPONENT: &str = "orchestrator-queue";

pub type Result<T, E = QueueError> = std::result::Result<T, E>;

pub struct Queue {
    db: Arc<Db>,
    config: QueueConfig,
    events: events::EventBus,
}

impl Queue {
    pub fn new(db: Arc<Db>, config: QueueConfig) -> Self {
        let events = events::EventBus::new(config.event_channel_capacity);
        Self { db, config, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Parses `amount` and enqueues it, coalescing into the existing PENDING Item for `receiver`
    /// when the Queue is configured to do so. Returns the affected Item's id.
    #[instrument(target = COMPONENT, skip(self, memo), err)]
    pub async fn enqueue(
        &self,
        receiver: String,
        amount: &str,
        memo: Option<String>,
        has_storage_deposit: Option<bool>,
    ) -> Result<ItemId> {
        let amount = parse_amount(amount)?;
        let has_storage_deposit = has_storage_deposit.unwrap_or(self.config.default_has_storage_deposit);

        let id = self
            .db
            .enqueue(receiver, amount, memo, has_storage_deposit, self.config.coalesce)
            .await?;

        self.events.emit(Event::Pushed { item_id: id });
        Ok(id)
    }

    /// Up to `limit` pending Items, ascending by id. Read-only; claiming happens in
    /// `attach_batch`.
    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn peek(&self, limit: u32) -> Result<Vec<Item>> {
        let items = self.db.peek_pending(limit).await?;
        if !items.is_empty() {
            self.events.emit(Event::Peeked { count: items.len() });
        }
        Ok(items)
    }

    /// Atomically records a new Batch and reassigns `item_ids` to it. The durability barrier:
    /// the signed blob is committed to the Store before the caller broadcasts it.
    #[instrument(target = COMPONENT, skip(self, signed_blob), err)]
    pub async fn attach_batch(
        &self,
        tx_hash: String,
        signed_blob: Vec<u8>,
        item_ids: Vec<ItemId>,
    ) -> Result<BatchId> {
        Ok(self.db.attach_batch(tx_hash, signed_blob, item_ids).await?)
    }

    /// Marks `batch_id` successful and emits `Success` for every Item it owned.
    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn mark_batch_success(&self, batch_id: BatchId, actual_tx_hash: String) -> Result<()> {
        let items = self.db.mark_batch_success(batch_id, actual_tx_hash.clone()).await?;
        let count = items.len();
        for item in items {
            self.events.emit(Event::Success { item, tx_hash: actual_tx_hash.clone() });
        }
        self.events.emit(Event::BatchProcessed { item_count: count, success: true });
        Ok(())
    }

    /// Deletes `batch_id`, recycling its Items (incrementing `retry_count`, auto-stalling past
    /// `max_retries`), and emits `Failed` for every affected Item.
    #[instrument(target = COMPONENT, skip(self, error_message), err)]
    pub async fn recover_failed_batch(
        &self,
        batch_id: BatchId,
        error_message: Option<String>,
        max_retries: Option<u32>,
    ) -> Result<()> {
        let default_message = error_message.clone().unwrap_or_else(|| "batch recovery".to_string());
        let items = self.db.recover_failed_batch(batch_id, error_message, max_retries).await?;
        let count = items.len();
        for item in items {
            let message = item.error_message.clone().unwrap_or_else(|| default_message.clone());
            self.events.emit(Event::Failed { item, error_message: message });
        }
        self.events.emit(Event::BatchFailed { batch_id, error_message: default_message });
        let _ = count;
        Ok(())
    }

    /// Isolates exactly one Item (used when the chain reports a specific failing action within
    /// a batch); the Executor is expected to call `recover_failed_batch` for the siblings.
    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn mark_item_stalled(&self, item_id: ItemId, error_message: String) -> Result<()> {
        self.db.mark_item_stalled(item_id, error_message.clone()).await?;
        if let Some(item) = self.db.get_item(item_id).await? {
            self.events.emit(Event::Failed { item, error_message });
        }
        Ok(())
    }

    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn unstall(&self, item_id: ItemId) -> Result<u64> {
        Ok(self.db.unstall_items(vec![item_id]).await?)
    }

    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn unstall_many(&self, item_ids: Vec<ItemId>) -> Result<u64> {
        Ok(self.db.unstall_items(item_ids).await?)
    }

    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn unstall_all(&self) -> Result<u64> {
        Ok(self.db.unstall_all().await?)
    }

    /// Every Batch still `processing` with a non-null signed blob, for startup replay.
    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn replay_in_flight(&self) -> Result<Vec<InFlightBatch>> {
        Ok(self.db.replay_in_flight().await?)
    }

    /// Clears stale Batch associations left over from a crash. Called once at startup after
    /// `replay_in_flight` has been drained.
    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn recover(&self) -> Result<()> {
        Ok(self.db.recover().await?)
    }

    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn stats(&self) -> Result<Stats> {
        Ok(self.db.stats().await?)
    }

    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn has_work(&self) -> Result<bool> {
        Ok(self.db.has_work().await?)
    }

    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.db.get_item(id).await?)
    }

    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn list_items(&self, receiver: Option<String>, is_stalled: Option<bool>) -> Result<Vec<Item>> {
        Ok(self.db.list_items(receiver, is_stalled).await?)
    }

    /// Emits `LoopCompleted`. Called once by the Executor at the end of every tick.
    pub fn notify_loop_completed(&self) {
        self.events.emit(Event::LoopCompleted);
    }
}

fn parse_amount(amount: &str) -> Result<BigUint> {
    BigUint::from_str(amount).map_err(|_| QueueError::InvalidAmount(amount.to_string()))
}

#[cfg(test)]
mod tests;
