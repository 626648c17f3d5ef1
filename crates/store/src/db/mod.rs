use std::{fs::create_dir_all, path::PathBuf, str::FromStr};

use num_bigint::BigUint;
use tracing::{info, instrument};

use crate::{
    config::StoreConfig,
    db::{
        migrations::apply_migrations,
        pool_manager::{Pool, SqlitePoolManager},
    },
    errors::{DatabaseError, DatabaseSetupError},
    types::{BatchId, InFlightBatch, Item, ItemFilter, ItemId, Stats},
    COMPONENT,
};

mod connection;
mod migrations;
mod pool_manager;
mod sql;
#[cfg(test)]
mod tests;
mod transaction;

pub use connection::Connection;
pub use transaction::Transaction;

pub type Result<T, E = DatabaseError> = std::result::Result<T, E>;

/// Handle to the embedded store. Cheap to clone-by-reference (`Arc`-free: the pool itself is
/// the shared handle); callers typically hold a single `Db` behind an `Arc`.
pub struct Db {
    pool: Pool,
}

impl Db {
    /// Opens (creating if absent) the database file named in `config`, applies any pending
    /// migrations, and returns a ready-to-use handle.
    #[instrument(target = COMPONENT, skip_all, err)]
    pub async fn open(config: &StoreConfig) -> Result<Self, DatabaseSetupError> {
        let database_filepath: PathBuf = config.database_filepath.clone();
        info!(target: COMPONENT, ?database_filepath, "connecting to the database");

        if let Some(parent) = database_filepath.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent).map_err(DatabaseError::IoError)?;
            }
        }

        let manager = SqlitePoolManager::new(database_filepath.clone());
        let pool = Pool::builder(manager).build()?;

        let conn = pool.get().await.map_err(DatabaseError::MissingDbConnection)?;
        conn.interact(apply_migrations)
            .await
            .map_err(|err| DatabaseError::InteractError(format!("migration task failed: {err}")))??;

        info!(target: COMPONENT, sqlite = %database_filepath.display(), "connected to the database");

        Ok(Db { pool })
    }

    /// Test-only convenience: an in-memory database behind a single-connection pool. Suitable
    /// for unit tests in this crate and in `orchestrator-queue`, never for production use (the
    /// data vanishes with the last connection).
    pub async fn open_in_memory() -> Result<Self, DatabaseSetupError> {
        let manager = SqlitePoolManager::new_in_memory();
        let pool = Pool::builder(manager).max_size(1).build()?;

        let conn = pool.get().await.map_err(DatabaseError::MissingDbConnection)?;
        conn.interact(apply_migrations)
            .await
            .map_err(|err| DatabaseError::InteractError(format!("migration task failed: {err}")))??;

        Ok(Db { pool })
    }

    /// Inserts a new pending Item, or — when `coalesce` is set and a PENDING Item already exists
    /// for `receiver` — folds `amount` into that Item's existing amount, overwriting `memo` and
    /// `has_storage_deposit`. Returns the affected Item's id either way.
    #[instrument(target = COMPONENT, skip(self, amount, memo), err)]
    pub async fn enqueue(
        &self,
        receiver: String,
        amount: BigUint,
        memo: Option<String>,
        has_storage_deposit: bool,
        coalesce: bool,
    ) -> Result<ItemId> {
        self.pool
            .get()
            .await?
            .interact(move |conn| -> Result<ItemId> {
                let tx = conn.transaction()?;

                if coalesce {
                    if let Some(existing) = sql::find_pending_item_by_receiver(&tx, &receiver)? {
                        let prior = BigUint::from_str(&existing.amount)
                            .map_err(|_| DatabaseError::CorruptAmount(existing.amount.clone()))?;
                        let merged = (prior + &amount).to_string();
                        sql::update_item_amount(
                            &tx,
                            existing.id,
                            &merged,
                            memo.as_deref(),
                            has_storage_deposit,
                        )?;
                        tx.commit()?;
                        return Ok(existing.id);
                    }
                }

                let id = sql::insert_item(
                    &tx,
                    &receiver,
                    &amount.to_string(),
                    memo.as_deref(),
                    has_storage_deposit,
                )?;
                tx.commit()?;
                Ok(id)
            })
            .await
            .map_err(|err| DatabaseError::InteractError(format!("enqueue task failed: {err}")))?
    }

    /// Up to `limit` pending Items (`batch_id IS NULL AND is_stalled = 0`), ascending by id.
    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn peek_pending(&self, limit: u32) -> Result<Vec<Item>> {
        self.pool
            .get()
            .await?
            .interact(move |conn| {
                let tx = conn.transaction()?;
                sql::select_pending_items(&tx, limit)
            })
            .await
            .map_err(|err| DatabaseError::InteractError(format!("peek task failed: {err}")))?
    }

    /// Atomically records a new Batch and reassigns `item_ids` to it.
    #[instrument(target = COMPONENT, skip(self, signed_tx), err)]
    pub async fn attach_batch(
        &self,
        tx_hash: String,
        signed_tx: Vec<u8>,
        item_ids: Vec<ItemId>,
    ) -> Result<BatchId> {
        self.pool
            .get()
            .await?
            .interact(move |conn| -> Result<BatchId> {
                let tx = conn.transaction()?;
                let batch_id = sql::insert_batch(&tx, &tx_hash, &signed_tx)?;
                sql::set_items_batch_id(&tx, &item_ids, batch_id)?;
                tx.commit()?;
                Ok(batch_id)
            })
            .await
            .map_err(|err| DatabaseError::InteractError(format!("attach batch task failed: {err}")))?
    }

    /// Marks `batch_id` as `success`, clears its `signed_tx`, and marks every owned Item as
    /// storage-registered. Returns the affected Items for event emission.
    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn mark_batch_success(&self, batch_id: BatchId, actual_tx_hash: String) -> Result<Vec<Item>> {
        self.pool
            .get()
            .await?
            .interact(move |conn| -> Result<Vec<Item>> {
                let tx = conn.transaction()?;
                let items = sql::select_items_by_batch(&tx, batch_id)?;
                sql::mark_batch_success(&tx, batch_id, &actual_tx_hash)?;
                tx.commit()?;
                Ok(items
                    .into_iter()
                    .map(|item| Item { has_storage_deposit: true, ..item })
                    .collect())
            })
            .await
            .map_err(|err| DatabaseError::InteractError(format!("mark batch success task failed: {err}")))?
    }

    /// Deletes `batch_id` and detaches its Items, incrementing `retry_count` and auto-stalling
    /// any Item whose new `retry_count` exceeds `max_retries`. Returns the affected Items
    /// *after* the update, for event emission.
    #[instrument(target = COMPONENT, skip(self, error_message), err)]
    pub async fn recover_failed_batch(
        &self,
        batch_id: BatchId,
        error_message: Option<String>,
        max_retries: Option<u32>,
    ) -> Result<Vec<Item>> {
        self.pool
            .get()
            .await?
            .interact(move |conn| -> Result<Vec<Item>> {
                let tx = conn.transaction()?;
                let items =
                    sql::recover_failed_batch(&tx, batch_id, error_message.as_deref(), max_retries)?;
                tx.commit()?;
                Ok(items)
            })
            .await
            .map_err(|err| {
                DatabaseError::InteractError(format!("recover failed batch task failed: {err}"))
            })?
    }

    /// Marks a single Item stalled with an attached error message.
    #[instrument(target = COMPONENT, skip(self, error_message), err)]
    pub async fn mark_item_stalled(&self, item_id: ItemId, error_message: String) -> Result<()> {
        self.pool
            .get()
            .await?
            .interact(move |conn| -> Result<()> {
                let tx = conn.transaction()?;
                sql::mark_item_stalled(&tx, item_id, &error_message)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err| DatabaseError::InteractError(format!("mark item stalled task failed: {err}")))?
    }

    /// Clears `is_stalled`/`batch_id` for the given ids. Returns how many rows actually changed.
    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn unstall_items(&self, item_ids: Vec<ItemId>) -> Result<u64> {
        self.pool
            .get()
            .await?
            .interact(move |conn| -> Result<u64> {
                let tx = conn.transaction()?;
                let changed = sql::unstall_items(&tx, &item_ids)?;
                tx.commit()?;
                Ok(changed)
            })
            .await
            .map_err(|err| DatabaseError::InteractError(format!("unstall items task failed: {err}")))?
    }

    /// Clears `is_stalled` on every stalled Item. Returns how many rows changed.
    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn unstall_all(&self) -> Result<u64> {
        self.pool
            .get()
            .await?
            .interact(move |conn| -> Result<u64> {
                let tx = conn.transaction()?;
                let changed = sql::unstall_all(&tx)?;
                tx.commit()?;
                Ok(changed)
            })
            .await
            .map_err(|err| DatabaseError::InteractError(format!("unstall all task failed: {err}")))?
    }

    /// Every Batch still `processing` with a non-null `signed_tx`, with the Item ids it owns.
    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn replay_in_flight(&self) -> Result<Vec<InFlightBatch>> {
        self.pool
            .get()
            .await?
            .interact(move |conn| {
                let tx = conn.transaction()?;
                sql::select_in_flight_batches(&tx)
            })
            .await
            .map_err(|err| DatabaseError::InteractError(format!("replay in flight task failed: {err}")))?
    }

    /// Clears `batch_id` on Items still referencing a non-success Batch, then deletes every
    /// non-success Batch row. Called once at startup, after `replay_in_flight` has been drained.
    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn recover(&self) -> Result<()> {
        self.pool
            .get()
            .await?
            .interact(move |conn| -> Result<()> {
                let tx = conn.transaction()?;
                sql::recover(&tx)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err| DatabaseError::InteractError(format!("recover task failed: {err}")))?
    }

    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn stats(&self) -> Result<Stats> {
        self.pool
            .get()
            .await?
            .interact(move |conn| {
                let tx = conn.transaction()?;
                sql::stats(&tx)
            })
            .await
            .map_err(|err| DatabaseError::InteractError(format!("stats task failed: {err}")))?
    }

    /// Whether any Item is pending or processing — i.e. not yet terminal.
    pub async fn has_work(&self) -> Result<bool> {
        let stats = self.stats().await?;
        Ok(stats.pending > 0 || stats.processing > 0)
    }

    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        self.pool
            .get()
            .await?
            .interact(move |conn| {
                let tx = conn.transaction()?;
                sql::get_item(&tx, id)
            })
            .await
            .map_err(|err| DatabaseError::InteractError(format!("get item task failed: {err}")))?
    }

    #[instrument(target = COMPONENT, skip(self), err)]
    pub async fn list_items(&self, receiver: Option<String>, is_stalled: Option<bool>) -> Result<Vec<Item>> {
        self.pool
            .get()
            .await?
            .interact(move |conn| {
                let tx = conn.transaction()?;
                sql::list_items(&tx, ItemFilter { receiver: receiver.as_deref(), is_stalled })
            })
            .await
            .map_err(|err| DatabaseError::InteractError(format!("list items task failed: {err}")))?
    }
}
