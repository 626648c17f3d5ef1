//! Parameterized SQL against the `items`/`batches` relations. Every function here takes an
//! open [`Transaction`] and leaves committing to the caller in `db/mod.rs`, so that multi-row
//! operations share one atomic unit.

use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use crate::{
    db::transaction::Transaction,
    errors::DatabaseError,
    types::{Batch, BatchId, BatchStatus, InFlightBatch, Item, ItemFilter, ItemId, Stats},
};

type Result<T> = super::Result<T>;

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        receiver: row.get(1)?,
        amount: row.get(2)?,
        memo: row.get(3)?,
        has_storage_deposit: row.get(4)?,
        retry_count: row.get(5)?,
        error_message: row.get(6)?,
        batch_id: row.get(7)?,
        is_stalled: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const ITEM_COLUMNS: &str = "id, receiver, amount, memo, has_storage_deposit, retry_count, \
    error_message, batch_id, is_stalled, created_at, updated_at";

pub fn insert_item(
    tx: &Transaction<'_>,
    receiver: &str,
    amount: &str,
    memo: Option<&str>,
    has_storage_deposit: bool,
) -> Result<ItemId> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO items (receiver, amount, memo, has_storage_deposit) VALUES (?1, ?2, ?3, ?4)",
    )?;
    stmt.execute(params![receiver, amount, memo, has_storage_deposit])?;
    Ok(tx.last_insert_rowid())
}

pub fn find_pending_item_by_receiver(
    tx: &Transaction<'_>,
    receiver: &str,
) -> Result<Option<Item>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM items \
         WHERE receiver = ?1 AND batch_id IS NULL AND is_stalled = 0"
    );
    let mut stmt = tx.prepare_cached(&sql)?;
    stmt.query_row(params![receiver], row_to_item)
        .optional()
        .map_err(DatabaseError::SqliteError)
}

pub fn update_item_amount(
    tx: &Transaction<'_>,
    id: ItemId,
    amount: &str,
    memo: Option<&str>,
    has_storage_deposit: bool,
) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "UPDATE items SET amount = ?1, memo = ?2, has_storage_deposit = ?3, \
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?4",
    )?;
    stmt.execute(params![amount, memo, has_storage_deposit, id])?;
    Ok(())
}

pub fn select_pending_items(tx: &Transaction<'_>, limit: u32) -> Result<Vec<Item>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM items \
         WHERE batch_id IS NULL AND is_stalled = 0 ORDER BY id ASC LIMIT ?1"
    );
    let mut stmt = tx.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![limit], row_to_item)?;
    rows.collect::<rusqlite::Result<_>>().map_err(DatabaseError::SqliteError)
}

pub fn insert_batch(tx: &Transaction<'_>, tx_hash: &str, signed_tx: &[u8]) -> Result<BatchId> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO batches (tx_hash, signed_tx, status) VALUES (?1, ?2, 'processing')",
    )?;
    stmt.execute(params![tx_hash, signed_tx])?;
    Ok(tx.last_insert_rowid())
}

pub fn set_items_batch_id(tx: &Transaction<'_>, item_ids: &[ItemId], batch_id: BatchId) -> Result<()> {
    let placeholders = item_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
    let sql = format!(
        "UPDATE items SET batch_id = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
         WHERE id IN ({placeholders})"
    );
    tx.prepare_cached(&sql)?.execute(params![batch_id])?;
    Ok(())
}

pub fn select_items_by_batch(tx: &Transaction<'_>, batch_id: BatchId) -> Result<Vec<Item>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE batch_id = ?1 ORDER BY id ASC");
    let mut stmt = tx.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![batch_id], row_to_item)?;
    rows.collect::<rusqlite::Result<_>>().map_err(DatabaseError::SqliteError)
}

pub fn mark_batch_success(tx: &Transaction<'_>, batch_id: BatchId, actual_tx_hash: &str) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "UPDATE batches SET status = 'success', tx_hash = ?1, signed_tx = NULL, \
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?2",
    )?;
    let changed = stmt.execute(params![actual_tx_hash, batch_id])?;
    if changed == 0 {
        return Err(DatabaseError::BatchNotFound(batch_id));
    }

    let mut stmt = tx.prepare_cached(
        "UPDATE items SET has_storage_deposit = 1, \
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE batch_id = ?1",
    )?;
    stmt.execute(params![batch_id])?;
    Ok(())
}

pub fn delete_batch(tx: &Transaction<'_>, batch_id: BatchId) -> Result<()> {
    tx.prepare_cached("DELETE FROM batches WHERE id = ?1")?.execute(params![batch_id])?;
    Ok(())
}

/// Detaches every Item owned by `batch_id` and sets `error_message` when provided. `max_retries`
/// being `Some` means this is a whole-transaction failure being charged against the Items: their
/// `retry_count` is incremented and any Item whose new `retry_count` exceeds `max_retries` is
/// auto-stalled. `max_retries` being `None` means the Items are innocent siblings of an
/// action-indexed failure and are returned to pending untouched, per the "siblings are recycled
/// without incrementing the per-Item error or tripping maxRetries" rule. The Batch row is only
/// deleted once every Item has been detached from it, since `items.batch_id` is an immediate
/// foreign key. Returns the affected Items *after* the update, for event emission.
pub fn recover_failed_batch(
    tx: &Transaction<'_>,
    batch_id: BatchId,
    error_message: Option<&str>,
    max_retries: Option<u32>,
) -> Result<Vec<Item>> {
    let item_ids: Vec<ItemId> =
        select_items_by_batch(tx, batch_id)?.into_iter().map(|item| item.id).collect();

    if item_ids.is_empty() {
        delete_batch(tx, batch_id)?;
        return Ok(Vec::new());
    }

    let placeholders = item_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
    let retry_count_expr = if max_retries.is_some() { "retry_count + 1" } else { "retry_count" };
    let sql = format!(
        "UPDATE items SET batch_id = NULL, retry_count = {retry_count_expr}, \
         error_message = COALESCE(?1, error_message), \
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id IN ({placeholders})"
    );
    tx.prepare_cached(&sql)?.execute(params![error_message])?;

    if let Some(max_retries) = max_retries {
        let sql = format!(
            "UPDATE items SET is_stalled = 1 WHERE retry_count > ?1 AND id IN ({placeholders})"
        );
        tx.prepare_cached(&sql)?.execute(params![max_retries])?;
    }

    delete_batch(tx, batch_id)?;

    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id IN ({placeholders}) ORDER BY id ASC");
    let mut stmt = tx.prepare_cached(&sql)?;
    let rows = stmt.query_map((), row_to_item)?;
    rows.collect::<rusqlite::Result<_>>().map_err(DatabaseError::SqliteError)
}

pub fn mark_item_stalled(tx: &Transaction<'_>, item_id: ItemId, error_message: &str) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "UPDATE items SET is_stalled = 1, error_message = ?1, \
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?2",
    )?;
    let changed = stmt.execute(params![error_message, item_id])?;
    if changed == 0 {
        return Err(DatabaseError::ItemNotFound(item_id));
    }
    Ok(())
}

pub fn unstall_items(tx: &Transaction<'_>, item_ids: &[ItemId]) -> Result<u64> {
    if item_ids.is_empty() {
        return Ok(0);
    }
    let placeholders = item_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "UPDATE items SET is_stalled = 0, batch_id = NULL, \
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
         WHERE is_stalled = 1 AND id IN ({placeholders})"
    );
    let changed = tx
        .prepare_cached(&sql)?
        .execute(params_from_iter(item_ids.iter()))?;
    Ok(changed as u64)
}

pub fn unstall_all(tx: &Transaction<'_>) -> Result<u64> {
    let changed = tx
        .prepare_cached(
            "UPDATE items SET is_stalled = 0, batch_id = NULL, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE is_stalled = 1",
        )?
        .execute(())?;
    Ok(changed as u64)
}

pub fn select_in_flight_batches(tx: &Transaction<'_>) -> Result<Vec<InFlightBatch>> {
    let mut stmt = tx.prepare_cached(
        "SELECT id, tx_hash, signed_tx FROM batches \
         WHERE status = 'processing' AND signed_tx IS NOT NULL ORDER BY id ASC",
    )?;
    let batches = stmt
        .query_map((), |row| {
            Ok((row.get::<_, BatchId>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut out = Vec::with_capacity(batches.len());
    for (batch_id, tx_hash, signed_tx) in batches {
        let mut item_stmt = tx.prepare_cached("SELECT id FROM items WHERE batch_id = ?1 ORDER BY id ASC")?;
        let item_ids = item_stmt
            .query_map(params![batch_id], |row| row.get::<_, ItemId>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        out.push(InFlightBatch { batch_id, tx_hash, signed_tx, item_ids });
    }
    Ok(out)
}

/// Clears `batch_id` on any Item still pointing at a non-success Batch, then deletes every
/// non-success Batch row. Called once at startup, after `select_in_flight_batches` has already
/// been drained and redispatched.
pub fn recover(tx: &Transaction<'_>) -> Result<()> {
    tx.prepare_cached(
        "UPDATE items SET batch_id = NULL, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
         WHERE batch_id IN (SELECT id FROM batches WHERE status != 'success')",
    )?
    .execute(())?;
    tx.prepare_cached("DELETE FROM batches WHERE status != 'success'")?.execute(())?;
    Ok(())
}

pub fn stats(tx: &Transaction<'_>) -> Result<Stats> {
    let total: u64 =
        tx.prepare_cached("SELECT COUNT(*) FROM items")?.query_row((), |row| row.get(0))?;
    let pending: u64 = tx
        .prepare_cached("SELECT COUNT(*) FROM items WHERE batch_id IS NULL AND is_stalled = 0")?
        .query_row((), |row| row.get(0))?;
    let processing: u64 = tx
        .prepare_cached("SELECT COUNT(*) FROM items WHERE batch_id IS NOT NULL")?
        .query_row((), |row| row.get(0))?;
    let success: u64 = tx
        .prepare_cached(
            "SELECT COUNT(*) FROM items WHERE batch_id IN \
             (SELECT id FROM batches WHERE status = 'success')",
        )?
        .query_row((), |row| row.get(0))?;
    let stalled: u64 = tx
        .prepare_cached("SELECT COUNT(*) FROM items WHERE is_stalled = 1")?
        .query_row((), |row| row.get(0))?;

    Ok(Stats { total, pending, processing, success, stalled })
}

pub fn get_item(tx: &Transaction<'_>, id: ItemId) -> Result<Option<Item>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1");
    tx.prepare_cached(&sql)?
        .query_row(params![id], row_to_item)
        .optional()
        .map_err(DatabaseError::SqliteError)
}

pub fn list_items(tx: &Transaction<'_>, filter: ItemFilter<'_>) -> Result<Vec<Item>> {
    let mut sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE 1 = 1");
    if filter.receiver.is_some() {
        sql.push_str(" AND receiver = ?1");
    }
    if let Some(is_stalled) = filter.is_stalled {
        sql.push_str(if is_stalled { " AND is_stalled = 1" } else { " AND is_stalled = 0" });
    }
    sql.push_str(" ORDER BY id ASC");

    let mut stmt = tx.prepare_cached(&sql)?;
    let rows = if let Some(receiver) = filter.receiver {
        stmt.query_map(params![receiver], row_to_item)?
    } else {
        stmt.query_map((), row_to_item)?
    };
    rows.collect::<rusqlite::Result<_>>().map_err(DatabaseError::SqliteError)
}

pub fn get_batch(tx: &Transaction<'_>, batch_id: BatchId) -> Result<Option<Batch>> {
    let mut stmt = tx.prepare_cached(
        "SELECT id, tx_hash, signed_tx, status, created_at, updated_at FROM batches WHERE id = ?1",
    )?;
    stmt.query_row(params![batch_id], |row| {
        let status: String = row.get(3)?;
        Ok(Batch {
            id: row.get(0)?,
            tx_hash: row.get(1)?,
            signed_tx: row.get(2)?,
            status: BatchStatus::parse(&status).unwrap_or(BatchStatus::Processing),
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    })
    .optional()
    .map_err(DatabaseError::SqliteError)
}
