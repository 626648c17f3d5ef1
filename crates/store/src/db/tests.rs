use assert_matches::assert_matches;

use super::{connection::Connection, migrations::apply_migrations, sql};
use crate::types::{BatchStatus, ItemFilter};

fn create_db() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    apply_migrations(&mut conn).unwrap();
    conn
}

#[test]
fn insert_and_find_pending_item() {
    let mut conn = create_db();
    let tx = conn.transaction().unwrap();
    let id = sql::insert_item(&tx, "alice.near", "100", None, false).unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    let item = sql::find_pending_item_by_receiver(&tx, "alice.near").unwrap().unwrap();
    assert_eq!(item.id, id);
    assert_eq!(item.amount, "100");
    assert!(item.is_pending());
}

#[test]
fn attach_batch_is_atomic() {
    let mut conn = create_db();
    let tx = conn.transaction().unwrap();
    let a = sql::insert_item(&tx, "alice.near", "10", None, true).unwrap();
    let b = sql::insert_item(&tx, "bob.near", "20", None, true).unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    let batch_id = sql::insert_batch(&tx, "hash1", b"signed").unwrap();
    sql::set_items_batch_id(&tx, &[a, b], batch_id).unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    let pending = sql::select_pending_items(&tx, 10).unwrap();
    assert!(pending.is_empty());
    let batch_items = sql::select_items_by_batch(&tx, batch_id).unwrap();
    assert_eq!(batch_items.len(), 2);
}

#[test]
fn mark_batch_success_marks_items_storage_registered() {
    let mut conn = create_db();
    let tx = conn.transaction().unwrap();
    let id = sql::insert_item(&tx, "alice.near", "10", None, false).unwrap();
    let batch_id = sql::insert_batch(&tx, "hash1", b"signed").unwrap();
    sql::set_items_batch_id(&tx, &[id], batch_id).unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    sql::mark_batch_success(&tx, batch_id, "chain-hash").unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    let batch = sql::get_batch(&tx, batch_id).unwrap().unwrap();
    assert_matches!(batch.status, BatchStatus::Success);
    assert!(batch.signed_tx.is_none());
    let item = sql::get_item(&tx, id).unwrap().unwrap();
    assert!(item.has_storage_deposit);
}

#[test]
fn recover_failed_batch_recycles_items_and_stalls_over_max_retries() {
    let mut conn = create_db();
    let tx = conn.transaction().unwrap();
    let id = sql::insert_item(&tx, "alice.near", "10", None, true).unwrap();
    let batch_id = sql::insert_batch(&tx, "hash1", b"signed").unwrap();
    sql::set_items_batch_id(&tx, &[id], batch_id).unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    let items = sql::recover_failed_batch(&tx, batch_id, Some("boom"), Some(2)).unwrap();
    tx.commit().unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].retry_count, 1);
    assert!(!items[0].is_stalled);

    let tx = conn.transaction().unwrap();
    assert!(sql::get_batch(&tx, batch_id).unwrap().is_none());

    // Drive retry_count past max_retries and confirm auto-stall.
    let batch_id = sql::insert_batch(&tx, "hash2", b"signed").unwrap();
    sql::set_items_batch_id(&tx, &[id], batch_id).unwrap();
    tx.commit().unwrap();
    let tx = conn.transaction().unwrap();
    let items = sql::recover_failed_batch(&tx, batch_id, None, Some(1)).unwrap();
    tx.commit().unwrap();

    assert_eq!(items[0].retry_count, 2);
    assert!(items[0].is_stalled);
}

#[test]
fn mark_item_stalled_isolates_offender() {
    let mut conn = create_db();
    let tx = conn.transaction().unwrap();
    let id = sql::insert_item(&tx, "alice.near", "10", None, true).unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    sql::mark_item_stalled(&tx, id, "invalid receiver").unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    let item = sql::get_item(&tx, id).unwrap().unwrap();
    assert!(item.is_stalled);
    assert_eq!(item.error_message.as_deref(), Some("invalid receiver"));
    assert!(!item.is_pending());
}

#[test]
fn unstall_is_idempotent() {
    let mut conn = create_db();
    let tx = conn.transaction().unwrap();
    let id = sql::insert_item(&tx, "alice.near", "10", None, true).unwrap();
    sql::mark_item_stalled(&tx, id, "oops").unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    let changed = sql::unstall_items(&tx, &[id]).unwrap();
    tx.commit().unwrap();
    assert_eq!(changed, 1);

    let tx = conn.transaction().unwrap();
    let changed = sql::unstall_items(&tx, &[id]).unwrap();
    tx.commit().unwrap();
    assert_eq!(changed, 0, "unstalling an already-unstalled item is a no-op");
}

#[test]
fn replay_in_flight_lists_processing_batches_with_their_items() {
    let mut conn = create_db();
    let tx = conn.transaction().unwrap();
    let id = sql::insert_item(&tx, "alice.near", "10", None, true).unwrap();
    let batch_id = sql::insert_batch(&tx, "hash1", b"signed").unwrap();
    sql::set_items_batch_id(&tx, &[id], batch_id).unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    let in_flight = sql::select_in_flight_batches(&tx).unwrap();
    assert_eq!(in_flight.len(), 1);
    assert_eq!(in_flight[0].batch_id, batch_id);
    assert_eq!(in_flight[0].item_ids, vec![id]);
}

#[test]
fn recover_clears_non_success_batches() {
    let mut conn = create_db();
    let tx = conn.transaction().unwrap();
    let id = sql::insert_item(&tx, "alice.near", "10", None, true).unwrap();
    let batch_id = sql::insert_batch(&tx, "hash1", b"signed").unwrap();
    sql::set_items_batch_id(&tx, &[id], batch_id).unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    sql::recover(&tx).unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    assert!(sql::get_batch(&tx, batch_id).unwrap().is_none());
    let item = sql::get_item(&tx, id).unwrap().unwrap();
    assert!(item.is_pending());
}

#[test]
fn list_items_filters_by_receiver_and_stalled() {
    let mut conn = create_db();
    let tx = conn.transaction().unwrap();
    let a = sql::insert_item(&tx, "alice.near", "10", None, true).unwrap();
    let _b = sql::insert_item(&tx, "bob.near", "20", None, true).unwrap();
    sql::mark_item_stalled(&tx, a, "oops").unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    let stalled = sql::list_items(&tx, ItemFilter { receiver: None, is_stalled: Some(true) }).unwrap();
    assert_eq!(stalled.len(), 1);
    assert_eq!(stalled[0].receiver, "alice.near");

    let bobs = sql::list_items(&tx, ItemFilter { receiver: Some("bob.near"), is_stalled: None }).unwrap();
    assert_eq!(bobs.len(), 1);
}

#[test]
fn large_amounts_round_trip_losslessly() {
    let mut conn = create_db();
    let huge = "1".repeat(120);
    let tx = conn.transaction().unwrap();
    let id = sql::insert_item(&tx, "alice.near", &huge, None, true).unwrap();
    tx.commit().unwrap();

    let tx = conn.transaction().unwrap();
    let item = sql::get_item(&tx, id).unwrap().unwrap();
    assert_eq!(item.amount, huge);
}
