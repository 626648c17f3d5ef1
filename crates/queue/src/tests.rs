use std::sync::Arc;

use assert_matches::assert_matches;
use orchestrator_store::db::Db;

use crate::{config::QueueConfig, events::Event, Queue};

async fn new_queue(coalesce: bool) -> Queue {
    let db = Db::open_in_memory().await.unwrap();
    Queue::new(Arc::new(db), QueueConfig { coalesce, ..QueueConfig::default() })
}

#[tokio::test]
async fn enqueue_rejects_invalid_amount() {
    let queue = new_queue(true).await;
    let err = queue.enqueue("alice.near".into(), "not-a-number", None, None).await.unwrap_err();
    assert_matches!(err, crate::QueueError::InvalidAmount(_));
}

#[tokio::test]
async fn enqueue_accepts_zero_amount() {
    let queue = new_queue(true).await;
    let id = queue.enqueue("alice.near".into(), "0", None, None).await.unwrap();
    let item = queue.get_item(id).await.unwrap().unwrap();
    assert_eq!(item.amount, "0");
}

#[tokio::test]
async fn coalesce_sums_amounts_for_same_receiver() {
    let queue = new_queue(true).await;
    queue.enqueue("alice.near".into(), "100", None, None).await.unwrap();
    queue.enqueue("alice.near".into(), "200", None, None).await.unwrap();
    queue.enqueue("alice.near".into(), "300", None, None).await.unwrap();

    let peeked = queue.peek(10).await.unwrap();
    assert_eq!(peeked.len(), 1);
    assert_eq!(peeked[0].amount, "600");
}

#[tokio::test]
async fn coalescing_disabled_keeps_separate_items() {
    let queue = new_queue(false).await;
    queue.enqueue("alice.near".into(), "100", None, None).await.unwrap();
    queue.enqueue("alice.near".into(), "200", None, None).await.unwrap();

    let peeked = queue.peek(10).await.unwrap();
    assert_eq!(peeked.len(), 2);
}

#[tokio::test]
async fn peek_is_bounded_and_fifo() {
    let queue = new_queue(false).await;
    for i in 0..5 {
        queue.enqueue(format!("receiver-{i}"), "10", None, None).await.unwrap();
    }
    let peeked = queue.peek(3).await.unwrap();
    assert_eq!(peeked.len(), 3);
    assert!(peeked.windows(2).all(|pair| pair[0].id < pair[1].id));

    assert!(queue.peek(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn attach_batch_then_mark_success_registers_storage_deposit() {
    let queue = new_queue(false).await;
    let id = queue.enqueue("alice.near".into(), "10", None, None).await.unwrap();

    let batch_id = queue.attach_batch("hash1".into(), b"signed".to_vec(), vec![id]).await.unwrap();
    queue.mark_batch_success(batch_id, "chain-hash".into()).await.unwrap();

    let item = queue.get_item(id).await.unwrap().unwrap();
    assert!(item.has_storage_deposit);
    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.success, 1);
    assert_eq!(stats.pending, 0);
}

#[tokio::test]
async fn recover_failed_batch_returns_items_to_pending_with_incremented_retry() {
    let queue = new_queue(false).await;
    let id = queue.enqueue("alice.near".into(), "10", None, None).await.unwrap();
    let batch_id = queue.attach_batch("hash1".into(), b"signed".to_vec(), vec![id]).await.unwrap();

    queue.recover_failed_batch(batch_id, Some("transport error".into()), Some(5)).await.unwrap();

    let item = queue.get_item(id).await.unwrap().unwrap();
    assert!(item.is_pending());
    assert_eq!(item.retry_count, 1);
}

#[tokio::test]
async fn per_action_failure_isolates_exactly_one_item() {
    let queue = new_queue(false).await;
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(queue.enqueue(format!("r{i}"), "10", None, Some(true)).await.unwrap());
    }
    let batch_id = queue.attach_batch("hash1".into(), b"signed".to_vec(), ids.clone()).await.unwrap();

    let offender = ids[2];
    queue.mark_item_stalled(offender, "action 2 failed".into()).await.unwrap();
    queue.recover_failed_batch(batch_id, None, None).await.unwrap();

    for (i, id) in ids.iter().enumerate() {
        let item = queue.get_item(*id).await.unwrap().unwrap();
        if i == 2 {
            assert!(item.is_stalled);
        } else {
            assert!(item.is_pending());
            assert_eq!(item.retry_count, 0, "siblings are not penalized for a co-tenant's failure");
        }
    }
}

#[tokio::test]
async fn auto_stall_on_retry_exhaustion() {
    let queue = new_queue(false).await;
    let id = queue.enqueue("alice.near".into(), "10", None, None).await.unwrap();

    for _ in 0..3 {
        let batch_id = queue.attach_batch("hash".into(), b"signed".to_vec(), vec![id]).await.unwrap();
        queue.recover_failed_batch(batch_id, Some("stale nonce".into()), Some(2)).await.unwrap();
    }

    let item = queue.get_item(id).await.unwrap().unwrap();
    assert_eq!(item.retry_count, 3);
    assert!(item.is_stalled);
    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.pending, 0);
}

#[tokio::test]
async fn unstall_is_idempotent() {
    let queue = new_queue(false).await;
    let id = queue.enqueue("alice.near".into(), "10", None, None).await.unwrap();
    queue.mark_item_stalled(id, "oops".into()).await.unwrap();

    assert_eq!(queue.unstall(id).await.unwrap(), 1);
    assert_eq!(queue.unstall(id).await.unwrap(), 0, "second unstall is a no-op");

    let item = queue.get_item(id).await.unwrap().unwrap();
    assert!(item.is_pending());
}

#[tokio::test]
async fn replay_in_flight_then_recover_restores_pending_or_success() {
    let queue = new_queue(false).await;
    let a = queue.enqueue("alice.near".into(), "10", None, None).await.unwrap();
    let b = queue.enqueue("bob.near".into(), "20", None, None).await.unwrap();
    let batch_id = queue.attach_batch("hash1".into(), b"signed".to_vec(), vec![a, b]).await.unwrap();

    let in_flight = queue.replay_in_flight().await.unwrap();
    assert_eq!(in_flight.len(), 1);
    assert_eq!(in_flight[0].batch_id, batch_id);

    // Simulate the chain having already committed this batch before the crash.
    queue.mark_batch_success(batch_id, "chain-hash".into()).await.unwrap();
    queue.recover().await.unwrap();

    let item_a = queue.get_item(a).await.unwrap().unwrap();
    assert!(item_a.has_storage_deposit);
}

#[tokio::test]
async fn large_amounts_round_trip() {
    let queue = new_queue(false).await;
    let huge = "9".repeat(200);
    let id = queue.enqueue("alice.near".into(), &huge, None, None).await.unwrap();
    let item = queue.get_item(id).await.unwrap().unwrap();
    assert_eq!(item.amount, huge);
}

#[tokio::test]
async fn events_are_emitted_after_commit() {
    let queue = new_queue(false).await;
    let mut rx = queue.subscribe();

    let id = queue.enqueue("alice.near".into(), "10", None, None).await.unwrap();
    assert_matches!(rx.recv().await.unwrap(), Event::Pushed { item_id } if item_id == id);

    let batch_id = queue.attach_batch("hash1".into(), b"signed".to_vec(), vec![id]).await.unwrap();
    queue.mark_batch_success(batch_id, "chain-hash".into()).await.unwrap();
    assert_matches!(rx.recv().await.unwrap(), Event::Success { .. });
    assert_matches!(rx.recv().await.unwrap(), Event::BatchProcessed { success: true, .. });
}
