use orchestrator_store::types::{Item, ItemId};
use tokio::sync::broadcast;

/// Default capacity of the lifecycle event channel. Lagging subscribers drop the oldest events
/// rather than stall a Queue operation; this is a best-effort observability channel, never a
/// delivery guarantee.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// A lifecycle event emitted by the Queue. Always emitted *after* the owning Store transaction
/// has committed, so a subscriber never observes an event for state that could still roll back.
#[derive(Debug, Clone)]
pub enum Event {
    /// A new Item was created, or an existing pending Item absorbed a coalesced enqueue.
    Pushed { item_id: ItemId },
    /// `peek` returned a non-empty candidate list.
    Peeked { count: usize },
    /// An Item's owning Batch was marked successful.
    Success { item: Item, tx_hash: String },
    /// An Item was recycled or stalled out of a failed Batch.
    Failed { item: Item, error_message: String },
    /// A tick finished processing a batch.
    BatchProcessed { item_count: usize, success: bool },
    /// A tick's batch failed outright (as opposed to a single isolated Item).
    BatchFailed { batch_id: i64, error_message: String },
    /// One full tick of the Executor's loop completed.
    LoopCompleted,
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Best-effort: a `Send` error only means there are currently no subscribers, which is not
    /// an error condition for the Queue.
    pub(crate) fn emit(&self, event: Event) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}
