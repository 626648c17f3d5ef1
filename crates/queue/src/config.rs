use serde::{Deserialize, Serialize};

use crate::events::DEFAULT_EVENT_CHANNEL_CAPACITY;

#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Whether a new enqueue for a receiver with an existing PENDING Item is folded into it
    /// (summing amounts) rather than creating a second Item.
    pub coalesce: bool,
    /// `has_storage_deposit` used for a new Item when the caller does not specify one.
    pub default_has_storage_deposit: bool,
    /// Capacity of the best-effort lifecycle event channel.
    pub event_channel_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            coalesce: true,
            default_has_storage_deposit: false,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}
