//! Row types for the two relations the store owns: `items` and `batches`.

use serde::{Deserialize, Serialize};

pub type ItemId = i64;
pub type BatchId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Processing,
    Success,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Processing => "processing",
            BatchStatus::Success => "success",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "processing" => Some(BatchStatus::Processing),
            "success" => Some(BatchStatus::Success),
            _ => None,
        }
    }
}

/// One requested transfer, as persisted in the `items` table.
///
/// `batch_id IS NULL` is the ground truth for "pending"; `is_stalled` excludes an item from
/// scheduling independent of its batch association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub receiver: String,
    pub amount: String,
    pub memo: Option<String>,
    pub has_storage_deposit: bool,
    pub retry_count: u32,
    pub error_message: Option<String>,
    pub batch_id: Option<BatchId>,
    pub is_stalled: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Item {
    pub fn is_pending(&self) -> bool {
        self.batch_id.is_none() && !self.is_stalled
    }
}

/// One on-chain transaction bundling one or more Items, as persisted in the `batches` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub tx_hash: String,
    pub signed_tx: Option<Vec<u8>>,
    pub status: BatchStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Aggregate counts reported by `Db::stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    pub success: u64,
    pub stalled: u64,
}

/// A batch still `processing` at startup, ready to be resubmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightBatch {
    pub batch_id: BatchId,
    pub tx_hash: String,
    pub signed_tx: Vec<u8>,
    pub item_ids: Vec<ItemId>,
}

/// Filters accepted by `Db::list_items`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemFilter<'a> {
    pub receiver: Option<&'a str>,
    pub is_stalled: Option<bool>,
}
