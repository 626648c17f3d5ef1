use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("amount {0:?} is not a non-negative integer")]
    InvalidAmount(String),
    #[error("store error")]
    Store(#[from] orchestrator_store::errors::DatabaseError),
}
