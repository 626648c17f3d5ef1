use thiserror::Error;

/// Errors surfaced by a single tick. Every variant is non-fatal to the Executor's loop: a
/// failed tick is logged and the loop sleeps for its usual interval before trying again.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("signer failed to produce a signed transaction")]
    SignerFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("queue operation failed")]
    Queue(#[from] orchestrator_queue::QueueError),
}
