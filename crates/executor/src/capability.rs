//! Chain-facing capabilities the Executor is built against, but never implements itself.
//!
//! Mirrors the teacher's `TransactionValidator`/`BatchBuilder` split: the Executor owns
//! scheduling and recovery, and delegates signing and submission to injected, object-safe
//! implementations so the binary can supply whatever concrete chain connector it likes.

use async_trait::async_trait;

use crate::action::Action;

/// Produces a signed transaction from an ordered action sequence.
#[async_trait]
pub trait Signer: Send + Sync + 'static {
    /// Signs `actions` against `contract`, returning the opaque signed blob and its content
    /// hash (SHA-256 of the serialized transaction, base58-encoded, by convention).
    async fn sign(
        &self,
        contract: &str,
        actions: &[Action],
    ) -> Result<SignedTransaction, Box<dyn std::error::Error + Send + Sync>>;
}

/// A signed, opaque transaction blob plus its content hash.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub signed_blob: Vec<u8>,
    pub content_hash: String,
}

/// Submits a signed blob to the chain and reports what happened.
#[async_trait]
pub trait Broadcaster: Send + Sync + 'static {
    /// Redelivery of the same `signed_blob` after prior acceptance must be safe - the chain is
    /// assumed to deduplicate by content, which is what makes blind resubmission on crash
    /// recovery sound.
    async fn send(&self, signed_blob: &[u8]) -> Outcome;
}

/// The result of submitting a signed transaction to the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The chain accepted and executed the transaction.
    Success { tx_hash: String },
    /// One action in the batch failed. `index` may be absent for whole-transaction action
    /// failures, e.g. resource accounting.
    ActionError { index: Option<usize>, kind: String },
    /// The transaction was rejected before execution (malformed or stale nonce).
    InvalidTxError { kind: String },
    /// The call did not complete: network, timeout, or similar transport failure.
    Transport { err: String },
}
