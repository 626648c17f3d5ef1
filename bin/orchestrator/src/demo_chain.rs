//! A minimal in-memory chain connector so the service is runnable out-of-the-box. This is
//! explicitly a stand-in for the real signing/RPC integration, which is out of scope: it signs by
//! hashing the action sequence and always reports broadcast success.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use orchestrator_executor::{
    action::Action,
    capability::{Broadcaster, Outcome, SignedTransaction, Signer},
};
use sha2::{Digest, Sha256};

pub struct DemoSigner;

#[async_trait]
impl Signer for DemoSigner {
    async fn sign(
        &self,
        contract: &str,
        actions: &[Action],
    ) -> Result<SignedTransaction, Box<dyn std::error::Error + Send + Sync>> {
        let serialized = format!("{contract}:{actions:?}");
        let content_hash = bs58::encode(Sha256::digest(serialized.as_bytes())).into_string();
        Ok(SignedTransaction { signed_blob: serialized.into_bytes(), content_hash })
    }
}

/// Always accepts, stamping a deterministic, monotonically increasing tx hash.
pub struct DemoBroadcaster {
    next_tx_index: AtomicU64,
}

impl DemoBroadcaster {
    pub fn new() -> Self {
        Self { next_tx_index: AtomicU64::new(0) }
    }
}

impl Default for DemoBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broadcaster for DemoBroadcaster {
    async fn send(&self, signed_blob: &[u8]) -> Outcome {
        let index = self.next_tx_index.fetch_add(1, Ordering::SeqCst);
        let digest = bs58::encode(Sha256::digest(signed_blob)).into_string();
        Outcome::Success { tx_hash: format!("{index}-{digest}") }
    }
}
