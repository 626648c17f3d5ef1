use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use orchestrator_queue::Queue;
use orchestrator_store::types::ItemId;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::{
    action::Action,
    capability::{Broadcaster, Outcome, Signer},
    config::ExecutorConfig,
    errors::ExecutorError,
    COMPONENT,
};

/// Drives Items through the chain: forms a Batch out of pending Items on a fixed interval, asks
/// the Signer for a signed transaction, commits it to the Queue, broadcasts it, and reacts to the
/// outcome. Single-writer: at most one tick runs at a time, and a tick never starts a second
/// outstanding batch before the first resolves.
pub struct Executor {
    queue: Arc<Queue>,
    signer: Arc<dyn Signer>,
    broadcaster: Arc<dyn Broadcaster>,
    config: ExecutorConfig,
    running: AtomicBool,
    /// Publishes `true` whenever a tick observes no remaining work. `wait_until_idle` treats this
    /// purely as a wake signal and re-checks `queue.has_work()` itself, so a missed notification
    /// never causes a permanent hang.
    idle: watch::Sender<bool>,
}

impl Executor {
    pub fn new(
        queue: Arc<Queue>,
        signer: Arc<dyn Signer>,
        broadcaster: Arc<dyn Broadcaster>,
        config: ExecutorConfig,
    ) -> Arc<Self> {
        let (idle, _receiver) = watch::channel(false);
        Arc::new(Self { queue, signer, broadcaster, config, running: AtomicBool::new(false), idle })
    }

    /// Runs crash recovery, resets stale Batch associations, then drives the tick loop until
    /// [`stop`](Self::stop) is called. The caller is expected to `tokio::spawn` this.
    #[instrument(target = COMPONENT, skip_all)]
    pub async fn start(self: &Arc<Self>) -> Result<(), ExecutorError> {
        if let Err(err) = self.recover_in_flight().await {
            warn!(target: COMPONENT, %err, "crash recovery failed, continuing without it");
        }
        self.queue.recover().await?;

        self.running.store(true, Ordering::SeqCst);
        info!(
            target: COMPONENT,
            interval_ms = self.config.interval_ms,
            batch_size = self.config.clamped_batch_size(),
            "executor started",
        );

        while self.running.load(Ordering::SeqCst) {
            if let Err(err) = self.tick().await {
                warn!(target: COMPONENT, %err, "tick failed, will retry next interval");
                tokio::time::sleep(self.config.interval()).await;
            }
        }

        info!(target: COMPONENT, "executor stopped");
        Ok(())
    }

    /// Clears the running flag. A tick already in progress completes; no new tick starts.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Resolves once `queue.has_work()` is false. Safe to call from multiple tasks.
    pub async fn wait_until_idle(&self) -> Result<(), ExecutorError> {
        let mut idle_rx = self.idle.subscribe();
        loop {
            if !self.queue.has_work().await? {
                return Ok(());
            }
            let _ = idle_rx.changed().await;
        }
    }

    /// For each Batch still `processing` at startup, resubmits its signed blob and applies the
    /// same outcome dispatch a live tick would. Blockchain submission is assumed idempotent on
    /// the signed content, so a prior silent acceptance surfaces as `Success` here.
    #[instrument(target = COMPONENT, skip_all, err)]
    pub(crate) async fn recover_in_flight(&self) -> Result<(), ExecutorError> {
        let in_flight = self.queue.replay_in_flight().await?;
        if !in_flight.is_empty() {
            info!(target: COMPONENT, count = in_flight.len(), "resubmitting in-flight batches after restart");
        }

        for batch in in_flight {
            let outcome = self.broadcaster.send(&batch.signed_tx).await;
            self.dispatch_outcome(batch.batch_id, &batch.item_ids, outcome).await?;
        }

        Ok(())
    }

    /// One iteration: peek candidates, fit them to the action budget, sign, commit, broadcast,
    /// dispatch the outcome, then sleep out the remainder of `interval`.
    #[instrument(target = COMPONENT, skip_all, err)]
    pub(crate) async fn tick(&self) -> Result<(), ExecutorError> {
        let t0 = Instant::now();
        let candidates = self.queue.peek(self.config.clamped_batch_size()).await?;

        if (candidates.len() as u32) < self.config.min_queue_to_process {
            debug!(target: COMPONENT, candidates = candidates.len(), "not enough work, skipping tick");
            return self.finish_tick(t0).await;
        }

        let mut chosen_ids = Vec::new();
        let mut actions = Vec::new();
        let mut cost = 0usize;

        for item in candidates {
            let item_cost = if item.has_storage_deposit {
                Action::TRANSFER_ONLY_COST
            } else {
                Action::REGISTRATION_COST
            };
            if cost + item_cost > self.config.max_actions_per_transaction {
                break;
            }
            cost += item_cost;

            if !item.has_storage_deposit {
                actions.push(Action::StorageDeposit { account_id: item.receiver.clone() });
            }
            actions.push(Action::FtTransfer {
                receiver_id: item.receiver.clone(),
                amount: item.amount.clone(),
                memo: item.memo.clone(),
            });
            chosen_ids.push(item.id);
        }

        if chosen_ids.is_empty() {
            warn!(target: COMPONENT, "no candidate Item fits inside the per-transaction action budget");
            return self.finish_tick(t0).await;
        }

        let signed = match self.signer.sign(&self.config.contract_account_id, &actions).await {
            Ok(signed) => signed,
            Err(err) => {
                let err = ExecutorError::SignerFailure(err);
                warn!(target: COMPONENT, %err, "leaving candidate Items pending for the next tick");
                return self.finish_tick(t0).await;
            },
        };

        // Durability barrier: the signed blob is committed before broadcast is attempted.
        let batch_id = self
            .queue
            .attach_batch(signed.content_hash, signed.signed_blob.clone(), chosen_ids.clone())
            .await?;

        let outcome = self.broadcaster.send(&signed.signed_blob).await;
        self.dispatch_outcome(batch_id, &chosen_ids, outcome).await?;

        self.finish_tick(t0).await
    }

    /// Applies the outcome-dispatch table from a Broadcaster result. `item_ids` is the ordered
    /// list of Items the Batch was formed from; `ActionError`'s `index`, when present, indexes
    /// into this list, matching the way the Batch's own Items were enumerated to build it.
    async fn dispatch_outcome(
        &self,
        batch_id: i64,
        item_ids: &[ItemId],
        outcome: Outcome,
    ) -> Result<(), ExecutorError> {
        match outcome {
            Outcome::Success { tx_hash } => {
                self.queue.mark_batch_success(batch_id, tx_hash).await?;
            },
            Outcome::ActionError { index: Some(index), kind } => match item_ids.get(index) {
                Some(&item_id) => {
                    self.queue.mark_item_stalled(item_id, kind).await?;
                    self.queue.recover_failed_batch(batch_id, None, None).await?;
                },
                None => {
                    warn!(target: COMPONENT, index, "action index out of range for this batch, recycling whole batch");
                    self.queue
                        .recover_failed_batch(batch_id, Some(kind), Some(self.config.max_retries))
                        .await?;
                },
            },
            Outcome::ActionError { index: None, kind } | Outcome::InvalidTxError { kind } => {
                self.queue
                    .recover_failed_batch(batch_id, Some(kind), Some(self.config.max_retries))
                    .await?;
            },
            Outcome::Transport { err } => {
                self.queue
                    .recover_failed_batch(batch_id, Some(err), Some(self.config.max_retries))
                    .await?;
            },
        }
        Ok(())
    }

    async fn finish_tick(&self, t0: Instant) -> Result<(), ExecutorError> {
        self.queue.notify_loop_completed();
        let has_work = self.queue.has_work().await?;
        let _ = self.idle.send(!has_work);

        if let Some(remaining) = self.config.interval().checked_sub(t0.elapsed()) {
            tokio::time::sleep(remaining).await;
        }
        Ok(())
    }
}
