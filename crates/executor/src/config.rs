use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Executor-specific configuration.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Maximum number of Items considered per tick. Clamped to 1..=100.
    pub batch_size: u32,
    /// Minimum wall-time between ticks, in milliseconds.
    pub interval_ms: u64,
    /// If fewer than this many candidate Items are available, the tick is skipped.
    pub min_queue_to_process: u32,
    /// Maximum `retry_count` before an Item auto-stalls on batch recovery.
    pub max_retries: u32,
    /// Chain-imposed upper bound on actions in one transaction.
    pub max_actions_per_transaction: usize,
    /// Fungible-token contract account targeted by every transfer/registration action.
    pub contract_account_id: String,
    /// Attached value for a `storage_deposit` action (domain constant, opaque integer-as-string).
    pub storage_deposit_amount: String,
    /// Gas budget attached to each action (domain constant, opaque integer-as-string).
    pub gas_per_action: String,
}

impl ExecutorConfig {
    /// `batch_size` clamped into the 1..=100 range mandated for the Executor's per-tick budget.
    pub fn clamped_batch_size(&self) -> u32 {
        self.batch_size.clamp(1, 100)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            interval_ms: 500,
            min_queue_to_process: 1,
            max_retries: 5,
            max_actions_per_transaction: 100,
            contract_account_id: "token.near".to_string(),
            storage_deposit_amount: "1250000000000000000000".to_string(),
            gas_per_action: "30000000000000".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ExecutorConfig;

    #[test]
    fn batch_size_is_clamped() {
        let mut config = ExecutorConfig { batch_size: 0, ..ExecutorConfig::default() };
        assert_eq!(config.clamped_batch_size(), 1);

        config.batch_size = 500;
        assert_eq!(config.clamped_batch_size(), 100);
    }
}
