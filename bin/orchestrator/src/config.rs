use std::fmt::{Display, Formatter};

use orchestrator_executor::ExecutorConfig;
use orchestrator_queue::QueueConfig;
use orchestrator_store::config::StoreConfig;
use orchestrator_utils::config::DEFAULT_ORCHESTRATOR_PORT;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Interface the REST surface binds to.
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

impl OrchestratorConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Display for OrchestratorConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{{ endpoint: \"{}\", store: {} }}",
            self.endpoint(),
            self.store,
        ))
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_ORCHESTRATOR_PORT,
            store: StoreConfig::default(),
            queue: QueueConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}
