use std::sync::Arc;

use orchestrator_queue::Queue;

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<Queue>,
}
