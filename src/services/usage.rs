// ABOUTME: Best-effort token usage recording on a spawned task
// ABOUTME: Failures are logged and never reach the request that produced the usage

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::database::{Database, TokenUsageRecord};

/// Writes token usage rows without blocking or failing the caller
#[derive(Clone)]
pub struct UsageRecorder {
    database: Arc<Database>,
}

impl UsageRecorder {
    /// Create a recorder over the shared database
    #[must_use]
    pub const fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Spawn the insert; the handle is only awaited by tests
    pub fn record_best_effort(&self, record: TokenUsageRecord) -> JoinHandle<()> {
        let database = Arc::clone(&self.database);
        tokio::spawn(async move {
            match database.insert_token_usage(&record).await {
                Ok(()) => debug!(
                    tenant_id = %record.tenant_id,
                    model = %record.model,
                    prompt_tokens = record.prompt_tokens,
                    completion_tokens = record.completion_tokens,
                    "Token usage recorded"
                ),
                Err(e) => warn!(
                    tenant_id = %record.tenant_id,
                    user_id = %record.user_id,
                    error = %e,
                    "Failed to record token usage"
                ),
            }
        })
    }
}
