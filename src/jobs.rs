use crate::context::AppContext;
use std::sync::Arc;
use tokio::time::interval;
use tracing::{debug, info};

/// Background maintenance for in-memory state
pub struct JobScheduler {
    context: Arc<AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");
        tokio::spawn(Self::rate_limit_prune_job(Arc::clone(&self)));
    }

    /// Drop expired rate-limit windows (runs once per window)
    async fn rate_limit_prune_job(scheduler: Arc<Self>) {
        let mut interval = interval(scheduler.context.config.rate_limit.window());
        // First tick fires immediately and there is nothing to prune yet
        interval.tick().await;

        loop {
            interval.tick().await;
            let removed = scheduler
                .context
                .rate_limiter
                .prune(std::time::Instant::now());
            if removed > 0 {
                debug!(
                    removed,
                    remaining = scheduler.context.rate_limiter.tracked_keys(),
                    "Pruned expired rate limit windows"
                );
            }
        }
    }
}
