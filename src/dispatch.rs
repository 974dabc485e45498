/// Concurrent broadcast dispatch
///
/// One task per recipient, each under its own send deadline, all under one
/// batch deadline. A failing recipient only ever affects its own
/// [`SendResult`]; nothing here is retried.
use crate::{
    config::BroadcastConfig,
    db::Employee,
    deadline::{self, Bounded},
    mailer::{render_broadcast, EmailTransport},
    metrics,
    validation::is_valid_email,
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Outcome for a single recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendResult {
    pub email: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResult {
    fn sent(email: String) -> Self {
        Self {
            email,
            success: true,
            error: None,
        }
    }

    fn failed(email: String, error: impl Into<String>) -> Self {
        Self {
            email,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Aggregate of one dispatch; one result per recipient, in recipient order
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub results: Vec<SendResult>,
    /// The batch deadline passed before every send finished
    pub timed_out: bool,
}

impl DispatchReport {
    pub fn recipient_count(&self) -> usize {
        self.results.len()
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

#[derive(Clone)]
pub struct DispatchEngine {
    transport: Arc<dyn EmailTransport>,
    send_timeout: Duration,
    batch_timeout: Duration,
}

impl DispatchEngine {
    pub fn new(
        transport: Arc<dyn EmailTransport>,
        send_timeout: Duration,
        batch_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            send_timeout,
            batch_timeout,
        }
    }

    pub fn from_config(transport: Arc<dyn EmailTransport>, config: &BroadcastConfig) -> Self {
        Self::new(transport, config.send_timeout(), config.batch_timeout())
    }

    /// Send `subject`/`content` to every recipient concurrently
    ///
    /// Recipients still outstanding when the batch deadline passes are
    /// abandoned and reported as failures, so the report always holds exactly
    /// one result per recipient.
    pub async fn dispatch(
        &self,
        subject: &str,
        content: &str,
        recipients: &[Employee],
    ) -> DispatchReport {
        let batch_deadline = tokio::time::Instant::now() + self.batch_timeout;
        let subject: Arc<str> = Arc::from(subject);
        let content: Arc<str> = Arc::from(content);

        let mut results: Vec<Option<SendResult>> = vec![None; recipients.len()];
        let mut tasks = JoinSet::new();

        for (index, employee) in recipients.iter().enumerate() {
            let email = employee.email.trim().to_string();

            if !is_valid_email(&email) {
                debug!(index, "Skipping recipient with invalid email address");
                if let Some(slot) = results.get_mut(index) {
                    *slot = Some(SendResult::failed(email, "Invalid email address"));
                }
                continue;
            }

            let transport = Arc::clone(&self.transport);
            let subject = Arc::clone(&subject);
            let content = Arc::clone(&content);
            let name = employee.name.clone();
            let send_timeout = self.send_timeout;

            tasks.spawn(async move {
                let html = render_broadcast(&subject, &name, &content);
                let outcome =
                    deadline::within(send_timeout, transport.send(&email, &subject, &html)).await;

                let result = match outcome {
                    Bounded::Completed(Ok(())) => SendResult::sent(email),
                    Bounded::Completed(Err(e)) => SendResult::failed(email, e.to_string()),
                    Bounded::TimedOut => SendResult::failed(email, "Send timed out"),
                };
                (index, result)
            });
        }

        let mut timed_out = false;
        loop {
            let next = tokio::time::timeout_at(batch_deadline, tasks.join_next()).await;
            match next {
                Ok(Some(Ok((index, result)))) => {
                    if let Some(slot) = results.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Ok(Some(Err(e))) => {
                    // Panicked or cancelled; its slot stays empty and is
                    // filled in as a failure below.
                    warn!(error = %e, "Send task did not complete");
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        outstanding = tasks.len(),
                        "Batch deadline passed; abandoning outstanding sends"
                    );
                    timed_out = true;
                    tasks.abort_all();
                    break;
                }
            }
        }

        let results: Vec<SendResult> = results
            .into_iter()
            .zip(recipients)
            .map(|(result, employee)| {
                result.unwrap_or_else(|| {
                    let reason = if timed_out {
                        "Batch timed out"
                    } else {
                        "Send task failed"
                    };
                    SendResult::failed(employee.email.trim().to_string(), reason)
                })
            })
            .collect();

        for result in &results {
            metrics::record_email(result.success);
        }

        let report = DispatchReport { results, timed_out };
        info!(
            recipients = report.recipient_count(),
            sent = report.success_count(),
            failed = report.failure_count(),
            timed_out,
            "Dispatch finished"
        );
        report
    }
}
