/// Deadlines for bounded operations
///
/// Identity verification, each individual send and the whole send batch all
/// run under their own deadline. Each reports an explicit `TimedOut` outcome
/// instead of an error, so callers decide what a timeout means for them.
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bounded<T> {
    Completed(T),
    TimedOut,
}

impl<T> Bounded<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Bounded::Completed(value) => Some(value),
            Bounded::TimedOut => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Bounded::TimedOut)
    }
}

/// Run `fut` for at most `limit`; the future is dropped when the limit passes
pub async fn within<F>(limit: Duration, fut: F) -> Bounded<F::Output>
where
    F: Future,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(value) => Bounded::Completed(value),
        Err(_) => Bounded::TimedOut,
    }
}
