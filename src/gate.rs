use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Minimum spacing between the completion of one request and the start of
/// the next. Only meaningful while the owner holds the client lock.
#[derive(Debug)]
pub(crate) struct RequestGate {
    min_interval: Duration,
    last_completion: Option<Instant>,
}

impl RequestGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_completion: None,
        }
    }

    /// Remaining wait before the next request may start.
    pub fn remaining(&self) -> Option<Duration> {
        let last = self.last_completion?;
        let elapsed = Instant::now().saturating_duration_since(last);
        self.min_interval
            .checked_sub(elapsed)
            .filter(|d| !d.is_zero())
    }

    /// Dropping the returned future aborts the wait.
    pub async fn acquire(&self) {
        if let Some(wait) = self.remaining() {
            debug!(wait_ms = wait.as_millis() as u64, "rate limiting: waiting before next request");
            tokio::time::sleep(wait).await;
        }
    }

    pub fn record_completion(&mut self) {
        self.last_completion = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_request_is_not_delayed() {
        let gate = RequestGate::new(Duration::from_secs(2));
        let start = Instant::now();
        gate.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_remainder_from_last_completion() {
        let mut gate = RequestGate::new(Duration::from_secs(2));
        gate.record_completion();
        tokio::time::advance(Duration::from_millis(500)).await;

        let start = Instant::now();
        gate.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_requests_pass_immediately() {
        let mut gate = RequestGate::new(Duration::from_secs(2));
        gate.record_completion();
        tokio::time::advance(Duration::from_secs(5)).await;

        assert!(gate.remaining().is_none());
        let start = Instant::now();
        gate.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wait_returns_control() {
        let mut gate = RequestGate::new(Duration::from_secs(2));
        gate.record_completion();
        let res = tokio::time::timeout(Duration::from_millis(100), gate.acquire()).await;
        assert!(res.is_err());
        assert!(gate.remaining().is_some());
    }
}
