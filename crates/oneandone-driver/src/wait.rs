//! Bounded polling.
//!
//! Every wait has a fixed interval and a maximum number of attempts. A check
//! error ends the wait immediately: the loops retry state transitions, never
//! failed calls.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl WaitPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on the time spent sleeping.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Run `check` until it yields a value, at most `policy.max_attempts` times.
///
/// `resource`, `id` and `target` only feed logs and the budget error.
pub async fn poll_until<T, F, Fut>(
    resource: &'static str,
    id: &str,
    target: &str,
    policy: WaitPolicy,
    mut check: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    debug!(
        resource,
        id,
        target,
        budget_secs = policy.budget().as_secs(),
        "waiting"
    );

    for attempt in 1..=policy.max_attempts {
        if let Some(value) = check().await? {
            return Ok(value);
        }

        debug!(resource, id, target, attempt, "not there yet");

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(Error::WaitBudgetExceeded {
        resource,
        id: id.to_string(),
        target: target.to_string(),
        attempts: policy.max_attempts,
    })
}

/// Block until `fetch` reports the provider state `target`.
pub async fn wait_for_state<F, Fut>(
    resource: &'static str,
    id: &str,
    target: &str,
    policy: WaitPolicy,
    mut fetch: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    poll_until(resource, id, target, policy, || {
        let state = fetch();
        async move { Ok((state.await? == target).then_some(())) }
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    const FAST: WaitPolicy = WaitPolicy::new(Duration::ZERO, 5);

    #[tokio::test]
    async fn returns_as_soon_as_target_is_seen() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        wait_for_state("server", "S1", "POWERED_ON", FAST, || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(if n < 2 { "POWERING_ON" } else { "POWERED_ON" }.to_string())
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn budget_exhaustion_is_an_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = wait_for_state("firewall policy", "FW1", "ACTIVE", FAST, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("CONFIGURING".to_string())
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match err {
            Error::WaitBudgetExceeded {
                resource,
                id,
                target,
                attempts,
            } => {
                assert_eq!(resource, "firewall policy");
                assert_eq!(id, "FW1");
                assert_eq!(target, "ACTIVE");
                assert_eq!(attempts, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn check_error_aborts_without_retrying() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = poll_until::<(), _, _>("server", "S1", "ip", FAST, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::NotCreated)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::NotCreated));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn budget_counts_sleeps_between_attempts() {
        let policy = WaitPolicy::new(Duration::from_secs(30), 10);
        assert_eq!(policy.budget(), Duration::from_secs(270));
    }
}
