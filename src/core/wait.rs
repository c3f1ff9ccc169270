//! DF-007: Wait for a droplet's public IP.
//!
//! Bounded by a retry budget and a wall-clock deadline; a cancel flag is
//! checked before every poll and after every sleep. Time goes through the
//! `Clock` trait so tests never sleep for real.

use super::error::{DropformError, Result};
use super::settings::PollPolicy;
use super::types::ResolvedToken;
use crate::cloud::ComputeApi;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Source of elapsed time and sleeping.
pub trait Clock {
    /// Time since the clock was created.
    fn elapsed(&self) -> Duration;
    fn sleep(&self, d: Duration);
}

/// Real wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A droplet that became reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ready {
    pub ip: String,
    pub polls: u32,
}

/// Poll `GET /droplets/{id}` until a public IPv4 appears.
pub fn wait_for_public_ip(
    api: &dyn ComputeApi,
    token: &ResolvedToken,
    id: u64,
    policy: &PollPolicy,
    clock: &dyn Clock,
    cancel: &CancelToken,
) -> Result<Ready> {
    let start = clock.elapsed();
    let mut polls = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(DropformError::Cancelled { id });
        }

        polls += 1;
        let droplet = api.get_droplet(token, id)?;
        if let Some(ip) = droplet.public_ip() {
            info!(id, ip, polls, "droplet has a public IP");
            return Ok(Ready {
                ip: ip.to_string(),
                polls,
            });
        }
        debug!(id, polls, status = ?droplet.status, "no public IP yet");

        let waited = clock.elapsed().saturating_sub(start);
        if polls >= policy.max_attempts || waited.saturating_add(policy.interval) > policy.deadline {
            return Err(DropformError::PollTimeout {
                id,
                attempts: polls,
                elapsed: waited,
            });
        }

        clock.sleep(policy.interval);
        if cancel.is_cancelled() {
            return Err(DropformError::Cancelled { id });
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeClock;
    use super::*;
    use crate::cloud::fake::{Call, FakeApi};

    fn policy(max_attempts: u32, deadline_secs: u64) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(5),
            max_attempts,
            deadline: Duration::from_secs(deadline_secs),
        }
    }

    fn token() -> ResolvedToken {
        ResolvedToken::new("secret123")
    }

    #[test]
    fn test_df007_ready_first_poll() {
        let api = FakeApi::new(11, 0);
        let clock = FakeClock::new();
        let ready = wait_for_public_ip(&api, &token(), 11, &policy(10, 600), &clock, &CancelToken::new())
            .unwrap();
        assert_eq!(ready.ip, "203.0.113.10");
        assert_eq!(ready.polls, 1);
        assert!(clock.sleeps.borrow().is_empty());
    }

    #[test]
    fn test_df007_ready_after_pending() {
        let api = FakeApi::new(11, 3);
        let clock = FakeClock::new();
        let ready = wait_for_public_ip(&api, &token(), 11, &policy(10, 600), &clock, &CancelToken::new())
            .unwrap();
        assert_eq!(ready.polls, 4);
        assert_eq!(clock.total_slept(), Duration::from_secs(15));
        assert!(api.calls().iter().all(|c| *c == Call::Get { id: 11 }));
    }

    #[test]
    fn test_df007_retry_budget_exhausted() {
        let api = FakeApi::new(11, 100);
        let clock = FakeClock::new();
        let err = wait_for_public_ip(&api, &token(), 11, &policy(4, 3600), &clock, &CancelToken::new())
            .unwrap_err();
        match err {
            DropformError::PollTimeout { id, attempts, elapsed } => {
                assert_eq!(id, 11);
                assert_eq!(attempts, 4);
                assert_eq!(elapsed, Duration::from_secs(15));
            }
            other => panic!("expected PollTimeout, got {:?}", other),
        }
        assert_eq!(api.calls().len(), 4);
    }

    #[test]
    fn test_df007_deadline_exceeded() {
        let api = FakeApi::new(11, 100);
        let clock = FakeClock::new();
        let err = wait_for_public_ip(&api, &token(), 11, &policy(1000, 12), &clock, &CancelToken::new())
            .unwrap_err();
        // Polls at t=0, 5, 10; next would start at 15 > 12
        assert!(matches!(err, DropformError::PollTimeout { attempts: 3, .. }));
        assert!(clock.total_slept() <= Duration::from_secs(12));
    }

    #[test]
    fn test_df007_cancelled_before_first_poll() {
        let api = FakeApi::new(11, 0);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = wait_for_public_ip(&api, &token(), 11, &policy(10, 600), &FakeClock::new(), &cancel)
            .unwrap_err();
        assert!(matches!(err, DropformError::Cancelled { id: 11 }));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_df007_cancelled_between_polls() {
        let api = FakeApi::new(11, 100);
        let cancel = CancelToken::new();
        let clock = FakeClock::cancelling_after(2, cancel.clone());
        let err = wait_for_public_ip(&api, &token(), 11, &policy(100, 6000), &clock, &cancel)
            .unwrap_err();
        assert!(matches!(err, DropformError::Cancelled { id: 11 }));
        assert_eq!(api.calls().len(), 2);
    }

    #[test]
    fn test_df007_get_error_is_fatal() {
        let api = FakeApi::new(11, 0);
        api.get_errors.borrow_mut().push_back("connection reset".to_string());
        let err = wait_for_public_ip(&api, &token(), 11, &policy(10, 600), &FakeClock::new(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, DropformError::RemoteApi { status: None, .. }));
    }

    #[test]
    fn test_df007_huge_interval_does_not_overflow() {
        let api = FakeApi::new(11, 100);
        let policy = PollPolicy {
            interval: Duration::from_secs(u64::MAX),
            max_attempts: 10,
            deadline: Duration::from_secs(u64::MAX),
        };
        let err = wait_for_public_ip(&api, &token(), 11, &policy, &FakeClock::new(), &CancelToken::new())
            .unwrap_err();
        // One full interval already waited; a second one cannot fit
        assert!(matches!(err, DropformError::PollTimeout { attempts: 2, .. }));
    }

    #[test]
    fn test_df007_cancel_token_shared() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn test_df007_system_clock_advances() {
        let c = SystemClock::new();
        c.sleep(Duration::from_millis(5));
        assert!(c.elapsed() >= Duration::from_millis(5));
    }
}
