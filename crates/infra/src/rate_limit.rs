//! Per-(principal, operation) rate limiting on top of `governor`.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::Quota;
use stockroom_auth::PrincipalId;

use crate::config::RateLimitConfig;

type LimitKey = (PrincipalId, &'static str);

type KeyedLimiter<C> = governor::RateLimiter<
    LimitKey,
    DefaultKeyedStateStore<LimitKey>,
    C,
    NoOpMiddleware<<C as Clock>::Instant>,
>;

/// Keys whose window has fully elapsed are dropped every this many checks.
const RETAIN_EVERY: u64 = 1024;

/// Allows `max_calls` in a burst per key, refilled evenly over `window`.
pub struct RateLimiter<C = DefaultClock>
where
    C: Clock,
{
    config: RateLimitConfig,
    clock: C,
    limiter: Option<KeyedLimiter<C>>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, DefaultClock::default())
    }
}

impl<C> RateLimiter<C>
where
    C: Clock + Clone,
{
    pub fn with_clock(config: RateLimitConfig, clock: C) -> Self {
        let limiter = config
            .enabled
            .then(|| quota(&config))
            .map(|quota| {
                governor::RateLimiter::new(quota, DefaultKeyedStateStore::default(), clock.clone())
            });

        Self {
            config,
            clock,
            limiter,
            checks: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Record a call, or return how long the caller must wait.
    pub fn check(&self, principal_id: PrincipalId, operation: &'static str) -> Result<(), Duration> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };

        if self.checks.fetch_add(1, Ordering::Relaxed) % RETAIN_EVERY == RETAIN_EVERY - 1 {
            limiter.retain_recent();
        }

        limiter
            .check_key(&(principal_id, operation))
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Forget keys that are back to a full burst.
    pub fn retain_recent(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.retain_recent();
        }
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.limiter.as_ref().map_or(0, |limiter| limiter.len())
    }
}

impl<C> fmt::Debug for RateLimiter<C>
where
    C: Clock,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn quota(config: &RateLimitConfig) -> Quota {
    let burst = NonZeroU32::new(config.max_calls).unwrap_or(NonZeroU32::MIN);
    let period = (config.window / burst.get()).max(Duration::from_nanos(1));
    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;

    fn limiter(max_calls: u32, window_ms: u64) -> (RateLimiter<FakeRelativeClock>, FakeRelativeClock) {
        let clock = FakeRelativeClock::default();
        let limiter = RateLimiter::with_clock(
            RateLimitConfig {
                enabled: true,
                max_calls,
                window: Duration::from_millis(window_ms),
            },
            clock.clone(),
        );
        (limiter, clock)
    }

    #[test]
    fn allows_a_burst_of_max_calls() {
        let (limiter, _clock) = limiter(4, 1000);
        let who = PrincipalId::new();

        for _ in 0..4 {
            assert!(limiter.check(who, "inventory/addReserve").is_ok());
        }
        let retry = limiter.check(who, "inventory/addReserve").unwrap_err();
        assert_eq!(retry, Duration::from_millis(250));
    }

    #[test]
    fn calls_refill_over_the_window() {
        let (limiter, clock) = limiter(2, 100);
        let who = PrincipalId::new();

        assert!(limiter.check(who, "op").is_ok());
        assert!(limiter.check(who, "op").is_ok());
        assert!(limiter.check(who, "op").is_err());

        clock.advance(Duration::from_millis(50));
        assert!(limiter.check(who, "op").is_ok());
        assert!(limiter.check(who, "op").is_err());

        clock.advance(Duration::from_millis(100));
        assert!(limiter.check(who, "op").is_ok());
        assert!(limiter.check(who, "op").is_ok());
    }

    #[test]
    fn keys_are_independent() {
        let (limiter, _clock) = limiter(1, 1000);
        let a = PrincipalId::new();
        let b = PrincipalId::new();

        assert!(limiter.check(a, "inventory/addReserve").is_ok());
        assert!(limiter.check(b, "inventory/addReserve").is_ok());
        assert!(limiter.check(a, "inventory/backorder").is_ok());
        assert!(limiter.check(a, "inventory/addReserve").is_err());
    }

    #[test]
    fn idle_principals_are_forgotten() {
        let (limiter, clock) = limiter(5, 1000);
        for _ in 0..10_000 {
            limiter.check(PrincipalId::new(), "inventory/addReserve").unwrap();
        }
        assert!(limiter.tracked_keys() > 1_000);

        clock.advance(Duration::from_secs(3600));
        limiter.retain_recent();

        assert!(limiter.tracked_keys() < 100);
    }

    #[test]
    fn busy_principals_survive_retention() {
        let (limiter, clock) = limiter(1, 1000);
        let who = PrincipalId::new();
        limiter.check(who, "op").unwrap();

        clock.advance(Duration::from_millis(100));
        limiter.retain_recent();

        assert_eq!(limiter.tracked_keys(), 1);
        assert!(limiter.check(who, "op").is_err());
    }

    #[test]
    fn disabled_limiter_never_refuses() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        });
        let who = PrincipalId::new();
        for _ in 0..100 {
            assert!(limiter.check(who, "op").is_ok());
        }
        assert_eq!(limiter.tracked_keys(), 0);
    }
}
