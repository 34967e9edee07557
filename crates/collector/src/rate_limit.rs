//! Per-location call budget for the OpenWeather API.
//!
//! A daily quota becomes a token bucket with capacity 1 that refills one
//! token every `86400 / daily_limit` seconds. Refill is continuous; nothing
//! resets at midnight. Idle time never banks more than one call.

use common::Error;
use governor::clock::{Clock, DefaultClock, Reference};
use governor::middleware::NoOpMiddleware;
use governor::nanos::Nanos;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovLimiter};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 86_400;

type DirectLimiter<C> =
    GovLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Spacing between admitted calls for a daily limit.
///
/// Whole seconds, as `86400 / daily_limit`; a limit of zero, or one so large
/// the spacing rounds down to zero, is a configuration error.
pub fn interval_for(daily_limit: u32) -> Result<Duration, Error> {
    if daily_limit == 0 {
        return Err(Error::Config("daily call limit must be > 0".into()));
    }
    let secs = SECONDS_PER_DAY / u64::from(daily_limit);
    if secs == 0 {
        return Err(Error::Config(format!(
            "daily call limit must be <= {SECONDS_PER_DAY} (got {daily_limit})"
        )));
    }
    Ok(Duration::from_secs(secs))
}

/// Token bucket admitting at most one call per interval.
pub struct RateBudget<C: Clock = DefaultClock> {
    limiter: DirectLimiter<C>,
    clock: C,
    interval: Duration,
    // GCRA lets a second call through right after a long idle period;
    // admissions closer together than `interval` are refused here.
    last_admitted: Mutex<Option<C::Instant>>,
}

impl RateBudget<DefaultClock> {
    pub fn from_daily_limit(daily_limit: u32) -> Result<Self, Error> {
        Self::with_clock(daily_limit, &DefaultClock::default())
    }
}

impl<C: Clock> RateBudget<C> {
    /// Budget driven by an explicit clock (tests use `FakeRelativeClock`).
    pub fn with_clock(daily_limit: u32, clock: &C) -> Result<Self, Error> {
        let interval = interval_for(daily_limit)?;
        let quota = Quota::with_period(interval)
            .ok_or_else(|| Error::Config(format!("invalid call interval {interval:?}")))?
            .allow_burst(NonZeroU32::MIN);

        Ok(Self {
            limiter: GovLimiter::direct_with_clock(quota, clock),
            clock: clock.clone(),
            interval,
            last_admitted: Mutex::new(None),
        })
    }

    /// Take the token if one is available. Never blocks.
    pub fn admit(&self) -> bool {
        let mut last = self
            .last_admitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = self.clock.now();
        if let Some(previous) = *last {
            if now.duration_since(previous) < Nanos::from(self.interval) {
                return false;
            }
        }
        if self.limiter.check().is_err() {
            return false;
        }

        *last = Some(now);
        true
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl<C: Clock> fmt::Debug for RateBudget<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateBudget")
            .field("interval", &self.interval)
            .finish()
    }
}
