//! Rate limiting policy for forwarding errors to the system log.
//!
//! The policy is a leaky bucket approximated by a single "next allowed"
//! timestamp per key: after an idle period up to `burst` events pass
//! immediately, after which admissions settle at one per `period` on average.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default average spacing between two forwarded errors of the same type.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Default number of errors of one type forwarded in a burst.
pub const DEFAULT_BURST: u32 = 5;

/// Decision made by a rate limiting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Forward the event
    Allow,
    /// Drop the event
    Suppress,
}

impl PolicyDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }

    pub fn is_suppress(&self) -> bool {
        matches!(self, PolicyDecision::Suppress)
    }
}

/// Error returned when a policy is configured with invalid parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Period must be greater than zero
    ZeroPeriod,
    /// Burst must allow at least one event
    ZeroBurst,
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::ZeroPeriod => write!(f, "period must be greater than 0"),
            PolicyError::ZeroBurst => write!(f, "burst must be greater than 0"),
        }
    }
}

impl std::error::Error for PolicyError {}

/// Trait for rate limiting policies.
pub trait RateLimitPolicy: Send + Sync {
    /// Register an occurrence at `timestamp` and decide whether to forward it.
    fn register_event(&mut self, timestamp: SystemTime) -> PolicyDecision;

    /// Forget all history.
    fn reset(&mut self);
}

/// Leaky bucket keyed on a scalar "next allowed" timestamp.
///
/// On each event at time `now`:
/// - if `now <= next_allowed` the event is suppressed and state is unchanged;
/// - otherwise it is allowed and
///   `next_allowed = max(next_allowed, now - burst * period) + period`.
///
/// A fresh policy has no `next_allowed` and admits its first event.
///
/// # Example
/// ```
/// use error_reporting::{LeakyBucketPolicy, RateLimitPolicy};
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let mut policy = LeakyBucketPolicy::new(Duration::from_secs(60), 2).unwrap();
/// let t0 = UNIX_EPOCH + Duration::from_secs(1_000_000);
///
/// assert!(policy.register_event(t0).is_allow());
/// assert!(policy.register_event(t0).is_allow());
/// assert!(policy.register_event(t0).is_suppress());
///
/// // One slot refills per period.
/// assert!(policy.register_event(t0 + Duration::from_secs(61)).is_allow());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LeakyBucketPolicy {
    period: f64,
    burst: u32,
    next_allowed: Option<f64>,
}

impl LeakyBucketPolicy {
    /// Create a policy.
    ///
    /// # Errors
    /// `PolicyError::ZeroPeriod` if `period` is zero, `PolicyError::ZeroBurst`
    /// if `burst` is zero.
    pub fn new(period: Duration, burst: u32) -> Result<Self, PolicyError> {
        if period.is_zero() {
            return Err(PolicyError::ZeroPeriod);
        }
        if burst == 0 {
            return Err(PolicyError::ZeroBurst);
        }
        Ok(Self {
            period: period.as_secs_f64(),
            burst,
            next_allowed: None,
        })
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.period)
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Seconds since the epoch before which events are suppressed.
    pub fn next_allowed(&self) -> Option<f64> {
        self.next_allowed
    }

    /// Whether this state behaves exactly like a fresh policy at `now`.
    ///
    /// Once `next_allowed` has fallen to `now - burst * period` or earlier the
    /// recurrence clamps it, so forgetting the state changes no decision.
    pub fn is_idle(&self, now: SystemTime) -> bool {
        match self.next_allowed {
            None => true,
            Some(next) => next <= self.floor(seconds(now)),
        }
    }

    fn floor(&self, now: f64) -> f64 {
        now - f64::from(self.burst) * self.period
    }
}

impl Default for LeakyBucketPolicy {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD.as_secs_f64(),
            burst: DEFAULT_BURST,
            next_allowed: None,
        }
    }
}

impl RateLimitPolicy for LeakyBucketPolicy {
    fn register_event(&mut self, timestamp: SystemTime) -> PolicyDecision {
        let now = seconds(timestamp);
        let floor = self.floor(now);

        let base = match self.next_allowed {
            Some(next) if now <= next => return PolicyDecision::Suppress,
            Some(next) => next.max(floor),
            None => floor,
        };

        self.next_allowed = Some(base + self.period);
        PolicyDecision::Allow
    }

    fn reset(&mut self) {
        self.next_allowed = None;
    }
}

fn seconds(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
