//! Rate limiter for copies sent to the system log.
//!
//! Decides, per exception type name, whether another error of that type
//! should be forwarded now. Every type name gets its own leaky bucket.

use crate::application::ports::Storage;
use crate::domain::policy::{LeakyBucketPolicy, PolicyDecision, RateLimitPolicy};
use crate::infrastructure::storage::ShardedStorage;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// Default storage backing a [`RateLimiter`].
pub type BucketStorage = Arc<ShardedStorage<String, LeakyBucketPolicy>>;

/// Per-type-name leaky bucket rate limiter.
///
/// Each decision is a read-modify-write of one bucket performed under that
/// key's storage lock, so concurrent errors of the same type are admitted in
/// a strict order and never exceed the burst.
///
/// By default the limiter keeps one bucket for every type name it has ever
/// seen. With [`RateLimiter::with_max_tracked_types`], buckets that have been
/// idle long enough to be indistinguishable from fresh ones are pruned
/// whenever the map grows past the limit.
pub struct RateLimiter<S = BucketStorage>
where
    S: Storage<String, LeakyBucketPolicy>,
{
    storage: S,
    template: LeakyBucketPolicy,
    max_tracked_types: Option<usize>,
}

impl RateLimiter {
    /// Create a limiter whose buckets start as copies of `policy`.
    pub fn new(policy: LeakyBucketPolicy) -> Self {
        Self::with_storage(Arc::new(ShardedStorage::new()), policy)
    }
}

impl Default for RateLimiter {
    /// Five errors in a burst, then one per minute.
    fn default() -> Self {
        Self::new(LeakyBucketPolicy::default())
    }
}

impl<S> RateLimiter<S>
where
    S: Storage<String, LeakyBucketPolicy>,
{
    pub fn with_storage(storage: S, mut policy: LeakyBucketPolicy) -> Self {
        policy.reset();
        Self {
            storage,
            template: policy,
            max_tracked_types: None,
        }
    }

    /// Prune idle buckets once more than `max` type names are tracked.
    ///
    /// Pruning never changes a decision; if every bucket is still active the
    /// map is allowed to exceed `max`. While it stays above `max`, every
    /// `admit` scans the whole map, so pick a cap well above the number of
    /// type names expected to be active within `burst * period`.
    pub fn with_max_tracked_types(mut self, max: usize) -> Self {
        self.max_tracked_types = Some(max);
        self
    }

    /// Decide whether an error of type `type_name` observed at `now` should
    /// be forwarded.
    pub fn admit(&self, type_name: &str, now: SystemTime) -> PolicyDecision {
        let decision = self.storage.with_entry_mut(
            type_name.to_string(),
            || self.template.clone(),
            |bucket| bucket.register_event(now),
        );

        if let Some(max) = self.max_tracked_types {
            if self.storage.len() > max {
                let pruned = self.prune_idle(now);
                tracing::debug!(
                    target: crate::domain::printable::DIAGNOSTICS_TARGET,
                    pruned,
                    remaining = self.storage.len(),
                    "pruned idle rate limiter buckets"
                );
            }
        }

        decision
    }

    /// Remove buckets that behave exactly like fresh ones at `now`.
    ///
    /// Returns the number of buckets removed.
    pub fn prune_idle(&self, now: SystemTime) -> usize {
        let before = self.storage.len();
        self.storage.retain(|_, bucket| !bucket.is_idle(now));
        before.saturating_sub(self.storage.len())
    }

    /// Number of type names currently tracked.
    pub fn tracked_types(&self) -> usize {
        self.storage.len()
    }

    /// Policy every new bucket starts from.
    pub fn policy(&self) -> &LeakyBucketPolicy {
        &self.template
    }

    /// Forget every bucket.
    pub fn clear(&self) {
        self.storage.clear();
    }
}

impl<S> fmt::Debug for RateLimiter<S>
where
    S: Storage<String, LeakyBucketPolicy>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("policy", &self.template)
            .field("tracked_types", &self.storage.len())
            .field("max_tracked_types", &self.max_tracked_types)
            .finish()
    }
}
