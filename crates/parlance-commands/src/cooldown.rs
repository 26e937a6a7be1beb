//! Per-command, per-invoker invocation rate limiting.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::UserId;

/// Fixed-window rate limit: at most `max_uses` invocations per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownPolicy {
    pub max_uses: u32,
    pub window: Duration,
}

impl CooldownPolicy {
    pub fn new(max_uses: u32, window: Duration) -> Self {
        Self { max_uses, window }
    }
}

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownVerdict {
    Allowed,
    Denied { retry_after: Duration },
}

#[derive(Debug)]
struct Bucket {
    uses: u32,
    window_start: Instant,
}

/// Tracks cooldown state per (command identity, invoker identity).
/// Buckets are created lazily and mutated under the map's per-key lock,
/// so concurrent checks for the same key serialize their
/// read-modify-write.
#[derive(Debug, Default)]
pub struct CooldownGate {
    buckets: DashMap<(String, u64), Bucket>,
}

impl CooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks and records one invocation attempt. The caller supplies
    /// `now` so time is controllable in tests.
    pub fn check_and_record(
        &self,
        command: &str,
        invoker: UserId,
        policy: &CooldownPolicy,
        now: Instant,
    ) -> CooldownVerdict {
        let mut entry = self
            .buckets
            .entry((command.to_string(), invoker.0))
            .or_insert_with(|| Bucket {
                uses: 0,
                window_start: now,
            });
        let bucket = entry.value_mut();

        let elapsed = now.saturating_duration_since(bucket.window_start);
        if elapsed >= policy.window {
            bucket.uses = 0;
            bucket.window_start = now;
        }

        if bucket.uses < policy.max_uses {
            bucket.uses += 1;
            CooldownVerdict::Allowed
        } else {
            let remaining = policy
                .window
                .saturating_sub(now.saturating_duration_since(bucket.window_start));
            debug!(command, invoker = invoker.0, ?remaining, "cooldown denied");
            CooldownVerdict::Denied {
                retry_after: remaining,
            }
        }
    }

    /// Drops buckets whose window started more than `older_than` ago.
    pub fn evict_stale(&self, older_than: Duration, now: Instant) {
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.window_start) < older_than);
    }

    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}
