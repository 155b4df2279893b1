//! Per-character conversation cooldowns.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use hamlet_core::CharacterId;

/// When each character last finished a conversation.
///
/// Stamped by the orchestrator on release and read concurrently by the
/// decision engine.
#[derive(Debug, Default)]
pub struct Cooldowns {
    last: DashMap<CharacterId, DateTime<Utc>>,
}

impl Cooldowns {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `id` finished a conversation at `at`.
    pub fn stamp(&self, id: CharacterId, at: DateTime<Utc>) {
        self.last.insert(id, at);
    }

    /// The last stamp for `id`.
    #[must_use]
    pub fn last(&self, id: CharacterId) -> Option<DateTime<Utc>> {
        self.last.get(&id).map(|entry| *entry)
    }

    /// Whether at least `secs` seconds have passed since `id` was stamped.
    /// Characters never stamped are always ready.
    #[must_use]
    pub fn ready(&self, id: CharacterId, now: DateTime<Utc>, secs: i64) -> bool {
        self.last(id)
            .is_none_or(|at| now.signed_duration_since(at) >= Duration::seconds(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_after_interval() {
        let cooldowns = Cooldowns::new();
        let id = CharacterId::new();
        let t0 = Utc::now();
        assert!(cooldowns.ready(id, t0, 5));

        cooldowns.stamp(id, t0);
        assert!(!cooldowns.ready(id, t0 + Duration::seconds(4), 5));
        assert!(cooldowns.ready(id, t0 + Duration::seconds(5), 5));
    }
}
