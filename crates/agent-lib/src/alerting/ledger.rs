//! Per-rule record of the last firing time

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Maps rule id to the timestamp (ms) of its last fired alert
///
/// An entry exists only once the rule has fired since the last reset.
#[derive(Debug, Default)]
pub struct CooldownLedger {
    last_fired: DashMap<String, i64>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a firing at `now` unless the rule is still cooling down.
    ///
    /// Returns `true` when the rule may fire. The check and the update happen
    /// under the same shard lock, so two concurrent callers cannot both fire
    /// inside one cooldown window.
    pub fn try_fire(&self, rule_id: &str, cooldown_ms: i64, now: i64) -> bool {
        match self.last_fired.entry(rule_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.saturating_sub(*entry.get()) < cooldown_ms {
                    false
                } else {
                    entry.insert(now);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    pub fn last_fired(&self, rule_id: &str) -> Option<i64> {
        self.last_fired.get(rule_id).map(|entry| *entry.value())
    }

    /// Whether the rule would currently be suppressed
    pub fn is_cooling_down(&self, rule_id: &str, cooldown_ms: i64, now: i64) -> bool {
        self.last_fired(rule_id)
            .is_some_and(|last| now.saturating_sub(last) < cooldown_ms)
    }

    pub fn reset(&self) {
        self.last_fired.clear();
    }

    /// Forget a single rule; returns whether it had fired
    pub fn reset_rule(&self, rule_id: &str) -> bool {
        self.last_fired.remove(rule_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.last_fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_fired.is_empty()
    }
}
