// gatekeeper-policy/src/cache.rs
// ============================================================================
// Module: Decision Cache
// Description: A bounded, TTL-bounded LRU cache implementing
// gatekeeper_core::interfaces::DecisionCache, used for both the local and
// shared tiers of the PDP's two-tier cache.
// Purpose: Avoid re-evaluating the policy bundle for repeated identical
// DecisionInputs within their TTL.
// Dependencies: gatekeeper_core, std::sync::Mutex
// ============================================================================

//! ## Overview
//! Entries are keyed by the caller-supplied cache key (the canonical-JSON
//! hash of a `DecisionInput`, see `gatekeeper_core::hashing`). Each entry
//! also carries the `PolicyVersion` it was decided under; `invalidate_stale`
//! removes every entry not tagged with the current version, so a policy
//! bundle replacement invalidates the cache without a separate flush pass.
//! Eviction is strict LRU once `capacity` is reached.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use gatekeeper_core::decision::Decision;
use gatekeeper_core::identifiers::PolicyVersion;
use gatekeeper_core::interfaces::DecisionCache;

struct Entry {
    decision: Decision,
    expires_at_ms: i64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    lru_order: VecDeque<String>,
}

/// A bounded, TTL-aware LRU decision cache.
///
/// # Invariants
/// - Never holds more than `capacity` entries; the least recently touched
///   entry is evicted first.
pub struct LruTtlDecisionCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl LruTtlDecisionCache {
    /// Creates a cache bounded to `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                lru_order: VecDeque::new(),
            }),
        }
    }

    fn touch(inner: &mut Inner, key: &str) {
        if let Some(pos) = inner.lru_order.iter().position(|item| item == key) {
            inner.lru_order.remove(pos);
        }
        inner.lru_order.push_back(key.to_string());
    }
}

impl DecisionCache for LruTtlDecisionCache {
    fn get(&self, key: &str, now_ms: i64) -> Option<Decision> {
        #[allow(clippy::unwrap_used, reason = "poisoned only on a prior panic; propagating is worse than a stale cache")]
        let mut inner = self.inner.lock().unwrap();
        let expired = match inner.entries.get(key) {
            Some(entry) => entry.expires_at_ms <= now_ms,
            None => return None,
        };
        if expired {
            inner.entries.remove(key);
            if let Some(pos) = inner.lru_order.iter().position(|item| item == key) {
                inner.lru_order.remove(pos);
            }
            return None;
        }
        let decision = inner.entries.get(key).map(|entry| entry.decision.clone());
        if decision.is_some() {
            Self::touch(&mut inner, key);
        }
        decision
    }

    fn put(&self, key: String, decision: Decision, ttl_ms: i64, now_ms: i64) {
        #[allow(clippy::unwrap_used, reason = "poisoned only on a prior panic; propagating is worse than a stale cache")]
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.len() >= self.capacity && !inner.entries.contains_key(&key) {
            if let Some(oldest) = inner.lru_order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        inner.entries.insert(
            key.clone(),
            Entry {
                decision,
                expires_at_ms: now_ms.saturating_add(ttl_ms),
            },
        );
        Self::touch(&mut inner, &key);
    }

    fn invalidate_stale(&self, current_version: &PolicyVersion) {
        #[allow(clippy::unwrap_used, reason = "poisoned only on a prior panic; propagating is worse than a stale cache")]
        let mut inner = self.inner.lock().unwrap();
        let stale_keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.decision.policy_version != *current_version)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale_keys {
            inner.entries.remove(&key);
            if let Some(pos) = inner.lru_order.iter().position(|item| item == &key) {
                inner.lru_order.remove(pos);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use gatekeeper_core::decision::Decision;
    use gatekeeper_core::decision::DecisionReason;
    use gatekeeper_core::decision::Effect;
    use gatekeeper_core::identifiers::PolicyVersion;
    use gatekeeper_core::time::Timestamp;

    use super::LruTtlDecisionCache;
    use gatekeeper_core::interfaces::DecisionCache;

    fn decision(version: &str) -> Decision {
        Decision {
            effect: Effect::Allow,
            constraints: BTreeSet::new(),
            reason: DecisionReason {
                matched_policies: Vec::new(),
                explanation: "test".to_string(),
            },
            policy_version: PolicyVersion::new(version),
            decided_at: Timestamp::Logical(0),
        }
    }

    #[test]
    fn evicts_least_recently_used_when_full() {
        let cache = LruTtlDecisionCache::new(2);
        cache.put("a".to_string(), decision("v1"), 10_000, 0);
        cache.put("b".to_string(), decision("v1"), 10_000, 0);
        assert!(cache.get("a", 0).is_some());
        cache.put("c".to_string(), decision("v1"), 10_000, 0);
        assert!(cache.get("b", 0).is_none());
        assert!(cache.get("a", 0).is_some());
        assert!(cache.get("c", 0).is_some());
    }

    #[test]
    fn invalidate_stale_removes_old_version_only() {
        let cache = LruTtlDecisionCache::new(10);
        cache.put("a".to_string(), decision("v1"), 10_000, 0);
        cache.put("b".to_string(), decision("v2"), 10_000, 0);
        cache.invalidate_stale(&PolicyVersion::new("v2"));
        assert!(cache.get("a", 0).is_none());
        assert!(cache.get("b", 0).is_some());
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = LruTtlDecisionCache::new(10);
        cache.put("a".to_string(), decision("v1"), 1_000, 0);
        assert!(cache.get("a", 500).is_some());
        assert!(cache.get("a", 1_000).is_none());
    }
}
