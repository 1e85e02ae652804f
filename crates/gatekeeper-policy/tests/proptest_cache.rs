// gatekeeper-policy/tests/proptest_cache.rs
// ============================================================================
// Module: Decision Cache Property-Based Tests
// Description: Property tests for LruTtlDecisionCache's determinism,
// capacity, and version-invalidation invariants.
// Purpose: Detect eviction/TTL/invalidation accounting bugs across wide
// input ranges.
// ============================================================================

//! Property-based tests for the bounded, TTL-aware LRU decision cache.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;

use gatekeeper_core::decision::Decision;
use gatekeeper_core::decision::DecisionReason;
use gatekeeper_core::decision::Effect;
use gatekeeper_core::identifiers::PolicyVersion;
use gatekeeper_core::interfaces::DecisionCache;
use gatekeeper_core::time::Timestamp;
use gatekeeper_policy::LruTtlDecisionCache;
use proptest::prelude::*;

fn decision(version: &str, tag: u32) -> Decision {
    Decision {
        effect: Effect::Allow,
        constraints: BTreeSet::new(),
        reason: DecisionReason {
            matched_policies: Vec::new(),
            explanation: format!("decision-{tag}"),
        },
        policy_version: PolicyVersion::new(version),
        decided_at: Timestamp::Logical(0),
    }
}

proptest! {
    #[test]
    fn repeated_reads_within_ttl_return_the_same_decision(
        capacity in 1_usize..=16,
        ttl_ms in 1_i64..=100_000,
        now_ms in 0_i64..=50_000,
        reads in 1_u32..=10,
    ) {
        let cache = LruTtlDecisionCache::new(capacity);
        let put_decision = decision("v1", 0);
        cache.put("k".to_string(), put_decision.clone(), ttl_ms, now_ms);

        for _ in 0..reads {
            let got = cache.get("k", now_ms);
            prop_assert_eq!(got, Some(put_decision.clone()));
        }
    }

    #[test]
    fn never_holds_more_entries_than_capacity(
        capacity in 1_usize..=8,
        key_count in 0_usize..=40,
    ) {
        let cache = LruTtlDecisionCache::new(capacity);
        for i in 0..key_count {
            cache.put(format!("k{i}"), decision("v1", i as u32), 1_000_000, 0);
        }

        let resident = (0..key_count).filter(|i| cache.get(&format!("k{i}"), 0).is_some()).count();
        prop_assert!(resident <= capacity, "cache held {resident} entries, exceeding capacity {capacity}");
    }

    #[test]
    fn invalidate_stale_removes_all_and_only_entries_tagged_with_a_different_version(
        current_tag in 0_u8..=1,
        tags in prop::collection::vec(0_u8..=1, 1..20),
    ) {
        let cache = LruTtlDecisionCache::new(100);
        let versions = ["v1", "v2"];
        let current_version = PolicyVersion::new(versions[current_tag as usize]);

        for (i, tag) in tags.iter().enumerate() {
            cache.put(format!("k{i}"), decision(versions[*tag as usize], i as u32), 1_000_000, 0);
        }

        cache.invalidate_stale(&current_version);

        for (i, tag) in tags.iter().enumerate() {
            let still_present = cache.get(&format!("k{i}"), 0).is_some();
            if versions[*tag as usize] == current_version.as_str() {
                prop_assert!(still_present, "current-version entry k{i} was evicted by invalidate_stale");
            } else {
                prop_assert!(!still_present, "stale entry k{i} survived invalidate_stale");
            }
        }
    }
}
