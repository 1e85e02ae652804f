// gatekeeper-pipeline/src/parameter_filter.rs
// ============================================================================
// Module: Parameter Filter
// Description: Redacts sensitive request arguments before dispatch/audit and
// truncates oversized response payloads.
// Purpose: Implement spec.md §4.5 and invariant I4: no value for a field in
// the effective filter mask may reach the adapter or the audit record.
// Dependencies: gatekeeper_core, serde_json
// ============================================================================

//! ## Overview
//! Two independent masks apply: a static deny-list of well-known secret
//! field names (always redacted, regardless of policy) and the PDP's
//! `Constraint::RedactFields`/`Constraint::FieldAllowList` from the matched
//! decision. The filter never mutates the caller's original `Action`; it
//! produces a new, redacted copy (spec.md §4.5: "the original is never
//! retained past this stage").

use std::collections::BTreeSet;

use gatekeeper_core::decision::Constraint;
use serde_json::Map;
use serde_json::Value;

/// Well-known secret field names redacted regardless of policy.
const STATIC_DENY_LIST: &[&str] = &[
    "password",
    "passwd",
    "api_key",
    "apikey",
    "token",
    "access_token",
    "refresh_token",
    "client_secret",
    "private_key",
    "secret",
    "ssn",
];

/// Produces a redacted copy of `parameters`, applying the static deny-list
/// and every `RedactFields`/`FieldAllowList` constraint in `constraints`.
///
/// When more than one `FieldAllowList` constraint is present (from
/// same-priority matching `Allow` rules), the effective allow-list is their
/// intersection, matching the decision's own constraint-intersection
/// composition (spec.md §4.4).
#[must_use]
pub fn filter_parameters(parameters: &Map<String, Value>, constraints: &BTreeSet<Constraint>) -> Map<String, Value> {
    let mut redact: BTreeSet<&str> = STATIC_DENY_LIST.iter().copied().collect();
    let mut allow_list: Option<BTreeSet<&str>> = None;

    for constraint in constraints {
        match constraint {
            Constraint::RedactFields(fields) => redact.extend(fields.iter().map(String::as_str)),
            Constraint::FieldAllowList(fields) => {
                let fields: BTreeSet<&str> = fields.iter().map(String::as_str).collect();
                allow_list = Some(match allow_list {
                    Some(existing) => existing.intersection(&fields).copied().collect(),
                    None => fields,
                });
            }
            Constraint::MaxCostUnits(_) | Constraint::MaxResponseBytes(_) => {}
        }
    }

    parameters
        .iter()
        .filter(|(key, _)| !redact.contains(key.as_str()))
        .filter(|(key, _)| allow_list.as_ref().is_none_or(|allow| allow.contains(key.as_str())))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Applies a `Constraint::MaxResponseBytes` ceiling to a dispatched result
/// payload, replacing an oversized payload with a truncation marker.
#[must_use]
pub fn apply_response_constraints(payload: Value, constraints: &BTreeSet<Constraint>) -> Value {
    let Some(max_bytes) = constraints.iter().find_map(|constraint| match constraint {
        Constraint::MaxResponseBytes(max) => Some(*max),
        _ => None,
    }) else {
        return payload;
    };

    let serialized_len = serde_json::to_vec(&payload).map(|bytes| bytes.len()).unwrap_or_default();
    let serialized_len = u64::try_from(serialized_len).unwrap_or(u64::MAX);

    if serialized_len > max_bytes {
        serde_json::json!({
            "truncated": true,
            "max_response_bytes": max_bytes,
        })
    } else {
        payload
    }
}

#[cfg(test)]
mod tests {
    use gatekeeper_core::decision::Constraint;
    use serde_json::json;
    use serde_json::Map;

    use super::apply_response_constraints;
    use super::filter_parameters;

    fn parameters() -> Map<String, serde_json::Value> {
        let mut map = Map::new();
        map.insert("query".to_string(), json!("SELECT 1"));
        map.insert("password".to_string(), json!("p"));
        map.insert("api_key".to_string(), json!("k"));
        map
    }

    #[test]
    fn static_deny_list_is_always_redacted() {
        let filtered = filter_parameters(&parameters(), &std::collections::BTreeSet::new());
        assert!(filtered.contains_key("query"));
        assert!(!filtered.contains_key("password"));
        assert!(!filtered.contains_key("api_key"));
    }

    #[test]
    fn field_allow_list_narrows_to_the_named_fields() {
        let mut constraints = std::collections::BTreeSet::new();
        constraints.insert(Constraint::FieldAllowList(["query".to_string()].into_iter().collect()));
        let filtered = filter_parameters(&parameters(), &constraints);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("query"));
    }

    #[test]
    fn oversized_payload_is_truncated() {
        let mut constraints = std::collections::BTreeSet::new();
        constraints.insert(Constraint::MaxResponseBytes(4));
        let result = apply_response_constraints(json!({"a": "this is long"}), &constraints);
        assert_eq!(result["truncated"], json!(true));
    }

    #[test]
    fn payload_within_ceiling_is_untouched() {
        let mut constraints = std::collections::BTreeSet::new();
        constraints.insert(Constraint::MaxResponseBytes(4_096));
        let payload = json!({"a": "small"});
        let result = apply_response_constraints(payload.clone(), &constraints);
        assert_eq!(result, payload);
    }
}
