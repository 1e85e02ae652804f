// gatekeeper-core/src/identifiers.rs
// ============================================================================
// Module: Gatekeeper Identifiers
// Description: Canonical opaque identifiers for principals, resources, and
// requests.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque and serialize as strings. Validation of contents
//! (format, length) is handled at the resolver/registry boundary rather than
//! within these simple wrappers.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

opaque_id!(
    /// Principal identifier (human, agent, service, or device).
    PrincipalId
);
opaque_id!(
    /// Backend resource identifier.
    ResourceId
);
opaque_id!(
    /// Capability identifier, scoped to its owning resource.
    CapabilityId
);
opaque_id!(
    /// Request identifier carried through a single invocation for correlation.
    RequestId
);
opaque_id!(
    /// Correlation identifier optionally supplied by the caller.
    CorrelationId
);
opaque_id!(
    /// Stable identifier for a policy rule.
    PolicyId
);
opaque_id!(
    /// Policy bundle version tag.
    PolicyVersion
);
opaque_id!(
    /// Audit event identifier (UUID string form).
    AuditEventId
);
opaque_id!(
    /// SIEM sink identifier.
    SinkId
);
