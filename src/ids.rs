//! Typed identifiers shared by the allocation and workflow modules.
//!
//! Every identifier is a thin wrapper around a `String`. Keeping them as
//! distinct types stops a plant id from being passed where a community id
//! is expected, and lets the workflow store key on a typed composite key.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Returns the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

string_id!(
    /// Identifier of a Renewable Energy Community.
    CommunityId
);
string_id!(
    /// Identifier of a generation plant owned by a community.
    PlantId
);
string_id!(
    /// Identifier of a community member (consumer, producer or prosumer).
    MemberId
);
string_id!(
    /// Identifier of a document held by the document ledger.
    DocumentId
);
string_id!(
    /// Stable phase identifier, e.g. `"3"` or `"P2"`.
    PhaseId
);
string_id!(
    /// Accounting period an allocation refers to, e.g. `"2024-03"`.
    Period
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_value() {
        assert_eq!(PlantId::new("IMP-7").to_string(), "IMP-7");
        assert_eq!(PhaseId::from("P2").as_str(), "P2");
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&MemberId::new("m1")).unwrap_or_default();
        assert_eq!(json, "\"m1\"");
    }
}
