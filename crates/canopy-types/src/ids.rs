use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap a raw id.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Opaque trace token linking an intent to the events and audit records it causes.
    CorrelationId
);
string_id!(
    /// Window identifier, minted by the reducer from the state's window sequence.
    WindowId
);
string_id!(
    /// Virtual workspace identifier.
    SpaceId
);
string_id!(
    /// Capability (installable feature) identifier, e.g. `core.settings`.
    CapabilityId
);
string_id!(
    /// Context key for `multi_by_context` capabilities (e.g. a user id).
    ContextId
);
string_id!(
    /// Audit chain identifier.
    ChainId
);

impl CorrelationId {
    /// Generate a fresh random correlation id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl WindowId {
    /// Deterministic window id for the n-th window created in a state lineage.
    pub fn from_sequence(seq: u64) -> Self {
        Self(format!("win-{}", seq))
    }
}

impl SpaceId {
    pub const DEFAULT: &'static str = "default";

    /// The space active at boot.
    pub fn default_space() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_ids_follow_sequence() {
        assert_eq!(WindowId::from_sequence(1).as_str(), "win-1");
        assert_eq!(WindowId::from_sequence(42).to_string(), "win-42");
    }

    #[test]
    fn correlation_ids_are_unique() {
        assert_ne!(CorrelationId::generate(), CorrelationId::generate());
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = CapabilityId::from("core.settings");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"core.settings\"");
    }
}
