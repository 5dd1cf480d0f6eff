use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("invalid id: expected `{prefix}` followed by a ULID, got `{value}`")]
    InvalidFormat { prefix: &'static str, value: String },
}

fn validate_prefixed(value: &str, prefix: &'static str) -> Result<(), IdError> {
    let invalid = || IdError::InvalidFormat {
        prefix,
        value: value.to_string(),
    };
    let suffix = value.strip_prefix(prefix).ok_or_else(invalid)?;
    if suffix.len() != 26 {
        return Err(invalid());
    }
    Ulid::from_str(suffix).map_err(|_| invalid())?;
    Ok(())
}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, ToSchema)]
        #[serde(transparent)]
        #[schema(as = String)]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                validate_prefixed(&value, Self::PREFIX)?;
                Ok(Self(value))
            }

            pub fn generate() -> Self {
                Self(format!("{}{}", Self::PREFIX, Ulid::new()))
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

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = String::deserialize(deserializer)?;
                Self::new(value).map_err(serde::de::Error::custom)
            }
        }
    };
}

id_type!(
    /// Identifier of a candidate event awaiting a decision.
    CandidateId,
    "cand_"
);

id_type!(
    /// Identifier of a connected notification channel.
    ChannelId,
    "chan_"
);

/// Identifier assigned by the calendar provider to a written entry.
///
/// Providers use their own formats, so this is an opaque string rather
/// than a prefixed ULID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(as = String)]
pub struct CalendarEventId(String);

impl CalendarEventId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CalendarEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_id_roundtrip() {
        let id = CandidateId::generate();
        assert!(id.as_str().starts_with("cand_"));

        let parsed = CandidateId::new(id.as_str().to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_candidate_id_rejects_wrong_prefix() {
        let err = CandidateId::new("chan_01ARZ3NDEKTSV4RRFFQ69G5FAV").unwrap_err();
        assert!(matches!(err, IdError::InvalidFormat { prefix: "cand_", .. }));
    }

    #[test]
    fn test_candidate_id_rejects_short_suffix() {
        assert!(CandidateId::new("cand_123").is_err());
    }

    #[test]
    fn test_channel_id_serde_is_transparent() {
        let id = ChannelId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_str()));

        let back: ChannelId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        let result: Result<CandidateId, _> = serde_json::from_str("\"not-an-id\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_calendar_event_id_is_opaque() {
        let id = CalendarEventId::new("google:abcdef123");
        assert_eq!(id.as_str(), "google:abcdef123");
        assert_eq!(id.to_string(), "google:abcdef123");
    }
}
