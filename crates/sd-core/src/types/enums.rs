use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle state of a candidate event.
///
/// `Pending` and `Notified` are active; the other four are terminal and
/// can never be left once entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum CandidateState {
    Pending,
    Notified,
    Approved,
    Denied,
    Expired,
    Failed,
}

impl CandidateState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Denied | Self::Expired | Self::Failed
        )
    }

    /// Position in the lifecycle, used to detect stale notifications:
    /// a record carrying a lower rank than one already observed for the
    /// same candidate is stale.
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Notified => 1,
            Self::Approved | Self::Denied | Self::Expired | Self::Failed => 2,
        }
    }
}

/// Chat platform (or direct API call) a message or candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Slack,
    Line,
    Discord,
    Teams,
    Api,
}

/// A human decision on a candidate event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Decision {
    Approve,
    Deny,
}

impl Decision {
    pub fn target_state(self) -> CandidateState {
        match self {
            Self::Approve => CandidateState::Approved,
            Self::Deny => CandidateState::Denied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!CandidateState::Pending.is_terminal());
        assert!(!CandidateState::Notified.is_terminal());
        assert!(CandidateState::Approved.is_terminal());
        assert!(CandidateState::Denied.is_terminal());
        assert!(CandidateState::Expired.is_terminal());
        assert!(CandidateState::Failed.is_terminal());
    }

    #[test]
    fn test_rank_is_monotonic_along_lifecycle() {
        assert!(CandidateState::Pending.rank() < CandidateState::Notified.rank());
        assert!(CandidateState::Notified.rank() < CandidateState::Approved.rank());
        assert_eq!(
            CandidateState::Approved.rank(),
            CandidateState::Expired.rank()
        );
    }

    #[test]
    fn test_platform_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Platform::Slack).unwrap(),
            "\"slack\""
        );
        assert_eq!(serde_json::to_string(&Platform::Line).unwrap(), "\"line\"");
    }

    #[test]
    fn test_decision_targets() {
        assert_eq!(Decision::Approve.target_state(), CandidateState::Approved);
        assert_eq!(Decision::Deny.target_state(), CandidateState::Denied);
    }
}
