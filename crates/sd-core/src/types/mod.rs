pub mod candidate;
pub mod conflict;
pub mod enums;
pub mod ids;
pub mod message;
pub mod notification;

pub use candidate::{CandidateDraft, CandidateEvent, DecisionOutcome};
pub use conflict::{BusyEvent, ConflictResult, TimeSlot};
pub use enums::{CandidateState, Decision, Platform};
pub use ids::{CalendarEventId, CandidateId, ChannelId, IdError};
pub use message::CanonicalMessage;
pub use notification::NotificationBody;
