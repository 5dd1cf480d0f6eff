pub mod bus;
pub mod types;

pub use crate::bus::NotificationBus;
pub use crate::types::{NotificationRecord, NotificationSource};
