//! Core engine of the chat-to-calendar booking flow: the candidate
//! lifecycle state machine, the conflict detector, and the seams to
//! the calendar provider and extraction service.

pub mod calendar;
pub mod config;
pub mod conflict;
pub mod error;
pub mod extract;
pub mod memory;
pub mod reply;
pub mod slated;
pub mod store;
pub mod types;
pub mod validation;

pub use crate::error::SlatedError;
pub use crate::slated::{RequestContext, Slated};
pub use crate::store::Store;
