pub mod correlation;
pub mod idempotency;
