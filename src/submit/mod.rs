//! Delivery of finished matches to the results backend

pub mod client;
pub mod outbox;

pub use client::{HttpSubmitter, ResultSubmitter};
pub use outbox::{OutboxState, SubmissionOutbox};
