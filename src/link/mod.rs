//! Phone <-> watch messaging

pub mod client;
pub mod messages;

pub use client::{NatsLink, PhoneLink};
pub use messages::{PhoneMessage, WatchMessage};
