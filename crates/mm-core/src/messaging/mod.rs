//! Cross-messenger abstractions: the inbound feed, the moderation sink and the
//! message model the validator reads.

pub mod port;
pub mod throttled;
pub mod types;
