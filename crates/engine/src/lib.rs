//! Fan-out services: publishing posts to followers and reading back
//! delivered notifications.

pub mod notifications;
pub mod publisher;
