//! Read side of delivered notifications.

use std::sync::Arc;

use fanout_common::store::Store;
use fanout_common::types::Notification;

/// Most notifications returned by a single stream request.
pub const MAX_STREAMED_NOTIFICATIONS: usize = 20;

/// Service layer for reading a user's delivered notifications.
#[derive(Debug, Clone)]
pub struct NotificationService {
    store: Arc<Store>,
}

impl NotificationService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// A user's most recent notifications, newest first, capped at
    /// [`MAX_STREAMED_NOTIFICATIONS`]. Unknown users get an empty list.
    pub fn stream_notifications(&self, user_id: &str) -> Vec<Notification> {
        let notifications = self
            .store
            .recent_notifications(user_id, MAX_STREAMED_NOTIFICATIONS);

        tracing::debug!(
            user_id = %user_id,
            count = notifications.len(),
            "Streaming notifications"
        );

        notifications
    }
}
