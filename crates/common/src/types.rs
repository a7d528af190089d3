use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user in the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    /// IDs of the users following this user.
    pub followers: Vec<String>,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            followers: Vec::new(),
        }
    }
}

/// A published post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Create a post with a fresh ID, timestamped now.
    pub fn new(user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Notification delivery status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Delivered,
    Failed,
}

/// A notification addressed to a single follower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// Recipient
    pub user_id: String,
    pub post_id: String,
    pub post_author_id: String,
    /// Rendered notification text
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub status: DeliveryStatus,
    /// Number of failed delivery attempts so far.
    pub retry_count: u32,
    pub last_retry_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Build a pending notification for `recipient` about `post`.
    pub fn for_post(recipient: impl Into<String>, post: &Post, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: recipient.into(),
            post_id: post.id.clone(),
            post_author_id: post.user_id.clone(),
            content: content.into(),
            read: false,
            created_at: Utc::now(),
            status: DeliveryStatus::Pending,
            retry_count: 0,
            last_retry_at: None,
            delivered_at: None,
        }
    }

    /// Record a failed attempt that will be retried.
    pub fn mark_retry(&mut self) {
        self.retry_count += 1;
        self.last_retry_at = Some(Utc::now());
    }

    pub fn mark_delivered(&mut self) {
        self.status = DeliveryStatus::Delivered;
        self.delivered_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self) {
        self.status = DeliveryStatus::Failed;
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Pending => write!(f, "pending"),
            DeliveryStatus::Delivered => write!(f, "delivered"),
            DeliveryStatus::Failed => write!(f, "failed"),
        }
    }
}
