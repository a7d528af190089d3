//! Publish entry point.
//!
//! Stores a new post and fans it out: one notification per follower of the
//! author, each handed to the delivery queue. Returns as soon as every job is
//! queued; delivery happens asynchronously and its failures are never
//! reported back to the publisher.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use fanout_common::error::AppError;
use fanout_common::store::Store;
use fanout_common::types::{Notification, Post};
use fanout_notifier::QueueHandle;

/// Parameters for publishing a post.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishRequest {
    pub user_id: String,
    pub content: String,
}

/// Acknowledgement returned to the publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishResponse {
    pub success: bool,
    pub message: String,
    pub post_id: String,
    pub notifications_queued: u32,
}

/// Fans new posts out to followers through the notification queue.
#[derive(Debug, Clone)]
pub struct PostPublisher {
    store: Arc<Store>,
    queue: QueueHandle,
}

impl PostPublisher {
    pub fn new(store: Arc<Store>, queue: QueueHandle) -> Self {
        Self { store, queue }
    }

    /// Store the post and queue one notification per follower.
    ///
    /// An unknown author (a blank id included) or an author without followers
    /// still gets the post stored and a successful response with zero
    /// notifications queued. The only error is a queue that has been stopped.
    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishResponse, AppError> {
        let user_id = request.user_id.as_str();

        tracing::info!(user_id = %user_id, "Received publish request");

        let post = Post::new(user_id, request.content.as_str());
        self.store.insert_post(post.clone());

        let (author_name, followers) = match self.store.user(user_id) {
            Some(author) => (author.username, author.followers),
            None => {
                tracing::debug!(user_id = %user_id, "Author not found, no followers to notify");
                (user_id.to_string(), Vec::new())
            }
        };

        let content = render_content(&author_name, &post.content);

        tracing::info!(
            post_id = %post.id,
            user_id = %user_id,
            followers = followers.len(),
            "Fanning out notifications"
        );

        for follower_id in &followers {
            let notification = Notification::for_post(follower_id.as_str(), &post, content.as_str());
            self.queue.enqueue(notification).await?;
        }

        let queued = followers.len() as u32;
        Ok(PublishResponse {
            success: true,
            message: format!("Post published, {} notifications queued", queued),
            post_id: post.id,
            notifications_queued: queued,
        })
    }
}

/// Notification text for a post: `"{author} posted: {content}"`.
pub fn render_content(author: &str, content: &str) -> String {
    format!("{} posted: {}", author, content)
}
