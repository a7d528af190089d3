//! In-memory data store shared by the publish path and the delivery workers.
//!
//! One `RwLock` guards all maps. Every accessor takes the lock for exactly one
//! read or one mutation and never holds it across an await point.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{Duration, Utc};

use crate::error::AppError;
use crate::types::{Notification, Post, User};

#[derive(Debug, Default)]
struct StoreInner {
    users: HashMap<String, User>,
    posts: HashMap<String, Post>,
    /// Recipient user ID -> delivered notifications, in append order.
    notifications: HashMap<String, Vec<Notification>>,
}

/// Thread-safe in-memory store. Share it as `Arc<Store>`.
#[derive(Debug, Default)]
pub struct Store {
    inner: RwLock<StoreInner>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a user.
    pub fn add_user(&self, user: User) {
        self.write().users.insert(user.id.clone(), user);
    }

    pub fn user(&self, user_id: &str) -> Option<User> {
        self.read().users.get(user_id).cloned()
    }

    /// Record that `follower_id` follows `followee_id`. Duplicate follows are ignored.
    pub fn follow(&self, follower_id: &str, followee_id: &str) -> Result<(), AppError> {
        let mut inner = self.write();
        let followee = inner
            .users
            .get_mut(followee_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", followee_id)))?;

        if !followee.followers.iter().any(|f| f == follower_id) {
            followee.followers.push(follower_id.to_string());
        }
        Ok(())
    }

    /// Follower IDs of a user, or `None` if the user does not exist.
    pub fn followers_of(&self, user_id: &str) -> Option<Vec<String>> {
        self.read().users.get(user_id).map(|u| u.followers.clone())
    }

    pub fn insert_post(&self, post: Post) {
        self.write().posts.insert(post.id.clone(), post);
    }

    pub fn post(&self, post_id: &str) -> Option<Post> {
        self.read().posts.get(post_id).cloned()
    }

    /// All posts by an author, newest first.
    pub fn posts_by(&self, user_id: &str) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .read()
            .posts
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }

    /// Append a delivered notification to its recipient's list.
    pub fn append_notification(&self, notification: Notification) {
        self.write()
            .notifications
            .entry(notification.user_id.clone())
            .or_default()
            .push(notification);
    }

    /// A user's notifications in append order.
    pub fn notifications_for(&self, user_id: &str) -> Vec<Notification> {
        self.read()
            .notifications
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Up to `limit` notifications for a user, most recent first.
    ///
    /// Notifications with equal timestamps are ordered latest-appended first.
    pub fn recent_notifications(&self, user_id: &str, limit: usize) -> Vec<Notification> {
        let mut recent: Vec<Notification> = {
            let inner = self.read();
            match inner.notifications.get(user_id) {
                Some(list) => list.iter().rev().cloned().collect(),
                None => return Vec::new(),
            }
        };
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit);
        recent
    }

    /// Populate the store with a small social graph for local runs.
    pub fn seed_sample_data(&self) {
        for (id, username) in [
            ("u1", "alice"),
            ("u2", "bob"),
            ("u3", "charlie"),
            ("u4", "david"),
            ("u5", "eve"),
        ] {
            self.add_user(User::new(id, username));
        }

        // (follower, followee); duplicates are intentional and collapse.
        let follows = [
            ("u2", "u1"),
            ("u1", "u2"),
            ("u1", "u3"),
            ("u2", "u4"),
            ("u1", "u5"),
            ("u2", "u4"),
            ("u2", "u5"),
            ("u1", "u3"),
            ("u3", "u1"),
            ("u4", "u1"),
        ];
        for (follower, followee) in follows {
            // Both ends were inserted above.
            let _ = self.follow(follower, followee);
        }

        let now = Utc::now();
        let posts = [
            ("p1", "u1", "Hello from Alice!", Duration::hours(24)),
            ("p2", "u2", "Bob's first post", Duration::hours(12)),
            ("p3", "u3", "Charlie shares news", Duration::hours(6)),
            ("p4", "u4", "David's photo post", Duration::hours(3)),
            ("p5", "u5", "Eve's thoughts", Duration::hours(1)),
        ];
        for (id, user_id, content, age) in posts {
            self.insert_post(Post {
                id: id.to_string(),
                user_id: user_id.to_string(),
                content: content.to_string(),
                created_at: now - age,
            });
        }

        tracing::info!("Seeded store with sample users, follows and posts");
    }
}
