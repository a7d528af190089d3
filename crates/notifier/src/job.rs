use fanout_common::types::Notification;

/// A notification plus the delivery attempt it is waiting for.
#[derive(Debug, Clone)]
pub struct Job {
    pub notification: Notification,
    /// 1-based attempt number.
    pub attempt: u32,
}

impl Job {
    pub fn new(notification: Notification) -> Self {
        Self {
            notification,
            attempt: 1,
        }
    }

    /// The same job, scheduled for its next attempt.
    pub fn retry(self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self
        }
    }
}
