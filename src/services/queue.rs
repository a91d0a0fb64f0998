//! In-memory holding area for extracted messages.

use std::sync::Mutex;

use crate::models::Message;

/// Ordered, append-only queue of messages awaiting delivery.
///
/// Unbounded; the consumer is expected to [`drain`](MessageQueue::drain) it
/// faster than the extractor fills it.
#[derive(Debug, Default)]
pub struct MessageQueue {
    messages: Mutex<Vec<Message>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the back.
    pub fn push(&self, message: Message) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
    }

    /// Remove and return every queued message, oldest first.
    pub fn drain(&self) -> Vec<Message> {
        std::mem::take(&mut *self.messages.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Copy of the queued messages, leaving the queue untouched.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
