//! Shopper notifications.
//!
//! Services render a template name plus a JSON context; the transport behind
//! `Notifier` decides how it reaches the shopper. Delivery is best-effort and
//! never blocks an order transition.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Notification delivery error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification transport failure: {0}")]
    Transport(String),
}

/// The messages the shop sends.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Template {
    OrderConfirmation,
    OrderCancelled,
    OrderShipped,
}

/// A rendered-and-addressed message, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub template: Template,
    pub context: Value,
}

/// Outbound notification transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

#[async_trait]
impl<N> Notifier for Arc<N>
where
    N: Notifier + ?Sized,
{
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        (**self).send(notification).await
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<Notification>,
    fail_on_send: bool,
}

/// In-memory notifier for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `send` calls fail.
    pub fn set_fail_on_send(&self, fail: bool) {
        if let Ok(mut state) = self.state.write() {
            state.fail_on_send = fail;
        }
    }

    /// Messages delivered so far, in order.
    pub fn sent(&self) -> Vec<Notification> {
        self.state
            .read()
            .map(|state| state.sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| NotifyError::Transport("state lock poisoned".to_string()))?;
        if state.fail_on_send {
            return Err(NotifyError::Transport("smtp unavailable".to_string()));
        }
        state.sent.push(notification);
        Ok(())
    }
}
