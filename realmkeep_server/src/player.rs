use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use crate::world::PlayerHandle;

/// A connected player as far as the world registry is concerned.
///
/// Once disconnected the player stays disconnected; the reason is kept for
/// whoever tears the session down.
#[derive(Debug)]
pub struct Player {
    uuid: Uuid,
    name: String,
    disconnect_reason: Mutex<Option<String>>,
}

impl Player {
    /// Creates a new [`Player`] with a random id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            disconnect_reason: Mutex::new(None),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn is_connected(&self) -> bool {
        self.disconnect_reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub fn disconnect_reason(&self) -> Option<String> {
        self.disconnect_reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PlayerHandle for Player {
    fn name(&self) -> &str {
        &self.name
    }

    fn disconnect(&self, reason: &str) {
        let mut slot = self
            .disconnect_reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            tracing::info!(player = %self.name, uuid = %self.uuid, reason, "disconnecting player");
            *slot = Some(reason.to_string());
        }
    }
}
