use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use vitis_core::types::{ConversationTurn, Role};

/// Ordered turns per (session, room).
pub trait ChatLog: Send + Sync {
    fn append(&self, session_id: &str, room_id: &str, role: Role, text: &str) -> Result<()>;
    /// Turns in chronological order; empty for an unknown room.
    fn history(&self, session_id: &str, room_id: &str) -> Result<Vec<ConversationTurn>>;
}

#[derive(Default)]
pub struct InMemoryChatLog {
    rooms: Mutex<HashMap<(String, String), Vec<ConversationTurn>>>,
}

impl InMemoryChatLog {
    pub fn new() -> Self { Self::default() }
}

impl ChatLog for InMemoryChatLog {
    fn append(&self, session_id: &str, room_id: &str, role: Role, text: &str) -> Result<()> {
        let mut rooms = self.rooms.lock().map_err(|_| anyhow!("chat log lock poisoned"))?;
        rooms.entry((session_id.to_string(), room_id.to_string())).or_default().push(ConversationTurn::now(role, text));
        Ok(())
    }

    fn history(&self, session_id: &str, room_id: &str) -> Result<Vec<ConversationTurn>> {
        let rooms = self.rooms.lock().map_err(|_| anyhow!("chat log lock poisoned"))?;
        Ok(rooms.get(&(session_id.to_string(), room_id.to_string())).cloned().unwrap_or_default())
    }
}
