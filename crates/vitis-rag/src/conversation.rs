//! One chat turn end to end: log the user side, answer, log the reply.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

use vitis_core::config::ChatSettings;
use vitis_core::error::Error;
use vitis_core::types::Role;

use crate::chat_log::ChatLog;
use crate::service::RagService;

const IMAGE_NOT_RECOGNISED: &str = "Gambar tidak dikenali sebagai penyakit tanaman.";
const UPLOAD_CLEARER_IMAGE: &str =
    "Mohon unggah gambar yang jelas dari daun tanaman yang menunjukkan gejala penyakit untuk analisis lebih lanjut.";

/// Chat-log text recorded for an accepted classification.
pub fn classification_summary(label: &str, confidence: f32) -> String {
    format!("Gambar telah diproses menggunakan CNN dengan hasil prediksi kelas: {label} dengan confidence: {confidence:.2}.")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageReply {
    /// False when confidence did not clear the threshold; nothing is logged then.
    pub recognised: bool,
    pub summary: String,
    pub answer: String,
}

pub struct Conversation {
    service: Arc<RagService>,
    log: Arc<dyn ChatLog>,
    settings: ChatSettings,
    rooms: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl Conversation {
    pub fn new(service: Arc<RagService>, log: Arc<dyn ChatLog>, settings: ChatSettings) -> Self {
        Self { service, log, settings, rooms: Mutex::new(HashMap::new()) }
    }

    pub fn service(&self) -> &RagService { &self.service }

    pub fn handle_text(&self, session_id: &str, room_id: &str, message: &str) -> Result<String> {
        require("session_id", session_id)?;
        require("room_id", room_id)?;
        require("message", message)?;
        self.in_room(session_id, room_id, || {
            // History read back after the append, so it ends with this message.
            self.log.append(session_id, room_id, Role::User, message)?;
            let history = self.log.history(session_id, room_id)?;
            let answer = self.service.answer_text(message, &history);
            self.log.append(session_id, room_id, Role::Ai, &answer)?;
            Ok(answer)
        })
    }

    pub fn handle_classification(&self, session_id: &str, room_id: &str, label: &str, confidence: f32) -> Result<ImageReply> {
        require("session_id", session_id)?;
        require("room_id", room_id)?;
        require("label", label)?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::MalformedInput(format!("confidence must be within [0, 1], got {confidence}")).into());
        }
        if confidence <= self.settings.image_confidence_threshold {
            info!(label, confidence, "classification below threshold; skipping answer");
            return Ok(ImageReply { recognised: false, summary: IMAGE_NOT_RECOGNISED.to_string(), answer: UPLOAD_CLEARER_IMAGE.to_string() });
        }

        self.in_room(session_id, room_id, || {
            let summary = classification_summary(label, confidence);
            self.log.append(session_id, room_id, Role::User, &summary)?;
            let history = self.log.history(session_id, room_id)?;
            let answer = self.service.answer_image(label, &history);
            self.log.append(session_id, room_id, Role::Ai, &answer)?;
            Ok(ImageReply { recognised: true, summary, answer })
        })
    }

    /// Rooms with a turn in progress or waiting.
    pub fn open_rooms(&self) -> usize { self.rooms.lock().map_or(0, |rooms| rooms.len()) }

    /// Runs `turn` holding the room's mutex. The registry entry is dropped once no caller holds it.
    fn in_room<T>(&self, session_id: &str, room_id: &str, turn: impl FnOnce() -> Result<T>) -> Result<T> {
        let key = (session_id.to_string(), room_id.to_string());
        let room = {
            let mut rooms = self.rooms.lock().map_err(|_| anyhow!("room registry lock poisoned"))?;
            rooms.entry(key.clone()).or_default().clone()
        };
        let result = match room.lock() {
            Ok(_turn) => turn(),
            Err(_) => Err(anyhow!("room lock poisoned")),
        };
        if let Ok(mut rooms) = self.rooms.lock() {
            // Clones are only taken under the registry lock, so two means the registry and us.
            if Arc::strong_count(&room) == 2 {
                rooms.remove(&key);
            }
        }
        result
    }
}

fn require(field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() { Err(Error::MalformedInput(format!("{field} must not be empty"))) } else { Ok(()) }
}
