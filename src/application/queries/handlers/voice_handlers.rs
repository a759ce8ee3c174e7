//! Voice Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::queries::{GetVoice, ListVoices};
use crate::domain::voice::{Voice, VoiceCatalog, VoiceId};

// ============================================================================
// Response DTOs
// ============================================================================

/// 音色响应
#[derive(Debug, Clone)]
pub struct VoiceResponse {
    pub id: String,
    pub gender: String,
    pub language_code: String,
}

impl From<&Voice> for VoiceResponse {
    fn from(voice: &Voice) -> Self {
        Self {
            id: voice.id.as_str().to_string(),
            gender: voice.gender.as_ssml().to_string(),
            language_code: voice.language_code.clone(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GetVoice Handler
pub struct GetVoiceHandler {
    catalog: Arc<VoiceCatalog>,
}

impl GetVoiceHandler {
    pub fn new(catalog: Arc<VoiceCatalog>) -> Self {
        Self { catalog }
    }

    pub fn handle(&self, query: GetVoice) -> Result<VoiceResponse, ApplicationError> {
        let id = VoiceId::new(query.voice_id)?;
        let voice = self.catalog.find(&id)?;
        Ok(VoiceResponse::from(voice))
    }
}

/// ListVoices Handler
pub struct ListVoicesHandler {
    catalog: Arc<VoiceCatalog>,
}

impl ListVoicesHandler {
    pub fn new(catalog: Arc<VoiceCatalog>) -> Self {
        Self { catalog }
    }

    pub fn handle(&self, _query: ListVoices) -> Vec<VoiceResponse> {
        self.catalog.voices().iter().map(VoiceResponse::from).collect()
    }
}
