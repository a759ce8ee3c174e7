//! Voice Context - Value Objects

use serde::{Deserialize, Serialize};

use super::errors::VoiceError;

/// 默认语言区域
pub const DEFAULT_LANGUAGE_CODE: &str = "es-ES";

/// 音色标识，如 `es-ES-Neural2-A`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoiceId(String);

impl VoiceId {
    pub fn new(id: impl Into<String>) -> Result<Self, VoiceError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() || trimmed.len() > 100 {
            return Err(VoiceError::InvalidId(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SSML 音色性别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoiceGender {
    Female,
    Male,
    Neutral,
}

impl VoiceGender {
    pub fn as_ssml(&self) -> &'static str {
        match self {
            VoiceGender::Female => "FEMALE",
            VoiceGender::Male => "MALE",
            VoiceGender::Neutral => "NEUTRAL",
        }
    }
}

/// 音色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub id: VoiceId,
    pub gender: VoiceGender,
    pub language_code: String,
}

/// 音色目录
///
/// 不变量:
/// - 所有音色属于同一个语言区域
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    language_code: String,
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    /// 内置的 Neural2 音色（A..F）
    pub fn neural2(language_code: &str) -> Self {
        let variants = [
            ('A', VoiceGender::Female),
            ('B', VoiceGender::Male),
            ('C', VoiceGender::Female),
            ('D', VoiceGender::Female),
            ('E', VoiceGender::Female),
            ('F', VoiceGender::Male),
        ];

        let voices = variants
            .iter()
            .map(|(suffix, gender)| Voice {
                id: VoiceId(format!("{}-Neural2-{}", language_code, suffix)),
                gender: *gender,
                language_code: language_code.to_string(),
            })
            .collect();

        Self {
            language_code: language_code.to_string(),
            voices,
        }
    }

    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn find(&self, id: &VoiceId) -> Result<&Voice, VoiceError> {
        self.voices
            .iter()
            .find(|v| &v.id == id)
            .ok_or_else(|| VoiceError::NotFound(id.clone()))
    }

    /// 默认音色（目录中的第一个）
    pub fn default_voice(&self) -> Option<&Voice> {
        self.voices.first()
    }
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::neural2(DEFAULT_LANGUAGE_CODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = VoiceCatalog::default();
        assert_eq!(catalog.voices().len(), 6);
        assert_eq!(catalog.language_code(), "es-ES");

        let b = catalog.find(&VoiceId::new("es-ES-Neural2-B").unwrap()).unwrap();
        assert_eq!(b.gender, VoiceGender::Male);
        assert_eq!(b.gender.as_ssml(), "MALE");
    }

    #[test]
    fn test_unknown_voice() {
        let catalog = VoiceCatalog::default();
        let id = VoiceId::new("en-US-Wavenet-A").unwrap();
        assert!(matches!(catalog.find(&id), Err(VoiceError::NotFound(_))));
    }

    #[test]
    fn test_voice_id_validation() {
        assert!(VoiceId::new("  ").is_err());
        assert_eq!(VoiceId::new(" es-ES-Neural2-A ").unwrap().as_str(), "es-ES-Neural2-A");
    }
}
