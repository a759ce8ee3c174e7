//! Voice Context - 音色限界上下文
//!
//! 职责:
//! - 可用音色目录（固定的 Neural2 音色）
//! - 音色校验

mod errors;
mod value_objects;

pub use errors::VoiceError;
pub use value_objects::{Voice, VoiceCatalog, VoiceGender, VoiceId, DEFAULT_LANGUAGE_CODE};
