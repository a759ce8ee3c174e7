//! Voice Queries

/// 获取单个音色
#[derive(Debug, Clone)]
pub struct GetVoice {
    pub voice_id: String,
}

/// 列出所有音色
#[derive(Debug, Clone)]
pub struct ListVoices;
