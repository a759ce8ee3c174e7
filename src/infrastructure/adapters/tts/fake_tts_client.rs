//! Fake TTS Client - 离线 TTS 客户端
//!
//! 不调用外部服务，生成长度与文本成正比的静音 WAV。用于本地开发和测试。

use async_trait::async_trait;
use std::time::Duration;

use crate::application::ports::{
    AudioFormat, SynthesisRequest, SynthesizedAudio, TtsEnginePort, TtsError,
};

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 每个字符对应的音频时长（秒）
    pub seconds_per_char: f64,
    /// 最短音频时长（秒）
    pub min_duration_secs: f64,
    /// 采样率
    pub sample_rate: u32,
    /// 模拟推理延迟
    pub latency: Duration,
    /// 是否在结果中直接给出时长；false 时由 AudioProbe 测量
    pub report_duration: bool,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            seconds_per_char: 0.06,
            min_duration_secs: 0.5,
            sample_rate: 16000,
            latency: Duration::from_millis(200),
            report_duration: true,
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            seconds_per_char = config.seconds_per_char,
            sample_rate = config.sample_rate,
            "FakeTtsClient initialized"
        );
        Self { config }
    }

    /// 使用默认配置创建
    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    /// 文本对应的音频时长（秒），按整采样点取整
    pub fn duration_for(&self, text: &str) -> f64 {
        let secs = (text.chars().count() as f64 * self.config.seconds_per_char)
            .max(self.config.min_duration_secs);
        let samples = (secs * self.config.sample_rate as f64).round();
        samples / self.config.sample_rate as f64
    }
}

/// 生成单声道 16 位静音 WAV
pub fn silent_wav(duration_secs: f64, sample_rate: u32) -> Vec<u8> {
    let num_samples = (duration_secs * sample_rate as f64).round() as usize;
    let bits_per_sample: u16 = 16;
    let num_channels: u16 = 1;
    let data_size = num_samples * (bits_per_sample as usize / 8) * num_channels as usize;
    let byte_rate = sample_rate * num_channels as u32 * (bits_per_sample / 8) as u32;
    let block_align = num_channels * (bits_per_sample / 8);

    let mut wav = Vec::with_capacity(44 + data_size);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&((36 + data_size) as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&num_channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_size as u32).to_le_bytes());
    wav.resize(44 + data_size, 0);

    wav
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, TtsError> {
        tracing::debug!(
            text_len = request.text.chars().count(),
            voice = %request.voice.id,
            "FakeTtsClient: generating silent audio"
        );

        // 模拟推理延迟
        tokio::time::sleep(self.config.latency).await;

        let duration = self.duration_for(&request.text);
        Ok(SynthesizedAudio {
            audio_data: silent_wav(duration, self.config.sample_rate),
            format: AudioFormat::Wav,
            duration_secs: self.config.report_duration.then_some(duration),
        })
    }
}
