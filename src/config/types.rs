//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::ports::{AudioFormat, ClosingCard, FrameSize};
use crate::application::{PipelineSettings, RenderFailurePolicy, RetryPolicy, SchedulerConfig};
use crate::domain::SegmentConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// TTS 引擎配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 生成流水线配置
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// 视频编码与字幕帧配置
    #[serde(default)]
    pub video: VideoConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 上传配置
    #[serde(default)]
    pub upload: UploadConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// 组装单次运行的流水线参数
    pub fn pipeline_settings(&self) -> PipelineSettings {
        let p = &self.pipeline;
        PipelineSettings {
            segment: SegmentConfig {
                max_chars: p.max_chars_per_segment,
            },
            scheduler: SchedulerConfig {
                concurrency_limit: p.concurrency_limit,
                retry: RetryPolicy {
                    max_retries: p.max_retries,
                    backoff_base: Duration::try_from_secs_f64(p.backoff_base_seconds)
                        .unwrap_or_else(|_| Duration::from_secs_f64(default_backoff_base())),
                },
                audio_format: self.tts.audio_format,
            },
            batch_size: p.batch_merge_size,
            closing_duration: p.closing_clip_duration_seconds,
            render_failure_policy: p.render_failure_policy,
            frame_size: FrameSize {
                width: self.video.width,
                height: self.video.height,
            },
            closing_card: ClosingCard {
                title: self.video.closing_title.clone(),
                subtitle: self.video.closing_subtitle.clone(),
            },
            work_dir: self.storage.work_dir.clone(),
            output_dir: self.storage.output_dir.clone(),
        }
    }
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 上传文本的最大大小（字节）
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024 // 10 MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// TTS 提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    /// Google Cloud Text-to-Speech
    #[default]
    Google,
    /// 离线静音引擎，用于本地开发
    Fake,
}

/// TTS 引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub provider: TtsProvider,

    /// API 根地址
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,

    /// API key（`?key=`），与 bearer_token 二选一
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub bearer_token: Option<String>,

    /// 语言区域，决定音色目录
    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 请求的音频编码
    #[serde(default)]
    pub audio_format: AudioFormat,

    /// Fake 引擎的模拟延迟（毫秒）
    #[serde(default = "default_fake_latency_ms")]
    pub fake_latency_ms: u64,
}

fn default_tts_endpoint() -> String {
    "https://texttospeech.googleapis.com".to_string()
}

fn default_language_code() -> String {
    crate::domain::voice::DEFAULT_LANGUAGE_CODE.to_string()
}

fn default_tts_timeout() -> u64 {
    60
}

fn default_fake_latency_ms() -> u64 {
    200
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            endpoint: default_tts_endpoint(),
            api_key: None,
            bearer_token: None,
            language_code: default_language_code(),
            timeout_secs: default_tts_timeout(),
            audio_format: AudioFormat::default(),
            fake_latency_ms: default_fake_latency_ms(),
        }
    }
}

/// 流水线配置
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// 单片段最大字符数（含句间空格）
    #[serde(default = "default_max_chars")]
    pub max_chars_per_segment: usize,

    /// 同时进行的 TTS 请求数
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// 限流时的最大重试次数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 退避基数（秒），第 k 次重试前等待 base * 2^k
    #[serde(default = "default_backoff_base")]
    pub backoff_base_seconds: f64,

    /// 每次合并的最大输入数
    #[serde(default = "default_batch_merge_size")]
    pub batch_merge_size: usize,

    /// 结尾卡片时长（秒）
    #[serde(default = "default_closing_duration")]
    pub closing_clip_duration_seconds: f64,

    #[serde(default)]
    pub render_failure_policy: RenderFailurePolicy,

    /// 同时运行的视频任务数
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// 等待队列长度，队列满时拒绝新任务
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 已结束任务在内存中保留的时长（秒）
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,

    /// 最多保留的已结束任务数，超出时先淘汰最早结束的
    #[serde(default = "default_max_finished_jobs")]
    pub max_finished_jobs: usize,
}

fn default_max_chars() -> usize {
    crate::domain::DEFAULT_MAX_CHARS
}

fn default_concurrency_limit() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> f64 {
    2.0
}

fn default_batch_merge_size() -> usize {
    10
}

fn default_closing_duration() -> f64 {
    crate::domain::DEFAULT_CLOSING_DURATION_SECS
}

fn default_max_concurrent_jobs() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    64
}

fn default_job_retention_secs() -> u64 {
    24 * 60 * 60
}

fn default_max_finished_jobs() -> usize {
    256
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chars_per_segment: default_max_chars(),
            concurrency_limit: default_concurrency_limit(),
            max_retries: default_max_retries(),
            backoff_base_seconds: default_backoff_base(),
            batch_merge_size: default_batch_merge_size(),
            closing_clip_duration_seconds: default_closing_duration(),
            render_failure_policy: RenderFailurePolicy::default(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            queue_capacity: default_queue_capacity(),
            job_retention_secs: default_job_retention_secs(),
            max_finished_jobs: default_max_finished_jobs(),
        }
    }
}

/// 视频配置
#[derive(Debug, Clone, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_fps")]
    pub fps: u32,

    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_threads")]
    pub threads: u32,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// 字幕字体
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,

    /// 结尾卡片标题字体，缺失时使用常规字体
    #[serde(default = "default_bold_font_path")]
    pub bold_font_path: Option<PathBuf>,

    #[serde(default = "default_font_size")]
    pub font_size: f32,

    #[serde(default = "default_line_height")]
    pub line_height: u32,

    /// 结尾卡片 logo，启动时下载一次
    #[serde(default)]
    pub logo_url: Option<String>,

    #[serde(default = "default_closing_title")]
    pub closing_title: String,

    #[serde(default = "default_closing_subtitle")]
    pub closing_subtitle: String,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    320
}

fn default_fps() -> u32 {
    24
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_preset() -> String {
    "ultrafast".to_string()
}

fn default_threads() -> u32 {
    4
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

fn default_font_path() -> PathBuf {
    PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf")
}

fn default_bold_font_path() -> Option<PathBuf> {
    Some(PathBuf::from(
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    ))
}

fn default_font_size() -> f32 {
    30.0
}

fn default_line_height() -> u32 {
    40
}

fn default_closing_title() -> String {
    ClosingCard::default().title
}

fn default_closing_subtitle() -> String {
    ClosingCard::default().subtitle
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            preset: default_preset(),
            threads: default_threads(),
            pixel_format: default_pixel_format(),
            font_path: default_font_path(),
            bold_font_path: default_bold_font_path(),
            font_size: default_font_size(),
            line_height: default_line_height(),
            logo_url: None,
            closing_title: default_closing_title(),
            closing_subtitle: default_closing_subtitle(),
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 临时产物根目录，每次运行在其下建立独立子目录
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// 最终视频目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("textreel")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/videos")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            output_dir: default_output_dir(),
        }
    }
}

/// 上传配置
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default)]
    pub enabled: bool,

    /// PUT 目标根地址
    #[serde(default)]
    pub endpoint: String,

    /// 对外访问根地址，为空时与 endpoint 相同
    #[serde(default)]
    pub public_base_url: Option<String>,

    #[serde(default)]
    pub bearer_token: Option<String>,

    #[serde(default = "default_upload_timeout")]
    pub timeout_secs: u64,
}

fn default_upload_timeout() -> u64 {
    300
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            public_base_url: None,
            bearer_token: None,
            timeout_secs: default_upload_timeout(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
