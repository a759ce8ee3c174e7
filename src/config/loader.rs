//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml / config.local.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, TtsProvider};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "TEXTREEL";

/// 退避基数上限（秒）
const MAX_BACKOFF_BASE_SECONDS: f64 = 3600.0;

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `TEXTREEL_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值（见 types.rs 中各结构体的 Default）
///
/// # 环境变量示例
/// - `TEXTREEL_SERVER__PORT=9000`
/// - `TEXTREEL_TTS__API_KEY=...`
/// - `TEXTREEL_TTS__PROVIDER=fake`
/// - `TEXTREEL_PIPELINE__CONCURRENCY_LIMIT=8`
/// - `TEXTREEL_UPLOAD__ENABLED=true`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 例如: TEXTREEL_VIDEO__FONT_PATH=/fonts/Roboto.ttf
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    // 缺失的字段由 serde default 补齐
    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("Server port cannot be 0"));
    }

    if config.tts.provider == TtsProvider::Google && config.tts.endpoint.trim().is_empty() {
        return Err(invalid("TTS endpoint cannot be empty"));
    }

    let p = &config.pipeline;
    if p.max_chars_per_segment == 0 {
        return Err(invalid("pipeline.max_chars_per_segment must be positive"));
    }
    if p.concurrency_limit == 0 {
        return Err(invalid("pipeline.concurrency_limit must be positive"));
    }
    if !(p.backoff_base_seconds.is_finite()
        && (0.0..=MAX_BACKOFF_BASE_SECONDS).contains(&p.backoff_base_seconds))
    {
        return Err(invalid(format!(
            "pipeline.backoff_base_seconds must be between 0 and {}",
            MAX_BACKOFF_BASE_SECONDS
        )));
    }
    // 批大小为 1 时合并永远无法收敛
    if p.batch_merge_size < 2 {
        return Err(invalid("pipeline.batch_merge_size must be at least 2"));
    }
    if !(p.closing_clip_duration_seconds.is_finite() && p.closing_clip_duration_seconds > 0.0) {
        return Err(invalid("pipeline.closing_clip_duration_seconds must be positive"));
    }
    if p.max_concurrent_jobs == 0 || p.queue_capacity == 0 {
        return Err(invalid("pipeline.max_concurrent_jobs and queue_capacity must be positive"));
    }
    if p.max_finished_jobs == 0 {
        return Err(invalid("pipeline.max_finished_jobs must be positive"));
    }

    if config.video.width == 0 || config.video.height == 0 || config.video.fps == 0 {
        return Err(invalid("video width, height and fps must be positive"));
    }

    if config.upload.enabled && config.upload.endpoint.trim().is_empty() {
        return Err(invalid("upload.endpoint is required when upload is enabled"));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志），不输出凭据
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("TTS Provider: {:?}", config.tts.provider);
    tracing::info!("TTS Endpoint: {}", config.tts.endpoint);
    tracing::info!(
        "TTS Credentials: api_key={} bearer_token={}",
        config.tts.api_key.is_some(),
        config.tts.bearer_token.is_some()
    );
    tracing::info!("Language: {}", config.tts.language_code);
    tracing::info!(
        "Pipeline: max_chars={} concurrency={} max_retries={} backoff_base={}s batch={} closing={}s policy={:?}",
        config.pipeline.max_chars_per_segment,
        config.pipeline.concurrency_limit,
        config.pipeline.max_retries,
        config.pipeline.backoff_base_seconds,
        config.pipeline.batch_merge_size,
        config.pipeline.closing_clip_duration_seconds,
        config.pipeline.render_failure_policy
    );
    tracing::info!(
        "Video: {}x{} @{}fps {} / {} ({})",
        config.video.width,
        config.video.height,
        config.video.fps,
        config.video.video_codec,
        config.video.audio_codec,
        config.video.preset
    );
    tracing::info!(
        "Jobs: max_concurrent={} queue={} retention={}s max_finished={}",
        config.pipeline.max_concurrent_jobs,
        config.pipeline.queue_capacity,
        config.pipeline.job_retention_secs,
        config.pipeline.max_finished_jobs
    );
    tracing::info!("Font: {:?}", config.video.font_path);
    tracing::info!("Work Directory: {:?}", config.storage.work_dir);
    tracing::info!("Output Directory: {:?}", config.storage.output_dir);
    tracing::info!("Upload Enabled: {}", config.upload.enabled);
    if config.upload.enabled {
        tracing::info!("Upload Endpoint: {}", config.upload.endpoint);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::RenderFailurePolicy;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_default_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_batch_size_one() {
        let mut config = AppConfig::default();
        config.pipeline.batch_merge_size = 1;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validation_error_for_zero_concurrency() {
        let mut config = AppConfig::default();
        config.pipeline.concurrency_limit = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_bounds_backoff_base() {
        let mut config = AppConfig::default();
        config.pipeline.backoff_base_seconds = 1e20;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));

        config.pipeline.backoff_base_seconds = -1.0;
        assert!(validate_config(&config).is_err());

        config.pipeline.backoff_base_seconds = 0.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_upload_requires_endpoint() {
        let mut config = AppConfig::default();
        config.upload.enabled = true;
        assert!(validate_config(&config).is_err());

        config.upload.endpoint = "https://storage.local/bucket".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[tts]
provider = "fake"

[pipeline]
concurrency_limit = 2
render_failure_policy = "skip"

[video]
width = 640
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.tts.provider, TtsProvider::Fake);
        assert_eq!(config.pipeline.concurrency_limit, 2);
        assert_eq!(config.pipeline.render_failure_policy, RenderFailurePolicy::Skip);
        assert_eq!(config.video.width, 640);
        // 未出现的字段使用默认值
        assert_eq!(config.pipeline.batch_merge_size, 10);
        assert_eq!(config.video.height, 320);
    }
}
