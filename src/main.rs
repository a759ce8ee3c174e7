//! Textreel - 文本转旁白视频服务
//!
//! 启动顺序：配置 → 日志 → 适配器（TTS、字幕帧、ffmpeg、上传）→ 任务队列与 Worker → HTTP 服务

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;

use textreel::application::{CaptionRendererPort, GenerateVideoHandler, TtsEnginePort};
use textreel::config::{load_config, print_config, AppConfig, LogConfig, TtsProvider};
use textreel::domain::voice::VoiceCatalog;
use textreel::infrastructure::adapters::{
    fetch_logo, CaptionStyle, FakeTtsClient, FakeTtsClientConfig, FfmpegMuxer, FfmpegMuxerConfig,
    GlyphCaptionRenderer, GoogleTtsAuth, GoogleTtsClient, GoogleTtsClientConfig,
    HttpObjectUploader, HttpObjectUploaderConfig, SymphoniaAudioProbe,
};
use textreel::infrastructure::http::{AppState, HttpServer, ServerConfig};
use textreel::infrastructure::memory::{InMemoryJobManager, JobRetention};
use textreel::infrastructure::worker::{VideoWorker, VideoWorkerConfig};

const LOGO_TIMEOUT: Duration = Duration::from_secs(10);

fn init_tracing(log: &LogConfig) {
    let log_filter = format!("{},textreel={},tower_http=debug", log.level, log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_tts_engine(config: &AppConfig) -> anyhow::Result<Arc<dyn TtsEnginePort>> {
    let tts = &config.tts;
    match tts.provider {
        TtsProvider::Google => {
            let auth = match (&tts.api_key, &tts.bearer_token) {
                (Some(key), _) => GoogleTtsAuth::ApiKey(key.clone()),
                (None, Some(token)) => GoogleTtsAuth::BearerToken(token.clone()),
                (None, None) => {
                    tracing::warn!("No TTS credentials configured; requests are sent unauthenticated");
                    GoogleTtsAuth::None
                }
            };
            let client_config = GoogleTtsClientConfig::new(&tts.endpoint)
                .with_timeout(tts.timeout_secs)
                .with_auth(auth);
            Ok(Arc::new(GoogleTtsClient::new(client_config)?))
        }
        TtsProvider::Fake => Ok(Arc::new(FakeTtsClient::new(FakeTtsClientConfig {
            latency: Duration::from_millis(tts.fake_latency_ms),
            ..Default::default()
        }))),
    }
}

async fn build_caption_renderer(config: &AppConfig) -> anyhow::Result<Arc<dyn CaptionRendererPort>> {
    let video = &config.video;
    let style = CaptionStyle {
        font_size: video.font_size,
        line_height: video.line_height,
        ..Default::default()
    };

    let mut renderer = GlyphCaptionRenderer::from_font_files(
        &video.font_path,
        video.bold_font_path.as_deref(),
        style,
    )
    .with_context(|| format!("Failed to load caption font {:?}", video.font_path))?;

    // logo 下载失败不影响启动，结尾卡片不带 logo
    if let Some(url) = &video.logo_url {
        match fetch_logo(url, LOGO_TIMEOUT).await {
            Ok(logo) => renderer = renderer.with_logo(logo),
            Err(e) => tracing::warn!(url = %url, error = %e, "Closing card logo unavailable"),
        }
    }

    Ok(Arc::new(renderer))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        return;
    }
    tracing::info!("Received shutdown signal");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().context("Failed to load config")?;

    init_tracing(&config.log);

    tracing::info!("Textreel - text to narrated video");
    print_config(&config);

    tokio::fs::create_dir_all(&config.storage.work_dir)
        .await
        .with_context(|| format!("Failed to create work dir {:?}", config.storage.work_dir))?;
    tokio::fs::create_dir_all(&config.storage.output_dir)
        .await
        .with_context(|| format!("Failed to create output dir {:?}", config.storage.output_dir))?;

    let catalog = Arc::new(VoiceCatalog::neural2(&config.tts.language_code));

    let tts_engine = build_tts_engine(&config)?;
    if !tts_engine.health_check().await {
        tracing::warn!(endpoint = %config.tts.endpoint, "TTS health check failed");
    }

    let renderer = build_caption_renderer(&config).await?;

    let muxer = FfmpegMuxer::new(FfmpegMuxerConfig {
        ffmpeg_path: config.video.ffmpeg_path.clone(),
        fps: config.video.fps,
        video_codec: config.video.video_codec.clone(),
        audio_codec: config.video.audio_codec.clone(),
        preset: config.video.preset.clone(),
        threads: config.video.threads,
        pixel_format: config.video.pixel_format.clone(),
        ..Default::default()
    });
    let ffmpeg_version = muxer.version().await.context("ffmpeg is not available")?;
    tracing::info!(version = %ffmpeg_version, "ffmpeg found");

    let mut handler = GenerateVideoHandler::new(
        catalog.clone(),
        tts_engine,
        Arc::new(SymphoniaAudioProbe::new()),
        renderer,
        Arc::new(muxer),
        config.pipeline_settings(),
    );

    if config.upload.enabled {
        let uploader = HttpObjectUploader::new(HttpObjectUploaderConfig {
            endpoint: config.upload.endpoint.clone(),
            public_base_url: config
                .upload
                .public_base_url
                .clone()
                .unwrap_or_else(|| config.upload.endpoint.clone()),
            bearer_token: config.upload.bearer_token.clone(),
            timeout_secs: config.upload.timeout_secs,
        })?;
        handler = handler.with_uploader(Arc::new(uploader));
    }

    // 创建任务队列
    let (job_tx, job_rx) = mpsc::channel(config.pipeline.queue_capacity);
    let job_manager = Arc::new(InMemoryJobManager::new(job_tx).with_retention(JobRetention {
        ttl: Duration::from_secs(config.pipeline.job_retention_secs),
        max_finished: config.pipeline.max_finished_jobs,
    }));

    let worker = VideoWorker::new(
        VideoWorkerConfig {
            max_concurrent_jobs: config.pipeline.max_concurrent_jobs,
        },
        job_rx,
        job_manager.clone(),
        Arc::new(handler),
    );
    tokio::spawn(worker.run());

    let state = AppState::new(catalog, job_manager);
    let server = HttpServer::new(
        ServerConfig {
            host: config.server.host.clone(),
            port: config.server.port,
            max_body_bytes: config.server.max_upload_bytes,
        },
        state,
    );

    server.run_with_shutdown(shutdown_signal()).await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
