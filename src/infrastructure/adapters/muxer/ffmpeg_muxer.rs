//! FFmpeg Muxer - 调用 ffmpeg 子进程
//!
//! - render_segment: 静态帧循环 + 旁白音频（或 anullsrc 静音），按时长截断
//! - merge: concat demuxer，先尝试流拷贝，失败再重新编码
//!
//! 所有片段使用相同的编码参数，流拷贝合并在正常情况下即可成功。

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::application::ports::{MuxError, RenderSegmentRequest, VideoMuxerPort};

/// stderr 保留的尾部行数
const STDERR_TAIL_LINES: usize = 20;

/// FFmpeg 配置
#[derive(Debug, Clone)]
pub struct FfmpegMuxerConfig {
    /// ffmpeg 可执行文件
    pub ffmpeg_path: String,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub threads: u32,
    pub pixel_format: String,
    /// 输出音频采样率（静音片段与旁白片段一致）
    pub audio_sample_rate: u32,
}

impl Default for FfmpegMuxerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            fps: 24,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "ultrafast".to_string(),
            threads: 4,
            pixel_format: "yuv420p".to_string(),
            audio_sample_rate: 44100,
        }
    }
}

pub struct FfmpegMuxer {
    config: FfmpegMuxerConfig,
}

impl FfmpegMuxer {
    pub fn new(config: FfmpegMuxerConfig) -> Self {
        Self { config }
    }

    /// `ffmpeg -version` 的第一行，启动时检查可执行文件是否可用
    pub async fn version(&self) -> Result<String, MuxError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| MuxError::Spawn {
                program: self.config.ffmpeg_path.clone(),
                message: e.to_string(),
            })?;

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string())
    }

    fn encoding_args(&self) -> Vec<OsString> {
        let c = &self.config;
        [
            "-c:v",
            c.video_codec.as_str(),
            "-preset",
            c.preset.as_str(),
            "-tune",
            "stillimage",
            "-threads",
            c.threads.to_string().as_str(),
            "-pix_fmt",
            c.pixel_format.as_str(),
            "-r",
            c.fps.to_string().as_str(),
            "-c:a",
            c.audio_codec.as_str(),
            "-ar",
            c.audio_sample_rate.to_string().as_str(),
            "-ac",
            "2",
        ]
        .iter()
        .map(OsString::from)
        .collect()
    }

    fn render_args(&self, request: &RenderSegmentRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-loop".into(),
            "1".into(),
            "-framerate".into(),
            self.config.fps.to_string().into(),
            "-i".into(),
            request.image.clone().into(),
        ];

        match &request.audio {
            Some(audio) => {
                args.push("-i".into());
                args.push(audio.clone().into());
            }
            None => {
                args.push("-f".into());
                args.push("lavfi".into());
                args.push("-i".into());
                args.push(
                    format!(
                        "anullsrc=channel_layout=stereo:sample_rate={}",
                        self.config.audio_sample_rate
                    )
                    .into(),
                );
            }
        }

        args.extend(["-map", "0:v:0", "-map", "1:a:0"].iter().map(OsString::from));
        args.push("-t".into());
        args.push(format!("{:.3}", request.duration).into());
        args.extend(self.encoding_args());
        args.push(request.output.clone().into());
        args
    }

    fn merge_args(&self, list_file: &Path, output: &Path, stream_copy: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(list_file.into());

        if stream_copy {
            args.push("-c".into());
            args.push("copy".into());
        } else {
            args.extend(self.encoding_args());
        }
        args.push(output.into());
        args
    }

    async fn run(&self, operation: &'static str, args: Vec<OsString>) -> Result<(), MuxError> {
        tracing::trace!(operation = operation, args = ?args, "Running ffmpeg");

        let output = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MuxError::Spawn {
                program: self.config.ffmpeg_path.clone(),
                message: e.to_string(),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");

        Err(MuxError::ProcessFailed {
            operation,
            status: output.status.to_string(),
            stderr: tail,
        })
    }
}

/// concat demuxer 列表文件内容
fn concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| {
            let escaped = p.to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

#[async_trait]
impl VideoMuxerPort for FfmpegMuxer {
    async fn render_segment(&self, request: &RenderSegmentRequest) -> Result<(), MuxError> {
        if !request.duration.is_finite() || request.duration <= 0.0 {
            return Err(MuxError::InvalidInput(format!(
                "segment duration must be positive, got {}",
                request.duration
            )));
        }

        self.run("render_segment", self.render_args(request)).await?;

        tracing::debug!(
            output = %request.output.display(),
            start = request.start_offset,
            duration = request.duration,
            silent = request.audio.is_none(),
            "Segment video rendered"
        );
        Ok(())
    }

    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MuxError> {
        if inputs.is_empty() {
            return Err(MuxError::InvalidInput("nothing to merge".to_string()));
        }

        let list_file = output.with_extension("txt");
        tokio::fs::write(&list_file, concat_list(inputs))
            .await
            .map_err(|e| MuxError::IoError(e.to_string()))?;

        let result = match self
            .run("merge", self.merge_args(&list_file, output, true))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    output = %output.display(),
                    error = %e,
                    "ffmpeg concat with copy failed; retrying with re-encode"
                );
                self.run("merge", self.merge_args(&list_file, output, false))
                    .await
            }
        };

        if let Err(e) = tokio::fs::remove_file(&list_file).await {
            tracing::debug!(path = %list_file.display(), error = %e, "Failed to remove concat list");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lossy(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn request(audio: Option<&str>) -> RenderSegmentRequest {
        RenderSegmentRequest {
            image: PathBuf::from("/tmp/run/caption.png"),
            audio: audio.map(PathBuf::from),
            start_offset: 3.0,
            duration: 2.5,
            output: PathBuf::from("/tmp/run/segment.mp4"),
        }
    }

    #[test]
    fn test_render_args_with_audio() {
        let muxer = FfmpegMuxer::new(FfmpegMuxerConfig::default());
        let args = lossy(&muxer.render_args(&request(Some("/tmp/run/audio.mp3"))));

        assert!(args.windows(2).any(|w| w == ["-loop", "1"]));
        assert!(args.windows(2).any(|w| w == ["-i", "/tmp/run/audio.mp3"]));
        assert!(args.windows(2).any(|w| w == ["-t", "2.500"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-preset", "ultrafast"]));
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "yuv420p"]));
        assert!(args.windows(2).any(|w| w == ["-threads", "4"]));
        assert_eq!(args.last().unwrap(), "/tmp/run/segment.mp4");
        assert!(!args.iter().any(|a| a.starts_with("anullsrc")));
    }

    #[test]
    fn test_render_args_silent() {
        let muxer = FfmpegMuxer::new(FfmpegMuxerConfig::default());
        let args = lossy(&muxer.render_args(&request(None)));

        assert!(args.windows(2).any(|w| w == ["-f", "lavfi"]));
        assert!(args
            .iter()
            .any(|a| a == "anullsrc=channel_layout=stereo:sample_rate=44100"));
    }

    #[test]
    fn test_merge_args_copy_and_reencode() {
        let muxer = FfmpegMuxer::new(FfmpegMuxerConfig::default());
        let list = Path::new("/tmp/run/batch.txt");
        let out = Path::new("/tmp/run/batch.mp4");

        let copy = lossy(&muxer.merge_args(list, out, true));
        assert!(copy.windows(2).any(|w| w == ["-c", "copy"]));
        assert!(copy.windows(2).any(|w| w == ["-f", "concat"]));

        let reencode = lossy(&muxer.merge_args(list, out, false));
        assert!(!reencode.iter().any(|a| a == "copy"));
        assert!(reencode.windows(2).any(|w| w == ["-c:a", "aac"]));
    }

    #[test]
    fn test_concat_list_preserves_order_and_escapes() {
        let list = concat_list(&[
            PathBuf::from("/tmp/a.mp4"),
            PathBuf::from("/tmp/it's.mp4"),
        ]);
        assert_eq!(list, "file '/tmp/a.mp4'\nfile '/tmp/it'\\''s.mp4'\n");
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let muxer = FfmpegMuxer::new(FfmpegMuxerConfig {
            ffmpeg_path: "/nonexistent/ffmpeg".to_string(),
            ..Default::default()
        });
        let err = muxer.render_segment(&request(None)).await.unwrap_err();
        assert!(matches!(err, MuxError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_invalid_duration_rejected() {
        let muxer = FfmpegMuxer::new(FfmpegMuxerConfig::default());
        let mut req = request(None);
        req.duration = 0.0;
        let err = muxer.render_segment(&req).await.unwrap_err();
        assert!(matches!(err, MuxError::InvalidInput(_)));
    }
}
