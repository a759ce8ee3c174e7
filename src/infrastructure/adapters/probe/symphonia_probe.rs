//! Symphonia Audio Probe - 基于 symphonia 的音频时长测量
//!
//! 容器头里有总帧数时直接换算；否则（如无 Xing 头的 MP3）逐包累加时长，不解码。

use std::io::Cursor;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

use crate::application::ports::{AudioFormat, AudioInfo, AudioProbePort, ProbeError};

#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaAudioProbe;

impl SymphoniaAudioProbe {
    pub fn new() -> Self {
        Self
    }
}

impl AudioProbePort for SymphoniaAudioProbe {
    fn probe(&self, data: &[u8], format: AudioFormat) -> Result<AudioInfo, ProbeError> {
        if data.is_empty() {
            return Err(ProbeError::InvalidInput("Audio data is empty".to_string()));
        }

        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(format.extension());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ProbeError::UnsupportedFormat(format!("Probe failed: {}", e)))?;

        let mut reader = probed.format;

        let track = reader
            .default_track()
            .ok_or_else(|| ProbeError::DecodingError("No audio track found".to_string()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let sample_rate = params.sample_rate;
        let channels = params.channels.map(|c| c.count() as u8);

        if let (Some(frames), Some(rate)) = (params.n_frames, sample_rate) {
            if rate > 0 {
                return Ok(AudioInfo {
                    duration_secs: frames as f64 / rate as f64,
                    sample_rate,
                    channels,
                });
            }
        }

        let time_base = params
            .time_base
            .or_else(|| sample_rate.filter(|r| *r > 0).map(|r| TimeBase::new(1, r)))
            .ok_or_else(|| ProbeError::DecodingError("Unknown time base".to_string()))?;

        let mut total_ts: u64 = 0;
        loop {
            match reader.next_packet() {
                Ok(packet) => {
                    if packet.track_id() == track_id {
                        total_ts += packet.dur;
                    }
                }
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(ProbeError::DecodingError(format!("Packet read error: {}", e)));
                }
            }
        }

        let time = time_base.calc_time(total_ts);
        Ok(AudioInfo {
            duration_secs: time.seconds as f64 + time.frac,
            sample_rate,
            channels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::tts::silent_wav;

    #[test]
    fn test_probe_wav_duration() {
        let wav = silent_wav(1.5, 16000);
        let info = SymphoniaAudioProbe::new().probe(&wav, AudioFormat::Wav).unwrap();

        assert!((info.duration_secs - 1.5).abs() < 1e-3);
        assert_eq!(info.sample_rate, Some(16000));
        assert_eq!(info.channels, Some(1));
    }

    #[test]
    fn test_probe_empty_input() {
        let err = SymphoniaAudioProbe::new()
            .probe(&[], AudioFormat::Mp3)
            .unwrap_err();
        assert!(matches!(err, ProbeError::InvalidInput(_)));
    }

    #[test]
    fn test_probe_garbage() {
        let garbage = vec![0x42u8; 64];
        assert!(SymphoniaAudioProbe::new()
            .probe(&garbage, AudioFormat::Wav)
            .is_err());
    }
}
