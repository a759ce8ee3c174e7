//! Probe Adapter - 音频时长测量

mod symphonia_probe;

pub use symphonia_probe::SymphoniaAudioProbe;
