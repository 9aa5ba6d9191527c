//! Capture primitives: audio frames and screen pixels.
//!
//! Both engines consume capture through the async `AudioSource` /
//! `FrameSource` seams so the sync math can be tested against synthetic
//! sources. The real backends (cpal, xcap) own handles that are not `Send`,
//! so each runs on a dedicated worker thread and bridges frames to the
//! engine task over channels.

mod audio;
mod screen;

use async_trait::async_trait;

use crate::config::{AudioSettings, ScreenSettings};
use crate::error::Result;

pub use audio::CpalAudioSource;
pub use screen::XcapFrameSource;

/// A packed RGB frame captured from a monitor.
#[derive(Debug, Clone)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    /// RGB8 pixel data, row-major, `width * height * 3` bytes.
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// Builds a frame from RGBA bytes, dropping the alpha channel.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 3);
        for px in rgba.chunks_exact(4) {
            data.extend_from_slice(&px[..3]);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Builds a single-color frame. Used by tests and demos.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 3);
        for _ in 0..(width as usize) * (height as usize) {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }
}

/// Source of fixed-size mono audio frames.
#[async_trait]
pub trait AudioSource: Send {
    /// Sample rate of the underlying stream, in Hz.
    fn sample_rate(&self) -> u32;

    /// Reads exactly `frame_size` mono samples. Failures are transient:
    /// callers back off briefly and retry.
    async fn read_frame(&mut self, frame_size: usize) -> Result<Vec<f32>>;
}

/// Source of captured screen frames.
#[async_trait]
pub trait FrameSource: Send {
    /// Grabs one frame from the configured monitor.
    async fn grab_frame(&mut self) -> Result<RgbFrame>;
}

/// Capability-checked factory for capture sources.
///
/// Opening a source validates backend availability up front, so a missing
/// audio device or empty monitor list surfaces as a configuration error at
/// engine construction rather than inside the tick loop.
pub trait CaptureBackend: Send + Sync {
    fn open_audio(&self, settings: &AudioSettings) -> Result<Box<dyn AudioSource>>;
    fn open_frames(&self, settings: &ScreenSettings) -> Result<Box<dyn FrameSource>>;
}

/// The default backend: cpal for audio, xcap for the screen.
pub struct SystemCaptureBackend;

impl CaptureBackend for SystemCaptureBackend {
    fn open_audio(&self, settings: &AudioSettings) -> Result<Box<dyn AudioSource>> {
        Ok(Box::new(CpalAudioSource::open(settings.device_index)?))
    }

    fn open_frames(&self, settings: &ScreenSettings) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(XcapFrameSource::open(settings.monitor_index)?))
    }
}
