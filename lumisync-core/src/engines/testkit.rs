//! Shared mocks for engine and coordinator tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::capture::{AudioSource, CaptureBackend, FrameSource, RgbFrame};
use crate::config::{AudioSettings, ScreenSettings};
use crate::device::{DeviceDiscovery, LightSession};
use crate::error::{Error, Result};

/// Recorded call against a [`MockSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionCall {
    Connect(String),
    PowerOn,
    PowerOff,
    SetColor(u16, u8, u8),
}

/// Light session that records every call and always succeeds.
#[derive(Default)]
pub(crate) struct MockSession {
    calls: Mutex<Vec<SessionCall>>,
}

impl MockSession {
    pub(crate) fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count_color_pushes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SessionCall::SetColor(..)))
            .count()
    }

    pub(crate) fn pushed_brightnesses(&self) -> Vec<u8> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                SessionCall::SetColor(_, _, b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SessionCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl LightSession for MockSession {
    async fn connect(&self, address: &str) -> Result<()> {
        self.record(SessionCall::Connect(address.to_string()));
        Ok(())
    }

    async fn power_on(&self) -> Result<()> {
        self.record(SessionCall::PowerOn);
        Ok(())
    }

    async fn power_off(&self) -> Result<()> {
        self.record(SessionCall::PowerOff);
        Ok(())
    }

    async fn set_color(&self, hue: u16, saturation: u8, brightness: u8) -> Result<()> {
        self.record(SessionCall::SetColor(hue, saturation, brightness));
        Ok(())
    }
}

/// Discovery that returns a fixed answer.
pub(crate) struct FixedDiscovery(pub(crate) Option<String>);

#[async_trait]
impl DeviceDiscovery for FixedDiscovery {
    async fn find_device(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Decrements a shared counter on drop, so tests can assert that engine
/// loops release their capture sources.
pub(crate) struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Audio source producing silent frames at a fixed virtual cadence.
pub(crate) struct SilentSource {
    sample_rate: u32,
    delay: Duration,
    _guard: Option<LiveGuard>,
}

impl SilentSource {
    pub(crate) fn new(sample_rate: u32, delay: Duration) -> Self {
        Self {
            sample_rate,
            delay,
            _guard: None,
        }
    }

    pub(crate) fn tracked(sample_rate: u32, delay: Duration, live: Arc<AtomicUsize>) -> Self {
        Self {
            sample_rate,
            delay,
            _guard: Some(LiveGuard::new(live)),
        }
    }
}

#[async_trait]
impl AudioSource for SilentSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn read_frame(&mut self, frame_size: usize) -> Result<Vec<f32>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![0.0; frame_size])
    }
}

/// Audio source whose every read fails, for back-off paths.
pub(crate) struct FailingSource;

#[async_trait]
impl AudioSource for FailingSource {
    fn sample_rate(&self) -> u32 {
        44100
    }

    async fn read_frame(&mut self, _frame_size: usize) -> Result<Vec<f32>> {
        Err(Error::CaptureRead("mock failure".to_string()))
    }
}

/// Frame source producing a solid color.
pub(crate) struct SolidFrameSource {
    rgb: [u8; 3],
    _guard: Option<LiveGuard>,
}

impl SolidFrameSource {
    pub(crate) fn new(rgb: [u8; 3]) -> Self {
        Self { rgb, _guard: None }
    }

    pub(crate) fn tracked(rgb: [u8; 3], live: Arc<AtomicUsize>) -> Self {
        Self {
            rgb,
            _guard: Some(LiveGuard::new(live)),
        }
    }
}

#[async_trait]
impl FrameSource for SolidFrameSource {
    async fn grab_frame(&mut self) -> Result<RgbFrame> {
        Ok(RgbFrame::solid(16, 16, self.rgb))
    }
}

/// Capture backend handing out mock sources and tracking how many are live.
pub(crate) struct MockBackend {
    pub(crate) live: Arc<AtomicUsize>,
    pub(crate) fail_audio: bool,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            fail_audio: false,
        }
    }

    pub(crate) fn without_audio() -> Self {
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            fail_audio: true,
        }
    }

    pub(crate) fn live_sources(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for MockBackend {
    fn open_audio(&self, _settings: &AudioSettings) -> Result<Box<dyn AudioSource>> {
        if self.fail_audio {
            return Err(Error::NoCaptureBackend("no input device".to_string()));
        }
        Ok(Box::new(SilentSource::tracked(
            44100,
            Duration::from_millis(1),
            Arc::clone(&self.live),
        )))
    }

    fn open_frames(&self, _settings: &ScreenSettings) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(SolidFrameSource::tracked(
            [0, 128, 255],
            Arc::clone(&self.live),
        )))
    }
}
