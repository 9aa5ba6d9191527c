//! Audio sync engine: spectral band energies drive the light color.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::capture::AudioSource;
use crate::config::AudioSettings;
use crate::device::LightSession;
use crate::engines::normalize::BandNormalizer;
use crate::error::{Error, Result};

/// Upper frequency edge of each analysis band, in Hz. Band i spans from
/// the previous edge (0 for the first band) up to `BAND_EDGES_HZ[i]`.
pub(crate) const BAND_EDGES_HZ: [f32; 10] = [
    50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 6000.0, 10000.0, 20000.0,
];

/// Back-off after a failed capture read before retrying.
const READ_BACKOFF: Duration = Duration::from_millis(50);

/// Engine that captures audio frames, derives normalized band energies and
/// pushes a matching color to the light.
///
/// Start/stop are idempotent: `start` is a no-op while the loop is running,
/// `stop` is a no-op when idle. `stop` waits for the loop task to exit, so
/// the capture stream is released by the time it returns.
pub struct AudioSyncEngine {
    session: Arc<dyn LightSession>,
    settings: AudioSettings,
    source: Option<Box<dyn AudioSource>>,
    normalizer: Option<BandNormalizer>,
    stop_flag: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl AudioSyncEngine {
    /// Creates an engine over an already-opened capture source. Rejects
    /// unsupported band counts up front.
    pub fn new(
        session: Arc<dyn LightSession>,
        source: Box<dyn AudioSource>,
        settings: AudioSettings,
    ) -> Result<Self> {
        if settings.num_bands != BAND_EDGES_HZ.len() {
            return Err(Error::UnsupportedBandCount {
                expected: BAND_EDGES_HZ.len(),
                got: settings.num_bands,
            });
        }
        settings.validate()?;

        let normalizer = BandNormalizer::new(settings.num_bands, settings.history_len);

        Ok(Self {
            session,
            settings,
            source: Some(source),
            normalizer: Some(normalizer),
            stop_flag: Arc::new(AtomicBool::new(false)),
            task: None,
        })
    }

    /// Returns true while the background loop is running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Spawns the background loop. No-op if already running.
    pub async fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let (Some(source), Some(normalizer)) = (self.source.take(), self.normalizer.take())
        else {
            // Already consumed by a previous run; a stopped engine is
            // discarded, not restarted.
            return;
        };

        self.stop_flag.store(false, Ordering::SeqCst);

        let session = Arc::clone(&self.session);
        let settings = self.settings.clone();
        let stop_flag = Arc::clone(&self.stop_flag);

        self.task = Some(tokio::spawn(async move {
            audio_loop(session, source, settings, normalizer, stop_flag).await;
        }));
    }

    /// Signals the loop to stop and waits for it to exit. No-op if idle.
    pub async fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

async fn audio_loop(
    session: Arc<dyn LightSession>,
    mut source: Box<dyn AudioSource>,
    settings: AudioSettings,
    mut normalizer: BandNormalizer,
    stop_flag: Arc<AtomicBool>,
) {
    let sample_rate = source.sample_rate();
    let fft = FftPlanner::new().plan_fft_forward(settings.chunk);
    let min_push_interval = Duration::from_millis(settings.min_push_interval_ms);
    let mut last_push: Option<Instant> = None;

    tracing::info!("Audio sync started ({} Hz input)", sample_rate);

    while !stop_flag.load(Ordering::SeqCst) {
        let frame = match source.read_frame(settings.chunk).await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("Audio read failed, backing off: {}", e);
                tokio::time::sleep(READ_BACKOFF).await;
                continue;
            }
        };

        let magnitudes = magnitude_spectrum(&frame, fft.as_ref());
        let energies = band_energies(&magnitudes, frame.len(), sample_rate);
        let normalized = normalizer.update_and_normalize(&energies);
        let (hue, saturation, brightness) = color_from_bands(&normalized);

        if last_push.map_or(true, |t| t.elapsed() > min_push_interval) {
            if let Err(e) = session.set_color(hue, saturation, brightness).await {
                tracing::warn!("Color push failed: {}", e);
            }
            last_push = Some(Instant::now());
        }

        tokio::task::yield_now().await;
    }

    tracing::info!("Audio sync stopped");
    // Dropping the source here releases the capture stream.
    drop(source);
}

/// One-sided magnitude spectrum of a mono frame, scaled by 1/n.
fn magnitude_spectrum(frame: &[f32], fft: &dyn Fft<f32>) -> Vec<f32> {
    let n = frame.len();
    if n == 0 || n != fft.len() {
        return Vec::new();
    }

    let mut buffer: Vec<Complex<f32>> = frame.iter().map(|&s| Complex::new(s, 0.0)).collect();
    fft.process(&mut buffer);

    buffer[..n / 2].iter().map(|c| c.norm() / n as f32).collect()
}

/// Averages magnitude bins into the fixed frequency bands.
fn band_energies(magnitudes: &[f32], frame_size: usize, sample_rate: u32) -> Vec<f32> {
    let mut energies = Vec::with_capacity(BAND_EDGES_HZ.len());

    for (i, &freq_max) in BAND_EDGES_HZ.iter().enumerate() {
        let freq_min = if i > 0 { BAND_EDGES_HZ[i - 1] } else { 0.0 };

        let bin_min = (freq_min * frame_size as f32 / sample_rate as f32) as usize;
        let bin_max = ((freq_max * frame_size as f32 / sample_rate as f32) as usize)
            .min(magnitudes.len().saturating_sub(1));

        let energy = if bin_max > bin_min {
            magnitudes[bin_min..bin_max].iter().sum::<f32>() / (bin_max - bin_min) as f32
        } else {
            0.0
        };
        energies.push(energy);
    }

    energies
}

/// Maps normalized band energies to a hue/saturation/brightness triple.
fn color_from_bands(normalized: &[f32]) -> (u16, u8, u8) {
    let overall = mean(normalized);
    let bass = mean(&normalized[0..3]);
    let mid = mean(&normalized[3..6]);
    let treble = mean(&normalized[6..10]);

    // Bass is weighted to zero for now; kept in the formula until the hue
    // mapping gets retuned.
    let hue = ((bass * 0.0 + treble * 240.0) % 360.0) as u16;

    let saturation = (50.0 + mid * 50.0) as i32;
    let saturation = saturation.clamp(30, 100) as u8;

    let brightness = (20.0 + overall * 80.0) as i32;
    let brightness = brightness.clamp(10, 100) as u8;

    (hue, saturation, brightness)
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}
