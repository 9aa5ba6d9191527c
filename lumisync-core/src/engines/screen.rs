//! Screen sync engine: the dominant screen color drives the light.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::imageops::FilterType;
use image::RgbImage;
use tokio::task::JoinHandle;

use crate::capture::{FrameSource, RgbFrame};
use crate::config::ScreenSettings;
use crate::device::LightSession;
use crate::engines::color::{apply_gamma_correction, lerp, lerp_hue, rgb_to_hsv};
use crate::error::Result;

/// Captured frames are downsampled to this square size before averaging.
const SAMPLE_SIZE: u32 = 150;

/// The hue/saturation/brightness state carried across ticks. Each tick
/// moves it a fraction of the way toward the fresh target, which keeps the
/// light from flickering on rapid scene changes.
#[derive(Debug, Clone, Copy)]
struct SmoothedColor {
    hue: f32,
    saturation: f32,
    brightness: f32,
}

impl Default for SmoothedColor {
    fn default() -> Self {
        Self {
            hue: 0.0,
            saturation: 50.0,
            brightness: 60.0,
        }
    }
}

impl SmoothedColor {
    fn step_toward(&mut self, target: ColorTarget, factor: f32) {
        self.hue = lerp_hue(self.hue, target.hue, factor);
        self.saturation = lerp(self.saturation, target.saturation, factor);
        self.brightness = lerp(self.brightness, target.brightness, factor);
    }
}

/// Per-tick color target derived from one captured frame.
#[derive(Debug, Clone, Copy)]
struct ColorTarget {
    hue: f32,
    saturation: f32,
    brightness: f32,
}

/// Engine that captures the screen, averages it down to one color and
/// pushes a smoothed version to the light every tick.
///
/// Same start/stop contract as the audio engine: both are idempotent and
/// `stop` joins the loop task before returning.
pub struct ScreenSyncEngine {
    session: Arc<dyn LightSession>,
    settings: ScreenSettings,
    source: Option<Box<dyn FrameSource>>,
    user_brightness: Arc<AtomicU8>,
    stop_flag: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ScreenSyncEngine {
    /// Creates an engine over an already-opened frame source.
    pub fn new(
        session: Arc<dyn LightSession>,
        source: Box<dyn FrameSource>,
        settings: ScreenSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            session,
            settings,
            source: Some(source),
            user_brightness: Arc::new(AtomicU8::new(80)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            task: None,
        })
    }

    /// Sets the brightness ceiling (1-100). Takes effect on the next tick;
    /// callable at any time, including while the loop is running.
    pub fn set_user_brightness(&self, value: u8) {
        self.user_brightness
            .store(value.clamp(1, 100), Ordering::SeqCst);
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
        let Some(source) = self.source.take() else {
            return;
        };

        self.stop_flag.store(false, Ordering::SeqCst);

        let session = Arc::clone(&self.session);
        let settings = self.settings.clone();
        let user_brightness = Arc::clone(&self.user_brightness);
        let stop_flag = Arc::clone(&self.stop_flag);

        self.task = Some(tokio::spawn(async move {
            screen_loop(session, source, settings, user_brightness, stop_flag).await;
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

async fn screen_loop(
    session: Arc<dyn LightSession>,
    mut source: Box<dyn FrameSource>,
    settings: ScreenSettings,
    user_brightness: Arc<AtomicU8>,
    stop_flag: Arc<AtomicBool>,
) {
    let interval = Duration::from_secs_f64(1.0 / settings.refresh_rate as f64);

    tracing::info!(
        "Screen sync started ({} ticks/s)",
        settings.refresh_rate
    );

    let mut current = SmoothedColor::default();

    while !stop_flag.load(Ordering::SeqCst) {
        let frame = match source.grab_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("Screen grab failed, skipping tick: {}", e);
                tokio::time::sleep(interval).await;
                continue;
            }
        };

        let Some(average) = weighted_average_color(&frame, settings.power_factor) else {
            tokio::time::sleep(interval).await;
            continue;
        };

        let target = color_target(average, &settings, user_brightness.load(Ordering::SeqCst));
        current.step_toward(target, settings.smoothing_factor);

        if let Err(e) = session
            .set_color(
                current.hue as u16,
                current.saturation as u8,
                current.brightness as u8,
            )
            .await
        {
            tracing::warn!("Color push failed: {}", e);
        }

        tokio::time::sleep(interval).await;
    }

    tracing::info!("Screen sync stopped");
    drop(source);
}

/// Luminance-weighted average color of a frame, computed on a downsampled
/// copy. Bright pixels dominate; an all-black frame falls back to a
/// uniform average. Returns `None` for malformed pixel data.
fn weighted_average_color(frame: &RgbFrame, power_factor: f32) -> Option<[u8; 3]> {
    let image = RgbImage::from_raw(frame.width, frame.height, frame.data.clone())?;
    let small = image::imageops::resize(&image, SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Lanczos3);

    let pixels: Vec<[f32; 3]> = small
        .pixels()
        .map(|p| [p.0[0] as f32, p.0[1] as f32, p.0[2] as f32])
        .collect();

    let mut weights: Vec<f32> = pixels
        .iter()
        .map(|[r, g, b]| ((r + g + b) / 3.0).powf(power_factor))
        .collect();

    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        let uniform = 1.0 / weights.len() as f32;
        weights.fill(uniform);
    } else {
        for w in &mut weights {
            *w /= total;
        }
    }

    let mut avg = [0.0f32; 3];
    for (pixel, weight) in pixels.iter().zip(&weights) {
        avg[0] += pixel[0] * weight;
        avg[1] += pixel[1] * weight;
        avg[2] += pixel[2] * weight;
    }

    Some(avg.map(|c| c as u8))
}

/// Derives the tick's color target from the averaged frame color.
fn color_target(average: [u8; 3], settings: &ScreenSettings, user_brightness: u8) -> ColorTarget {
    let corrected = apply_gamma_correction(average, settings.gamma_correction);
    let (h, s, v) = rgb_to_hsv(corrected);

    let s = (s * settings.saturation_boost).min(1.0);

    let brightness = (user_brightness as f32 * v).clamp(
        settings.min_brightness as f32,
        settings.max_brightness as f32,
    );

    ColorTarget {
        hue: h * 360.0,
        saturation: (s * 100.0).max(10.0),
        brightness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::testkit::{MockSession, SolidFrameSource};

    fn settings() -> ScreenSettings {
        ScreenSettings::default()
    }

    #[test]
    fn test_average_of_solid_frame_is_that_color() {
        let frame = RgbFrame::solid(64, 64, [200, 40, 40]);
        let avg = weighted_average_color(&frame, 1.8).unwrap();
        assert!(avg[0] >= 198 && avg[0] <= 200, "got {:?}", avg);
        assert!(avg[1] >= 38 && avg[1] <= 42);
        assert!(avg[2] >= 38 && avg[2] <= 42);
    }

    #[test]
    fn test_all_black_frame_uses_uniform_weights() {
        let frame = RgbFrame::solid(32, 32, [0, 0, 0]);
        let avg = weighted_average_color(&frame, 1.8).unwrap();
        assert_eq!(avg, [0, 0, 0]);
    }

    #[test]
    fn test_bright_pixels_dominate_average() {
        // Half dark red, half bright green: luminance weighting should pull
        // the average strongly toward green
        let mut data = Vec::new();
        for i in 0..(64 * 64) {
            if i % 2 == 0 {
                data.extend_from_slice(&[40, 0, 0]);
            } else {
                data.extend_from_slice(&[0, 255, 0]);
            }
        }
        let frame = RgbFrame {
            width: 64,
            height: 64,
            data,
        };
        let avg = weighted_average_color(&frame, 1.8).unwrap();
        assert!(avg[1] > avg[0] * 4, "got {:?}", avg);
    }

    #[test]
    fn test_brightness_stays_within_clamp_bounds() {
        let s = settings();

        // All-black frame: v = 0
        let dark = color_target([0, 0, 0], &s, 100);
        assert_eq!(dark.brightness, s.min_brightness as f32);

        // All-white frame: v = 1, ceiling at max_brightness
        let bright = color_target([255, 255, 255], &s, 100);
        assert_eq!(bright.brightness, s.max_brightness as f32);
    }

    #[test]
    fn test_saturation_has_floor_and_boost_cap() {
        let s = settings();

        // Gray has zero saturation; the floor keeps a hint of color
        let gray = color_target([128, 128, 128], &s, 80);
        assert_eq!(gray.saturation, 10.0);

        // Fully saturated input stays capped at 100 despite the 1.5x boost
        let red = color_target([255, 0, 0], &s, 80);
        assert_eq!(red.saturation, 100.0);
    }

    #[test]
    fn test_user_brightness_scales_target() {
        let s = settings();
        let half = color_target([255, 255, 255], &s, 40);
        assert_eq!(half.brightness, 40.0);
    }

    #[test]
    fn test_smoothing_converges_to_red_without_oscillation() {
        let s = settings(); // smoothing_factor 0.4
        let mut current = SmoothedColor::default();
        let target = color_target([255, 0, 0], &s, 80);
        assert_eq!(target.hue, 0.0);

        let mut prev_distance = f32::MAX;
        for _ in 0..50 {
            current.step_toward(target, s.smoothing_factor);
            // Distance to 0/360 on the circle
            let distance = current.hue.min(360.0 - current.hue);
            assert!(
                distance <= prev_distance + 1e-3,
                "hue moved away from target: {} -> {}",
                prev_distance,
                distance
            );
            prev_distance = distance;
        }

        assert!(prev_distance < 0.5, "hue did not converge: {}", current.hue);
        assert!((current.saturation - target.saturation).abs() < 0.5);
        assert!((current.brightness - target.brightness).abs() < 0.5);
    }

    #[tokio::test]
    async fn test_loop_pushes_every_tick_and_stops_cleanly() {
        let session = Arc::new(MockSession::default());
        let live = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let source = Box::new(SolidFrameSource::tracked([0, 0, 255], Arc::clone(&live)));

        let mut s = settings();
        s.refresh_rate = 100;

        let mut engine = ScreenSyncEngine::new(session.clone(), source, s).unwrap();
        engine.start().await;
        engine.start().await; // no-op
        assert!(engine.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        engine.stop().await;
        assert!(!engine.is_running());
        assert_eq!(live.load(Ordering::SeqCst), 0, "frame source leaked");

        assert!(session.count_color_pushes() >= 2);
    }

    #[tokio::test]
    async fn test_set_user_brightness_applies_on_next_tick() {
        let session = Arc::new(MockSession::default());
        let source = Box::new(SolidFrameSource::new([255, 255, 255]));

        let mut s = settings();
        s.refresh_rate = 200;
        s.smoothing_factor = 1.0; // jump straight to the target

        let mut engine = ScreenSyncEngine::new(session.clone(), source, s).unwrap();
        engine.set_user_brightness(150); // clamped to 100
        engine.start().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        engine.set_user_brightness(20);
        tokio::time::sleep(Duration::from_millis(50)).await;
        engine.stop().await;

        let brightnesses = session.pushed_brightnesses();
        assert!(brightnesses.first().copied().unwrap() >= 70);
        assert!(brightnesses.last().copied().unwrap() <= 20);
    }
}
