//! Coordinator owning the device session and at most one running engine.

use std::sync::Arc;

use crate::capture::CaptureBackend;
use crate::config::{AudioSettings, ScreenSettings};
use crate::device::{DeviceDiscovery, LightSession};
use crate::engines::audio::AudioSyncEngine;
use crate::engines::screen::ScreenSyncEngine;
use crate::error::{Error, Result};

/// Which source currently drives the light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Audio,
    Screen,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Audio => write!(f, "audio"),
            SyncMode::Screen => write!(f, "screen"),
        }
    }
}

/// The single running engine, tagged by mode.
enum ActiveEngine {
    Audio(AudioSyncEngine),
    Screen(ScreenSyncEngine),
}

impl ActiveEngine {
    fn mode(&self) -> SyncMode {
        match self {
            ActiveEngine::Audio(_) => SyncMode::Audio,
            ActiveEngine::Screen(_) => SyncMode::Screen,
        }
    }

    async fn stop(&mut self) {
        match self {
            ActiveEngine::Audio(engine) => engine.stop().await,
            ActiveEngine::Screen(engine) => engine.stop().await,
        }
    }
}

/// Manages the mutually-exclusive engine lifecycle against one device
/// session: every `start` tears down the previous engine first, connects
/// and powers the device, then brings up the requested engine.
pub struct SyncCoordinator {
    session: Arc<dyn LightSession>,
    discovery: Arc<dyn DeviceDiscovery>,
    capture: Arc<dyn CaptureBackend>,
    active: Option<ActiveEngine>,
}

impl SyncCoordinator {
    pub fn new(
        session: Arc<dyn LightSession>,
        discovery: Arc<dyn DeviceDiscovery>,
        capture: Arc<dyn CaptureBackend>,
    ) -> Self {
        Self {
            session,
            discovery,
            capture,
            active: None,
        }
    }

    /// The mode of the currently running engine, if any.
    pub fn active_mode(&self) -> Option<SyncMode> {
        self.active.as_ref().map(ActiveEngine::mode)
    }

    /// Starts sync in `mode`, stopping any running engine first.
    ///
    /// Audio mode requires an explicit `device_ip`. Screen mode falls back
    /// to discovery when no address is given. On any error the coordinator
    /// is left with no active engine.
    pub async fn start(
        &mut self,
        mode: SyncMode,
        device_ip: Option<&str>,
        audio_settings: AudioSettings,
        screen_settings: ScreenSettings,
        screen_brightness: Option<u8>,
    ) -> Result<()> {
        self.stop().await;

        match mode {
            SyncMode::Audio => {
                let ip = device_ip.ok_or(Error::MissingDeviceAddress)?;

                self.session.connect(ip).await?;
                self.session.power_on().await?;

                let source = self.capture.open_audio(&audio_settings)?;
                let mut engine =
                    AudioSyncEngine::new(Arc::clone(&self.session), source, audio_settings)?;
                engine.start().await;
                self.active = Some(ActiveEngine::Audio(engine));
            }
            SyncMode::Screen => {
                let ip = match device_ip {
                    Some(ip) => ip.to_string(),
                    None => self
                        .discovery
                        .find_device()
                        .await?
                        .ok_or(Error::DeviceNotFound)?,
                };

                self.session.connect(&ip).await?;
                self.session.power_on().await?;

                let source = self.capture.open_frames(&screen_settings)?;
                let mut engine =
                    ScreenSyncEngine::new(Arc::clone(&self.session), source, screen_settings)?;
                if let Some(brightness) = screen_brightness {
                    engine.set_user_brightness(brightness);
                }
                engine.start().await;
                self.active = Some(ActiveEngine::Screen(engine));
            }
        }

        tracing::info!("Sync started in {} mode", mode);
        Ok(())
    }

    /// Stops the running engine, if any, and powers the device off.
    /// Power-off failures are logged and swallowed so teardown always
    /// completes.
    pub async fn stop(&mut self) {
        if let Some(mut engine) = self.active.take() {
            tracing::info!("Stopping {} sync", engine.mode());
            engine.stop().await;
        }

        if let Err(e) = self.session.power_off().await {
            tracing::warn!("Power-off failed during stop: {}", e);
        }
    }

    /// Forwards a brightness change to the running screen engine, if any.
    pub fn set_screen_brightness(&self, value: u8) {
        if let Some(ActiveEngine::Screen(engine)) = &self.active {
            engine.set_user_brightness(value);
        }
    }
}
