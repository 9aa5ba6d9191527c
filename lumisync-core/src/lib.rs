//! Lumisync Core - drives a Tapo color bulb from live audio or screen content.
//!
//! This library provides:
//! - Audio sync engine: FFT band energies with adaptive normalization
//! - Screen sync engine: weighted average screen color with smoothing
//! - Sync coordinator managing the two engines and the device session
//! - Tapo L530 device client and subnet discovery
//! - cpal/xcap capture backends behind async trait seams
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lumisync_core::capture::SystemCaptureBackend;
//! use lumisync_core::config::{Credentials, SyncSettings};
//! use lumisync_core::device::{SubnetScanner, TapoController};
//! use lumisync_core::engines::{SyncCoordinator, SyncMode};
//!
//! # async fn run() -> lumisync_core::Result<()> {
//! let creds = Credentials::from_env()?;
//! let settings = SyncSettings::default();
//!
//! let session = Arc::new(TapoController::new(&creds.email, &creds.password));
//! let discovery = Arc::new(SubnetScanner::new(&creds.email, &creds.password));
//! let capture = Arc::new(SystemCaptureBackend);
//!
//! let mut coordinator = SyncCoordinator::new(session, discovery, capture);
//! coordinator
//!     .start(SyncMode::Screen, None, settings.audio, settings.screen, Some(80))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod device;
pub mod engines;
pub mod error;

pub use error::{Error, Result};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::capture::{AudioSource, CaptureBackend, FrameSource, RgbFrame, SystemCaptureBackend};
    pub use crate::config::{AudioSettings, Credentials, ScreenSettings, SyncSettings};
    pub use crate::device::{DeviceDiscovery, LightSession, SubnetScanner, TapoController};
    pub use crate::engines::{AudioSyncEngine, ScreenSyncEngine, SyncCoordinator, SyncMode};
    pub use crate::error::{Error, Result};
}
