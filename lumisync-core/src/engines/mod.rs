//! Sync engines and the coordinator that manages them.

mod audio;
mod color;
mod coordinator;
mod normalize;
mod screen;

#[cfg(test)]
pub(crate) mod testkit;

pub use audio::AudioSyncEngine;
pub use color::{apply_gamma_correction, lerp, lerp_hue, rgb_to_hsv};
pub use coordinator::{SyncCoordinator, SyncMode};
pub use normalize::BandNormalizer;
pub use screen::ScreenSyncEngine;
