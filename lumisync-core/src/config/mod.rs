//! Configuration types and loading for lumisync.

mod loader;
mod types;

pub use loader::{env_device_ip, load_settings, load_settings_or_default};
pub use types::{AudioSettings, Credentials, ScreenSettings, SyncSettings};
