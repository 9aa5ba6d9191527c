//! Device session and discovery for Tapo color bulbs.

mod controller;
mod discovery;

use async_trait::async_trait;

use crate::error::Result;

pub use controller::TapoController;
pub use discovery::SubnetScanner;

/// A session against a single color light device.
///
/// Both sync engines push colors through this seam; the coordinator uses it
/// for connection and power management around engine start/stop.
#[async_trait]
pub trait LightSession: Send + Sync {
    /// Connects to the device at `address`. A no-op when already connected
    /// to the same address.
    async fn connect(&self, address: &str) -> Result<()>;

    /// Turns the device on. Fails when no session is established.
    async fn power_on(&self) -> Result<()>;

    /// Turns the device off. A no-op when no session is established.
    async fn power_off(&self) -> Result<()>;

    /// Sets hue (0-360), saturation (0-100) and brightness (0-100).
    async fn set_color(&self, hue: u16, saturation: u8, brightness: u8) -> Result<()>;
}

/// Best-effort device discovery.
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// Scans for a reachable device and returns its address, or `None`
    /// when the scan is exhausted.
    async fn find_device(&self) -> Result<Option<String>>;
}
