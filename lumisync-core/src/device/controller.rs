//! Tapo L530 session management.

use async_trait::async_trait;
use tapo::{ApiClient, ColorLightHandler};
use tokio::sync::Mutex;

use crate::device::LightSession;
use crate::error::{Error, Result};

/// Controller holding at most one authenticated L530 handler.
///
/// The handler is created on `connect` and reused across mode switches
/// until a connect to a different address replaces it.
pub struct TapoController {
    email: String,
    password: String,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    handler: Option<ColorLightHandler>,
    address: Option<String>,
}

impl TapoController {
    /// Creates a controller for the given Tapo account. No network traffic
    /// happens until `connect`.
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Returns the address of the current session, if any.
    pub async fn address(&self) -> Option<String> {
        self.inner.lock().await.address.clone()
    }
}

#[async_trait]
impl LightSession for TapoController {
    async fn connect(&self, address: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.handler.is_some() && inner.address.as_deref() == Some(address) {
            return Ok(());
        }

        tracing::info!("Connecting to Tapo device at {}", address);
        let client = ApiClient::new(self.email.clone(), self.password.clone());
        let handler = client.l530(address).await?;

        inner.handler = Some(handler);
        inner.address = Some(address.to_string());
        Ok(())
    }

    async fn power_on(&self) -> Result<()> {
        let inner = self.inner.lock().await;
        let handler = inner.handler.as_ref().ok_or(Error::DeviceNotConnected)?;
        handler.on().await?;
        Ok(())
    }

    async fn power_off(&self) -> Result<()> {
        let inner = self.inner.lock().await;
        let Some(handler) = inner.handler.as_ref() else {
            return Ok(());
        };
        handler.off().await?;
        Ok(())
    }

    async fn set_color(&self, hue: u16, saturation: u8, brightness: u8) -> Result<()> {
        let inner = self.inner.lock().await;
        let handler = inner.handler.as_ref().ok_or(Error::DeviceNotConnected)?;

        // The Tapo API rejects zero values: hue is 1-360, saturation and
        // brightness are 1-100.
        let hue = if hue == 0 { 360 } else { hue.min(360) };
        let saturation = saturation.clamp(1, 100);
        let brightness = brightness.clamp(1, 100);

        handler.set_hue_saturation(hue, saturation).await?;
        handler.set_brightness(brightness).await?;
        Ok(())
    }
}
