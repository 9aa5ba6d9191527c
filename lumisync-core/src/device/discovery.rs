//! Subnet scan discovery for Tapo devices.

use std::time::Duration;

use async_trait::async_trait;
use tapo::ApiClient;

use crate::device::DeviceDiscovery;
use crate::error::Result;

/// Sequentially probes a /24 subnet for a reachable Tapo color light.
pub struct SubnetScanner {
    email: String,
    password: String,
    scan_base: String,
    start: u8,
    end: u8,
    per_host_timeout: Duration,
}

impl SubnetScanner {
    /// Creates a scanner over the default home subnet 192.168.1.1-254.
    pub fn new(email: &str, password: &str) -> Self {
        Self::with_range(email, password, "192.168.1", 1, 254)
    }

    /// Creates a scanner over `scan_base.start` through `scan_base.end`.
    pub fn with_range(email: &str, password: &str, scan_base: &str, start: u8, end: u8) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            scan_base: scan_base.to_string(),
            start,
            end,
            per_host_timeout: Duration::from_secs(2),
        }
    }

    async fn probe(&self, ip: &str) -> bool {
        let client = ApiClient::new(self.email.clone(), self.password.clone());
        match client.l530(ip).await {
            Ok(handler) => handler.get_device_info().await.is_ok(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl DeviceDiscovery for SubnetScanner {
    async fn find_device(&self) -> Result<Option<String>> {
        tracing::info!(
            "Scanning {}.{}-{} for a Tapo device",
            self.scan_base,
            self.start,
            self.end
        );

        for host in self.start..=self.end {
            let ip = format!("{}.{}", self.scan_base, host);
            tracing::trace!("Probing {}", ip);

            let found = tokio::time::timeout(self.per_host_timeout, self.probe(&ip))
                .await
                .unwrap_or(false);

            if found {
                tracing::info!("Found Tapo device at {}", ip);
                return Ok(Some(ip));
            }
        }

        tracing::warn!("Subnet scan exhausted without finding a device");
        Ok(None)
    }
}
