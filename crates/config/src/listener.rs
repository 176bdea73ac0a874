//! UDP listener configuration

use serde::Deserialize;
use std::time::Duration;

/// UDP listener configuration
///
/// # Example
///
/// ```toml
/// [listener]
/// address = "0.0.0.0"
/// port = 8089
/// read_timeout = "1s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 8089
    pub port: u16,

    /// Read deadline, renewed on every loop iteration
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Receive buffer per datagram (bytes); longer datagrams are truncated
    /// Default: 1024
    pub max_datagram_size: usize,

    /// Kernel socket receive buffer (SO_RCVBUF)
    /// Default: 262144 (256KB)
    pub recv_buffer_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 8089,
            read_timeout: Duration::from_secs(1),
            max_datagram_size: 1024,
            recv_buffer_size: 256 * 1024,
        }
    }
}

impl ListenerConfig {
    /// `address:port` string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
