//! # Starlane
//!
//! Startup helpers shared by the `starlane_server` and `starlane_client`
//! binaries: logging, transport configuration and socket setup.

#![deny(missing_docs)]
#![deny(unsafe_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use starlane_net::{LossyLink, NetworkConditions, TransportConfig, TransportResult, UdpTransport};

/// Game tick rate (updates per second).
pub const TICK_RATE: u32 = 60;

/// Ticks between re-requests of unfilled sequence gaps.
pub const GAP_RETRY_TICKS: u64 = 10;

/// Installs the global `tracing` subscriber.
///
/// Honors `RUST_LOG`; defaults to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

/// Loads the transport configuration, then applies command-line overrides.
///
/// # Errors
///
/// Unreadable or invalid configuration file.
pub fn load_config(path: Option<&Path>, compression: bool) -> TransportResult<TransportConfig> {
    let config = match path {
        Some(path) => TransportConfig::from_toml_file(path)?,
        None => TransportConfig::default(),
    };
    let enabled = config.compression || compression;
    Ok(config.with_compression(enabled))
}

/// Binds a UDP socket, optionally degraded by simulated packet loss.
///
/// # Errors
///
/// The address cannot be bound.
pub fn bind_socket(addr: SocketAddr, loss_percent: u8) -> std::io::Result<LossyLink<UdpTransport>> {
    let socket = UdpTransport::bind(addr)?;
    let conditions = NetworkConditions {
        packet_loss_percent: loss_percent.min(100),
        ..NetworkConditions::PERFECT
    };
    Ok(LossyLink::new(socket, conditions, u64::from(addr.port())))
}

/// Duration of one tick at `tick_rate` Hz.
#[must_use]
pub fn tick_duration(tick_rate: u32) -> Duration {
    Duration::from_secs(1) / tick_rate.max(1)
}
