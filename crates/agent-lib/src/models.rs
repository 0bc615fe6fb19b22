//! Core data models for the metrics engine

use serde::{Deserialize, Serialize};

/// Name of the loopback interface, excluded from snapshot network totals
pub const LOOPBACK_INTERFACE: &str = "lo";

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One point-in-time reading of host resource usage
///
/// Percentages are in the 0-100 range. Network counters are cumulative
/// byte totals and never decrease within a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: i64,
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    pub network_rx: u64,
    pub network_tx: u64,
}

impl Snapshot {
    /// Build a snapshot from a live reading, stamping it with `timestamp`
    pub fn from_reading(reading: &MetricsReading, timestamp: i64) -> Self {
        let (network_rx, network_tx) = reading.external_network_totals();

        Self {
            timestamp,
            cpu: reading.cpu.usage,
            memory: reading.memory.usage,
            disk: reading.disk.usage,
            network_rx,
            network_tx,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuReading {
    pub usage: f64,
    #[serde(default)]
    pub cores: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryReading {
    pub usage: f64,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub used_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskReading {
    pub usage: f64,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub used_bytes: u64,
}

/// Cumulative counters for a single network interface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Live metrics as returned by a sampler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReading {
    pub cpu: CpuReading,
    pub memory: MemoryReading,
    pub disk: DiskReading,
    #[serde(default)]
    pub network: Vec<NetworkInterface>,
}

impl MetricsReading {
    /// Received/transmitted bytes summed over every reported interface
    pub fn network_totals(&self) -> (u64, u64) {
        sum_interfaces(self.network.iter())
    }

    /// Received/transmitted bytes summed over all interfaces except loopback
    pub fn external_network_totals(&self) -> (u64, u64) {
        sum_interfaces(
            self.network
                .iter()
                .filter(|iface| iface.name != LOOPBACK_INTERFACE),
        )
    }
}

fn sum_interfaces<'a>(interfaces: impl Iterator<Item = &'a NetworkInterface>) -> (u64, u64) {
    interfaces.fold((0u64, 0u64), |(rx, tx), iface| {
        (
            rx.saturating_add(iface.rx_bytes),
            tx.saturating_add(iface.tx_bytes),
        )
    })
}
