//! Host metrics sampling through the `sysinfo` crate
//!
//! Reads:
//! - global CPU utilization (delta since the previous sample)
//! - used/total memory
//! - usage of the filesystem mounted at `/`
//! - cumulative per-interface network counters

use super::{async_trait, MetricsSampler};
use crate::models::{CpuReading, DiskReading, MemoryReading, MetricsReading, NetworkInterface};
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};
use sysinfo::{Disk, Disks, Networks, System};
use tracing::debug;

const ROOT_MOUNT_POINT: &str = "/";

struct SamplerState {
    system: System,
    disks: Disks,
    networks: Networks,
}

/// Samples the local host
///
/// `sysinfo` refreshes need `&mut`, so the state sits behind a mutex and each
/// sample runs on the blocking pool.
pub struct SysinfoSampler {
    state: Arc<Mutex<SamplerState>>,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        let mut system = System::new();
        // Prime CPU counters so the first sample has a baseline
        system.refresh_cpu();
        system.refresh_memory();

        Self {
            state: Arc::new(Mutex::new(SamplerState {
                system,
                disks: Disks::new_with_refreshed_list(),
                networks: Networks::new_with_refreshed_list(),
            })),
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSampler for SysinfoSampler {
    async fn sample(&self) -> Result<MetricsReading> {
        let state = Arc::clone(&self.state);

        tokio::task::spawn_blocking(move || -> Result<MetricsReading> {
            let mut guard = state
                .lock()
                .map_err(|e| anyhow!("sampler state lock poisoned: {e}"))?;
            Ok(read_host(&mut guard))
        })
        .await
        .context("Sampling task failed")?
    }
}

fn read_host(state: &mut SamplerState) -> MetricsReading {
    state.system.refresh_cpu();
    state.system.refresh_memory();
    state.disks.refresh();
    state.networks.refresh();

    let cpu = CpuReading {
        usage: round_one_decimal(f64::from(state.system.global_cpu_info().cpu_usage())),
        cores: state.system.cpus().len(),
    };

    let total_memory = state.system.total_memory();
    let used_memory = state.system.used_memory();
    let memory = MemoryReading {
        usage: round_one_decimal(percent(used_memory, total_memory)),
        total_bytes: total_memory,
        used_bytes: used_memory,
    };

    let disk = root_disk(state.disks.list())
        .map(|d| {
            let total = d.total_space();
            let used = total.saturating_sub(d.available_space());
            DiskReading {
                usage: round_one_decimal(percent(used, total)),
                total_bytes: total,
                used_bytes: used,
            }
        })
        .unwrap_or_else(|| {
            debug!("No disks reported, disk usage defaults to zero");
            DiskReading::default()
        });

    let mut network: Vec<NetworkInterface> = state
        .networks
        .iter()
        .map(|(name, data)| NetworkInterface {
            name: name.clone(),
            rx_bytes: data.total_received(),
            tx_bytes: data.total_transmitted(),
        })
        .collect();
    network.sort_by(|a, b| a.name.cmp(&b.name));

    MetricsReading {
        cpu,
        memory,
        disk,
        network,
    }
}

/// The filesystem mounted at `/`, else the largest one reported
fn root_disk(disks: &[Disk]) -> Option<&Disk> {
    disks
        .iter()
        .find(|d| d.mount_point() == Path::new(ROOT_MOUNT_POINT))
        .or_else(|| disks.iter().max_by_key(|d| d.total_space()))
}

fn percent(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64 * 100.0
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
