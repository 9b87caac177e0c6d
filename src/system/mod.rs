//! Host metrics for the system widget, plus the power button.

pub mod cpu;
pub mod memory;
pub mod power;

pub use cpu::{CpuSample, CpuTracker};

use serde::Serialize;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {detail}")]
    Parse { path: String, detail: String },
}

/// Payload of `GET /system`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemReport {
    /// CPU busy percentage since the previous report.
    pub cpu: u8,
    /// Used memory percentage.
    pub memory: u8,
    /// Uptime in minutes.
    pub uptime: u64,
}

impl SystemReport {
    pub async fn collect(cpu: &CpuTracker) -> Result<Self, MetricsError> {
        Ok(Self {
            cpu: cpu.utilisation().await?,
            memory: memory::used_percent()?,
            uptime: memory::uptime_minutes()?,
        })
    }
}

fn read_proc(path: &Path) -> Result<String, MetricsError> {
    std::fs::read_to_string(path).map_err(|e| MetricsError::Read {
        path: path.display().to_string(),
        source: e,
    })
}
