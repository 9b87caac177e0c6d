//! CPU utilisation from `/proc/stat` tick deltas.
//!
//! The aggregate `cpu` line reports cumulative ticks per state since boot.
//! Utilisation over an interval is derived from two samples: the share of
//! the elapsed ticks that were not idle.

use std::path::Path;
use tokio::sync::Mutex;
use tracing::warn;

use super::MetricsError;

const STAT_PATH: &str = "/proc/stat";

/// Cumulative idle and total ticks at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuSample {
    pub idle: u64,
    pub total: u64,
}

impl CpuSample {
    pub fn read() -> Result<Self, MetricsError> {
        let content = super::read_proc(Path::new(STAT_PATH))?;
        Self::parse(&content)
    }

    /// Parse the aggregate line of `/proc/stat`.
    ///
    /// Idle counts `idle + iowait`; total sums the first eight fields
    /// (guest time is already folded into user).
    pub fn parse(content: &str) -> Result<Self, MetricsError> {
        let line = content
            .lines()
            .find(|l| l.split_whitespace().next() == Some("cpu"))
            .ok_or_else(|| MetricsError::Parse {
                path: STAT_PATH.into(),
                detail: "aggregate cpu line not found".into(),
            })?;

        let fields = line
            .split_whitespace()
            .skip(1)
            .take(8)
            .map(|f| {
                f.parse::<u64>().map_err(|_| MetricsError::Parse {
                    path: STAT_PATH.into(),
                    detail: format!("expected tick count, got '{f}'"),
                })
            })
            .collect::<Result<Vec<u64>, _>>()?;

        if fields.len() < 4 {
            return Err(MetricsError::Parse {
                path: STAT_PATH.into(),
                detail: format!("expected at least 4 cpu fields, got {}", fields.len()),
            });
        }

        let iowait = fields.get(4).copied().unwrap_or(0);
        Ok(Self {
            idle: fields[3] + iowait,
            total: fields.iter().sum(),
        })
    }

    /// Busy percentage between `previous` and `self`, rounded to a whole percent.
    pub fn busy_percent_since(&self, previous: &CpuSample) -> u8 {
        let idle = self.idle.saturating_sub(previous.idle);
        let total = self.total.saturating_sub(previous.total);
        if total == 0 {
            return 0;
        }
        let idle_pct = (idle as f64 / total as f64 * 100.0).round();
        (100.0 - idle_pct).clamp(0.0, 100.0) as u8
    }
}

/// Holds the previous sample so each call reports usage since the last one.
pub struct CpuTracker {
    last: Mutex<CpuSample>,
}

impl CpuTracker {
    /// Capture the baseline sample. If procfs is unreadable the baseline is zero.
    pub fn new() -> Self {
        let baseline = CpuSample::read().unwrap_or_else(|e| {
            warn!("No CPU baseline: {e}");
            CpuSample::default()
        });
        Self::with_baseline(baseline)
    }

    pub fn with_baseline(baseline: CpuSample) -> Self {
        Self {
            last: Mutex::new(baseline),
        }
    }

    /// Read a fresh sample and report usage since the previous call.
    pub async fn utilisation(&self) -> Result<u8, MetricsError> {
        let current = CpuSample::read()?;
        Ok(self.record(current).await)
    }

    /// Report usage between the stored sample and `current`, then store `current`.
    pub async fn record(&self, current: CpuSample) -> u8 {
        let mut last = self.last.lock().await;
        let pct = current.busy_percent_since(&last);
        *last = current;
        pct
    }
}

impl Default for CpuTracker {
    fn default() -> Self {
        Self::new()
    }
}
