//! Memory and uptime from `/proc/meminfo` and `/proc/uptime`.

use std::path::Path;

use super::MetricsError;

const MEMINFO_PATH: &str = "/proc/meminfo";
const UPTIME_PATH: &str = "/proc/uptime";

/// Used memory as a whole percentage of total.
pub fn used_percent() -> Result<u8, MetricsError> {
    let content = super::read_proc(Path::new(MEMINFO_PATH))?;
    parse_used_percent(&content)
}

/// Uptime in whole minutes.
pub fn uptime_minutes() -> Result<u64, MetricsError> {
    let content = super::read_proc(Path::new(UPTIME_PATH))?;
    parse_uptime_minutes(&content)
}

/// `MemAvailable` is preferred; older kernels only report `MemFree`.
pub fn parse_used_percent(content: &str) -> Result<u8, MetricsError> {
    let mut total_kb: Option<u64> = None;
    let mut available_kb: Option<u64> = None;
    let mut free_kb: Option<u64> = None;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let slot = match key {
            "MemTotal:" => &mut total_kb,
            "MemAvailable:" => &mut available_kb,
            "MemFree:" => &mut free_kb,
            _ => continue,
        };
        *slot = Some(value.parse().map_err(|_| MetricsError::Parse {
            path: MEMINFO_PATH.into(),
            detail: format!("expected integer kB value, got '{value}'"),
        })?);
    }

    let total = total_kb.filter(|t| *t > 0).ok_or_else(|| MetricsError::Parse {
        path: MEMINFO_PATH.into(),
        detail: "MemTotal not found".into(),
    })?;
    let available = available_kb.or(free_kb).ok_or_else(|| MetricsError::Parse {
        path: MEMINFO_PATH.into(),
        detail: "MemAvailable not found".into(),
    })?;

    let used = total.saturating_sub(available);
    Ok((used as f64 / total as f64 * 100.0).round() as u8)
}

pub fn parse_uptime_minutes(content: &str) -> Result<u64, MetricsError> {
    let secs: f64 = content
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| MetricsError::Parse {
            path: UPTIME_PATH.into(),
            detail: format!("expected seconds, got '{}'", content.trim()),
        })?;
    Ok((secs / 60.0).floor() as u64)
}
