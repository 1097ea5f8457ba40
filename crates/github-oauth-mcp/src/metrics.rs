//! Tool-call metrics and server uptime, surfaced on `/metrics` and `/health`.

use std::collections::BTreeMap;
use std::time::Instant;

use tokio::sync::RwLock;

/// Point-in-time view of the counters.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Total tool calls since startup.
    pub total: u64,
    /// Per-tool call counts.
    pub by_tool: BTreeMap<String, u64>,
}

/// Operational counters shared across transports.
pub struct Metrics {
    started_at: Instant,
    counts: RwLock<BTreeMap<String, u64>>,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self { started_at: Instant::now(), counts: RwLock::new(BTreeMap::new()) }
    }

    /// Increment the call count for a tool.
    pub async fn record(&self, tool_name: &str) {
        let mut counts = self.counts.write().await;
        let count = counts.entry(tool_name.to_string()).or_insert(0);
        *count += 1;
        tracing::debug!(tool = tool_name, count = *count, "Tool call count incremented");
    }

    /// Copy of the current counters.
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let by_tool = self.counts.read().await.clone();
        let total = by_tool.values().sum();
        MetricsSnapshot { total, by_tool }
    }

    /// Seconds since the server started.
    #[must_use]
    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish()
    }
}

/// Current UTC timestamp in ISO-8601 format with a `Z` suffix.
#[must_use]
pub fn utc_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_snapshot() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot().await.total, 0);

        metrics.record("get_github_user_info").await;
        metrics.record("get_github_user_info").await;
        metrics.record("analyze_repository").await;

        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.by_tool["get_github_user_info"], 2);
        assert_eq!(snapshot.by_tool["analyze_repository"], 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let metrics = Metrics::new();
        metrics.record("tool").await;

        let mut snapshot = metrics.snapshot().await;
        snapshot.by_tool.insert("fake".to_string(), 999);

        assert_eq!(metrics.snapshot().await.total, 1);
    }

    #[test]
    fn test_uptime_is_nonnegative() {
        assert!(Metrics::new().uptime_seconds() >= 0.0);
    }

    #[test]
    fn test_timestamp_has_z_suffix() {
        assert!(utc_timestamp().ends_with('Z'));
    }
}
