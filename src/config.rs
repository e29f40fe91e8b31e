use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Find the first '=' and split there
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            // Remove surrounding quotes if present
            if (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))
            {
                value = &value[1..value.len() - 1];
            }

            // Only set if not already set (env vars take precedence)
            if std::env::var(key).is_err() {
                // SAFETY: We're single-threaded at this point (called before any async runtime)
                unsafe { std::env::set_var(key, value) };
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    pub device: DeviceEndpointConfig,
    pub poll: PollConfig,
    pub push: PushConfig,
    pub liveness: LivenessConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEndpointConfig {
    /// Base URL of the door station's web server, without trailing slash.
    pub base_url: String,
    /// Timeout for individual API requests (not the event stream).
    pub http_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Period between status requests.
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// How long the event stream may stay silent before it is treated
    /// as dead. The firmware sends no keepalives, so this must be well
    /// above the gap between routine relay_status events.
    pub stall_timeout_ms: u64,
    /// First reconnect delay after the stream drops.
    pub backoff_base_ms: u64,
    /// Upper bound for the reconnect delay.
    pub backoff_max_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessConfig {
    /// Maximum time since the last successful read on any channel before
    /// the connection is considered lost.
    pub staleness_threshold_ms: u64,
    /// How fresh the other channel's last success must be for it to keep
    /// the connection alive when one channel fails.
    pub recency_window_ms: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            device: DeviceEndpointConfig {
                base_url: "http://10.0.0.60:8080".to_string(),
                http_timeout_ms: 5000,
            },
            poll: PollConfig { interval_ms: 2000 },
            push: PushConfig {
                stall_timeout_ms: 15000,
                backoff_base_ms: 1000,
                backoff_max_ms: 30000,
            },
            liveness: LivenessConfig {
                staleness_threshold_ms: 6000,
                recency_window_ms: 2000,
            },
        }
    }
}

impl PanelConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DOORSTATION_URL") {
            config.device.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(timeout) = std::env::var("PANEL_HTTP_TIMEOUT_MS")
            && let Ok(t) = timeout.parse()
        {
            config.device.http_timeout_ms = t;
        }
        if let Ok(interval) = std::env::var("PANEL_POLL_INTERVAL_MS")
            && let Ok(i) = interval.parse()
        {
            config.poll.interval_ms = i;
        }
        if let Ok(stall) = std::env::var("PANEL_PUSH_STALL_TIMEOUT_MS")
            && let Ok(s) = stall.parse()
        {
            config.push.stall_timeout_ms = s;
        }
        if let Ok(base) = std::env::var("PANEL_PUSH_BACKOFF_BASE_MS")
            && let Ok(b) = base.parse()
        {
            config.push.backoff_base_ms = b;
        }
        if let Ok(max) = std::env::var("PANEL_PUSH_BACKOFF_MAX_MS")
            && let Ok(m) = max.parse()
        {
            config.push.backoff_max_ms = m;
        }
        if let Ok(threshold) = std::env::var("PANEL_STALENESS_THRESHOLD_MS")
            && let Ok(t) = threshold.parse()
        {
            config.liveness.staleness_threshold_ms = t;
        }
        if let Ok(window) = std::env::var("PANEL_RECENCY_WINDOW_MS")
            && let Ok(w) = window.parse()
        {
            config.liveness.recency_window_ms = w;
        }

        config
    }
}

impl DeviceEndpointConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl PushConfig {
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }
}

impl LivenessConfig {
    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_millis(self.staleness_threshold_ms)
    }

    pub fn recency_window(&self) -> Duration {
        Duration::from_millis(self.recency_window_ms)
    }
}
