//! Shared runtime state for qlab-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. Everything here is
//! immutable after boot; each `/stream` request owns its own counter.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// StreamSettings
// ---------------------------------------------------------------------------

pub const DEFAULT_TICKS: u32 = 10;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Pacing for `GET /stream`: `ticks` chunks, `interval` apart.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StreamSettings {
    ticks: u32,
    interval: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            ticks: DEFAULT_TICKS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl StreamSettings {
    /// `interval` must be non-zero; `ticks` may be zero (empty stream).
    pub fn new(ticks: u32, interval: Duration) -> Result<Self, SettingsError> {
        if interval.is_zero() {
            return Err(SettingsError::ZeroInterval);
        }
        Ok(Self { ticks, interval })
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Read `/stream/ticks` and `/stream/interval_ms`; absent keys default.
    pub fn from_config_json(cfg: &Value) -> Result<Self, SettingsError> {
        let ticks = match cfg.pointer("/stream/ticks") {
            None | Some(Value::Null) => DEFAULT_TICKS,
            Some(v) => v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| SettingsError::NotAnInteger {
                    key: "stream.ticks",
                    found: v.to_string(),
                })?,
        };

        let interval = match cfg.pointer("/stream/interval_ms") {
            None | Some(Value::Null) => DEFAULT_INTERVAL,
            Some(v) => v
                .as_u64()
                .map(Duration::from_millis)
                .ok_or_else(|| SettingsError::NotAnInteger {
                    key: "stream.interval_ms",
                    found: v.to_string(),
                })?,
        };

        Self::new(ticks, interval)
    }
}

/// Read `/daemon/addr`. `Ok(None)` when the key is absent.
pub fn daemon_addr_from_config(cfg: &Value) -> Result<Option<SocketAddr>, SettingsError> {
    let Some(v) = cfg.pointer("/daemon/addr") else {
        return Ok(None);
    };
    let raw = v.as_str().ok_or_else(|| SettingsError::InvalidAddr {
        value: v.to_string(),
    })?;
    raw.parse()
        .map(Some)
        .map_err(|_| SettingsError::InvalidAddr {
            value: raw.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Invalid daemon settings read from config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingsError {
    /// Key present but not a non-negative integer in range.
    NotAnInteger { key: &'static str, found: String },
    /// `stream.interval_ms` is zero.
    ZeroInterval,
    /// `daemon.addr` is not a `host:port` socket address.
    InvalidAddr { value: String },
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnInteger { key, found } => {
                write!(f, "{key} must be a non-negative integer (got {found})")
            }
            Self::ZeroInterval => write!(f, "stream.interval_ms must be greater than zero"),
            Self::InvalidAddr { value } => {
                write!(f, "daemon.addr must be a socket address like 127.0.0.1:8000 (got {value})")
            }
        }
    }
}

impl std::error::Error for SettingsError {}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Handle shared (via `Arc`) across all Axum handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Static build metadata.
    pub build: BuildInfo,
    /// Pacing for `/stream`.
    pub stream: StreamSettings,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_stream(StreamSettings::default())
    }

    pub fn with_stream(stream: StreamSettings) -> Self {
        Self {
            build: BuildInfo {
                service: "qlab-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            stream,
        }
    }

    pub fn from_config_json(cfg: &Value) -> Result<Self, SettingsError> {
        Ok(Self::with_stream(StreamSettings::from_config_json(cfg)?))
    }
}
