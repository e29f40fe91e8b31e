//! JSON bodies and event payloads spoken by the door station firmware.
//!
//! Every type here maps one-to-one onto what the device actually sends;
//! parsing strictness is part of the behavior. `RelayFields` requires
//! both relays so a partial status payload fails to deserialize and is
//! discarded by the caller instead of half-applied.

use serde::{Deserialize, Serialize};

/// Placeholder the firmware substitutes for stored secrets. A submitted
/// password equal to this must be dropped from the request so the device
/// keeps what it has.
pub const MASK_SENTINEL: &str = "********";

/// Relay portion of a status body. Both fields required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayFields {
    pub door: bool,
    pub light: bool,
}

/// Body of `GET /api/status`. The sync layer only consumes `relays`;
/// `system` is carried for display and unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub relays: RelayFields,
    #[serde(default)]
    pub system: Option<String>,
}

/// Envelope of a pushed event payload: `{"type": ..., "data": ...}`.
/// `data` stays untyped until the kind is known.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Event kinds the panel knows about. Everything else is carried as
/// `Unknown` and ignored by the dispatcher, so new firmware event types
/// never break an old panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushKind {
    Connected,
    RelayStatus,
    SystemStatus,
    Unknown(String),
}

impl From<&str> for PushKind {
    fn from(s: &str) -> Self {
        match s {
            "connected" => PushKind::Connected,
            "relay_status" => PushKind::RelayStatus,
            "system_status" => PushKind::SystemStatus,
            other => PushKind::Unknown(other.to_string()),
        }
    }
}

/// Reply to `POST /api/doorbell` and `POST /api/config`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandAck {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CommandAck {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

/// Reply to `POST /api/factory-reset`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetAck {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Device configuration as served by `GET /api/config` and accepted by
/// `POST /api/config`. All fields optional: the firmware applies only
/// what is present, and omitted password fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_ssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sip_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sip_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sip_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sip_callee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door_pulse_duration: Option<u32>,
}

impl DeviceSettings {
    /// Drop password fields that still hold the mask sentinel, so a
    /// round-tripped config form never overwrites a stored secret with
    /// its placeholder.
    pub fn strip_masked(mut self) -> Self {
        if self.wifi_password.as_deref() == Some(MASK_SENTINEL) {
            self.wifi_password = None;
        }
        if self.sip_password.as_deref() == Some(MASK_SENTINEL) {
            self.sip_password = None;
        }
        self
    }
}
