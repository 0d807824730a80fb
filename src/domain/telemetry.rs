//! PZEM power-meter entities as served by the external API.
//!
//! Device status and the reset flag are owned upstream; nothing here derives
//! them from sample age.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PzemData {
    pub id: String,
    pub device_id: String,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub energy: f64,
    pub frequency: f64,
    pub power_factor: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PzemLog {
    pub id: String,
    pub device_id: String,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub energy: f64,
    pub frequency: f64,
    pub power_factor: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PzemDevice {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    pub status: DeviceStatus,
    pub is_active: bool,
    #[serde(default)]
    pub should_reset: bool,
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub latest_data: Option<PzemData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PzemRealtimeResponse {
    pub device_id: String,
    pub name: String,
    pub status: DeviceStatus,
    pub is_active: bool,
    pub should_reset: bool,
    pub data: Option<PzemData>,
    pub last_update: Option<DateTime<Utc>>,
}

impl PzemRealtimeResponse {
    pub fn from_device(device: PzemDevice) -> Self {
        let last_update = device
            .latest_data
            .as_ref()
            .map(|data| data.created_at)
            .or(device.last_seen_at);

        Self {
            device_id: device.id,
            name: device.name,
            status: device.status,
            is_active: device.is_active,
            should_reset: device.should_reset,
            data: device.latest_data,
            last_update,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PzemWebSocketData {
    pub device_id: String,
    pub status: DeviceStatus,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub power: Option<f64>,
    pub energy: Option<f64>,
    pub frequency: Option<f64>,
    pub power_factor: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<&PzemRealtimeResponse> for PzemWebSocketData {
    fn from(realtime: &PzemRealtimeResponse) -> Self {
        let data = realtime.data.as_ref();
        Self {
            device_id: realtime.device_id.clone(),
            status: realtime.status,
            voltage: data.map(|d| d.voltage),
            current: data.map(|d| d.current),
            power: data.map(|d| d.power),
            energy: data.map(|d| d.energy),
            frequency: data.map(|d| d.frequency),
            power_factor: data.map(|d| d.power_factor),
            timestamp: realtime.last_update,
        }
    }
}
