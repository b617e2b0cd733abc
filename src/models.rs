// src/models.rs
use serde::{Deserialize, Serialize};

/// Status assigned to every device at creation. No other status is
/// written anywhere; there is no transition logic.
pub const DEFAULT_STATUS: &str = "Active";

/// A tracked homebrew device.
///
/// `saved_cpn` and `security_key` are sensitive: they are persisted and
/// used to gate edits, but must never reach the table view. Serialized
/// field names are fixed; existing device files use the camel-case
/// `appId`/`savedCPN`/`securityKey` spelling.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Device {
    pub id: u32,
    pub name: String,
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "savedCPN")]
    pub saved_cpn: String,
    #[serde(rename = "securityKey")]
    pub security_key: String,
    pub status: String,
}

/// Non-sensitive projection of a [`Device`], safe to render or print.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DevicePublicView {
    pub id: u32,
    pub name: String,
    #[serde(rename = "appId")]
    pub app_id: String,
    pub status: String,
}

impl Device {
    pub fn public_view(&self) -> DevicePublicView {
        DevicePublicView {
            id: self.id,
            name: self.name.clone(),
            app_id: self.app_id.clone(),
            status: self.status.clone(),
        }
    }
}
