//! Inbound record types.

use serde::{Deserialize, Serialize};

/// Store-assigned inbound identifier.
pub type InboundId = i64;

/// Identifier of the administrative user owning an inbound.
pub type OwnerId = i64;

/// Tag the engine uses to address the inbound listening on `port`.
pub fn inbound_tag(port: u16) -> String {
    format!("inbound-{}", port)
}

/// Client-supplied listener definition.
///
/// Everything here is passed through to the store as-is; `settings`,
/// `stream_settings` and `sniffing` are protocol payloads the panel never
/// interprets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InboundSettings {
    pub remark: String,
    pub listen: String,
    pub port: u16,
    pub protocol: String,
    pub settings: String,
    pub stream_settings: String,
    pub sniffing: String,
    pub up: i64,
    pub down: i64,
    pub total: i64,
    pub expiry_time: i64,
}

/// A fully stamped inbound waiting for an id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInbound {
    pub user_id: OwnerId,
    pub enable: bool,
    pub tag: String,
    #[serde(flatten)]
    pub settings: InboundSettings,
}

impl NewInbound {
    /// Stamp client settings with the owner, `enable = true` and the derived tag.
    pub fn stamp(owner: OwnerId, settings: InboundSettings) -> Self {
        Self {
            user_id: owner,
            enable: true,
            tag: inbound_tag(settings.port),
            settings,
        }
    }

    pub fn with_id(self, id: InboundId) -> InboundConfig {
        InboundConfig {
            id,
            user_id: self.user_id,
            enable: self.enable,
            tag: self.tag,
            settings: self.settings,
        }
    }
}

/// One proxy listener definition as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundConfig {
    pub id: InboundId,
    pub user_id: OwnerId,
    pub enable: bool,
    pub tag: String,
    #[serde(flatten)]
    pub settings: InboundSettings,
}

/// Partial update bound onto an existing record.
///
/// `tag` cannot be supplied by clients; the gateway fills it in when the
/// port changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InboundPatch {
    pub remark: Option<String>,
    pub listen: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub settings: Option<String>,
    pub stream_settings: Option<String>,
    pub sniffing: Option<String>,
    pub enable: Option<bool>,
    pub up: Option<i64>,
    pub down: Option<i64>,
    pub total: Option<i64>,
    pub expiry_time: Option<i64>,
    #[serde(skip_deserializing)]
    pub tag: Option<String>,
}

impl InboundPatch {
    /// Apply the present fields onto `record`. Id and owner never change.
    pub fn apply_to(&self, record: &mut InboundConfig) {
        let target = &mut record.settings;
        if let Some(v) = &self.remark {
            target.remark = v.clone();
        }
        if let Some(v) = &self.listen {
            target.listen = v.clone();
        }
        if let Some(v) = self.port {
            target.port = v;
        }
        if let Some(v) = &self.protocol {
            target.protocol = v.clone();
        }
        if let Some(v) = &self.settings {
            target.settings = v.clone();
        }
        if let Some(v) = &self.stream_settings {
            target.stream_settings = v.clone();
        }
        if let Some(v) = &self.sniffing {
            target.sniffing = v.clone();
        }
        if let Some(v) = self.up {
            target.up = v;
        }
        if let Some(v) = self.down {
            target.down = v;
        }
        if let Some(v) = self.total {
            target.total = v;
        }
        if let Some(v) = self.expiry_time {
            target.expiry_time = v;
        }
        if let Some(v) = self.enable {
            record.enable = v;
        }
        if let Some(v) = &self.tag {
            record.tag = v.clone();
        }
    }
}
