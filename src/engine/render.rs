//! Rendering of the engine configuration document.

use serde::Serialize;
use serde_json::Value;

use crate::inbound::InboundConfig;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EngineInbound<'a> {
    tag: &'a str,
    listen: Option<&'a str>,
    port: u16,
    protocol: &'a str,
    settings: Value,
    stream_settings: Value,
    sniffing: Value,
}

#[derive(Serialize)]
struct EngineDocument<'a> {
    inbounds: Vec<EngineInbound<'a>>,
}

/// Payload strings are embedded as JSON when they parse, as plain strings
/// otherwise, and omitted (null) when empty.
fn embed(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Render the engine config for `inbounds` as pretty JSON.
pub fn render_config(inbounds: &[InboundConfig]) -> Result<String, serde_json::Error> {
    let document = EngineDocument {
        inbounds: inbounds
            .iter()
            .map(|i| EngineInbound {
                tag: &i.tag,
                listen: Some(i.settings.listen.as_str()).filter(|l| !l.is_empty()),
                port: i.settings.port,
                protocol: &i.settings.protocol,
                settings: embed(&i.settings.settings),
                stream_settings: embed(&i.settings.stream_settings),
                sniffing: embed(&i.settings.sniffing),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::{InboundSettings, NewInbound};

    #[test]
    fn test_render_embeds_payloads() {
        let inbound = NewInbound::stamp(
            1,
            InboundSettings {
                port: 8443,
                protocol: "vless".into(),
                settings: r#"{"clients":[]}"#.into(),
                stream_settings: "not json".into(),
                ..Default::default()
            },
        )
        .with_id(1);

        let rendered = render_config(&[inbound]).unwrap();
        let value: Value = serde_json::from_str(&rendered).unwrap();
        let first = &value["inbounds"][0];
        assert_eq!(first["tag"], "inbound-8443");
        assert_eq!(first["settings"]["clients"], serde_json::json!([]));
        assert_eq!(first["streamSettings"], "not json");
        assert!(first["sniffing"].is_null());
        assert!(first["listen"].is_null());
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = render_config(&[]).unwrap();
        let b = render_config(&[]).unwrap();
        assert_eq!(a, b);
    }
}
