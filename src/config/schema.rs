//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the panel.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::inbound::OwnerId;

/// Root configuration for the inbound panel.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PanelConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Administrators allowed to use the admin API.
    pub admin: AdminConfig,

    /// Restart scheduler settings.
    pub scheduler: SchedulerConfig,

    /// External proxy engine process settings.
    pub engine: EngineConfig,

    /// Inbound record storage.
    pub store: StoreConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:54321").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:54321".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// API keys and the owner each one authenticates as.
    pub users: Vec<AdminUser>,
}

/// A single administrator credential.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AdminUser {
    /// Owner id stamped onto every inbound this user creates.
    pub owner_id: OwnerId,

    /// Bearer token.
    pub api_key: String,
}

/// Restart scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between checks of the restart flag.
    pub restart_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            restart_interval_secs: 10,
        }
    }
}

/// Proxy engine process configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable. When unset the panel only renders the config file.
    pub binary: Option<String>,

    /// Arguments passed to the engine. `{config}` is replaced with `config_path`.
    pub args: Vec<String>,

    /// Where the rendered engine configuration is written.
    pub config_path: String,

    /// How long a freshly spawned engine must stay alive to count as started.
    pub startup_grace_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: None,
            args: vec!["-c".to_string(), "{config}".to_string()],
            config_path: "engine-config.json".to_string(),
            startup_grace_ms: 500,
        }
    }
}

/// Inbound store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot file. In-memory only when unset.
    pub path: Option<String>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Admin request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PanelConfig::default();
        assert_eq!(config.scheduler.restart_interval_secs, 10);
        assert!(config.engine.binary.is_none());
        assert!(config.admin.users.is_empty());
        assert!(config.store.path.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config: PanelConfig = toml::from_str(
            r#"
            [scheduler]
            restart_interval_secs = 3

            [[admin.users]]
            owner_id = 1
            api_key = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.restart_interval_secs, 3);
        assert_eq!(config.admin.users.len(), 1);
        assert_eq!(config.admin.users[0].owner_id, 1);
        assert_eq!(config.listener.bind_address, "0.0.0.0:54321");
    }
}
