//! nodemend.toml configuration parser.
//!
//! Every field has a default so the daemon runs without a config file.
//! Notification credentials may also come from the environment.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration::parse_duration;
use crate::table::RemediationTable;

pub const ENV_TELEGRAM_TOKEN: &str = "NODEMEND_TELEGRAM_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "NODEMEND_TELEGRAM_CHAT_ID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for {field}: {value:?}")]
    Duration { field: &'static str, value: String },

    #[error("compose ports starting at {base} with {slots} slots overflow the port space")]
    PortRange { base: i64, slots: u32 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodemendConfig {
    pub api: ApiConfig,
    pub remediation: RemediationConfig,
    pub notify: NotifyConfig,
    pub state: StateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Node listing endpoint; queried with `page`, `size` and `search`.
    pub endpoint: String,
    pub page_size: u32,
    pub request_timeout: String,
    /// Extra request headers sent with every fetch.
    pub headers: BTreeMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let headers = [
            ("Accept", "application/json, text/plain, */*"),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Referer", "https://nodes.oceanprotocol.com/"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            endpoint: "https://incentive-backend.oceanprotocol.com/nodes".to_string(),
            page_size: 10,
            request_timeout: "30s".to_string(),
            headers,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemediationConfig {
    /// Compose file name; `{index}` is replaced by the slot index.
    pub descriptor_template: String,
    pub compose_base_port: i64,
    pub compose_slots: u32,
    pub named_service_port: i64,
    /// Container restarted for the named-service port.
    pub named_service: String,
    /// Program and leading args for compose invocations.
    pub compose_command: Vec<String>,
    /// Program and leading args for the named-service restart.
    pub restart_command: Vec<String>,
    pub phase_timeout: String,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            descriptor_template: "docker-compose{index}.yaml".to_string(),
            compose_base_port: 3001,
            compose_slots: 5,
            named_service_port: 9000,
            named_service: "ocean-node".to_string(),
            compose_command: vec!["sudo".to_string(), "docker-compose".to_string()],
            restart_command: vec!["docker".to_string(), "restart".to_string()],
            phase_timeout: "5m".to_string(),
        }
    }
}

impl RemediationConfig {
    pub fn descriptor_name(&self, index: u32) -> String {
        self.descriptor_template.replace("{index}", &index.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotifyConfig {
    /// First line of every alert.
    pub title: String,
    /// Offset applied when rendering check times in alerts.
    pub utc_offset_hours: i32,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            title: "NODE FLEET".to_string(),
            utc_offset_hours: 7,
            telegram_token: None,
            telegram_chat_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StateConfig {
    pub file_name: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            file_name: "nodes_data.json".to_string(),
        }
    }
}

impl NodemendConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: NodemendConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Fill notification credentials from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Fill notification credentials from `lookup`; non-empty values win
    /// over the file.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup(ENV_TELEGRAM_TOKEN).filter(|v| !v.is_empty()) {
            self.notify.telegram_token = Some(token);
        }
        if let Some(chat_id) = lookup(ENV_TELEGRAM_CHAT_ID).filter(|v| !v.is_empty()) {
            self.notify.telegram_chat_id = Some(chat_id);
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.request_timeout()?;
        self.phase_timeout()?;
        let remediation = &self.remediation;
        if remediation
            .compose_base_port
            .checked_add(i64::from(remediation.compose_slots))
            .is_none()
        {
            return Err(ConfigError::PortRange {
                base: remediation.compose_base_port,
                slots: remediation.compose_slots,
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.api.request_timeout).ok_or_else(|| ConfigError::Duration {
            field: "api.request_timeout",
            value: self.api.request_timeout.clone(),
        })
    }

    pub fn phase_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.remediation.phase_timeout).ok_or_else(|| ConfigError::Duration {
            field: "remediation.phase_timeout",
            value: self.remediation.phase_timeout.clone(),
        })
    }

    pub fn remediation_table(&self) -> RemediationTable {
        RemediationTable::from_config(&self.remediation)
    }
}
