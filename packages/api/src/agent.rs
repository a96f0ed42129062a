//! Local agent types: `/v1/agent/...`.
//!
//! These describe the agent the client is talking to: its gossip members,
//! locally registered services and checks, and the registrations sent to it.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The agent's self-description, keyed by section (`Config`, `Member`, ...).
///
/// Kept loosely typed: sections vary between agent versions and only
/// `Config.NodeName` is read by the client.
pub type AgentSelf = HashMap<String, HashMap<String, serde_json::Value>>;

/// Health state of a check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Passing,
    Warning,
    Critical,
    Maintenance,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Passing => "passing",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
            HealthStatus::Maintenance => "maintenance",
        }
    }
}

/// Target state for a TTL check update.
///
/// Each state has two spellings: the status written by
/// `/v1/agent/check/update/{id}` and the legacy path segment used by
/// `/v1/agent/check/{pass|warn|fail}/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    Pass,
    Warn,
    Critical,
}

impl TtlStatus {
    pub fn status(self) -> HealthStatus {
        match self {
            TtlStatus::Pass => HealthStatus::Passing,
            TtlStatus::Warn => HealthStatus::Warning,
            TtlStatus::Critical => HealthStatus::Critical,
        }
    }

    pub fn legacy_segment(self) -> &'static str {
        match self {
            TtlStatus::Pass => "pass",
            TtlStatus::Warn => "warn",
            TtlStatus::Critical => "fail",
        }
    }
}

/// Body of `PUT /v1/agent/check/update/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CheckUpdate {
    pub status: HealthStatus,
    #[serde(default)]
    pub output: String,
}

/// Minimum severity streamed by `GET /v1/agent/monitor`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Trace,
    Debug,
    Warn,
    Err,
}

impl LogLevel {
    /// The `loglevel` query parameter value.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Warn => "warn",
            LogLevel::Err => "err",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "warn" => Ok(LogLevel::Warn),
            "err" | "error" => Ok(LogLevel::Err),
            other => Err(format!("unknown log level {other:?}")),
        }
    }
}

/// A check known to the local agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct AgentCheck {
    #[serde(default)]
    pub node: String,
    #[serde(rename = "CheckID")]
    pub check_id: String,
    #[serde(default)]
    pub name: String,
    pub status: HealthStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub output: String,
    #[serde(rename = "ServiceID", default)]
    pub service_id: String,
    #[serde(default)]
    pub service_name: String,
}

/// A service registered with the local agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,
    pub service: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub enable_tag_override: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, String>>,
}

/// A gossip pool member as seen by the agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct AgentMember {
    pub name: String,
    pub addr: String,
    pub port: u16,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub protocol_min: u8,
    #[serde(default)]
    pub protocol_max: u8,
    #[serde(default)]
    pub protocol_cur: u8,
    #[serde(default)]
    pub delegate_min: u8,
    #[serde(default)]
    pub delegate_max: u8,
    #[serde(default)]
    pub delegate_cur: u8,
}

/// A check definition attached to a service registration.
///
/// Exactly one of `script`, `http`, `tcp`, `ttl` or `docker_container_id`
/// is normally set; the agent validates the combination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct AgentServiceCheck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    #[serde(rename = "DockerContainerID", default, skip_serializing_if = "Option::is_none")]
    pub docker_container_id: Option<String>,

    /// Only meaningful for Docker checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    #[serde(default, with = "crate::duration::option", skip_serializing_if = "Option::is_none")]
    pub interval: Option<Duration>,

    #[serde(default, with = "crate::duration::option", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    #[serde(
        rename = "TTL",
        default,
        with = "crate::duration::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub ttl: Option<Duration>,

    #[serde(rename = "HTTP", default, skip_serializing_if = "Option::is_none")]
    pub http: Option<String>,

    #[serde(rename = "TCP", default, skip_serializing_if = "Option::is_none")]
    pub tcp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<HealthStatus>,

    #[serde(rename = "TLSSkipVerify", default)]
    pub tls_skip_verify: bool,

    /// Deregister the owning service after the check has been critical this long.
    #[serde(default, with = "crate::duration::option", skip_serializing_if = "Option::is_none")]
    pub deregister_critical_service_after: Option<Duration>,
}

/// Body of `PUT /v1/agent/service/register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct AgentServiceRegistration {
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default)]
    pub enable_tag_override: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<AgentServiceCheck>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<AgentServiceCheck>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, String>>,
}

/// Body of `PUT /v1/agent/check/register`: a standalone check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct AgentCheckRegistration {
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(rename = "ServiceID", default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,

    #[serde(flatten)]
    pub check: AgentServiceCheck,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_durations_use_go_format() {
        let check = AgentServiceCheck {
            http: Some("http://localhost:8080/health".into()),
            interval: Some(Duration::from_secs(10)),
            ttl: None,
            deregister_critical_service_after: Some(Duration::from_secs(90)),
            ..Default::default()
        };
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["Interval"], "10s");
        assert_eq!(json["DeregisterCriticalServiceAfter"], "1m30s");
        assert!(json.get("TTL").is_none());
        assert!(json.get("Script").is_none());
    }

    #[test]
    fn check_registration_flattens_definition() {
        let reg = AgentCheckRegistration {
            name: "mem".into(),
            check: AgentServiceCheck {
                ttl: Some(Duration::from_secs(15)),
                ..Default::default()
            },
            ..Default::default()
        };
        let json = serde_json::to_value(&reg).unwrap();
        assert_eq!(json["Name"], "mem");
        assert_eq!(json["TTL"], "15s");
    }

    #[test]
    fn ttl_status_spellings() {
        assert_eq!(TtlStatus::Critical.legacy_segment(), "fail");
        assert_eq!(TtlStatus::Critical.status(), HealthStatus::Critical);
        assert_eq!(
            serde_json::to_string(&TtlStatus::Warn.status()).unwrap(),
            "\"warning\""
        );
    }

    #[test]
    fn log_level_parses_case_insensitively() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("error".parse::<LogLevel>(), Ok(LogLevel::Err));
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
