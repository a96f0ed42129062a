//! Client configuration, optionally populated from environment variables.

use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

/// Default agent address.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:8500";

/// Default transport timeout for non-blocking requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Credentials sent as HTTP basic auth on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

impl BasicAuth {
    /// Parse `user` or `user:password`.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((user, pass)) => Self {
                username: user.to_string(),
                password: Some(pass.to_string()),
            },
            None => Self {
                username: raw.to_string(),
                password: None,
            },
        }
    }
}

/// Settings shared read-only by every request a client makes.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `CONSUL_HTTP_ADDR` | `127.0.0.1:8500` | `host[:port]` or a full URL |
/// | `CONSUL_HTTP_SSL` | `false` | `1`/`true` switches the scheme to https |
/// | `CONSUL_HTTP_SSL_VERIFY` | `true` | `0`/`false` disables certificate verification |
/// | `CONSUL_HTTP_AUTH` | (absent) | `user[:password]` for HTTP basic auth |
/// | `CONSUL_HTTP_TOKEN` | (absent) | Default ACL token |
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the agent, without the `/v1` prefix.
    pub address: Url,

    /// Datacenter sent as `dc` unless a request overrides it.
    pub datacenter: Option<String>,

    /// ACL token used when a request carries none of its own.
    pub token: Option<String>,

    /// Wait time for blocking queries that set an index but no wait of their own.
    pub wait_time: Option<Duration>,

    /// Transport timeout. Blocking reads extend it to cover their wait.
    pub timeout: Duration,

    pub basic_auth: Option<BasicAuth>,

    /// Verify the agent's TLS certificate. Only relevant for https addresses.
    pub verify_tls: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            datacenter: None,
            token: None,
            wait_time: None,
            timeout: DEFAULT_TIMEOUT,
            basic_auth: None,
            verify_tls: true,
        }
    }
}

fn default_address() -> Url {
    Url::parse(DEFAULT_ADDRESS).unwrap_or_else(|_| unreachable!("default address is a valid URL"))
}

impl ClientConfig {
    /// Defaults overridden by the `CONSUL_HTTP_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(addr) = var("CONSUL_HTTP_ADDR") {
            config.address = parse_address(&addr)?;
        }

        if let Some(ssl) = var("CONSUL_HTTP_SSL") {
            if parse_flag("CONSUL_HTTP_SSL", &ssl)? {
                config.address = with_scheme(config.address, "https")?;
            }
        }

        if let Some(verify) = var("CONSUL_HTTP_SSL_VERIFY") {
            config.verify_tls = parse_flag("CONSUL_HTTP_SSL_VERIFY", &verify)?;
        }

        config.basic_auth = var("CONSUL_HTTP_AUTH").map(|raw| BasicAuth::parse(&raw));
        config.token = var("CONSUL_HTTP_TOKEN");

        Ok(config)
    }

    pub fn with_address(mut self, addr: &str) -> Result<Self, ConfigError> {
        self.address = parse_address(addr)?;
        Ok(self)
    }

    pub fn with_datacenter(mut self, dc: impl Into<String>) -> Self {
        self.datacenter = Some(dc.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_wait_time(mut self, wait: Duration) -> Self {
        self.wait_time = Some(wait);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_basic_auth(mut self, auth: BasicAuth) -> Self {
        self.basic_auth = Some(auth);
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }
}

/// Accepts `host`, `host:port`, or an absolute `http(s)://` URL.
fn parse_address(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    if raw.contains("://") {
        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidAddress {
            value: raw.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidAddress {
                value: raw.to_string(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }
        return Ok(url);
    }

    let (host, port) = match raw.split_once(':') {
        Some((host, port)) => (host.trim(), Some(port.trim())),
        None => (raw, None),
    };

    let mut url = default_address();
    if !host.is_empty() {
        url.set_host(Some(host))
            .map_err(|e| ConfigError::InvalidAddress {
                value: raw.to_string(),
                reason: e.to_string(),
            })?;
    }
    if let Some(port) = port.filter(|p| !p.is_empty()) {
        let port: u16 = port.parse().map_err(|_| ConfigError::InvalidPort {
            value: raw.to_string(),
        })?;
        url.set_port(Some(port))
            .map_err(|()| ConfigError::InvalidPort {
                value: raw.to_string(),
            })?;
    }
    Ok(url)
}

fn with_scheme(mut url: Url, scheme: &str) -> Result<Url, ConfigError> {
    let value = url.to_string();
    url.set_scheme(scheme).map_err(|()| ConfigError::InvalidAddress {
        value,
        reason: format!("cannot switch scheme to {scheme}"),
    })?;
    Ok(url)
}

fn parse_flag(variable: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            variable,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.address.as_str(), "http://127.0.0.1:8500/");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.verify_tls);
        assert!(config.token.is_none());
        assert!(config.basic_auth.is_none());
    }

    #[test]
    fn host_and_port_override_address() {
        let config = config_from(&[("CONSUL_HTTP_ADDR", "consul.local:9500")]).unwrap();
        assert_eq!(config.address.host_str(), Some("consul.local"));
        assert_eq!(config.address.port(), Some(9500));

        let config = config_from(&[("CONSUL_HTTP_ADDR", "consul.local")]).unwrap();
        assert_eq!(config.address.port(), Some(8500));
    }

    #[test]
    fn full_url_is_accepted() {
        let config = config_from(&[("CONSUL_HTTP_ADDR", "https://10.0.0.5:8501")]).unwrap();
        assert_eq!(config.address.scheme(), "https");
        assert_eq!(config.address.port(), Some(8501));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = config_from(&[("CONSUL_HTTP_ADDR", "localhost:eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
        let err = config_from(&[("CONSUL_HTTP_ADDR", "localhost:70000")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
    }

    #[test]
    fn ssl_flag_switches_scheme() {
        let config = config_from(&[("CONSUL_HTTP_SSL", "1")]).unwrap();
        assert_eq!(config.address.scheme(), "https");
        assert_eq!(config.address.port(), Some(8500));

        let config = config_from(&[("CONSUL_HTTP_SSL", "false")]).unwrap();
        assert_eq!(config.address.scheme(), "http");

        let err = config_from(&[("CONSUL_HTTP_SSL", "maybe")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidFlag { variable: "CONSUL_HTTP_SSL", .. }
        ));
    }

    #[test]
    fn ssl_verify_can_be_disabled() {
        let config = config_from(&[("CONSUL_HTTP_SSL_VERIFY", "0")]).unwrap();
        assert!(!config.verify_tls);
        let config = config_from(&[("CONSUL_HTTP_SSL_VERIFY", "TRUE")]).unwrap();
        assert!(config.verify_tls);
    }

    #[test]
    fn auth_and_token() {
        let config = config_from(&[
            ("CONSUL_HTTP_AUTH", "ops:s3cret"),
            ("CONSUL_HTTP_TOKEN", "abc-123"),
        ])
        .unwrap();
        assert_eq!(
            config.basic_auth,
            Some(BasicAuth {
                username: "ops".into(),
                password: Some("s3cret".into())
            })
        );
        assert_eq!(config.token.as_deref(), Some("abc-123"));

        let config = config_from(&[("CONSUL_HTTP_AUTH", "ops"), ("CONSUL_HTTP_TOKEN", "  ")]).unwrap();
        assert_eq!(config.basic_auth.unwrap().password, None);
        assert!(config.token.is_none());
    }
}
