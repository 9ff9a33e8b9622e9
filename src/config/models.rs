// src/config/models.rs
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listener: ListenerConfig,

    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,

    #[serde(default)]
    pub health_check: HealthCheckConfig,

    #[serde(default)]
    pub load_balancer: LoadBalancerAlgorithm,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            backends: default_backends(),
            health_check: HealthCheckConfig::default(),
            load_balancer: LoadBalancerAlgorithm::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.backends.is_empty() {
            bail!("At least one backend must be configured");
        }

        for backend in &self.backends {
            if backend.host.trim().is_empty() {
                bail!("Backend host must not be empty");
            }
            if backend.port == 0 {
                bail!("Backend {} has an invalid port 0", backend.host);
            }
        }

        if self.listener.host.trim().is_empty() {
            bail!("Listener host must not be empty");
        }
        if self.listener.failure_message.is_empty() {
            bail!("Listener failure_message must not be empty");
        }

        if self.health_check.interval_secs == 0 {
            bail!("health_check.interval_secs must be greater than zero");
        }
        if self.health_check.timeout_secs == 0 {
            bail!("health_check.timeout_secs must be greater than zero");
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_listen_host")]
    pub host: String,

    #[serde(default = "default_listen_port")]
    pub port: u16,

    /// Written verbatim to a client whose backend could not be dialed.
    #[serde(default = "default_failure_message")]
    pub failure_message: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: default_listen_host(),
            port: default_listen_port(),
            failure_message: default_failure_message(),
        }
    }
}

impl ListenerConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve listen address {}:{}", self.host, self.port))?
            .next()
            .with_context(|| format!("No address found for {}:{}", self.host, self.port))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
}

impl BackendConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default = "default_health_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_health_timeout")]
    pub timeout_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_health_interval(),
            timeout_secs: default_health_timeout(),
        }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancerAlgorithm {
    #[default]
    RoundRobin,
}

fn default_backends() -> Vec<BackendConfig> {
    (8080..=8083)
        .map(|port| BackendConfig::new("localhost", port))
        .collect()
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    8000
}

fn default_failure_message() -> String {
    "Server is down".to_string()
}

fn default_health_interval() -> u64 {
    60
}

fn default_health_timeout() -> u64 {
    5
}
