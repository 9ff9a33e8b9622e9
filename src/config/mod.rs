// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config = parse_config(&contents, is_yaml(path))?;
    config.validate()?;
    Ok(config)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn parse_config(contents: &str, yaml: bool) -> Result<Config> {
    let config = if yaml {
        serde_yaml::from_str(contents).context("Failed to parse YAML config")?
    } else {
        serde_json::from_str(contents).context("Failed to parse JSON config")?
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_with_defaults() {
        let yaml = r#"
listener:
  port: 9000
backends:
  - host: 127.0.0.1
    port: 9001
  - host: 127.0.0.1
    port: 9002
"#;
        let config = parse_config(yaml, true).unwrap();
        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.listener.host, "0.0.0.0");
        assert_eq!(config.listener.failure_message, "Server is down");
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.health_check.interval_secs, 60);
        assert_eq!(config.health_check.timeout_secs, 5);
        assert_eq!(config.load_balancer, LoadBalancerAlgorithm::RoundRobin);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "backends": [{ "host": "localhost", "port": 8080 }],
            "health_check": { "interval_secs": 10, "timeout_secs": 2 },
            "load_balancer": "round_robin"
        }"#;
        let config = parse_config(json, false).unwrap();
        assert_eq!(config.listener.port, 8000);
        assert_eq!(config.health_check.interval().as_secs(), 10);
        assert_eq!(config.health_check.timeout().as_secs(), 2);
    }

    #[test]
    fn test_is_yaml_extension() {
        assert!(is_yaml(Path::new("config.yaml")));
        assert!(is_yaml(Path::new("config.yml")));
        assert!(!is_yaml(Path::new("config.json")));
        assert!(!is_yaml(Path::new("config")));
    }

    #[tokio::test]
    async fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/lb-config.yaml").await.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
