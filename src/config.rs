// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::{Deserialize, Serialize};

use std::{fmt, fs, io, path::Path, time::Duration};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    /// 单个连接的空闲超时（毫秒）
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
    /// 同时服务的连接数上限
    #[serde(default = "default_max_connections")]
    max_connections: usize,
    /// 为 0 时使用 CPU 核心数
    #[serde(default)]
    worker_threads: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_timeout_ms() -> u64 {
    30000 // 30s
}

fn default_max_connections() -> usize {
    100
}

/// 读取或解析配置文件时的错误
#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Toml(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Toml(e) => write!(f, "Invalid config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Toml(e) => Some(e),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Toml(e)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            max_connections: default_max_connections(),
            worker_threads: 0,
        }
    }

    pub fn from_toml(filename: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(filename)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(text)?;
        if config.worker_threads == 0 {
            config.worker_threads = num_cpus::get();
        }
        if config.max_connections == 0 {
            config.max_connections = default_max_connections();
        }
        Ok(config)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }
}

impl Config {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections.max(1)
    }

    /// 工作线程数，未配置时为 CPU 核心数
    pub fn worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get()
        } else {
            self.worker_threads
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(config.port(), 3000);
        assert_eq!(config.timeout_ms(), 30000);
        assert_eq!(config.max_connections(), 100);
        assert_eq!(config.worker_threads(), num_cpus::get());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str("port = 8080\nworker_threads = 2\n").unwrap();
        assert_eq!(config.port(), 8080);
        assert_eq!(config.worker_threads(), 2);
        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_empty_toml() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.port(), 3000);
        assert_eq!(config.worker_threads(), num_cpus::get());
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml_str("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_toml("definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_builders() {
        let config = Config::new().with_port(0).with_timeout_ms(50).with_max_connections(0);
        assert_eq!(config.port(), 0);
        assert_eq!(config.timeout(), Duration::from_millis(50));
        assert_eq!(config.max_connections(), 1);
    }

    #[test]
    fn test_host_name_kept_verbatim() {
        let config = Config::from_toml_str("host = \"localhost\"").unwrap();
        assert_eq!(config.host(), "localhost");
    }
}
