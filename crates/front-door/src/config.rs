// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server configuration module
//!
//! This module provides configuration structures and logic for the front door
//! server, supporting different environments and validation of configuration
//! parameters.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{Result, anyhow};
use axum::http::HeaderValue;
use config::{Config, ConfigError, File};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::{ServerError, ServerResult};

/// A validated server port that ensures the value is appropriate for the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerPort {
    port: u16,
    environment: Environment,
}

impl ServerPort {
    /// Create a new `ServerPort`, ensuring it's valid for the given environment
    ///
    /// # Errors
    ///
    /// Returns an error if the port is 0 in non-testing environments
    pub fn new(port: u16, environment: Environment) -> Result<Self> {
        if port == 0 && environment != Environment::Testing {
            return Err(anyhow!("port cannot be 0 in non-testing environments"));
        }
        Ok(Self { port, environment })
    }

    /// Create a safe default port for development
    pub const fn default_development() -> Self {
        Self {
            port: 3000,
            environment: Environment::Development,
        }
    }

    /// Create a safe testing port (port 0)
    pub const fn testing() -> Self {
        Self {
            port: 0,
            environment: Environment::Testing,
        }
    }

    /// Get the port value
    pub fn value(&self) -> u16 {
        self.port
    }
}

impl<'de> Deserialize<'de> for ServerPort {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let port = u16::deserialize(deserializer)?;
        // We'll validate this during configuration loading when we know the environment
        Ok(Self {
            port,
            environment: Environment::Development, // temporary, will be fixed during load
        })
    }
}

/// A validated CORS origin: either the wildcard `*` or a concrete origin
/// usable as an HTTP header value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorsOrigin(String);

impl CorsOrigin {
    /// Create a new `CorsOrigin`
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is empty or not a valid header value
    pub fn new(origin: impl Into<String>) -> Result<Self> {
        let origin = origin.into();
        if origin == "*" {
            return Ok(Self(origin));
        }
        if origin.is_empty() {
            return Err(anyhow!("CORS origin cannot be empty"));
        }
        HeaderValue::from_str(&origin)
            .map_err(|e| anyhow!("CORS origin is not a valid header value: {e}"))?;
        Ok(Self(origin))
    }

    /// The wildcard origin, allowing any caller
    pub fn wildcard() -> Self {
        Self("*".to_string())
    }

    /// Whether this origin is the wildcard
    pub fn is_wildcard(&self) -> bool {
        self.0 == "*"
    }

    /// Get the configured origin string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The origin as a header value, or `None` for the wildcard
    pub fn header_value(&self) -> Option<HeaderValue> {
        if self.is_wildcard() {
            None
        } else {
            // Construction validated the value
            HeaderValue::from_str(&self.0).ok()
        }
    }
}

impl Default for CorsOrigin {
    fn default() -> Self {
        Self::wildcard()
    }
}

impl<'de> Deserialize<'de> for CorsOrigin {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let origin = String::deserialize(deserializer)?;
        Self::new(origin).map_err(|e| de::Error::custom(e.to_string()))
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Development environment
    Development,
    /// Testing environment
    Testing,
}

impl Environment {
    /// Whether error responses should carry the underlying failure detail
    pub fn verbose_errors(self) -> bool {
        self == Self::Development
    }
}

/// Server configuration for different environments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    pub host: IpAddr,
    /// Server port (validated for environment compatibility)
    pub port: ServerPort,
    /// Origin allowed by the CORS policy
    pub cors_origin: CorsOrigin,
    /// Environment type
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: ServerPort::default_development(),
            cors_origin: CorsOrigin::wildcard(),
            environment: Environment::Development,
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables and optional configuration files
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env() -> ServerResult<Self> {
        Self::load().map_err(|e| ServerError::Config {
            message: format!("failed to load configuration: {e}"),
        })
    }

    /// Load configuration using the config crate with hierarchical sources
    ///
    /// Configuration is loaded in the following order (later sources override
    /// earlier ones):
    /// 1. Default values
    /// 2. Configuration file (config.json)
    /// 3. Environment variables `PORT`, `CORS_ORIGIN` and `ENVIRONMENT`
    ///
    /// A `PORT` value that does not parse as an integer is a load error; the
    /// process refuses to start rather than bind an arbitrary port.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load configuration with an injectable environment lookup
    fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config_builder = Config::builder()
            // Start with default values
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3000)?
            .set_default("cors_origin", "*")?
            .set_default("environment", "development")?
            // Add optional configuration file
            .add_source(File::with_name("config.json").required(false));

        if let Some(port) = env("PORT") {
            config_builder = config_builder.set_override("port", port)?;
        }
        if let Some(origin) = env("CORS_ORIGIN") {
            config_builder = config_builder.set_override("cors_origin", origin)?;
        }
        if let Some(label) = env("ENVIRONMENT") {
            config_builder = config_builder.set_override("environment", label.to_lowercase())?;
        }

        let config = config_builder.build()?;
        let mut server_config: Self = config.try_deserialize()?;

        // Fix the ServerPort to have the correct environment context
        server_config.port = ServerPort::new(server_config.port.value(), server_config.environment)
            .map_err(|e| ConfigError::Message(format!("invalid port configuration: {e}")))?;

        Ok(server_config)
    }

    /// Create configuration optimized for testing
    pub fn for_testing() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::testing(), // let OS choose available port
            cors_origin: CorsOrigin::wildcard(),
            environment: Environment::Testing,
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port.value())
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Testing => write!(f, "testing"),
        }
    }
}
