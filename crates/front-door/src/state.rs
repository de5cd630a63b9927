// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server state management module
//!
//! The only state shared across requests is the immutable configuration
//! loaded at process start; handlers never consult ambient process
//! environment.

use serde::{Deserialize, Serialize};

use crate::{config::ServerConfig, error::ServerResult};

/// Shared application state
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Server configuration
    config: ServerConfig,
}

impl ServerState {
    /// Create new server state
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Perform a health check
    ///
    /// The timestamp is computed fresh on every call.
    pub fn health_check(&self) -> ServerResult<HealthCheck> {
        Ok(HealthCheck {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// Health check response body
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Service status, always `"healthy"` when the service responds
    pub status: String,
    /// Current wall-clock time, RFC 3339
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_check_reports_healthy() {
        let state = ServerState::new(ServerConfig::for_testing());
        let health = state.health_check().expect("health check");

        assert_eq!(health.status, "healthy");
        assert!(chrono::DateTime::parse_from_rfc3339(&health.timestamp).is_ok());
    }

    #[test]
    fn health_check_timestamps_are_non_decreasing() {
        let state = ServerState::new(ServerConfig::for_testing());
        let first = state.health_check().expect("health check");
        let second = state.health_check().expect("health check");

        let first = chrono::DateTime::parse_from_rfc3339(&first.timestamp).expect("timestamp");
        let second = chrono::DateTime::parse_from_rfc3339(&second.timestamp).expect("timestamp");
        assert!(second >= first);
    }
}
