// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP request handlers module
//!
//! Handlers for the two informational endpoints plus the not-found fallback.
//! Handlers read configuration exclusively through [`ServerState`].

use axum::{
    Json,
    extract::State,
    http::{Method, Uri},
};
use serde::{Deserialize, Serialize};

use crate::{
    config::Environment,
    error::{ServerError, ServerResult},
    state::{HealthCheck, ServerState},
};

/// Fixed greeting returned by the root endpoint
const GREETING: &str = "Halo, ini server Express dengan TypeScript!";

/// Root endpoint response body
#[derive(Debug, Serialize, Deserialize)]
pub struct RootInfo {
    /// Fixed greeting message
    pub message: String,
    /// Service status, always `"running"`
    pub status: String,
    /// Configured environment label
    pub environment: Environment,
}

/// Root informational endpoint handler
///
/// Always succeeds with a fixed greeting, a `"running"` status and the
/// configured environment label.
pub async fn root_handler(State(state): State<ServerState>) -> ServerResult<Json<RootInfo>> {
    Ok(Json(RootInfo {
        message: GREETING.to_string(),
        status: "running".to_string(),
        environment: state.config().environment,
    }))
}

/// Health check endpoint handler
pub async fn health_handler(State(state): State<ServerState>) -> ServerResult<Json<HealthCheck>> {
    let health = state.health_check()?;
    Ok(Json(health))
}

/// Fallback handler for every unmatched method and path
pub async fn not_found_handler(method: Method, uri: Uri) -> ServerError {
    ServerError::RouteNotFound {
        method,
        path: uri.path().to_string(),
    }
}
