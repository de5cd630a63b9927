// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error handling module
//!
//! This module provides error types for server operations, including proper
//! HTTP response mapping. Every in-request failure is converted into a JSON
//! envelope here; nothing is retried and no request failure crashes the
//! process.

use std::net::SocketAddr;

use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::config::Environment;

/// Generic message returned for failures outside the development environment
const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong";

/// Error types for server operations
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Network binding errors
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Socket address that failed to bind
        address: SocketAddr,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server startup errors
    #[error("Server startup failed: {source}")]
    Startup {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Errors while serving connections
    #[error("Server failed while serving: {source}")]
    Serve {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// No registered handler matched the request
    #[error("Route {method} {path} not found")]
    RouteNotFound {
        /// Requested HTTP method
        method: Method,
        /// Requested path
        path: String,
    },

    /// Request body parsing failures (malformed JSON or form data)
    #[error("Body parsing failed: {detail}")]
    BodyParse {
        /// Parser-specific failure detail
        detail: String,
        /// Environment label, selects error message verbosity
        environment: Environment,
    },

    /// Any failure raised by a request handler
    #[error("Handler failed: {detail}")]
    Internal {
        /// Failure detail
        detail: String,
        /// Environment label, selects error message verbosity
        environment: Environment,
    },
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// Render the 500 envelope, with detail only in development
    fn internal_envelope(detail: &str, environment: Environment) -> Response {
        let message = if environment.verbose_errors() {
            detail.to_string()
        } else {
            GENERIC_FAILURE_MESSAGE.to_string()
        };

        let body = serde_json::json!({
            "error": "Internal Server Error",
            "message": message,
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::RouteNotFound { method, path } => {
                let body = serde_json::json!({
                    "error": "Not Found",
                    "message": format!("Route {method} {path} not found"),
                });
                (StatusCode::NOT_FOUND, Json(body)).into_response()
            }
            ServerError::BodyParse {
                ref detail,
                environment,
            }
            | ServerError::Internal {
                ref detail,
                environment,
            } => {
                error!(detail = %detail, "request failed");
                Self::internal_envelope(detail, environment)
            }
            ServerError::Config { .. }
            | ServerError::Bind { .. }
            | ServerError::Startup { .. }
            | ServerError::Serve { .. } => {
                // Startup-class failures never reach a request in practice
                error!(error = %self, "infrastructure failure surfaced in request path");
                Self::internal_envelope(&self.to_string(), Environment::Production)
            }
        }
    }
}
