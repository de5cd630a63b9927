// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Front Door Server Implementation
//!
//! This crate provides a minimal HTTP front door built with Axum: CORS and
//! body-parsing middleware, two informational endpoints, a catch-all 404
//! fallback, and a centralized error boundary that renders every in-request
//! failure as a JSON envelope.
//!
//! # Module Structure
//!
//! - [`config`]: Server configuration loaded once at startup from defaults,
//!   an optional file, and environment variables
//! - [`error`]: Error types and HTTP response handling with proper status codes
//! - [`state`]: Shared read-only application state
//! - [`server`]: Main server implementation and bind/serve lifecycle
//! - [`routes`]: Route configuration and HTTP request handlers
//! - [`middleware`]: CORS policy and body parsing ahead of route dispatch
//!
//! # Key Features
//!
//! - **Explicit configuration**: environment variables are read exactly once;
//!   handlers see configuration only through [`state::ServerState`]
//! - **Fail fast**: an unparseable `PORT` or an unbindable address stops the
//!   process with a diagnostic instead of running degraded
//! - **Single error boundary**: routing misses become 404 envelopes, parsing
//!   and handler failures become 500 envelopes with environment-dependent
//!   detail

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{CorsOrigin, Environment, ServerConfig, ServerPort};
pub use error::{ServerError, ServerResult};
pub use server::Server;
pub use state::{HealthCheck, ServerState};
