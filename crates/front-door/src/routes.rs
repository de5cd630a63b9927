// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Routes module
//!
//! This module provides route configuration for the front door server: the
//! two informational endpoints and the not-found fallback. The fallback is
//! also attached per method router, so a non-GET request to a known path is a
//! 404 rather than a 405.

pub mod handlers;

use axum::{Router, routing::get};
use handlers::{health_handler, not_found_handler, root_handler};

use crate::state::ServerState;

/// Create application routes with the not-found fallback
pub fn create_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(root_handler).fallback(not_found_handler))
        .route("/health", get(health_handler).fallback(not_found_handler))
        .fallback(not_found_handler)
}
