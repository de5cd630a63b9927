// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server implementation module
//!
//! This module provides the main server struct for the front door service:
//! router construction, middleware ordering, and the bind/serve lifecycle. A
//! bind failure is fatal, the process refuses to start in a degraded state.

use std::net::SocketAddr;

use axum::{Router, http::HeaderName};
use hyper::Request;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, info_span};

use crate::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    middleware::{cors_layer, parse_body},
    routes::create_routes,
    state::ServerState,
};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Main server struct
#[derive(Debug)]
pub struct Server {
    /// Server configuration
    config: ServerConfig,
    /// Application router
    router: Router,
    /// Server state
    state: ServerState,
}

impl Server {
    /// Create new server instance
    pub fn new(config: ServerConfig) -> Self {
        let state = ServerState::new(config.clone());
        let router = Self::create_router(state.clone());

        Self {
            config,
            router,
            state,
        }
    }

    /// Create application router with middleware
    ///
    /// Order ahead of dispatch: request id, tracing, CORS, body parsing.
    fn create_router(state: ServerState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                    if let Some(request_id) = req.headers().get(REQUEST_ID_HEADER) {
                        info_span!("http_request", ?request_id)
                    } else {
                        error!("failed to extract id from request");
                        info_span!("http_request", request_id = "unknown")
                    }
                }),
            )
            .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
            .layer(cors_layer(&state.config().cors_origin))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                parse_body,
            ));

        create_routes().layer(middleware).with_state(state)
    }

    /// Run the server
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address,
    /// `ServerError::Startup` if the listener address cannot be resolved, or
    /// `ServerError::Serve` if serving fails.
    pub async fn run(self) -> ServerResult<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;

        let actual_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        info!(
            address = %actual_addr,
            environment = %self.config.environment,
            cors_origin = %self.config.cors_origin.as_str(),
            "front door server starting",
        );

        axum::serve(listener, self.router)
            .await
            .map_err(|source| ServerError::Serve { source })
    }

    /// Run server for testing, returns the bound address
    ///
    /// The serve task is detached and stops with the test runtime.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address.
    pub async fn run_for_testing(self) -> ServerResult<SocketAddr> {
        let addr = self.config.socket_addr();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;

        let actual_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        tokio::spawn(async move {
            let _ = axum::serve(listener, self.router).await;
        });

        Ok(actual_addr)
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get server state for testing
    pub fn state(&self) -> &ServerState {
        &self.state
    }
}
