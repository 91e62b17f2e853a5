//! Asset gatekeeper server implementation
//!
//! Wires the decision engine, storage backend and identity verifier into an
//! axum router with tracing, request ids and panic recovery.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{http::Request, middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use super::error::AssetError;
use super::routes::{download, get_token, not_found, security_headers};
use super::store::{AssetStore, FilesystemStore};
use crate::core::{GatekeeperSettings, StoreBackend};
use crate::entitlement::{EntitlementCache, EntitlementChecker, SteamOwnershipAuthority};
use crate::gate::Gate;
use crate::identity::{CallbackOrigin, IdentityVerifier, SteamOpenId};
use crate::token::TokenCodec;

/// Shared state for the gatekeeper handlers
///
/// Built once at startup; every field is cheap to clone.
#[derive(Clone)]
pub struct GatekeeperState {
    /// Authorization decision engine
    pub gate: Gate,
    /// Codec used to mint tokens at the callback
    pub codec: Arc<TokenCodec>,
    /// Asset storage backend
    pub store: Arc<dyn AssetStore>,
    /// Identity provider verifier
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Source of the identity callback URL
    pub callback_origin: CallbackOrigin,
}

impl GatekeeperState {
    pub fn new(
        gate: Gate,
        codec: Arc<TokenCodec>,
        store: Arc<dyn AssetStore>,
        verifier: Arc<dyn IdentityVerifier>,
        callback_origin: CallbackOrigin,
    ) -> Self {
        Self {
            gate,
            codec,
            store,
            verifier,
            callback_origin,
        }
    }

    /// Build the production state from validated settings
    pub fn from_settings(settings: &GatekeeperSettings) -> crate::Result<Self> {
        let codec = Arc::new(TokenCodec::new(
            settings.key_set.clone(),
            settings.token_max_age,
        ));

        let authority = SteamOwnershipAuthority::new(
            settings.entitlement.endpoint.clone(),
            settings.publisher_key.clone(),
            settings.app_id.clone(),
            settings.entitlement.timeout,
        )?;
        let cache = EntitlementCache::new(
            settings.entitlement.cache_capacity,
            settings.entitlement.cache_ttl,
        );
        let checker = Arc::new(EntitlementChecker::new(Arc::new(authority), cache));
        let gate = Gate::new(codec.clone(), checker, settings.skip_auth.clone());

        let store: Arc<dyn AssetStore> = match &settings.store {
            StoreBackend::Filesystem { root } => {
                tracing::info!(root = %root.display(), "Serving assets from filesystem");
                Arc::new(FilesystemStore::new(root.clone()))
            }
        };

        let verifier = Arc::new(SteamOpenId::new(settings.identity_provider.clone())?);

        Ok(Self::new(
            gate,
            codec,
            store,
            verifier,
            settings.callback_origin.clone(),
        ))
    }
}

/// Asset gatekeeper HTTP server
pub struct GatekeeperServer {
    state: GatekeeperState,
}

impl GatekeeperServer {
    pub fn new(state: GatekeeperState) -> Self {
        Self { state }
    }

    /// Get a reference to the server state
    pub fn state(&self) -> &GatekeeperState {
        &self.state
    }

    /// Build the router with all routes and middleware
    pub fn build_router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request_id,
            )
        });

        Router::new()
            .route("/get-token", get(get_token))
            .route("/*path", get(download))
            .fallback(not_found)
            .layer(middleware::from_fn(security_headers))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(trace_layer)
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(CatchPanicLayer::new()),
            )
            .with_state(self.state.clone())
    }

    /// Bind `addr` and serve until ctrl-c
    pub async fn serve(&self, addr: SocketAddr) -> Result<(), AssetError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AssetError::BindFailed {
                reason: format!("{}: {}", addr, e),
            })?;

        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "Asset gatekeeper listening");

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AssetError::Internal {
                reason: e.to_string(),
            })?;

        tracing::info!("Asset gatekeeper stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
