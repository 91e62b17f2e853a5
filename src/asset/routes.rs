//! Asset gatekeeper routes and middleware
//!
//! Provides the download handler, the identity callback handler and the
//! security headers applied to every response.

use axum::{
    body::Body,
    extract::{rejection::PathRejection, Path, Query, RawQuery, State},
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use super::delivery::serve_asset;
use super::error::AssetError;
use super::server::GatekeeperState;
use crate::gate::{AssetPath, DenyReason, Verdict};
use crate::identity::{handle_callback, CallbackOutcome, CallbackParams};

/// Query parameters of a download request
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TokenParams {
    /// Access token minted by `/get-token`
    pub token: Option<String>,
}

impl TokenParams {
    /// Read the first `token` pair of a raw query string
    ///
    /// Repeated or unrelated parameters never reject the request.
    pub fn from_query(query: Option<&str>) -> Self {
        let token = query.and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "token")
                .map(|(_, value)| value.into_owned())
        });
        Self { token }
    }
}

impl IntoResponse for DenyReason {
    fn into_response(self) -> Response {
        let status = match self {
            DenyReason::NotFound => StatusCode::NOT_FOUND,
            DenyReason::MissingToken | DenyReason::InvalidToken => StatusCode::UNAUTHORIZED,
            DenyReason::NotEntitled => StatusCode::FORBIDDEN,
            DenyReason::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.message()).into_response()
    }
}

/// Security headers middleware
///
/// Adds to every response:
/// - `X-Content-Type-Options: nosniff`
/// - `X-Frame-Options: DENY`
/// - `Cache-Control: private` unless the handler chose otherwise
pub async fn security_headers(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    // Prevent MIME type sniffing
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    // Prevent clickjacking
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));

    // Entitled content must not land in shared caches
    headers
        .entry(header::CACHE_CONTROL)
        .or_insert(HeaderValue::from_static("private"));

    response
}

fn asset_error_response(path: &AssetPath, err: AssetError) -> Response {
    if err.is_not_found() {
        tracing::debug!(path = %path, "Asset not found");
        return DenyReason::NotFound.into_response();
    }
    tracing::error!(path = %path, error = %err, "Failed to deliver asset");
    DenyReason::Internal.into_response()
}

/// Serve an asset after authorization
///
/// Route: GET|HEAD /*path
pub async fn download(
    State(state): State<GatekeeperState>,
    method: Method,
    raw_path: Result<Path<String>, PathRejection>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    // Undecodable paths name nothing in the store
    let Ok(Path(raw_path)) = raw_path else {
        return DenyReason::NotFound.into_response();
    };
    let params = TokenParams::from_query(query.as_deref());

    let path = match state.gate.authorize(&raw_path, params.token.as_deref()).await {
        Verdict::Allow(path) => path,
        Verdict::Deny(reason) => return reason.into_response(),
    };

    let asset = match state.store.retrieve(&path).await {
        Ok(asset) => asset,
        Err(e) => return asset_error_response(&path, e),
    };

    match serve_asset(&method, &headers, &path, asset).await {
        Ok(response) => response,
        Err(e) => asset_error_response(&path, e),
    }
}

/// Not-found for anything outside the asset namespace
pub async fn not_found() -> Response {
    DenyReason::NotFound.into_response()
}

/// Identity-provider callback
///
/// Route: GET /get-token
pub async fn get_token(
    State(state): State<GatekeeperState>,
    uri: Uri,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.authority().map(|authority| authority.as_str()));
    let forwarded_proto = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok());

    let return_to = match state.callback_origin.callback_url(host, forwarded_proto) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot build callback URL");
            return (StatusCode::BAD_REQUEST, "bad request").into_response();
        }
    };

    match handle_callback(state.verifier.as_ref(), &state.codec, &params, &return_to).await {
        Ok(CallbackOutcome::Redirect(url)) => Redirect::to(url.as_str()).into_response(),
        Ok(CallbackOutcome::Cancelled) => (StatusCode::OK, "cancelled").into_response(),
        Ok(CallbackOutcome::Issued { token, .. }) => {
            (StatusCode::OK, format!("Your token: {}", token)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Identity verification failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "identity verification failed").into_response()
        }
    }
}
