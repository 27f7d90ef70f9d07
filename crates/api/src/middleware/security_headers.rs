//! Security headers middleware.
//!
//! The API only serves JSON, so the policy is fully locked down: nothing may
//! be framed, sniffed, prefetched or cached.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY,
            X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use crate::config::ApiConfig;

/// Per-deployment header settings.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    /// `Strict-Transport-Security` value, set only when served over https.
    hsts: Option<HeaderValue>,
}

impl SecurityHeaders {
    #[must_use]
    pub fn new(secure: bool, hsts_max_age_secs: u64) -> Self {
        let hsts = secure
            .then(|| {
                HeaderValue::from_str(&format!(
                    "max-age={hsts_max_age_secs}; includeSubDomains"
                ))
                .ok()
            })
            .flatten();
        Self { hsts }
    }

    #[must_use]
    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.is_secure(), config.http.hsts_max_age_secs)
    }
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: no-referrer`
/// - `Content-Security-Policy: default-src 'none'; frame-ancestors 'none'`
/// - `Strict-Transport-Security` (https deployments only)
/// - `Cache-Control: no-store`
/// - `Cross-Origin-Resource-Policy: same-origin`
/// - `X-DNS-Prefetch-Control: off`
pub async fn security_headers_middleware(
    State(policy): State<SecurityHeaders>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );

    if let Some(hsts) = policy.hsts {
        headers.insert(STRICT_TRANSPORT_SECURITY, hsts);
    }

    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}
