//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Two limiters are built from configuration:
//! - general: everything under `/api` (default 1 token/s, burst 50)
//! - payments: `/api/payments` (default 1 token per 6 s, burst 5)
//!
//! Rejections render as the usual JSON error body with a `Retry-After` header.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

/// Key extractor that prefers proxy headers (Cloudflare, then the usual
/// forwarding headers, then Fly.io) and falls back to the peer address.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

const IP_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-real-ip", "fly-client-ip"];

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        if let Some(ip) = header_ip(headers, IP_HEADERS[0]) {
            return Ok(ip);
        }

        // First hop of X-Forwarded-For
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        if let Some(ip) = IP_HEADERS[1..]
            .iter()
            .find_map(|name| header_ip(headers, name))
        {
            return Ok(ip);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

fn header_ip(headers: &axum::http::HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Build a per-IP limiter that replenishes one token every `replenish_secs`
/// and allows bursts of `burst`.
///
/// Returns `None` if either value is zero.
#[must_use]
pub fn rate_limiter(replenish_secs: u64, burst: u32) -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(replenish_secs)
        .burst_size(burst)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)).error_handler(governor_error_response))
}

impl From<GovernorError> for AppError {
    fn from(err: GovernorError) -> Self {
        match err {
            GovernorError::TooManyRequests { wait_time, .. } => Self::RateLimited {
                retry_after_secs: wait_time,
            },
            GovernorError::Other { code, .. } if code == StatusCode::TOO_MANY_REQUESTS => {
                Self::RateLimited {
                    retry_after_secs: 1,
                }
            }
            GovernorError::UnableToExtractKey => {
                Self::Internal("could not determine client address".to_string())
            }
            GovernorError::Other { msg, .. } => {
                Self::Internal(msg.unwrap_or_else(|| "rate limiter error".to_string()))
            }
        }
    }
}

fn governor_error_response(err: GovernorError) -> Response {
    AppError::from(err).into_response()
}
