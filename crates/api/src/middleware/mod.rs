//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (reuse or generate, echo in response)
//! 4. CORS (configured origins)
//! 5. Compression (gzip, br above the size threshold)
//! 6. Security headers
//! 7. Rate limiting (governor, stricter under `/api/payments`)
//!
//! Administrative routes additionally take the [`RequireApiToken`] extractor.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{RequireApiToken, has_api_token};
pub use rate_limit::{RateLimiterLayer, rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::{SecurityHeaders, security_headers_middleware};
