//! API token extractor for administrative routes.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use secrecy::ExposeSecret;

use crate::error::AppError;
use crate::payments::webhook::constant_time_compare;
use crate::state::AppState;

/// Extractor that requires `Authorization: Bearer <ATELIER_API_TOKEN>`.
///
/// # Example
///
/// ```rust,ignore
/// async fn delete(_token: RequireApiToken, Path(id): Path<i32>) -> Result<Json<...>> {
///     ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireApiToken;

impl FromRequestParts<AppState> for RequireApiToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Missing API token".to_string()))?;

        if !token_matches(token, state) {
            tracing::warn!(path = %parts.uri.path(), "Rejected invalid API token");
            return Err(AppError::Unauthorized("Invalid API token".to_string()));
        }

        Ok(Self)
    }
}

/// Whether the request carries the API token. Used by public routes that
/// reveal drafts to administrators.
#[must_use]
pub fn has_api_token(headers: &HeaderMap, state: &AppState) -> bool {
    bearer_token(headers).is_some_and(|token| token_matches(token, state))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

fn token_matches(token: &str, state: &AppState) -> bool {
    constant_time_compare(token, state.config().api_token.expose_secret())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, http::StatusCode, routing::get};
    use tower::ServiceExt;

    use super::*;
    use crate::state::tests::test_state;

    fn app() -> Router {
        Router::new()
            .route("/admin", get(|_token: RequireApiToken| async { "ok" }))
            .with_state(test_state())
    }

    async fn status_with(auth: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().uri("/admin");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_valid_token_accepted() {
        let status = status_with(Some("Bearer tK9#vQ2$mW7!pZ4@rX8%nB3^hJ6&cL1*")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_has_api_token() {
        let state = test_state();
        let mut headers = HeaderMap::new();
        assert!(!has_api_token(&headers, &state));
        headers.insert(
            AUTHORIZATION,
            "Bearer tK9#vQ2$mW7!pZ4@rX8%nB3^hJ6&cL1*".parse().unwrap(),
        );
        assert!(has_api_token(&headers, &state));
    }

    #[tokio::test]
    async fn test_missing_or_wrong_token_rejected() {
        assert_eq!(status_with(None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_with(Some("Bearer tK9#vQ2$mW7!pZ4@rX8%nB3^hJ6&cL1-")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_with(Some("Basic dXNlcjpwYXNz")).await,
            StatusCode::UNAUTHORIZED
        );
    }
}
