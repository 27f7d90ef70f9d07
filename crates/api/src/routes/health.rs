//! Health check endpoints.
//!
//! - `/health` liveness, never touches dependencies
//! - `/health/ready` database round trip
//! - `/health/detailed` concurrent probes of every dependency

use std::future::Future;
use std::time::{Duration, Instant};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;

use crate::config::AlertingConfig;
use crate::db;
use crate::state::AppState;

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProbeReport {
    fn up(latency: Duration) -> Self {
        Self {
            status: ProbeStatus::Up,
            latency_ms: Some(millis(latency)),
            message: None,
        }
    }

    fn down(latency: Duration, message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Down,
            latency_ms: Some(millis(latency)),
            message: Some(message.into()),
        }
    }

    fn skipped(reason: &str) -> Self {
        Self {
            status: ProbeStatus::Skipped,
            latency_ms: None,
            message: Some(reason.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct Checks {
    pub database: ProbeReport,
    pub cache: ProbeReport,
    pub storage: ProbeReport,
    pub payments: ProbeReport,
}

impl Checks {
    fn all(&self) -> [&ProbeReport; 4] {
        [&self.database, &self.cache, &self.storage, &self.payments]
    }
}

#[derive(Debug, Serialize)]
pub struct DetailedHealth {
    pub status: OverallStatus,
    pub version: &'static str,
    pub checks: Checks,
    pub cached_artworks: u64,
    pub alerting: AlertingConfig,
}

/// Liveness: returns "ok" while the process is serving.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness: 200 when the database answers, 503 otherwise.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match db::ping(state.pool()).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Detailed health: all probes run concurrently; 503 when unhealthy.
pub async fn detailed(State(state): State<AppState>) -> impl IntoResponse {
    let timeout = state.config().health.probe_timeout;

    let (database, cache, storage, payments) = tokio::join!(
        probe("database", timeout, probe_database(&state)),
        probe("cache", timeout, probe_cache(&state)),
        probe_storage(&state, timeout),
        probe_payments(&state, timeout),
    );

    let checks = Checks {
        database,
        cache,
        storage,
        payments,
    };
    let alerting = state.config().alerting.clone();
    let status = aggregate(&checks, alerting.response_time_ms);

    if status != OverallStatus::Healthy {
        tracing::warn!(?status, "Detailed health check not healthy");
    }

    let code = if status == OverallStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        code,
        Json(DetailedHealth {
            status,
            version: env!("CARGO_PKG_VERSION"),
            checks,
            cached_artworks: state.cache().entry_count(),
            alerting,
        }),
    )
}

/// Overall status from the probe reports.
///
/// The database is the only hard dependency; any other failure, or any probe
/// slower than `response_time_ms`, degrades the service.
fn aggregate(checks: &Checks, response_time_ms: u64) -> OverallStatus {
    if checks.database.status == ProbeStatus::Down {
        return OverallStatus::Unhealthy;
    }

    let degraded = checks.all().iter().any(|report| {
        report.status == ProbeStatus::Down
            || report.latency_ms.is_some_and(|ms| ms > response_time_ms)
    });

    if degraded {
        OverallStatus::Degraded
    } else {
        OverallStatus::Healthy
    }
}

/// Time a fallible probe, bounded by `timeout`.
///
/// The endpoint is public, so failure details are logged and the report only
/// says the dependency is unavailable.
async fn probe<F, E>(name: &'static str, timeout: Duration, fut: F) -> ProbeReport
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(())) => ProbeReport::up(started.elapsed()),
        Ok(Err(e)) => {
            tracing::warn!(check = name, error = %e, "Health probe failed");
            ProbeReport::down(started.elapsed(), "unavailable")
        }
        Err(_) => {
            tracing::warn!(check = name, ?timeout, "Health probe timed out");
            ProbeReport::down(started.elapsed(), "timed out")
        }
    }
}

async fn probe_database(state: &AppState) -> Result<(), sqlx::Error> {
    db::ping(state.pool()).await
}

async fn probe_cache(state: &AppState) -> Result<(), &'static str> {
    state
        .cache()
        .probe()
        .await
        .map(|_| ())
        .ok_or("cache round trip failed")
}

async fn probe_storage(state: &AppState, timeout: Duration) -> ProbeReport {
    let Some(url) = state.config().health.storage_url.as_deref() else {
        return ProbeReport::skipped("STORAGE_HEALTH_URL not set");
    };

    probe("storage", timeout, head_ok(state.http(), url)).await
}

/// `HEAD` the URL and accept any 2xx or 3xx answer.
async fn head_ok(client: &reqwest::Client, url: &str) -> Result<(), ProbeError> {
    let status = client.head(url).send().await?.status();
    if status.is_success() || status.is_redirection() {
        Ok(())
    } else {
        Err(ProbeError::Status(status))
    }
}

async fn probe_payments(state: &AppState, timeout: Duration) -> ProbeReport {
    if state.config().stripe.secret_key.expose_secret().is_empty() {
        return ProbeReport::skipped("STRIPE_SECRET_KEY not set");
    }

    probe("payments", timeout, async {
        state.stripe().balance().await.map(|_| ())
    })
    .await
}

#[derive(Debug, Error)]
enum ProbeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
