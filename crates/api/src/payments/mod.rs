//! Stripe payment gateway integration.
//!
//! # API Reference
//!
//! - Base URL: `https://api.stripe.com` (overridable for `stripe-mock`)
//! - Authentication: secret key via `Authorization: Bearer <key>`
//! - Request bodies are form-encoded; responses are JSON
//! - Webhooks are signed with `Stripe-Signature: t=<unix>,v1=<hex hmac>`

mod client;
mod types;
pub mod webhook;

pub use client::{CreateIntent, StripeClient};
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with Stripe.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe returned an error that is not the client's fault.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The card was declined or failed a check.
    #[error("Card error: {message}")]
    Card {
        code: Option<String>,
        message: String,
    },

    /// Stripe rejected the request parameters (unknown id, bad state, ...).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Webhook signature missing, stale or wrong.
    #[error("Invalid Stripe signature: {0}")]
    InvalidSignature(String),

    /// A feature needs configuration that is absent.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}
