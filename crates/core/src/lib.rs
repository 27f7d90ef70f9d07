//! Atelier Core - Shared domain types.
//!
//! This crate provides the types used across all Atelier components:
//! - `api` - JSON REST service for the art shop
//! - `cli` - Command-line tools for migrations and catalogue seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Money arithmetic, dimension labels and
//! the order state machine live here so the service and the CLI agree on them.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, prices, dimensions, slugs, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
