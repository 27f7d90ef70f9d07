//! Atelier API library.
//!
//! JSON REST backend for an online art shop: artworks, carts, wishlists,
//! orders and Stripe payments over `PostgreSQL`. Exposed as a library so the
//! binary, the CLI and the tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod state;
