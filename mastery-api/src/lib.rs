//! # Medicare Mastery API Server Library
//!
//! HTTP surface of the entitlement flow: the Stripe webhook receiver that
//! grants access, and the authenticated account endpoints the client polls.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
