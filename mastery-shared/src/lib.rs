//! # Mastery Shared Library
//!
//! Types and plumbing shared by the Medicare Mastery API server and the
//! client-side entitlement flow.
//!
//! ## Module Organization
//!
//! - `models`: Profile, enrollment and entitlement records
//! - `store`: Relational store abstraction (PostgreSQL and in-memory)
//! - `db`: Connection pool and migrations
//! - `auth`: Identity-provider session token validation
//! - `payments`: Stripe event envelope and webhook signatures

pub mod auth;
pub mod db;
pub mod models;
pub mod payments;
pub mod store;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
