//! # SynergySphere Shared Library
//!
//! Types, SQL and service clients used by the SynergySphere API server.
//!
//! ## Module Organization
//!
//! - `models`: database models and their queries
//! - `auth`: auth-service client, token validation, authorization checks
//! - `db`: connection pool and migrations
//! - `email`: transactional email providers
//! - `notify`: background notification inserts

pub mod auth;
pub mod db;
pub mod email;
pub mod models;
pub mod notify;

/// Current version of the SynergySphere shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
