//! Graph Marketing API Custom Audience Client
//!
//! This library provides a thin, typed client layer over the Graph
//! Marketing API's custom-audience endpoints: audience lifecycle
//! (create/read/list/delete), member uploads with client-side hashing and
//! 10,000-entry chunking, cross-account sharing, and lookalike derivation.
//!
//! # Modules
//!
//! - `audiences`: Custom audience lifecycle, membership, and sharing.
//! - `client`: Authenticated HTTP client and shared request helpers.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `identifiers`: Identifier normalization, hashing, and chunking.
//! - `lookalikes`: Lookalike audience creation.
//! - `models`: Wire-level data models.

pub mod audiences;
pub mod client;
pub mod config;
pub mod errors;
pub mod identifiers;
pub mod lookalikes;
pub mod models;
