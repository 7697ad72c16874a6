//! Shared plumbing for the Factlens crates.
//!
//! This crate is intentionally small so every other crate in the workspace can depend
//! on it without pulling in heavy transitive costs. Today it only hosts the
//! [`observability`] helpers that binaries and integration tests use to wire up
//! `tracing`.
//!
//! # Examples
//!
//! ```rust
//! use factlens_common::observability::{LogConfig, LogFormat};
//!
//! let cfg = LogConfig {
//!     format: LogFormat::Json,
//!     ..LogConfig::default()
//! };
//! assert_eq!(cfg.app_name, "factlens");
//! assert_eq!(cfg.default_filter, "info");
//! ```
pub mod observability;

pub use observability::{init_logging, LogConfig, LogFormat};
