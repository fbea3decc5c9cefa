//! Tablewatch service library crate.
//!
//! # Purpose
//! Exposes the bridge HTTP API, the field-completion watcher, the settings
//! store, and the AI helper for use by the binary and tests.
//!
//! # Notes
//! The Lark protocol lives in the `tablewatch-lark` crate and is reached only
//! through the traits in [`remote`].
pub mod ai;
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod observability;
pub mod orchestrator;
pub mod remote;
pub mod store;
pub mod watch;
