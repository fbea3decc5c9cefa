//! Lark open-platform client used by the tablewatch bridge.
//!
//! # Purpose
//! Wraps the subset of the Lark (Feishu) open API the bridge needs: tenant
//! token exchange, bitable discovery and record access, wiki token resolution,
//! chat messages, and task creation.
//!
//! # Notes
//! Record fields are decoded into [`FieldValue`] at this boundary so callers
//! never inspect raw JSON. Errors carry a retryable/fatal classification via
//! [`LarkError::is_retryable`].
pub mod client;
pub mod error;
pub mod token;
pub mod types;
pub mod value;

mod bitable;
mod messaging;
mod wiki;

pub use client::{DEFAULT_BASE_URL, LarkClient, LarkConfig};
pub use error::{LarkError, LarkResult};
pub use token::{IssuedToken, TokenCache};
pub use types::{Bitable, Field, TableInfo, TaskRequest};
pub use value::{FieldMap, FieldValue, UserRef};
