//! Configuration constants
//!
//! Static defaults and service URLs. User-overridable settings live in
//! [`crate::core::settings`].

pub mod defaults;
pub mod urls;
