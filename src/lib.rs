//! trust-cert - install, remove and check root certificates in the macOS,
//! Windows, Linux and NSS (Firefox) trust stores.

pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod fs;
pub mod identity;
pub mod platform;
pub mod trust;

pub use error::{Result, TrustError};
pub use platform::{Target, TrustStore};
pub use trust::resolve_backend;
