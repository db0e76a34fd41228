//! Repository implementations module.
//!
//! This module contains different implementations of the `P2Repository` trait:
//! - `http`: ESO P2 REST API client
//! - `local`: In-memory implementation for unit testing and dry runs
#[cfg(feature = "http-client")]
pub mod http;
pub mod local;

#[cfg(feature = "http-client")]
pub use http::HttpP2Repository;
pub use local::LocalP2Repository;
