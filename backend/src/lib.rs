//! # p2-gravity
//!
//! Preparation of GRAVITY Observing Blocks and their synchronization with the
//! ESO P2 scheduling service.
//!
//! A YAML observation configuration names a run, a folder and a list of
//! Observing Blocks. Each OB is built for one observation mode, generates its
//! acquisition and science templates locally, resolves its target through a
//! catalog, and is then created and updated on the P2 store.
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Identifier newtypes and remote documents
//! - [`config`]: Observation configuration, client settings and bundled samples
//! - [`models`]: Targets, templates, observation modes and the Observing Block
//! - [`catalog`]: Catalog services and target resolution
//! - [`p2`]: Repository pattern over the P2 store, in-memory and HTTP
//! - [`services`]: Per-OB submission pipeline, confirmation and reporting
//! - [`error`]: Error taxonomy shared by all layers
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use p2_gravity::catalog::{CatalogRecord, LocalCatalog, TargetResolver};
//! use p2_gravity::config::{samples, ObsConfig};
//! use p2_gravity::p2::repositories::LocalP2Repository;
//! use p2_gravity::services::{AutoConfirm, Submission};
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let config = ObsConfig::from_yaml_str(samples::sample("dual_off").unwrap()).unwrap();
//!
//! let repo = LocalP2Repository::new();
//! repo.add_run(&config.setup.run_id, "GRAVITY");
//! let catalog = LocalCatalog::new();
//! catalog.insert("HD 206893", vec![CatalogRecord::new("HD 206893", 326.34, -12.78)]);
//! let resolver = TargetResolver::new(Arc::new(catalog));
//!
//! let report = Submission::new(&repo, &resolver, &AutoConfirm)
//!     .submit_all(&config)
//!     .await
//!     .unwrap();
//! assert_eq!(report.sent(), 1);
//! # });
//! # }
//! ```

// Allow large error types - RemoteError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod p2;
pub mod services;
