//! P2 remote store access.
//!
//! - [`repository`]: the store contract and its error type
//! - [`repositories`]: in-memory and HTTP implementations
//! - [`factory`]: environment selection
//! - [`services`]: container preparation shared by every OB

pub mod factory;
pub mod repositories;
pub mod repository;
pub mod services;

pub use factory::{Credentials, P2Environment, RepositoryFactory};
pub use repository::{ErrorContext, P2Repository, RemoteError, RemoteResult};
pub use services::{find_item, prepare_container, PreparedContainer, SetupError};
