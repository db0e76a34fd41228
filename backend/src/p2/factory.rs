//! Repository factory for dependency injection.
//!
//! This module provides utilities for creating repository instances based on
//! the P2 environment selected at runtime.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::repositories::LocalP2Repository;
#[cfg(feature = "http-client")]
use super::repositories::HttpP2Repository;
use super::repository::{P2Repository, RemoteError, RemoteResult};

/// API root of the production P2 service.
pub const PRODUCTION_API_URL: &str = "https://www.eso.org/cop/api/v1";
/// API root of the P2 demo service.
pub const DEMO_API_URL: &str = "https://www.eso.org/copdemo/api/v1";
/// Public tutorial account of the demo service.
pub const DEMO_USERNAME: &str = "52052";
pub const DEMO_PASSWORD: &str = "tutorial";

/// P2 environment to synchronize with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum P2Environment {
    /// Operational service; OBs created here are real
    Production,
    /// Public demo service
    Demo,
    /// In-memory store, nothing leaves the process
    Local,
}

impl FromStr for P2Environment {
    type Err = String;

    /// Parse environment from string.
    ///
    /// # Arguments
    /// * `s` - String representation ("production", "demo", "local")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "demo" => Ok(Self::Demo),
            "local" => Ok(Self::Local),
            _ => Err(format!("Unknown P2 environment: {}", s)),
        }
    }
}

impl std::fmt::Display for P2Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            P2Environment::Production => "production",
            P2Environment::Demo => "demo",
            P2Environment::Local => "local",
        };
        f.write_str(s)
    }
}

impl P2Environment {
    /// Read the `P2_ENVIRONMENT` variable, if set to a known value.
    pub fn from_env() -> Option<Self> {
        std::env::var("P2_ENVIRONMENT")
            .ok()
            .and_then(|val| val.parse().ok())
    }

    /// API root for this environment; `None` for the in-memory store.
    pub fn api_url(&self) -> Option<&'static str> {
        match self {
            P2Environment::Production => Some(PRODUCTION_API_URL),
            P2Environment::Demo => Some(DEMO_API_URL),
            P2Environment::Local => None,
        }
    }
}

/// Login credentials for the P2 service.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Tutorial account of the demo service.
    pub fn demo() -> Self {
        Self::new(DEMO_USERNAME, DEMO_PASSWORD)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Repository factory for creating repository instances.
///
/// # Example
/// ```ignore
/// use p2_gravity::p2::{Credentials, P2Environment, RepositoryFactory};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let repo = RepositoryFactory::create(
///         P2Environment::Demo,
///         Some(&Credentials::demo()),
///         std::time::Duration::from_secs(30),
///     )
///     .await?;
///     let runs = repo.list_runs().await?;
///     Ok(())
/// }
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository instance for an environment.
    ///
    /// # Arguments
    /// * `environment` - Environment to connect to
    /// * `credentials` - Login credentials (required for remote environments)
    /// * `timeout` - Per-request timeout for remote environments
    pub async fn create(
        environment: P2Environment,
        credentials: Option<&Credentials>,
        timeout: Duration,
    ) -> RemoteResult<Arc<dyn P2Repository>> {
        match environment.api_url() {
            None => Ok(Self::create_local()),
            Some(url) => {
                let credentials = credentials.ok_or_else(|| {
                    RemoteError::authentication(format!(
                        "P2 {} environment requires credentials",
                        environment
                    ))
                })?;
                Self::create_http(url, credentials, timeout).await
            }
        }
    }

    #[cfg(feature = "http-client")]
    async fn create_http(
        url: &str,
        credentials: &Credentials,
        timeout: Duration,
    ) -> RemoteResult<Arc<dyn P2Repository>> {
        let repo =
            HttpP2Repository::connect(url, &credentials.username, &credentials.password, timeout)
                .await?;
        Ok(Arc::new(repo))
    }

    #[cfg(not(feature = "http-client"))]
    async fn create_http(
        url: &str,
        _credentials: &Credentials,
        _timeout: Duration,
    ) -> RemoteResult<Arc<dyn P2Repository>> {
        Err(RemoteError::transport(format!(
            "Cannot reach {}: http-client feature not enabled",
            url
        )))
    }

    /// Create an in-memory local repository.
    pub fn create_local() -> Arc<dyn P2Repository> {
        Arc::new(LocalP2Repository::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_str() {
        assert_eq!("demo".parse::<P2Environment>().unwrap(), P2Environment::Demo);
        assert_eq!(
            "PRODUCTION".parse::<P2Environment>().unwrap(),
            P2Environment::Production
        );
        assert_eq!(
            " prod ".parse::<P2Environment>().unwrap(),
            P2Environment::Production
        );
        assert_eq!("local".parse::<P2Environment>().unwrap(), P2Environment::Local);
        let err = "staging".parse::<P2Environment>().unwrap_err();
        assert!(err.contains("Unknown P2 environment"));
    }

    #[test]
    fn test_api_urls() {
        assert_eq!(P2Environment::Demo.api_url(), Some(DEMO_API_URL));
        assert_eq!(P2Environment::Production.api_url(), Some(PRODUCTION_API_URL));
        assert_eq!(P2Environment::Local.api_url(), None);
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::demo();
        let shown = format!("{:?}", creds);
        assert!(shown.contains(DEMO_USERNAME));
        assert!(!shown.contains(DEMO_PASSWORD));
    }

    #[tokio::test]
    async fn test_remote_environment_requires_credentials() {
        let result =
            RepositoryFactory::create(P2Environment::Demo, None, Duration::from_secs(1)).await;
        match result {
            Err(RemoteError::Authentication { message, .. }) => {
                assert!(message.contains("demo"))
            }
            _ => panic!("expected an authentication error"),
        }
    }

    #[tokio::test]
    async fn test_local_environment_needs_nothing() {
        let repo = RepositoryFactory::create(P2Environment::Local, None, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(repo.list_runs().await.unwrap().is_empty());
    }
}
