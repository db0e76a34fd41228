//! create-obs: prepare GRAVITY Observing Blocks and send them to P2.
//!
//! # Usage
//!
//! ```bash
//! # Write a sample configuration to the current directory
//! create-obs --generate dual_off
//!
//! # Send the OBs of a configuration to the P2 demo server
//! create-obs dual_off.yml --demo
//!
//! # Production, without per-OB confirmation
//! create-obs dual_off.yml --nogui
//! ```
//!
//! # Environment Variables
//!
//! - `P2_ENVIRONMENT`: `production`, `demo` or `local` (overrides `p2gravity.toml`)
//! - `RUST_LOG`: Log filter (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::{style, Term};
use tracing::info;

use p2_gravity::catalog::{SimbadCatalog, TargetResolver};
use p2_gravity::config::{samples, ClientConfig, ObsConfig};
use p2_gravity::p2::{Credentials, P2Environment, RepositoryFactory};
use p2_gravity::services::{AutoConfirm, Confirmation, Submission, TerminalConfirm};

#[derive(Parser)]
#[command(name = "create-obs")]
#[command(about = "Create GRAVITY Observing Blocks on ESO P2", long_about = None)]
#[command(version)]
struct Cli {
    /// Observation configuration (YAML)
    #[arg(required_unless_present = "generate")]
    file: Option<PathBuf>,

    /// Write a sample configuration of the given type and exit
    #[arg(long, value_name = "TYPE")]
    generate: Option<String>,

    /// Use the P2 demo server and its tutorial account
    #[arg(long)]
    demo: bool,

    /// Send every OB without asking for confirmation
    #[arg(long)]
    nogui: bool,

    /// Client settings file (default: p2gravity.toml in the usual places)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn prompt_credentials(username: Option<&str>) -> Result<Credentials> {
    let term = Term::stderr();
    let username = match username {
        Some(name) => name.to_string(),
        None => {
            term.write_str("P2 username: ")?;
            term.read_line()?.trim().to_string()
        }
    };
    term.write_str(&format!("P2 password for {}: ", username))?;
    let password = term.read_secure_line()?;
    Ok(Credentials::new(username, password))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Some(ref kind) = cli.generate {
        let cwd = std::env::current_dir()?;
        let path = samples::write_sample(kind, &cwd)?;
        println!("Sample configuration written to {}", path.display());
        return Ok(());
    }

    let file = match cli.file {
        Some(ref file) => file,
        None => bail!("no configuration file given"),
    };
    let config = ObsConfig::from_file(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    let client = match cli.config {
        Some(ref path) => ClientConfig::from_file(path)?,
        None => ClientConfig::from_default_location()?,
    };

    let (environment, credentials) = if cli.demo {
        (P2Environment::Demo, Some(Credentials::demo()))
    } else {
        match client.environment()? {
            P2Environment::Local => (P2Environment::Local, None),
            env => (env, Some(prompt_credentials(client.p2.username.as_deref())?)),
        }
    };

    info!(
        "create-obs v{} - {} OBs for run {} on P2 {}",
        env!("CARGO_PKG_VERSION"),
        config.observing_blocks.len(),
        config.setup.run_id,
        environment
    );

    let repo = RepositoryFactory::create(environment, credentials.as_ref(), client.p2_timeout())
        .await
        .context("Failed to connect to P2")?;
    let catalog = SimbadCatalog::new(&client.simbad.url, client.simbad_timeout())?;
    let resolver = TargetResolver::new(Arc::new(catalog));
    let confirmation: Box<dyn Confirmation> = if cli.nogui {
        Box::new(AutoConfirm)
    } else {
        Box::new(TerminalConfirm)
    };

    let submission = Submission::new(repo.as_ref(), &resolver, confirmation.as_ref());
    let report = submission.submit_all(&config).await?;

    println!();
    println!("{}", style(format!("Run {}", report.run_id)).bold());
    println!("{}", report);

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
