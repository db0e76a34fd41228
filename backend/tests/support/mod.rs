#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use p2_gravity::catalog::{CatalogRecord, LocalCatalog, TargetResolver};
use p2_gravity::config::ObsConfig;
use p2_gravity::p2::repositories::LocalP2Repository;

pub const RUN_ID: &str = "60.A-9252(M)";

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the variables on unwind and serializes access to the process
/// environment across tests.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

// ==================== Fixtures ====================

/// In-memory store with the test run registered.
pub fn repository() -> LocalP2Repository {
    let repo = LocalP2Repository::new();
    repo.add_run(RUN_ID, "GRAVITY");
    repo
}

/// HD 1234 with full astrometry and K/H/V photometry.
pub fn hd1234() -> CatalogRecord {
    CatalogRecord {
        pm_ra: Some(-546.01),
        pm_dec: Some(93.4),
        parallax: Some(25.0),
        flux_v: Some(7.1),
        flux_h: Some(5.2),
        flux_k: Some(5.0),
        ..CatalogRecord::new("HD 1234", 70.269_875, 13.928_527_78)
    }
}

/// Catalog knowing HD 1234 once and "Ambiguous Star" twice.
pub fn catalog() -> Arc<LocalCatalog> {
    let catalog = Arc::new(LocalCatalog::new());
    catalog.insert("HD 1234", vec![hd1234()]);
    catalog.insert(
        "Ambiguous Star",
        vec![
            CatalogRecord::new("Ambiguous Star A", 10.0, -20.0),
            CatalogRecord::new("Ambiguous Star B", 10.1, -20.1),
        ],
    );
    catalog
}

pub fn resolver(catalog: &Arc<LocalCatalog>) -> TargetResolver {
    TargetResolver::new(catalog.clone())
}

/// Configuration with the given OB entries, in order, under a shared setup.
pub fn config(concatenation: &str, obs: &str) -> ObsConfig {
    let yaml = format!(
        "setup:\n  run_id: {run}\n  folder: integration\n  concatenation: {concatenation}\n  date: 2020-09-20\n  resolution: MEDIUM\n  polarisation: IN\n\nObservingBlocks:\n{obs}",
        run = RUN_ID,
        concatenation = concatenation,
        obs = obs
    );
    ObsConfig::from_yaml_str(&yaml).unwrap()
}

/// One `dual_off` OB entry on `target`.
pub fn dual_off_entry(label: &str, target: &str) -> String {
    format!(
        "  {label}:\n    mode: dual_off\n    target: {target}\n    calib: false\n    companion: [129.0, 198.0]\n    dit: 100\n    ndit: 4\n",
        label = label,
        target = target
    )
}
