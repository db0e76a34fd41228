//! Bundled sample configurations written by `create-obs --generate`.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;

const SAMPLES: &[(&str, &str)] = &[
    ("dual_on", include_str!("../../samples/dual_on.yml")),
    ("dual_off", include_str!("../../samples/dual_off.yml")),
    ("dual_off_calib", include_str!("../../samples/dual_off_calib.yml")),
    ("dual_wide_off", include_str!("../../samples/dual_wide_off.yml")),
    ("dual_wide_on", include_str!("../../samples/dual_wide_on.yml")),
    ("single_on", include_str!("../../samples/single_on.yml")),
    ("single_off", include_str!("../../samples/single_off.yml")),
];

/// Names accepted by [`sample`].
pub fn sample_names() -> Vec<&'static str> {
    SAMPLES.iter().map(|(name, _)| *name).collect()
}

/// YAML text of a bundled sample.
pub fn sample(name: &str) -> Result<&'static str, ConfigurationError> {
    let wanted = name.trim().to_lowercase();
    SAMPLES
        .iter()
        .find(|(n, _)| *n == wanted)
        .map(|(_, content)| *content)
        .ok_or_else(|| ConfigurationError::UnknownMode {
            mode: name.to_string(),
            expected: sample_names().join(", "),
        })
}

/// Write sample `name` as `<name>.yml` in `dir`.
///
/// Refuses to replace an existing file.
pub fn write_sample(name: &str, dir: &Path) -> Result<PathBuf, ConfigurationError> {
    let content = sample(name)?;
    let path = dir.join(format!("{}.yml", name.trim().to_lowercase()));

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                ConfigurationError::invalid(
                    "--generate",
                    "file",
                    format!("{} already exists, not overwriting", path.display()),
                )
            } else {
                ConfigurationError::Io {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;

    file.write_all(content.as_bytes())
        .map_err(|e| ConfigurationError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObsConfig;

    #[test]
    fn test_every_sample_parses() {
        for name in sample_names() {
            let config = ObsConfig::from_yaml_str(sample(name).unwrap())
                .unwrap_or_else(|e| panic!("{}: {}", name, e));
            assert!(!config.observing_blocks.is_empty(), "{}", name);
            for entry in &config.observing_blocks {
                entry.definition().unwrap();
            }
        }
    }

    #[test]
    fn test_unknown_sample() {
        let err = sample("triple_on").unwrap_err();
        assert!(err.to_string().contains("dual_wide_off"));
    }

    #[test]
    fn test_write_sample_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample("dual_off", dir.path()).unwrap();
        assert!(path.ends_with("dual_off.yml"));

        std::fs::write(&path, "edited").unwrap();
        let err = write_sample("dual_off", dir.path()).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "edited");
    }
}
