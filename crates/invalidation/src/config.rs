//! Process-wide invalidation configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then the
//! `STALE_*` environment variables, then whatever the caller sets explicitly.
//!
//! ```toml
//! workdir = "/var/cache/stale"
//! schema-version = "7"
//! ```

use crate::generator::{CachePolicy, KeyGenerator};
use crate::invalidator::{BuildInvalidator, validate_component};
use crate::{Error, Result};
use dirs::{cache_dir, home_dir};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Schema version used when none is configured.
///
/// Bump it to invalidate every existing key, e.g. after fixing a bug that caused
/// bad artifacts to be cached.
pub const DEFAULT_SCHEMA_VERSION: &str = "7";

/// Environment variable overriding the working directory
pub const WORKDIR_ENV: &str = "STALE_WORKDIR";

/// Environment variable overriding the schema version
pub const SCHEMA_VERSION_ENV: &str = "STALE_SCHEMA_VERSION";

const INVALIDATOR_DIR: &str = "build_invalidator";

/// Invalidation settings shared by every generator and invalidator of a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct InvalidationConfig {
    /// Working directory holding persisted state; resolved from the environment
    /// and platform cache directories when unset
    pub workdir: Option<PathBuf>,
    /// Global schema version mixed into every key and record path
    pub schema_version: String,
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        Self {
            workdir: None,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
        }
    }
}

impl InvalidationConfig {
    /// Defaults overridden by the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env(|name| std::env::var(name).ok())
    }

    /// Parse a TOML configuration document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::serialization(format!("Failed to parse configuration: {e}")))
    }

    /// Load a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), ?config, "Loaded invalidation configuration");
        Ok(config)
    }

    /// Apply `STALE_*` overrides read through `lookup`. Blank values are ignored.
    #[must_use]
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(workdir) = lookup(WORKDIR_ENV) {
            self.workdir = Some(PathBuf::from(workdir));
        }
        if let Some(version) = lookup(SCHEMA_VERSION_ENV) {
            self.schema_version = version.trim().to_string();
        }
        self
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        validate_component("schema version", &self.schema_version)
    }

    /// The configured working directory, or the first writable default location
    pub fn workdir(&self) -> Result<PathBuf> {
        match &self.workdir {
            Some(dir) => Ok(dir.clone()),
            None => default_workdir(),
        }
    }

    /// Root under which all invalidators keep their records
    pub fn invalidator_root(&self) -> Result<PathBuf> {
        Ok(self.workdir()?.join(INVALIDATOR_DIR))
    }

    /// Create a build invalidator, optionally scoped to a task.
    ///
    /// Without a scope the invalidator acts globally across all tasks.
    pub fn invalidator(&self, scope: Option<&str>) -> Result<BuildInvalidator> {
        self.validate()?;
        BuildInvalidator::new(self.invalidator_root()?, &self.schema_version, scope)
    }

    /// Create the key generator for `policy`, seeded with this configuration's
    /// schema version and `base_inputs`
    pub fn key_generator<I, B>(&self, policy: CachePolicy, base_inputs: I) -> KeyGenerator
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        KeyGenerator::for_policy(policy, &self.schema_version, base_inputs)
    }
}

/// Inputs for determining the default working directory
#[derive(Debug, Clone)]
struct WorkdirInputs {
    xdg_cache_home: Option<PathBuf>,
    os_cache_dir: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    temp_dir: PathBuf,
}

fn workdir_from_inputs(inputs: WorkdirInputs) -> Result<PathBuf> {
    // Resolution order (first writable wins):
    // 1) XDG_CACHE_HOME/stale
    // 2) OS cache dir/stale
    // 3) ~/.stale/cache
    // 4) TMPDIR/stale/cache (fallback)
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(xdg) = inputs.xdg_cache_home {
        candidates.push(xdg.join("stale"));
    }
    if let Some(os_cache) = inputs.os_cache_dir {
        candidates.push(os_cache.join("stale"));
    }
    if let Some(home) = inputs.home_dir {
        candidates.push(home.join(".stale/cache"));
    }
    candidates.push(inputs.temp_dir.join("stale/cache"));

    for path in candidates {
        if path.starts_with("/homeless-shelter") {
            continue;
        }
        // An existing directory may still be read-only (some CI images mount $HOME so).
        if path.exists() {
            match tempfile::tempfile_in(&path) {
                Ok(_) => return Ok(path),
                Err(_) => continue,
            }
        }
        if std::fs::create_dir_all(&path).is_ok() {
            return Ok(path);
        }
    }
    Err(Error::configuration(
        "Failed to determine a writable working directory",
    ))
}

fn default_workdir() -> Result<PathBuf> {
    let inputs = WorkdirInputs {
        xdg_cache_home: std::env::var("XDG_CACHE_HOME")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from),
        os_cache_dir: cache_dir(),
        home_dir: home_dir(),
        temp_dir: std::env::temp_dir(),
    };
    workdir_from_inputs(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = InvalidationConfig::default();
        assert_eq!(config.schema_version, DEFAULT_SCHEMA_VERSION);
        assert!(config.workdir.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn parses_toml() {
        let config =
            InvalidationConfig::from_toml_str("workdir = \"/srv/work\"\nschema-version = \"9\"\n")
                .unwrap();
        assert_eq!(config.workdir, Some(PathBuf::from("/srv/work")));
        assert_eq!(config.schema_version, "9");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = InvalidationConfig::from_toml_str("workdir = \"/srv/work\"").unwrap();
        assert_eq!(config.schema_version, DEFAULT_SCHEMA_VERSION);
    }

    #[test]
    fn unknown_toml_keys_are_rejected() {
        let err = InvalidationConfig::from_toml_str("schema_version = \"9\"").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn load_reads_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stale.toml");
        std::fs::write(&path, "schema-version = \"12\"").unwrap();
        assert_eq!(InvalidationConfig::load(&path).unwrap().schema_version, "12");
        assert!(matches!(
            InvalidationConfig::load(temp.path().join("missing.toml")),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn env_overrides_file_values() {
        let config = InvalidationConfig {
            workdir: Some(PathBuf::from("/from/file")),
            schema_version: "9".into(),
        }
        .with_env(env(&[(WORKDIR_ENV, "/from/env"), (SCHEMA_VERSION_ENV, " 10 ")]));
        assert_eq!(config.workdir, Some(PathBuf::from("/from/env")));
        assert_eq!(config.schema_version, "10");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config = InvalidationConfig::default().with_env(env(&[(SCHEMA_VERSION_ENV, "  ")]));
        assert_eq!(config.schema_version, DEFAULT_SCHEMA_VERSION);
    }

    #[test]
    fn validate_rejects_bad_schema_version() {
        let mut config = InvalidationConfig::default();
        config.schema_version = "7/8".into();
        assert!(config.validate().is_err());
        config.schema_version = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalidator_is_rooted_under_workdir() {
        let temp = TempDir::new().unwrap();
        let config = InvalidationConfig {
            workdir: Some(temp.path().to_path_buf()),
            ..Default::default()
        };
        let inv = config.invalidator(Some("compile")).unwrap();
        assert_eq!(
            inv.root(),
            temp.path()
                .join(INVALIDATOR_DIR)
                .join(DEFAULT_SCHEMA_VERSION)
                .join("compile")
        );
    }

    #[test]
    fn key_generator_uses_schema_version() {
        let a = InvalidationConfig::default().key_generator(CachePolicy::Cacheable, [b"v1"]);
        let b = InvalidationConfig {
            schema_version: "8".into(),
            ..Default::default()
        }
        .key_generator(CachePolicy::Cacheable, [b"v1"]);
        assert_ne!(a, b);
        assert!(matches!(
            InvalidationConfig::default().key_generator(CachePolicy::Disabled, [b"v1"]),
            KeyGenerator::Uncacheable(_)
        ));
    }

    #[test]
    fn workdir_skips_homeless_shelter() {
        let tmp = std::env::temp_dir();
        let inputs = WorkdirInputs {
            xdg_cache_home: Some(PathBuf::from("/homeless-shelter/.cache")),
            os_cache_dir: None,
            home_dir: Some(PathBuf::from("/homeless-shelter")),
            temp_dir: tmp.clone(),
        };
        let dir = workdir_from_inputs(inputs).expect("should choose a writable fallback");
        assert!(!dir.starts_with("/homeless-shelter"));
        assert!(dir.starts_with(&tmp));
    }

    #[test]
    fn workdir_prefers_xdg_cache_home() {
        let temp = TempDir::new().unwrap();
        let inputs = WorkdirInputs {
            xdg_cache_home: Some(temp.path().to_path_buf()),
            os_cache_dir: None,
            home_dir: None,
            temp_dir: std::env::temp_dir(),
        };
        let dir = workdir_from_inputs(inputs).unwrap();
        assert_eq!(dir, temp.path().join("stale"));
        assert!(dir.is_dir());
    }
}
