use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::paths::expand_with_home;
use crate::storage::{StoreError, default_db_path};
use crate::sync::{ForceUpdate, RunConfig, TargetDocEntry};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("unsupported sync mode: {0} (expected `update` or `mirror`)")]
    UnsupportedMode(String),
    #[error("home directory is unavailable")]
    MissingHome,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// Push new and changed items only.
    #[default]
    Update,
    /// Push, then delete target items the source no longer has.
    Mirror,
}

impl FromStr for SyncMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "update" => Ok(Self::Update),
            "mirror" => Ok(Self::Mirror),
            other => Err(ConfigError::UnsupportedMode(other.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub source: String,
    pub search_root: PathBuf,
    pub target_root: String,
    pub mode: SyncMode,
    pub skip_list: Vec<String>,
    pub pairing_code: Option<String>,
    pub force_update: bool,
    pub db_path: PathBuf,
    pub auth_url: Option<String>,
    pub storage_url: Option<String>,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let home = dirs::home_dir().ok_or(ConfigError::MissingHome)?;

        let source = read("PAPERSYNC_SOURCE").ok_or(ConfigError::Missing("PAPERSYNC_SOURCE"))?;
        let target_root =
            read("PAPERSYNC_TARGET_ROOT").ok_or(ConfigError::Missing("PAPERSYNC_TARGET_ROOT"))?;
        let mode = match read("PAPERSYNC_MODE") {
            Some(value) => value.parse()?,
            None => SyncMode::default(),
        };
        let search_root = read("PAPERSYNC_SEARCH_ROOT")
            .map(|value| expand_with_home(&value, &home))
            .unwrap_or_else(|| home.clone());
        let db_path = resolve_db_path(read("PAPERSYNC_DB"), &home)?;

        Ok(Self {
            source,
            search_root,
            target_root,
            mode,
            skip_list: read("PAPERSYNC_SKIP")
                .map(|value| split_list(&value))
                .unwrap_or_default(),
            pairing_code: read("PAPERSYNC_PAIRING_CODE").map(|code| code.trim().to_string()),
            force_update: read("PAPERSYNC_FORCE_UPDATE").is_some_and(|value| parse_bool(&value)),
            db_path,
            auth_url: read("PAPERSYNC_AUTH_URL"),
            storage_url: read("PAPERSYNC_STORAGE_URL"),
        })
    }

    pub fn run_config(&self) -> RunConfig {
        let force_update = self
            .force_update
            .then(|| Box::new(always) as ForceUpdate);
        RunConfig {
            source_locator: self.source.clone(),
            target_root: self.target_root.clone(),
            mode: self.mode,
            skip_list: self.skip_list.clone(),
            force_update,
        }
    }
}

fn always(_candidate: &TargetDocEntry, _observed: &TargetDocEntry) -> bool {
    true
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// State database location from `PAPERSYNC_DB`, as a full run would use it.
pub fn db_path_from_env() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::MissingHome)?;
    let value = std::env::var("PAPERSYNC_DB")
        .ok()
        .filter(|value| !value.trim().is_empty());
    resolve_db_path(value, &home)
}

fn resolve_db_path(value: Option<String>, home: &Path) -> Result<PathBuf, ConfigError> {
    match value {
        Some(value) => Ok(expand_with_home(&value, home)),
        None => Ok(default_db_path()?),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<SyncConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SyncConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("PAPERSYNC_SOURCE", "Books"),
        ("PAPERSYNC_TARGET_ROOT", "Library"),
        ("PAPERSYNC_DB", "/tmp/papersync-test.db"),
    ];

    #[test]
    fn defaults_to_update_mode_without_skips() {
        let config = config(&REQUIRED).unwrap();
        assert_eq!(config.mode, SyncMode::Update);
        assert!(config.skip_list.is_empty());
        assert!(!config.force_update);
        assert!(config.pairing_code.is_none());
        assert_eq!(config.db_path, PathBuf::from("/tmp/papersync-test.db"));
        assert!(config.run_config().force_update.is_none());
    }

    #[test]
    fn reads_mode_skip_list_and_force_flag() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("PAPERSYNC_MODE", "Mirror"),
            ("PAPERSYNC_SKIP", "Private, Drafts ,,"),
            ("PAPERSYNC_FORCE_UPDATE", "yes"),
            ("PAPERSYNC_PAIRING_CODE", " abcd1234 "),
        ]);
        let config = config(&vars).unwrap();

        assert_eq!(config.mode, SyncMode::Mirror);
        assert_eq!(config.skip_list, vec!["Private", "Drafts"]);
        assert!(config.force_update);
        assert_eq!(config.pairing_code.as_deref(), Some("abcd1234"));
        assert!(config.run_config().force_update.is_some());
    }

    #[test]
    fn rejects_unknown_mode() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PAPERSYNC_MODE", "bidirectional"));
        assert!(matches!(
            config(&vars),
            Err(ConfigError::UnsupportedMode(mode)) if mode == "bidirectional"
        ));
    }

    #[test]
    fn requires_source_and_target_root() {
        assert!(matches!(
            config(&[("PAPERSYNC_TARGET_ROOT", "Library")]),
            Err(ConfigError::Missing("PAPERSYNC_SOURCE"))
        ));
        assert!(matches!(
            config(&[("PAPERSYNC_SOURCE", "Books"), ("PAPERSYNC_TARGET_ROOT", "  ")]),
            Err(ConfigError::Missing("PAPERSYNC_TARGET_ROOT"))
        ));
    }

    #[test]
    fn db_path_expands_home_the_same_way_for_every_caller() {
        let home = Path::new("/home/reader");
        assert_eq!(
            resolve_db_path(Some("~/state/papersync.db".into()), home).unwrap(),
            PathBuf::from("/home/reader/state/papersync.db")
        );

        let mut vars = REQUIRED.to_vec();
        vars.retain(|(name, _)| *name != "PAPERSYNC_DB");
        vars.push(("PAPERSYNC_DB", "~/state/papersync.db"));
        let config = config(&vars).unwrap();
        let home = dirs::home_dir().unwrap();
        assert_eq!(config.db_path, home.join("state/papersync.db"));
    }

    #[test]
    fn db_path_defaults_to_the_data_dir() {
        let home = Path::new("/home/reader");
        assert_eq!(
            resolve_db_path(None, home).unwrap(),
            default_db_path().unwrap()
        );
    }
}
