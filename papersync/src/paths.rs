use std::path::{Path, PathBuf};

/// Expands a leading `~` or `~/` against `home`. Other values pass through.
pub fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

/// Like [`expand_with_home`] with the current user's home. Left as is when
/// there is no home directory.
pub fn expand_home(value: &str) -> PathBuf {
    match dirs::home_dir() {
        Some(home) => expand_with_home(value, &home),
        None => PathBuf::from(value),
    }
}
