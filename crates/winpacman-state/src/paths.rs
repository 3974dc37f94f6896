//! XDG-style app directory layout (spec §4.8 "Directory layout").

use std::path::PathBuf;

/// Resolved locations of everything winpacman reads or writes outside the
/// provider filesystem boundary. Windows' `%APPDATA%\Local\winpacman\`
/// maps onto `dirs::data_local_dir()`, the same base every other platform
/// this crate might run on resolves through `dirs`.
#[derive(Debug, Clone)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The conventional location: `<data_local_dir>/winpacman`.
    pub fn discover() -> Option<Self> {
        dirs::data_local_dir().map(|base| Self::new(base.join("winpacman")))
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("config.json")
    }

    pub fn metadata_cache_db(&self) -> PathBuf {
        self.data_dir().join("metadata_cache.db")
    }

    pub fn history_file(&self) -> PathBuf {
        self.data_dir().join("history.json")
    }

    /// Create every directory in the layout if it doesn't already exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.config_dir())?;
        std::fs::create_dir_all(self.data_dir())?;
        std::fs::create_dir_all(self.cache_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_the_documented_tree() {
        let paths = AppPaths::new(PathBuf::from("/tmp/winpacman-test"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/winpacman-test/config/config.json"));
        assert_eq!(paths.metadata_cache_db(), PathBuf::from("/tmp/winpacman-test/data/metadata_cache.db"));
        assert_eq!(paths.history_file(), PathBuf::from("/tmp/winpacman-test/data/history.json"));
    }
}
