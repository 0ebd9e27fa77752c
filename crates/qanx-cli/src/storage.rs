//! Ledger state storage
//!
//! The whole token state lives in a single JSON snapshot that is rewritten
//! after every successful operation.

use std::path::{Path, PathBuf};

use qanx_core::Token;
use tracing::debug;

use crate::error::{CliError, Result};

const STATE_FILE: &str = "state.json";

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<data_local_dir>/qanx/state.json`
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("qanx")
            .join(STATE_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Token> {
        if !self.exists() {
            return Err(CliError::StateNotInitialized(self.path.display().to_string()));
        }
        let content = std::fs::read_to_string(&self.path)?;
        let token: Token = serde_json::from_str(&content)?;
        token.validate()?;
        debug!("Loaded state from {:?}", self.path);
        Ok(token)
    }

    pub fn save(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(token)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &self.path)?;

        debug!("Saved state to {:?}", self.path);
        Ok(())
    }

    /// Write a fresh snapshot, refusing to overwrite unless `force` is set
    pub fn init(&self, token: &Token, force: bool) -> Result<()> {
        if self.exists() && !force {
            return Err(CliError::StateExists(self.path.display().to_string()));
        }
        self.save(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qanx_core::{Address, TokenConfig};

    fn token() -> Token {
        let config = TokenConfig::new(1, Address::new([0xcc; 20]), Address::new([0xaa; 20]));
        Token::genesis(&config).unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.json"));

        assert!(matches!(store.load(), Err(CliError::StateNotInitialized(_))));

        store.init(&token(), false).unwrap();
        assert_eq!(store.load().unwrap(), token());
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        store.init(&token(), false).unwrap();
        assert!(matches!(
            store.init(&token(), false),
            Err(CliError::StateExists(_))
        ));
        store.init(&token(), true).unwrap();
    }

    #[test]
    fn test_load_rejects_oversized_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        store.init(&token(), false).unwrap();

        let mut state: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        state["decimals"] = serde_json::json!(39);
        std::fs::write(store.path(), state.to_string()).unwrap();

        assert!(matches!(
            store.load(),
            Err(CliError::Core(qanx_core::Error::Config(_)))
        ));
    }
}
