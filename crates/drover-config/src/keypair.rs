//! SSH keypair material for machine access to provisioned nodes.
//!
//! Keypairs are never stored in the config YAML. They live in a `.ssh/`
//! subdirectory next to the config file (`id_rsa` and `id_rsa.pub`) and
//! are read lazily, at most once per controller lifetime.

use crate::error::{ConfigError, Result};
use std::fs;
use std::path::Path;

pub const PUBLIC_KEY_FILE: &str = "id_rsa.pub";
pub const PRIVATE_KEY_FILE: &str = "id_rsa";

/// Loaded SSH key material.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keypair {
    pub public_key: String,
    pub private_key: String,
}

impl Keypair {
    /// Reads both key files from `dir` (the `.ssh/` directory).
    pub fn load(dir: &Path) -> Result<Self> {
        let public_path = dir.join(PUBLIC_KEY_FILE);
        let private_path = dir.join(PRIVATE_KEY_FILE);
        let public_key = read_key(&public_path)?;
        let private_key = read_key(&private_path)?;
        Ok(Self {
            public_key,
            // The engine's multi-line secret values need a leading newline
            // to survive the round trip through its config file.
            private_key: format!("\n{private_key}"),
        })
    }

    pub fn is_set(&self) -> bool {
        !self.public_key.is_empty() && !self.private_key.is_empty()
    }
}

fn read_key(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ConfigError::KeypairFileMissing(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_reads_both_keys() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PUBLIC_KEY_FILE), "ssh-rsa AAAA host").unwrap();
        fs::write(dir.path().join(PRIVATE_KEY_FILE), "-----BEGIN KEY-----").unwrap();

        let kp = Keypair::load(dir.path()).unwrap();
        assert_eq!(kp.public_key, "ssh-rsa AAAA host");
        assert_eq!(kp.private_key, "\n-----BEGIN KEY-----");
        assert!(kp.is_set());
    }

    #[test]
    fn load_fails_on_missing_private_key() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PUBLIC_KEY_FILE), "ssh-rsa AAAA").unwrap();

        let err = Keypair::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::KeypairFileMissing(_)));
    }

    #[test]
    fn default_keypair_is_not_set() {
        assert!(!Keypair::default().is_set());
    }
}
