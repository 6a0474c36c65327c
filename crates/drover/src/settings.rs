//! Runtime directory layout.
//!
//! Everything hangs off the work directory: stack configs live in
//! `etc/`, the engine projects in `projects/`. Both can be pointed
//! elsewhere individually.

use std::path::{Path, PathBuf};

pub const ENV_WORK_DIR: &str = "DROVER_WORK_DIR";
pub const ENV_CONFIG_DIR: &str = "DROVER_CONFIG_DIR";
pub const ENV_PROJECT_ROOT: &str = "DROVER_PROJECT_ROOT";

#[derive(Debug, Clone)]
pub struct Settings {
    config_dir: PathBuf,
    project_root: PathBuf,
}

impl Settings {
    /// Resolves the directory layout from the environment.
    pub fn from_env() -> std::io::Result<Self> {
        let work_dir = match std::env::var_os(ENV_WORK_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir()?,
        };
        let config_dir = std::env::var_os(ENV_CONFIG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| work_dir.join("etc"));
        let project_root = std::env::var_os(ENV_PROJECT_ROOT)
            .map(PathBuf::from)
            .unwrap_or_else(|| work_dir.join("projects"));
        Ok(Self {
            config_dir,
            project_root,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_default_under_work_dir() {
        temp_env::with_vars(
            [
                (ENV_WORK_DIR, Some("/var/lib/drover")),
                (ENV_CONFIG_DIR, None),
                (ENV_PROJECT_ROOT, None),
            ],
            || {
                let s = Settings::from_env().unwrap();
                assert_eq!(s.config_dir(), Path::new("/var/lib/drover/etc"));
                assert_eq!(s.project_root(), Path::new("/var/lib/drover/projects"));
            },
        );
    }

    #[test]
    fn explicit_directories_win() {
        temp_env::with_vars(
            [
                (ENV_WORK_DIR, Some("/var/lib/drover")),
                (ENV_CONFIG_DIR, Some("/etc/drover")),
                (ENV_PROJECT_ROOT, Some("/opt/projects")),
            ],
            || {
                let s = Settings::from_env().unwrap();
                assert_eq!(s.config_dir(), Path::new("/etc/drover"));
                assert_eq!(s.project_root(), Path::new("/opt/projects"));
            },
        );
    }
}
