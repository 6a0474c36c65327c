//! On-disk YAML config store.
//!
//! One file per stack, named `{projectType}-{stackName}.yaml`. Reading
//! resolves `dependsOn` entries relative to the config's own directory and
//! layers their stack props into the config's ordered base-property list.

use crate::error::{ConfigError, Result};
use crate::model::Config;
use std::fs;
use std::path::{Path, PathBuf};

/// Parses the config at `path` and resolves its `dependsOn` chain.
///
/// Every dependency must exist and parse; a missing or unparseable
/// dependency fails the whole read. Cycles are detected and rejected.
pub fn read_config(path: &Path) -> Result<Config> {
    let mut visited = Vec::new();
    read_config_inner(path, &mut visited)
}

fn read_config_inner(path: &Path, visited: &mut Vec<PathBuf>) -> Result<Config> {
    let canonical = fs::canonicalize(path)?;
    if visited.contains(&canonical) {
        return Err(ConfigError::CircularDependency(path.display().to_string()));
    }
    visited.push(canonical);

    let text = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&text)?;
    cfg.validate()?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    for dep_name in cfg.depends_on.clone() {
        let dep_path = dir.join(&dep_name);
        if !dep_path.exists() {
            return Err(ConfigError::DependencyNotFound(dep_path));
        }
        let dep = read_config_inner(&dep_path, visited)?;
        tracing::debug!(config = %path.display(), dependency = %dep_name, "loaded base properties");
        cfg.base_props.push(dep.props.stack);
        cfg.base_props.extend(dep.base_props);
    }

    visited.pop();
    Ok(cfg)
}

/// Serializes `cfg` to `path`.
///
/// The stack props payload is written in its concrete typed shape, so the
/// file is self-describing and stable across tool versions. With
/// `overwrite` unset an existing file is an error.
pub fn write_config(path: &Path, cfg: &Config, overwrite: bool) -> Result<()> {
    if !overwrite && path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    let text = serde_yaml::to_string(cfg)?;
    fs::write(path, text)?;
    tracing::debug!(config = %path.display(), "wrote config");
    Ok(())
}

/// Lists the config file names (not paths) in `dir`, sorted.
pub fn list_config_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".yaml") || name.ends_with(".yml") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
