//! Pulumi CLI wrapper
//!
//! Wraps the `pulumi` CLI for stack lifecycle operations. One
//! [`EngineStack`] wraps one named stack of one local engine project and
//! is reused for the life of its controller.

use crate::error::{EngineError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::Command;

/// One engine config setting. Secrets are stored encrypted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue {
    pub value: String,
    pub secret: bool,
}

impl ConfigValue {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            secret: false,
        }
    }

    pub fn secret(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            secret: true,
        }
    }
}

/// Ordered set of engine config settings.
pub type ConfigMap = BTreeMap<String, ConfigValue>;

/// Stack outputs keyed by output name.
pub type OutputMap = BTreeMap<String, serde_json::Value>;

/// Result of an update run.
#[derive(Debug, Clone, Default)]
pub struct UpResult {
    pub outputs: OutputMap,
}

/// Handle to one named stack managed by the external engine.
pub struct EngineStack {
    name: String,
    project_dir: PathBuf,
    program: String,
    last_error: Mutex<Option<String>>,
}

impl EngineStack {
    /// Idempotently creates or selects the named stack in `project_dir`.
    pub async fn select_or_create(name: &str, project_dir: &Path) -> Result<Self> {
        let stack = Self::with_program("pulumi", name, project_dir);
        stack
            .run(&[
                "stack",
                "select",
                "--stack",
                &stack.name,
                "--create",
                "--non-interactive",
            ])
            .await?;
        tracing::debug!(stack = %stack.name, dir = %project_dir.display(), "selected stack");
        Ok(stack)
    }

    /// Builds a handle without touching the engine. Used by tests to point
    /// at a stand-in binary.
    pub fn with_program(program: impl Into<String>, name: &str, project_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            project_dir: project_dir.to_path_buf(),
            program: program.into(),
            last_error: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Last error recorded by refresh/update/destroy, cleared after a
    /// clean run.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd.current_dir(&self.project_dir);
        cmd.env("PULUMI_SKIP_UPDATE_CHECK", "true");
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(stack = %self.name, "running: {} {}", self.program, args.join(" "));

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::PulumiNotFound
            } else {
                EngineError::Io(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn record<T>(&self, result: Result<T>) -> Result<T> {
        let mut last = self
            .last_error
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match &result {
            Ok(_) => *last = None,
            Err(e) => *last = Some(e.to_string()),
        }
        result
    }

    /// Pushes one setting into the stack's config store.
    pub async fn set_config(&self, key: &str, value: &ConfigValue) -> Result<()> {
        let args = config_set_args(&self.name, key, value);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&args).await?;
        Ok(())
    }

    /// Pushes every setting in `map`, in key order.
    pub async fn set_all_config(&self, map: &ConfigMap) -> Result<()> {
        for (key, value) in map {
            self.set_config(key, value).await?;
        }
        Ok(())
    }

    /// Pulls current provisioned state into the engine's checkpoint.
    pub async fn refresh(&self) -> Result<()> {
        let result = self
            .run(&[
                "refresh",
                "--yes",
                "--non-interactive",
                "--stack",
                &self.name,
            ])
            .await
            .map(|_| ());
        self.record(result)
    }

    /// Runs the create/update reconciliation and returns the stack outputs.
    pub async fn up(&self) -> Result<UpResult> {
        let result: Result<UpResult> = async {
            self.run(&["up", "--yes", "--non-interactive", "--stack", &self.name])
                .await?;
            let outputs = self.outputs().await?;
            Ok(UpResult { outputs })
        }
        .await;
        self.record(result)
    }

    /// Tears down every resource of the stack.
    pub async fn destroy(&self) -> Result<()> {
        let result = self
            .run(&[
                "destroy",
                "--yes",
                "--non-interactive",
                "--stack",
                &self.name,
            ])
            .await
            .map(|_| ());
        self.record(result)
    }

    /// Reads the stack's current output map.
    pub async fn outputs(&self) -> Result<OutputMap> {
        let text = self
            .run(&["stack", "output", "--json", "--stack", &self.name])
            .await?;
        parse_outputs(&text)
    }
}

fn config_set_args(stack: &str, key: &str, value: &ConfigValue) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "config".into(),
        "set".into(),
        "--stack".into(),
        stack.into(),
        "--non-interactive".into(),
    ];
    if value.secret {
        args.push("--secret".into());
    } else {
        args.push("--plaintext".into());
    }
    args.push("--".into());
    args.push(key.into());
    args.push(value.value.clone());
    args
}

fn parse_outputs(text: &str) -> Result<OutputMap> {
    if text.trim().is_empty() {
        return Ok(OutputMap::new());
    }
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_set_args_marks_secrets() {
        let plain = config_set_args("foo", "openstack:region", &ConfigValue::plain("qa-de-1"));
        assert!(plain.contains(&"--plaintext".to_string()));
        assert!(!plain.contains(&"--secret".to_string()));

        let secret = config_set_args("foo", "openstack:password", &ConfigValue::secret("hunter2"));
        assert!(secret.contains(&"--secret".to_string()));
        assert_eq!(secret.last().unwrap(), "hunter2");
    }

    #[test]
    fn parse_outputs_handles_empty_and_json() {
        assert!(parse_outputs("  \n").unwrap().is_empty());

        let outputs = parse_outputs(r#"{"nodeNetworkID": "net-123", "count": 2}"#).unwrap();
        assert_eq!(outputs["nodeNetworkID"], serde_json::json!("net-123"));
        assert_eq!(outputs["count"], serde_json::json!(2));
    }

    #[tokio::test]
    async fn missing_program_is_a_distinct_error() {
        let dir = tempfile::tempdir().unwrap();
        let stack = EngineStack::with_program("definitely-not-a-real-engine", "s", dir.path());
        let err = stack.refresh().await.unwrap_err();
        assert!(matches!(err, EngineError::PulumiNotFound));
        // The failure is recorded on the handle.
        assert!(stack.last_error().is_some());
    }
}
