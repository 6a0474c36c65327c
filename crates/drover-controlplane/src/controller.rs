//! Per-stack reconciliation controller.
//!
//! One controller owns one stack config and drives its adapter through
//! the deployment loop: initialize, configure, refresh, update. The loop
//! runs every reconciliation period and can be nudged early through the
//! update channel; any step failing abandons the iteration and the next
//! tick starts over from the failed step.

use crate::error::{ControlError, Result};
use drover_config::{
    merge_stack_props, read_config, write_config, Config, Keypair, ProjectType,
};
use drover_engine::log_resource_tree;
use drover_stacks::{init_adapter, StackAdapter, StackError};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Interval between reconciliation runs.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(15 * 60);

/// Upper bound for a single engine operation. Refresh and update runs
/// against a large domain can be slow, but not unbounded.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10 * 60);

pub struct Controller {
    project: ProjectType,
    stack_name: String,
    config_path: PathBuf,
    project_root: PathBuf,
    period: Duration,
    op_timeout: Duration,
    inner: Mutex<Inner>,
}

struct Inner {
    config: Config,
    stack: Option<Box<dyn StackAdapter>>,
    configured: bool,
    last_error: Option<String>,
}

impl Controller {
    /// Creates a controller for a new config and persists the config file.
    /// Fails if a file for this (project, stack) pair already exists.
    pub fn new(project_root: &Path, config_dir: &Path, config: Config) -> Result<Self> {
        config.validate()?;
        let config_path = config_dir.join(config.file_name());
        write_config(&config_path, &config, false)?;
        Ok(Self::assemble(project_root, config_path, config))
    }

    /// Creates a controller from an existing config file, resolving its
    /// `dependsOn` base properties.
    pub fn from_config_file(project_root: &Path, config_path: &Path) -> Result<Self> {
        let config = read_config(config_path)?;
        Ok(Self::assemble(
            project_root,
            config_path.to_path_buf(),
            config,
        ))
    }

    fn assemble(project_root: &Path, config_path: PathBuf, config: Config) -> Self {
        Self {
            project: config.project,
            stack_name: config.stack.clone(),
            config_path,
            project_root: project_root.to_path_buf(),
            period: DEFAULT_PERIOD,
            op_timeout: DEFAULT_OP_TIMEOUT,
            inner: Mutex::new(Inner {
                config,
                stack: None,
                configured: false,
                last_error: None,
            }),
        }
    }

    pub fn project(&self) -> ProjectType {
        self.project
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Snapshot of the current config.
    pub async fn config(&self) -> Config {
        self.inner.lock().await.config.clone()
    }

    /// Message of the last failed reconciliation, cleared after a clean run.
    pub async fn last_error(&self) -> Option<String> {
        self.inner.lock().await.last_error.clone()
    }

    /// The `.ssh/` directory next to the config file.
    fn ssh_dir(&self) -> PathBuf {
        self.config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(".ssh")
    }

    async fn with_deadline<T>(&self, fut: impl Future<Output = T>) -> Result<T> {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| ControlError::Deadline(self.op_timeout))
    }

    /// Selects (or creates) the engine stack and builds its adapter.
    /// Idempotent; a second call is a no-op.
    pub async fn init_stack(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.stack.is_some() {
            return Ok(());
        }
        let adapter = self
            .with_deadline(init_adapter(
                self.project,
                &self.stack_name,
                &self.project_root,
            ))
            .await??;
        inner.stack = Some(adapter);
        Ok(())
    }

    /// Pushes the current config into the engine stack's settings.
    ///
    /// The SSH keypair is read lazily: when the adapter reports a missing
    /// keypair, the key files are loaded from `.ssh/` next to the config
    /// file and configuration is retried exactly once.
    pub async fn configure_stack(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let Inner {
            config, stack, ..
        } = &mut *inner;
        let stack = stack.as_ref().ok_or(ControlError::StackUninitialized)?;

        match self.with_deadline(stack.configure(config)).await? {
            Err(StackError::KeypairNotSet) => {
                config.keypair = Some(Keypair::load(&self.ssh_dir())?);
                self.with_deadline(stack.configure(config)).await??;
            }
            result => result?,
        }
        inner.configured = true;
        Ok(())
    }

    /// Syncs the engine's checkpoint with the provisioned resources.
    pub async fn refresh_stack(&self) -> Result<()> {
        let inner = self.inner.lock().await;
        let stack = inner.stack.as_ref().ok_or(ControlError::StackUninitialized)?;
        self.with_deadline(stack.refresh()).await??;
        Ok(())
    }

    /// Runs the reconciling update and logs the resulting stack outputs.
    pub async fn update_stack(&self) -> Result<()> {
        let inner = self.inner.lock().await;
        let stack = inner.stack.as_ref().ok_or(ControlError::StackUninitialized)?;
        let result = self.with_deadline(stack.update()).await??;
        if !result.outputs.is_empty() {
            tracing::debug!(stack = %self.stack_name, "stack outputs:");
            for (key, value) in &result.outputs {
                tracing::debug!("\t{key} {value}");
            }
        }
        Ok(())
    }

    /// Tears down every resource of the stack. The config file stays.
    pub async fn destroy_stack(&self) -> Result<()> {
        let inner = self.inner.lock().await;
        let stack = inner.stack.as_ref().ok_or(ControlError::StackUninitialized)?;
        self.with_deadline(stack.destroy()).await??;
        Ok(())
    }

    /// Merges `incoming` stack props into the config, persists the merged
    /// config and returns it. The (project, stack) identity never changes.
    pub async fn update_config(&self, incoming: &Config) -> Result<Config> {
        let mut inner = self.inner.lock().await;
        if inner.config.project != incoming.project {
            return Err(ControlError::UnmatchedProject);
        }
        if inner.config.stack != incoming.stack {
            return Err(ControlError::UnmatchedStack);
        }
        let merged = merge_stack_props(&inner.config, &incoming.props.stack)?;
        write_config(&self.config_path, &merged, true)?;
        inner.config = merged;
        Ok(inner.config.clone())
    }

    /// Re-reads the config file, keeping already loaded keypair material.
    /// The next loop iteration reconfigures the stack.
    pub async fn reload_config(&self) -> Result<()> {
        let fresh = read_config(&self.config_path)?;
        let mut inner = self.inner.lock().await;
        if inner.config.project != fresh.project {
            return Err(ControlError::UnmatchedProject);
        }
        if inner.config.stack != fresh.stack {
            return Err(ControlError::UnmatchedStack);
        }
        let keypair = inner.config.keypair.take();
        inner.config = fresh;
        inner.config.keypair = keypair;
        inner.configured = false;
        Ok(())
    }

    /// Runs the reconciliation loop until `cancel` fires.
    ///
    /// A message on `update_rx` forces reconfiguration on an immediate
    /// extra iteration and restarts the full period.
    pub async fn run(
        self: Arc<Self>,
        mut update_rx: mpsc::Receiver<()>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            self.run_once().await;

            tokio::select! {
                update = update_rx.recv() => {
                    if update.is_none() {
                        return;
                    }
                    self.inner.lock().await.configured = false;
                    ticker.reset();
                }
                _ = ticker.tick() => {}
                _ = cancel.cancelled() => {
                    tracing::info!(
                        project = %self.project,
                        stack = %self.stack_name,
                        "stopping controller loop"
                    );
                    // A restarted loop must reconfigure from scratch.
                    self.inner.lock().await.configured = false;
                    return;
                }
            }
        }
    }

    /// One loop iteration. Errors are recorded, not propagated; the next
    /// tick retries from the failed step.
    pub async fn run_once(&self) {
        match self.reconcile().await {
            Ok(()) => {
                self.inner.lock().await.last_error = None;
                if let Err(err) = log_resource_tree(&self.stack_name) {
                    tracing::debug!(stack = %self.stack_name, error = %err, "no resource tree");
                }
            }
            Err(err) => {
                tracing::error!(
                    project = %self.project,
                    stack = %self.stack_name,
                    error = %err,
                    "reconciliation failed"
                );
                self.inner.lock().await.last_error = Some(err.to_string());
            }
        }
    }

    async fn reconcile(&self) -> Result<()> {
        if self.inner.lock().await.stack.is_none() {
            tracing::info!(project = %self.project, stack = %self.stack_name, "initialize stack");
            self.init_stack().await?;
        }
        if !self.inner.lock().await.configured {
            tracing::info!(project = %self.project, stack = %self.stack_name, "configure stack");
            self.configure_stack().await?;
        }
        tracing::info!(project = %self.project, stack = %self.stack_name, "refresh stack");
        self.refresh_stack().await?;
        tracing::info!(project = %self.project, stack = %self.stack_name, "update stack");
        self.update_stack().await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn inject_stack(&self, adapter: Box<dyn StackAdapter>) {
        self.inner.lock().await.stack = Some(adapter);
    }

    #[cfg(test)]
    pub(crate) async fn is_configured(&self) -> bool {
        self.inner.lock().await.configured
    }
}
