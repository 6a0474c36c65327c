//! Controller registry.
//!
//! Owns one controller per config file and its background loop task,
//! keyed by config file name. The registry can re-scan the config
//! directory and converge the running controllers on what is on disk.

use crate::controller::Controller;
use crate::error::{ControlError, Result};
use drover_config::{list_config_files, read_config, Config, ProjectType};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

struct ControllerHandle {
    controller: Arc<Controller>,
    update_tx: mpsc::Sender<()>,
    cancel: CancellationToken,
}

pub struct Manager {
    project_root: PathBuf,
    config_dir: PathBuf,
    controllers: Mutex<HashMap<String, ControllerHandle>>,
}

/// Outcome of a config directory re-scan, as config file names.
#[derive(Debug, Default)]
pub struct ReloadReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub stopped: Vec<String>,
}

impl Manager {
    pub fn new(project_root: &Path, config_dir: &Path) -> Self {
        tracing::debug!(dir = %config_dir.display(), "config directory");
        tracing::debug!(dir = %project_root.display(), "project directory");
        Self {
            project_root: project_root.to_path_buf(),
            config_dir: config_dir.to_path_buf(),
            controllers: Mutex::new(HashMap::new()),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Registers a brand new config: persists its file and starts its
    /// reconciliation loop.
    pub async fn register(&self, config: Config) -> Result<Arc<Controller>> {
        let file_name = config.file_name();
        let mut controllers = self.controllers.lock().await;
        if controllers.contains_key(&file_name) {
            return Err(ControlError::AlreadyRegistered(file_name));
        }
        let controller = Arc::new(Controller::new(
            &self.project_root,
            &self.config_dir,
            config,
        )?);
        controllers.insert(file_name, spawn(controller.clone()));
        Ok(controller)
    }

    /// Loads an existing config file and starts its loop.
    async fn load(&self, file_name: &str) -> Result<Arc<Controller>> {
        let mut controllers = self.controllers.lock().await;
        if controllers.contains_key(file_name) {
            return Err(ControlError::AlreadyRegistered(file_name.to_string()));
        }
        let path = self.config_dir.join(file_name);
        let controller = Arc::new(Controller::from_config_file(&self.project_root, &path)?);
        controllers.insert(file_name.to_string(), spawn(controller.clone()));
        Ok(controller)
    }

    /// Looks up the controller for a (project, stack) pair.
    pub async fn get(&self, project: ProjectType, stack: &str) -> Result<Arc<Controller>> {
        let file_name = format!("{project}-{stack}.yaml");
        self.get_by_file(&file_name).await
    }

    pub async fn get_by_file(&self, file_name: &str) -> Result<Arc<Controller>> {
        let controllers = self.controllers.lock().await;
        controllers
            .get(file_name)
            .map(|h| h.controller.clone())
            .ok_or_else(|| ControlError::NotFound(file_name.to_string()))
    }

    /// Scans the config directory and starts a controller for every config
    /// file. Unreadable files are logged and skipped, never fatal.
    pub async fn start_all(&self) -> Result<()> {
        for file_name in list_config_files(&self.config_dir)? {
            match self.load(&file_name).await {
                Ok(_) => tracing::info!(file = file_name, "controller registered"),
                Err(err) => tracing::error!(file = file_name, error = %err, "skipping config"),
            }
        }
        Ok(())
    }

    /// Nudges a controller into an immediate reconfigure-and-reconcile.
    pub async fn trigger_update(&self, project: ProjectType, stack: &str) -> Result<()> {
        let file_name = format!("{project}-{stack}.yaml");
        let controllers = self.controllers.lock().await;
        let handle = controllers
            .get(&file_name)
            .ok_or_else(|| ControlError::NotFound(file_name.clone()))?;
        // A full channel means an update is already pending.
        let _ = handle.update_tx.try_send(());
        Ok(())
    }

    /// Merges new stack props into a running controller's config and
    /// triggers reconciliation.
    pub async fn update_config(&self, incoming: &Config) -> Result<Config> {
        let controller = self.get(incoming.project, &incoming.stack).await?;
        let merged = controller.update_config(incoming).await?;
        self.trigger_update(incoming.project, &incoming.stack).await?;
        Ok(merged)
    }

    /// Converges running controllers on the config directory contents:
    /// new files get controllers, known files are reloaded, controllers
    /// whose file disappeared are stopped.
    pub async fn reload_configs(&self) -> Result<ReloadReport> {
        let mut report = ReloadReport::default();
        let mut on_disk = Vec::new();
        for file_name in list_config_files(&self.config_dir)? {
            // Validate before touching the registry.
            if let Err(err) = read_config(&self.config_dir.join(&file_name)) {
                tracing::error!(file = file_name, error = %err, "skipping config");
                continue;
            }
            on_disk.push(file_name);
        }

        for file_name in &on_disk {
            let known = self.controllers.lock().await.contains_key(file_name);
            if known {
                let controller = self.get_by_file(file_name).await?;
                match controller.reload_config().await {
                    Ok(()) => {
                        let _ = self
                            .trigger_update(controller.project(), controller.stack_name())
                            .await;
                        report.updated.push(file_name.clone());
                    }
                    Err(err) => {
                        tracing::error!(file = file_name, error = %err, "reload failed")
                    }
                }
            } else {
                match self.load(file_name).await {
                    Ok(_) => report.created.push(file_name.clone()),
                    Err(err) => tracing::error!(file = file_name, error = %err, "load failed"),
                }
            }
        }

        let mut controllers = self.controllers.lock().await;
        let stale: Vec<String> = controllers
            .keys()
            .filter(|k| !on_disk.contains(k))
            .cloned()
            .collect();
        for file_name in stale {
            if let Some(handle) = controllers.remove(&file_name) {
                handle.cancel.cancel();
                tracing::info!(file = file_name, "controller stopped");
                report.stopped.push(file_name);
            }
        }
        Ok(report)
    }

    /// Stops every controller loop.
    pub async fn shutdown(&self) {
        let mut controllers = self.controllers.lock().await;
        for (file_name, handle) in controllers.drain() {
            handle.cancel.cancel();
            tracing::info!(file = file_name, "controller stopped");
        }
    }
}

fn spawn(controller: Arc<Controller>) -> ControllerHandle {
    let (update_tx, update_rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    tokio::spawn(controller.clone().run(update_rx, cancel.clone()));
    ControllerHandle {
        controller,
        update_tx,
        cancel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::esxi_config;
    use drover_config::write_config;

    fn manager_in(dir: &Path) -> Manager {
        Manager::new(&dir.join("projects"), dir)
    }

    #[tokio::test]
    async fn register_writes_config_file_and_starts_controller() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager_in(dir.path());

        m.register(esxi_config("pool")).await.unwrap();
        assert!(dir.path().join("esxi-pool.yaml").exists());
        assert!(m.get(ProjectType::Esxi, "pool").await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager_in(dir.path());

        m.register(esxi_config("pool")).await.unwrap();
        assert!(matches!(
            m.register(esxi_config("pool")).await,
            Err(ControlError::AlreadyRegistered(_))
        ));
    }

    #[tokio::test]
    async fn get_unknown_stack_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager_in(dir.path());
        assert!(matches!(
            m.get(ProjectType::Esxi, "ghost").await,
            Err(ControlError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn start_all_skips_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            &dir.path().join("esxi-good.yaml"),
            &esxi_config("good"),
            false,
        )
        .unwrap();
        std::fs::write(dir.path().join("esxi-bad.yaml"), "projectType: mystery\n").unwrap();

        let m = manager_in(dir.path());
        m.start_all().await.unwrap();
        assert!(m.get(ProjectType::Esxi, "good").await.is_ok());
        assert!(m.get_by_file("esxi-bad.yaml").await.is_err());
    }

    #[tokio::test]
    async fn reload_diffs_created_updated_and_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager_in(dir.path());
        m.register(esxi_config("old")).await.unwrap();
        m.register(esxi_config("kept")).await.unwrap();

        // One file removed, one new file appears, one stays.
        std::fs::remove_file(dir.path().join("esxi-old.yaml")).unwrap();
        write_config(&dir.path().join("esxi-new.yaml"), &esxi_config("new"), false).unwrap();

        let report = m.reload_configs().await.unwrap();
        assert_eq!(report.created, ["esxi-new.yaml"]);
        assert_eq!(report.updated, ["esxi-kept.yaml"]);
        assert_eq!(report.stopped, ["esxi-old.yaml"]);

        assert!(m.get(ProjectType::Esxi, "new").await.is_ok());
        assert!(m.get(ProjectType::Esxi, "old").await.is_err());
    }

    #[tokio::test]
    async fn update_config_requires_registered_controller() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager_in(dir.path());
        assert!(matches!(
            m.update_config(&esxi_config("ghost")).await,
            Err(ControlError::NotFound(_))
        ));
    }
}
