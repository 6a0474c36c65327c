//! Common stack adapter trait and factory.

use crate::error::Result;
use crate::esxi::EsxiStack;
use crate::example::ExampleStack;
use crate::vcf::VcfStack;
use drover_config::{Config, ProjectType};
use drover_engine::{EngineStack, OutputMap, UpResult};
use serde::Serialize;
use std::path::Path;

/// Opaque engine-side state snapshot. Presently only the last run error;
/// endpoint metadata may join it later.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StackState {
    pub error: Option<String>,
}

/// One deployable stack, as seen by the controller.
///
/// All project types expose the same lifecycle; the differences live in
/// `configure`, which translates typed config props into engine settings.
#[async_trait::async_trait]
pub trait StackAdapter: Send + Sync {
    /// Pushes every engine setting derived from `cfg`. Idempotent; called
    /// once per controller reconfiguration.
    async fn configure(&self, cfg: &Config) -> Result<()>;

    /// Syncs the engine's view with the actually provisioned resources.
    async fn refresh(&self) -> Result<()>;

    /// Reconciles desired state and returns the stack outputs.
    async fn update(&self) -> Result<UpResult>;

    /// Tears down every resource of the stack.
    async fn destroy(&self) -> Result<()>;

    /// Current stack outputs.
    async fn outputs(&self) -> Result<OutputMap>;

    /// Message of the last failed engine run, if the most recent one failed.
    fn last_error(&self) -> Option<String>;

    /// Snapshot of the adapter's engine-side state.
    fn state(&self) -> StackState {
        StackState {
            error: self.last_error(),
        }
    }
}

/// Creates the adapter for `project`, selecting (or creating) the named
/// stack in the matching engine project under `project_root`.
pub async fn init_adapter(
    project: ProjectType,
    stack_name: &str,
    project_root: &Path,
) -> Result<Box<dyn StackAdapter>> {
    let project_dir = project_root.join(project.project_dir());
    let engine = EngineStack::select_or_create(stack_name, &project_dir).await?;
    let adapter: Box<dyn StackAdapter> = match project {
        ProjectType::Example => Box::new(ExampleStack::new(engine)),
        ProjectType::Esxi => Box::new(EsxiStack::new(engine)),
        ProjectType::VcfManagement | ProjectType::VcfWorkload => Box::new(VcfStack::new(engine)),
    };
    tracing::debug!(project = %project, stack = stack_name, "stack adapter initialized");
    Ok(adapter)
}
