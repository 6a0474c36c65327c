//! Example stack adapter.
//!
//! Minimal template used for smoke-testing the deployment loop: it only
//! needs the shared OpenStack provider settings, no project settings and
//! no keypair.

use crate::adapter::StackAdapter;
use crate::error::Result;
use crate::openstack;
use drover_config::Config;
use drover_engine::{EngineStack, OutputMap, UpResult};

pub struct ExampleStack {
    engine: EngineStack,
}

impl ExampleStack {
    pub fn new(engine: EngineStack) -> Self {
        Self { engine }
    }
}

#[async_trait::async_trait]
impl StackAdapter for ExampleStack {
    async fn configure(&self, cfg: &Config) -> Result<()> {
        let credentials = openstack::credential_settings(&cfg.props.openstack)?;
        self.engine.set_all_config(&credentials).await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        Ok(self.engine.refresh().await?)
    }

    async fn update(&self) -> Result<UpResult> {
        Ok(self.engine.up().await?)
    }

    async fn destroy(&self) -> Result<()> {
        Ok(self.engine.destroy().await?)
    }

    async fn outputs(&self) -> Result<OutputMap> {
        Ok(self.engine.outputs().await?)
    }

    fn last_error(&self) -> Option<String> {
        self.engine.last_error()
    }
}
