//! ESXi node pool stack adapter.
//!
//! Drives the bare-metal ESXi engine project: node and share lists are
//! pushed as JSON-encoded settings, networks by subnet. No keypair is
//! installed at this layer.

use crate::adapter::StackAdapter;
use crate::error::{Result, StackError};
use crate::openstack;
use drover_config::{Config, EsxiProps};
use drover_engine::{ConfigMap, ConfigValue, EngineStack, OutputMap, UpResult};

pub struct EsxiStack {
    engine: EngineStack,
}

impl EsxiStack {
    pub fn new(engine: EngineStack) -> Self {
        Self { engine }
    }
}

/// Builds the project settings for an ESXi node pool.
///
/// The resource prefix falls back to the stack name; both subnets are
/// mandatory. Structured lists cross the engine boundary JSON-encoded.
fn project_settings(stack_name: &str, props: &EsxiProps) -> Result<ConfigMap> {
    let prefix = if props.resource_prefix.is_empty() {
        stack_name
    } else {
        &props.resource_prefix
    };
    if props.node_subnet.is_empty() {
        return Err(StackError::PropertyNotSet("nodeSubnet"));
    }
    if props.storage_subnet.is_empty() {
        return Err(StackError::PropertyNotSet("storageSubnet"));
    }

    let mut map = ConfigMap::new();
    map.insert("resourcePrefix".into(), ConfigValue::plain(prefix));
    map.insert("nodeSubnet".into(), ConfigValue::plain(&props.node_subnet));
    map.insert(
        "storageSubnet".into(),
        ConfigValue::plain(&props.storage_subnet),
    );
    map.insert(
        "shareNetworkUUID".into(),
        ConfigValue::plain(&props.share_network_name),
    );
    map.insert(
        "nodes".into(),
        ConfigValue::plain(serde_json::to_string(&props.nodes)?),
    );
    map.insert(
        "shares".into(),
        ConfigValue::plain(serde_json::to_string(&props.shares)?),
    );
    Ok(map)
}

#[async_trait::async_trait]
impl StackAdapter for EsxiStack {
    async fn configure(&self, cfg: &Config) -> Result<()> {
        let credentials = openstack::credential_settings(&cfg.props.openstack)?;
        self.engine.set_all_config(&credentials).await?;

        let props = cfg
            .props
            .stack
            .as_esxi()
            .ok_or_else(|| StackError::PropsMismatch(cfg.project.to_string()))?;
        let settings = project_settings(&cfg.stack, props)?;
        self.engine.set_all_config(&settings).await?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use drover_config::props::{Node, Share};

    fn props() -> EsxiProps {
        EsxiProps {
            node_subnet: "10.1.0.0/24".into(),
            storage_subnet: "10.2.0.0/24".into(),
            share_network_name: "share-net".into(),
            nodes: vec![Node {
                name: "node001".into(),
                ip: "10.1.0.5".into(),
                ..Default::default()
            }],
            shares: vec![Share {
                name: "datastore".into(),
                size: 500,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn prefix_defaults_to_stack_name() {
        let map = project_settings("pool-a", &props()).unwrap();
        assert_eq!(map["resourcePrefix"].value, "pool-a");

        let mut p = props();
        p.resource_prefix = "custom".into();
        let map = project_settings("pool-a", &p).unwrap();
        assert_eq!(map["resourcePrefix"].value, "custom");
    }

    #[test]
    fn subnets_are_mandatory() {
        let mut p = props();
        p.node_subnet.clear();
        assert!(matches!(
            project_settings("pool", &p),
            Err(StackError::PropertyNotSet("nodeSubnet"))
        ));

        let mut p = props();
        p.storage_subnet.clear();
        assert!(matches!(
            project_settings("pool", &p),
            Err(StackError::PropertyNotSet("storageSubnet"))
        ));
    }

    #[test]
    fn node_and_share_lists_are_json_encoded() {
        let map = project_settings("pool", &props()).unwrap();
        let nodes: Vec<Node> = serde_json::from_str(&map["nodes"].value).unwrap();
        assert_eq!(nodes[0].name, "node001");
        let shares: Vec<Share> = serde_json::from_str(&map["shares"].value).unwrap();
        assert_eq!(shares[0].size, 500);
        // Empty lists still serialize so stale engine settings get cleared.
        let empty = project_settings(
            "pool",
            &EsxiProps {
                node_subnet: "a".into(),
                storage_subnet: "b".into(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(empty["nodes"].value, "[]");
        assert_eq!(empty["shares"].value, "[]");
    }
}
