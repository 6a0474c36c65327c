//! VCF domain stack adapter.
//!
//! Shared by the management and workload domain engine projects. Workload
//! configs usually arrive with base properties layered in from their
//! management domain; the merge happens here, right before the settings
//! are derived, so the config file on disk keeps only its own values.

use crate::adapter::StackAdapter;
use crate::error::{Result, StackError};
use crate::openstack;
use crate::wire;
use drover_config::props::ReservedIp;
use drover_config::{Config, StackProps, VcfProps};
use drover_engine::{ConfigMap, ConfigValue, EngineStack, OutputMap, UpResult};
use serde::Serialize;

/// Internal engine output of the cloud-builder appliance; never shown to
/// callers.
const CLOUD_BUILDER_OUTPUT: &str = "cloud-builder";

pub struct VcfStack {
    engine: EngineStack,
}

impl VcfStack {
    pub fn new(engine: EngineStack) -> Self {
        Self { engine }
    }
}

/// Resolves the effective props of `cfg`: its own VCF props with every
/// `dependsOn` base layered underneath, earlier bases taking precedence.
fn merged_props(cfg: &Config) -> Result<VcfProps> {
    let mut props = cfg
        .props
        .stack
        .as_vcf()
        .ok_or_else(|| StackError::PropsMismatch(cfg.project.to_string()))?
        .clone();
    for base in &cfg.base_props {
        if let StackProps::Vcf(base) = base {
            props.merge_base(base);
        }
    }
    Ok(props)
}

fn insert_json<T: Serialize>(map: &mut ConfigMap, key: &str, value: &T) -> Result<()> {
    map.insert(key.into(), ConfigValue::plain(serde_json::to_string(value)?));
    Ok(())
}

/// Builds the project settings for a VCF domain.
///
/// Structured values cross the engine boundary JSON-encoded in the engine
/// projects' key spelling (the [`wire`] views); empty fields are omitted
/// entirely. The reserved IP list is extended with the addresses of every
/// management appliance so the deployment subnet's allocation pool never
/// hands them out.
fn project_settings(props: &VcfProps) -> Result<ConfigMap> {
    let mut map = ConfigMap::new();
    if !props.external_network.is_empty() {
        insert_json(&mut map, "externalNetwork", &props.external_network)?;
    }
    if !props.management_network.is_empty() {
        insert_json(
            &mut map,
            "managementNetwork",
            &wire::ManagementNetwork::from(&props.management_network),
        )?;
    }
    if !props.deployment_network.is_empty() {
        insert_json(
            &mut map,
            "deploymentNetwork",
            &wire::DeploymentNetwork::from(&props.deployment_network),
        )?;
    }
    if !props.helper_vm.is_empty() {
        insert_json(&mut map, "helperVM", &wire::HelperVm::from(&props.helper_vm))?;
    }
    if !props.dns_zone_name.is_empty() {
        map.insert(
            "dnsZoneName".into(),
            ConfigValue::plain(&props.dns_zone_name),
        );
    }
    if !props.reverse_dns_zone_name.is_empty() {
        map.insert(
            "reverseDnsZoneName".into(),
            ConfigValue::plain(&props.reverse_dns_zone_name),
        );
    }
    if !props.public_router.is_empty() {
        map.insert(
            "publicRouter".into(),
            ConfigValue::plain(&props.public_router),
        );
    }
    if !props.keypair_file.public_key.is_empty() {
        map.insert(
            "publicKeyFile".into(),
            ConfigValue::plain(&props.keypair_file.public_key),
        );
    }
    if !props.keypair_file.private_key.is_empty() {
        map.insert(
            "privateKeyFile".into(),
            ConfigValue::plain(&props.keypair_file.private_key),
        );
    }
    if !props.private_networks.is_empty() {
        let networks: Vec<wire::PrivateNetwork> =
            props.private_networks.iter().map(Into::into).collect();
        insert_json(&mut map, "privateNetworks", &networks)?;
    }
    if !props.esxi_nodes.is_empty() {
        let nodes: Vec<wire::EsxiNode> = props.esxi_nodes.iter().map(Into::into).collect();
        insert_json(&mut map, "esxiNodes", &nodes)?;
    }
    if !props.esxi_server_image.is_empty() {
        map.insert(
            "esxiServerImage".into(),
            ConfigValue::plain(&props.esxi_server_image),
        );
    }
    if !props.esxi_server_flavor.is_empty() {
        map.insert(
            "esxiServerFlavor".into(),
            ConfigValue::plain(&props.esxi_server_flavor),
        );
    }
    if !props.shares.is_empty() {
        let shares: Vec<wire::NfsShare> = props.shares.iter().map(Into::into).collect();
        insert_json(&mut map, "shares", &shares)?;
    }

    let mut reserved = props.reserved_ips.clone();
    if !props.nsxt.is_empty() {
        insert_json(&mut map, "nsxt", &props.nsxt)?;
        reserved.push(ReservedIp {
            ip: props.nsxt.ip.clone(),
            hostname: props.nsxt.hostname.clone(),
        });
    }
    if !props.nsxt_managers.is_empty() {
        insert_json(&mut map, "nsxtManagers", &props.nsxt_managers)?;
        for m in &props.nsxt_managers {
            reserved.push(ReservedIp {
                ip: m.ip.clone(),
                hostname: m.hostname.clone(),
            });
        }
    }
    if !props.sddc_manager.is_empty() {
        insert_json(
            &mut map,
            "sddcManager",
            &wire::SddcManager::from(&props.sddc_manager),
        )?;
        reserved.push(ReservedIp {
            ip: props.sddc_manager.ip.clone(),
            hostname: props.sddc_manager.hostname.clone(),
        });
    }
    if !props.vcenter.is_empty() {
        insert_json(&mut map, "vcenter", &props.vcenter)?;
        reserved.push(ReservedIp {
            ip: props.vcenter.ip.clone(),
            hostname: props.vcenter.hostname.clone(),
        });
    }
    insert_json(&mut map, "reservedIPs", &reserved)?;
    Ok(map)
}

fn filter_outputs(mut outputs: OutputMap) -> OutputMap {
    outputs.remove(CLOUD_BUILDER_OUTPUT);
    outputs
}

#[async_trait::async_trait]
impl StackAdapter for VcfStack {
    async fn configure(&self, cfg: &Config) -> Result<()> {
        // Keypair first: a missing keypair must abort before any other
        // setting is pushed, so the caller can load it and retry cleanly.
        let keypair = openstack::keypair_settings(cfg.keypair.as_ref())?;
        self.engine.set_all_config(&keypair).await?;

        let credentials = openstack::credential_settings(&cfg.props.openstack)?;
        self.engine.set_all_config(&credentials).await?;

        let settings = project_settings(&merged_props(cfg)?)?;
        self.engine.set_all_config(&settings).await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        Ok(self.engine.refresh().await?)
    }

    async fn update(&self) -> Result<UpResult> {
        let mut result = self.engine.up().await?;
        result.outputs = filter_outputs(result.outputs);
        Ok(result)
    }

    async fn destroy(&self) -> Result<()> {
        Ok(self.engine.destroy().await?)
    }

    async fn outputs(&self) -> Result<OutputMap> {
        Ok(filter_outputs(self.engine.outputs().await?))
    }

    fn last_error(&self) -> Option<String> {
        self.engine.last_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drover_config::props::{
        EsxiNode, ManagementNetwork, NfsShare, Nsxt, NsxtManager, SddcManager, Vcenter,
    };
    use drover_config::{ProjectType, Props};

    #[test]
    fn merged_props_layers_bases_under_own_values() {
        let mut props = Props::default_for(ProjectType::VcfWorkload);
        if let StackProps::Vcf(p) = &mut props.stack {
            p.dns_zone_name = "workload.example.net".into();
        }
        let mut cfg = Config::new(ProjectType::VcfWorkload, "wl01", props);
        cfg.base_props.push(StackProps::Vcf(Box::new(VcfProps {
            dns_zone_name: "mgmt.example.net".into(),
            public_router: "router0".into(),
            ..Default::default()
        })));

        let merged = merged_props(&cfg).unwrap();
        assert_eq!(merged.dns_zone_name, "workload.example.net");
        assert_eq!(merged.public_router, "router0");
    }

    #[test]
    fn merged_props_rejects_mismatched_payload() {
        let cfg = Config::new(
            ProjectType::Esxi,
            "pool",
            Props::default_for(ProjectType::Esxi),
        );
        assert!(matches!(
            merged_props(&cfg),
            Err(StackError::PropsMismatch(_))
        ));
    }

    #[test]
    fn structured_settings_use_engine_key_spelling() {
        let props = VcfProps {
            management_network: ManagementNetwork {
                network_name: "mgmt-net".into(),
                subnet_name: "mgmt-sub".into(),
                subnet_gateway: "10.0.0.1".into(),
                ..Default::default()
            },
            esxi_nodes: vec![EsxiNode {
                name: "esxi-01".into(),
                image_name: "vmware-esxi-7".into(),
                ..Default::default()
            }],
            shares: vec![NfsShare {
                share_name: "datastore1".into(),
                share_size: 500,
            }],
            ..Default::default()
        };

        let map = project_settings(&props).unwrap();
        let net: serde_json::Value =
            serde_json::from_str(&map["managementNetwork"].value).unwrap();
        assert_eq!(net["name"], "mgmt-net");
        assert_eq!(net["subnet_name"], "mgmt-sub");
        assert_eq!(net["subnet_gateway"], "10.0.0.1");
        let nodes: serde_json::Value = serde_json::from_str(&map["esxiNodes"].value).unwrap();
        assert_eq!(nodes[0]["image_name"], "vmware-esxi-7");
        let shares: serde_json::Value = serde_json::from_str(&map["shares"].value).unwrap();
        assert_eq!(shares[0]["share_name"], "datastore1");
        assert_eq!(shares[0]["share_size"], 500);
    }

    #[test]
    fn appliance_addresses_are_reserved() {
        let props = VcfProps {
            nsxt: Nsxt {
                ip: "10.0.0.10".into(),
                hostname: "nsxt".into(),
                ..Default::default()
            },
            nsxt_managers: vec![NsxtManager {
                ip: "10.0.0.11".into(),
                hostname: "nsxt-m1".into(),
            }],
            sddc_manager: SddcManager {
                ip: "10.0.0.12".into(),
                hostname: "sddc".into(),
                ..Default::default()
            },
            vcenter: Vcenter {
                ip: "10.0.0.13".into(),
                hostname: "vcenter".into(),
            },
            reserved_ips: vec![ReservedIp {
                ip: "10.0.0.2".into(),
                hostname: "gateway".into(),
            }],
            ..Default::default()
        };

        let map = project_settings(&props).unwrap();
        let reserved: Vec<ReservedIp> = serde_json::from_str(&map["reservedIPs"].value).unwrap();
        let ips: Vec<_> = reserved.iter().map(|r| r.ip.as_str()).collect();
        assert_eq!(
            ips,
            ["10.0.0.2", "10.0.0.10", "10.0.0.11", "10.0.0.12", "10.0.0.13"]
        );
    }

    #[test]
    fn empty_fields_are_omitted_but_reserved_ips_always_pushed() {
        let map = project_settings(&VcfProps::default()).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["reservedIPs"].value, "[]");
    }

    #[test]
    fn cloud_builder_output_is_hidden() {
        let mut outputs = OutputMap::new();
        outputs.insert("cloud-builder".into(), serde_json::json!("10.0.0.99"));
        outputs.insert("vcenterIP".into(), serde_json::json!("10.0.0.13"));
        let filtered = filter_outputs(outputs);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("vcenterIP"));
    }
}
