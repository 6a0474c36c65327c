//! Project-specific stack property payloads.
//!
//! Exactly one concrete shape is valid per project type. The VCF shape is
//! shared by management and workload domains; workload configs typically
//! inherit network and DNS settings from their management domain via
//! `dependsOn` base properties and the fill-empty merge below.

use crate::error::{ConfigError, Result};
use crate::model::{Config, ProjectType};
use serde::{Deserialize, Serialize};

/// Project-type-specific configuration payload of a [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub enum StackProps {
    Example,
    Esxi(EsxiProps),
    Vcf(Box<VcfProps>),
}

impl Default for StackProps {
    fn default() -> Self {
        StackProps::Example
    }
}

impl StackProps {
    /// Materializes a raw payload into the concrete shape for `project`.
    ///
    /// A payload that does not match the expected shape is an error, never
    /// a zero-valued struct.
    pub fn from_value(project: ProjectType, value: serde_yaml::Value) -> Result<Self> {
        let mismatch = |e: serde_yaml::Error| {
            tracing::debug!(project = %project, error = %e, "stack props shape mismatch");
            ConfigError::PropsMismatch(project.to_string())
        };
        match project {
            ProjectType::Example => Ok(StackProps::Example),
            ProjectType::Esxi => {
                if value.is_null() {
                    return Ok(StackProps::Esxi(EsxiProps::default()));
                }
                Ok(StackProps::Esxi(serde_yaml::from_value(value).map_err(mismatch)?))
            }
            ProjectType::VcfManagement | ProjectType::VcfWorkload => {
                if value.is_null() {
                    return Ok(StackProps::Vcf(Box::default()));
                }
                Ok(StackProps::Vcf(Box::new(
                    serde_yaml::from_value(value).map_err(mismatch)?,
                )))
            }
        }
    }

    /// Default (empty) payload for a project type.
    pub fn default_for(project: ProjectType) -> Self {
        match project {
            ProjectType::Example => StackProps::Example,
            ProjectType::Esxi => StackProps::Esxi(EsxiProps::default()),
            ProjectType::VcfManagement | ProjectType::VcfWorkload => {
                StackProps::Vcf(Box::default())
            }
        }
    }

    /// Serializes back into the generic wire value.
    pub fn to_value(&self) -> Result<serde_yaml::Value> {
        let v = match self {
            StackProps::Example => serde_yaml::Value::Null,
            StackProps::Esxi(p) => serde_yaml::to_value(p)?,
            StackProps::Vcf(p) => serde_yaml::to_value(p)?,
        };
        Ok(v)
    }

    pub fn as_esxi(&self) -> Option<&EsxiProps> {
        match self {
            StackProps::Esxi(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_vcf(&self) -> Option<&VcfProps> {
        match self {
            StackProps::Vcf(p) => Some(p),
            _ => None,
        }
    }
}

/// Merges the stack props of `incoming` into a copy of `cfg`.
///
/// Esxi merges additively: node and share lists are concatenated in order,
/// without dedup or conflict detection. Other project types reject merging.
pub fn merge_stack_props(cfg: &Config, incoming: &StackProps) -> Result<Config> {
    let mut merged = cfg.clone();
    match (&mut merged.props.stack, incoming) {
        (StackProps::Esxi(base), StackProps::Esxi(inc)) => {
            base.nodes.extend(inc.nodes.iter().cloned());
            base.shares.extend(inc.shares.iter().cloned());
        }
        _ => return Err(ConfigError::MergeUnsupported(cfg.project.to_string())),
    }
    Ok(merged)
}

// ---------------------------------------------------------------------------
// ESXi

/// Properties of an ESXi bare-metal node pool stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EsxiProps {
    #[serde(rename = "resourcePrefix")]
    pub resource_prefix: String,
    #[serde(rename = "nodeSubnet")]
    pub node_subnet: String,
    #[serde(rename = "storageSubnet")]
    pub storage_subnet: String,
    #[serde(rename = "shareNetworkName")]
    pub share_network_name: String,
    pub nodes: Vec<Node>,
    pub shares: Vec<Share>,
}

/// One bare-metal ESXi node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub name: String,
    pub uuid: String,
    pub ip: String,
    pub image: String,
    pub flavor: String,
}

/// One NFS share attached to the node pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Share {
    pub name: String,
    pub size: i64,
}

// ---------------------------------------------------------------------------
// VCF management / workload domains

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Properties of a VCF management or workload domain stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VcfProps {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub esxi_server_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub esxi_server_flavor: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub esxi_nodes: Vec<EsxiNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shares: Vec<NfsShare>,
    #[serde(skip_serializing_if = "SddcManager::is_empty")]
    pub sddc_manager: SddcManager,
    #[serde(skip_serializing_if = "Nsxt::is_empty")]
    pub nsxt: Nsxt,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nsxt_managers: Vec<NsxtManager>,
    #[serde(skip_serializing_if = "Vcenter::is_empty")]
    pub vcenter: Vcenter,
    #[serde(skip_serializing_if = "ExternalNetwork::is_empty")]
    pub external_network: ExternalNetwork,
    #[serde(skip_serializing_if = "ManagementNetwork::is_empty")]
    pub management_network: ManagementNetwork,
    #[serde(skip_serializing_if = "DeploymentNetwork::is_empty")]
    pub deployment_network: DeploymentNetwork,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub private_networks: Vec<PrivateNetwork>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub public_router: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dns_zone_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reverse_dns_zone_name: String,
    #[serde(rename = "helperVM", skip_serializing_if = "HelperVm::is_empty")]
    pub helper_vm: HelperVm,
    #[serde(skip_serializing_if = "KeypairFile::is_empty")]
    pub keypair_file: KeypairFile,
    #[serde(rename = "reservedIPs", skip_serializing_if = "Vec::is_empty")]
    pub reserved_ips: Vec<ReservedIp>,
}

impl VcfProps {
    /// Layers `base` underneath these props: only fields that are empty
    /// here are filled from `base`. Existing non-zero values are never
    /// overwritten.
    pub fn merge_base(&mut self, base: &VcfProps) {
        fill_string(&mut self.esxi_server_image, &base.esxi_server_image);
        fill_string(&mut self.esxi_server_flavor, &base.esxi_server_flavor);
        fill_vec(&mut self.esxi_nodes, &base.esxi_nodes);
        fill_vec(&mut self.shares, &base.shares);
        self.sddc_manager.merge_base(&base.sddc_manager);
        self.nsxt.merge_base(&base.nsxt);
        fill_vec(&mut self.nsxt_managers, &base.nsxt_managers);
        self.vcenter.merge_base(&base.vcenter);
        self.external_network.merge_base(&base.external_network);
        self.management_network.merge_base(&base.management_network);
        self.deployment_network.merge_base(&base.deployment_network);
        fill_vec(&mut self.private_networks, &base.private_networks);
        fill_string(&mut self.public_router, &base.public_router);
        fill_string(&mut self.dns_zone_name, &base.dns_zone_name);
        fill_string(&mut self.reverse_dns_zone_name, &base.reverse_dns_zone_name);
        self.helper_vm.merge_base(&base.helper_vm);
        self.keypair_file.merge_base(&base.keypair_file);
        fill_vec(&mut self.reserved_ips, &base.reserved_ips);
    }
}

fn fill_string(target: &mut String, base: &str) {
    if target.is_empty() {
        target.push_str(base);
    }
}

fn fill_vec<T: Clone>(target: &mut Vec<T>, base: &[T]) {
    if target.is_empty() {
        target.extend(base.iter().cloned());
    }
}

fn fill_i64(target: &mut i64, base: i64) {
    if *target == 0 {
        *target = base;
    }
}

macro_rules! empty_check {
    ($ty:ty) => {
        impl $ty {
            pub fn is_empty(&self) -> bool {
                *self == Self::default()
            }
        }
    };
}

/// Reference to the pre-existing external (floating IP) network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExternalNetwork {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
}

impl ExternalNetwork {
    fn merge_base(&mut self, base: &ExternalNetwork) {
        fill_string(&mut self.name, &base.name);
        fill_string(&mut self.id, &base.id);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ManagementNetwork {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub network_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet_gateway: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet_mask: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet_cidr: String,
    #[serde(rename = "vlanID", skip_serializing_if = "is_zero")]
    pub vlan_id: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub esxi_interface: String,
}

impl ManagementNetwork {
    fn merge_base(&mut self, base: &ManagementNetwork) {
        fill_string(&mut self.network_name, &base.network_name);
        fill_string(&mut self.subnet_name, &base.subnet_name);
        fill_string(&mut self.subnet_gateway, &base.subnet_gateway);
        fill_string(&mut self.subnet_mask, &base.subnet_mask);
        fill_string(&mut self.subnet_cidr, &base.subnet_cidr);
        fill_i64(&mut self.vlan_id, base.vlan_id);
        fill_string(&mut self.esxi_interface, &base.esxi_interface);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeploymentNetwork {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub network_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cidr: String,
    #[serde(rename = "gatewayIP", skip_serializing_if = "String::is_empty")]
    pub gateway_ip: String,
}

impl DeploymentNetwork {
    fn merge_base(&mut self, base: &DeploymentNetwork) {
        fill_string(&mut self.network_name, &base.network_name);
        fill_string(&mut self.subnet_name, &base.subnet_name);
        fill_string(&mut self.cidr, &base.cidr);
        fill_string(&mut self.gateway_ip, &base.gateway_ip);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrivateNetwork {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub network_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cidr: String,
    #[serde(rename = "vlanID", skip_serializing_if = "is_zero")]
    pub vlan_id: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub esxi_interface: String,
}

/// One ESXi node enrolled into a VCF domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EsxiNode {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NfsShare {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub share_name: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub share_size: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SddcManager {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub esx_license: String,
}

impl SddcManager {
    fn merge_base(&mut self, base: &SddcManager) {
        fill_string(&mut self.id, &base.id);
        fill_string(&mut self.ip, &base.ip);
        fill_string(&mut self.hostname, &base.hostname);
        fill_string(&mut self.domain, &base.domain);
        fill_string(&mut self.esx_license, &base.esx_license);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Nsxt {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub license: String,
}

impl Nsxt {
    fn merge_base(&mut self, base: &Nsxt) {
        fill_string(&mut self.ip, &base.ip);
        fill_string(&mut self.hostname, &base.hostname);
        fill_string(&mut self.license, &base.license);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NsxtManager {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Vcenter {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
}

impl Vcenter {
    fn merge_base(&mut self, base: &Vcenter) {
        fill_string(&mut self.ip, &base.ip);
        fill_string(&mut self.hostname, &base.hostname);
    }
}

/// Jump host used while bringing up a domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HelperVm {
    #[serde(rename = "flavorID", skip_serializing_if = "String::is_empty")]
    pub flavor_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub flavor_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
}

impl HelperVm {
    fn merge_base(&mut self, base: &HelperVm) {
        fill_string(&mut self.flavor_id, &base.flavor_id);
        fill_string(&mut self.flavor_name, &base.flavor_name);
        fill_string(&mut self.image_name, &base.image_name);
        fill_string(&mut self.ip, &base.ip);
    }
}

/// Paths of the SSH keypair files pushed to the engine, not key material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeypairFile {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub public_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_key: String,
}

impl KeypairFile {
    fn merge_base(&mut self, base: &KeypairFile) {
        fill_string(&mut self.public_key, &base.public_key);
        fill_string(&mut self.private_key, &base.private_key);
    }
}

/// An address taken out of the deployment subnet's allocation pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReservedIp {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
}

empty_check!(ExternalNetwork);
empty_check!(ManagementNetwork);
empty_check!(DeploymentNetwork);
empty_check!(SddcManager);
empty_check!(Nsxt);
empty_check!(Vcenter);
empty_check!(HelperVm);
empty_check!(KeypairFile);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Props;

    fn esxi_config(nodes: Vec<Node>, shares: Vec<Share>) -> Config {
        let props = Props {
            openstack: Default::default(),
            stack: StackProps::Esxi(EsxiProps {
                nodes,
                shares,
                ..Default::default()
            }),
        };
        Config::new(ProjectType::Esxi, "pool", props)
    }

    fn node(name: &str) -> Node {
        Node {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn esxi_merge_concatenates_in_order() {
        let cfg = esxi_config(vec![node("n1"), node("n2")], vec![]);
        let incoming = StackProps::Esxi(EsxiProps {
            nodes: vec![node("n3")],
            ..Default::default()
        });
        let merged = merge_stack_props(&cfg, &incoming).unwrap();
        let names: Vec<_> = merged
            .props
            .stack
            .as_esxi()
            .unwrap()
            .nodes
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(names, ["n1", "n2", "n3"]);
    }

    #[test]
    fn esxi_merge_never_drops_and_never_dedups() {
        let cfg = esxi_config(vec![node("dup")], vec![Share { name: "s".into(), size: 1 }]);
        let incoming = StackProps::Esxi(EsxiProps {
            nodes: vec![node("dup")],
            shares: vec![Share { name: "s".into(), size: 1 }],
            ..Default::default()
        });
        let merged = merge_stack_props(&cfg, &incoming).unwrap();
        let props = merged.props.stack.as_esxi().unwrap();
        assert_eq!(props.nodes.len(), 2);
        assert_eq!(props.shares.len(), 2);
    }

    #[test]
    fn merge_rejects_other_project_types() {
        let cfg = Config::new(
            ProjectType::VcfManagement,
            "mgmt",
            Props::default_for(ProjectType::VcfManagement),
        );
        let incoming = StackProps::Vcf(Box::default());
        assert!(matches!(
            merge_stack_props(&cfg, &incoming),
            Err(ConfigError::MergeUnsupported(_))
        ));
    }

    #[test]
    fn vcf_merge_fills_only_empty_fields() {
        let mut primary = VcfProps {
            dns_zone_name: "workload.example.net".into(),
            management_network: ManagementNetwork {
                network_name: "mgmt-net".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let base = VcfProps {
            dns_zone_name: "base.example.net".into(),
            public_router: "router0".into(),
            management_network: ManagementNetwork {
                network_name: "base-net".into(),
                subnet_mask: "255.255.255.0".into(),
                vlan_id: 120,
                ..Default::default()
            },
            ..Default::default()
        };
        primary.merge_base(&base);
        // Explicit values survive.
        assert_eq!(primary.dns_zone_name, "workload.example.net");
        assert_eq!(primary.management_network.network_name, "mgmt-net");
        // Empty leaf fields are filled, even inside a partially set struct.
        assert_eq!(primary.public_router, "router0");
        assert_eq!(primary.management_network.subnet_mask, "255.255.255.0");
        assert_eq!(primary.management_network.vlan_id, 120);
    }

    #[test]
    fn vcf_merge_is_ordered() {
        let mut primary = VcfProps::default();
        let first = VcfProps {
            public_router: "first".into(),
            ..Default::default()
        };
        let second = VcfProps {
            public_router: "second".into(),
            dns_zone_name: "zone".into(),
            ..Default::default()
        };
        primary.merge_base(&first);
        primary.merge_base(&second);
        // Earlier base layers win over later ones.
        assert_eq!(primary.public_router, "first");
        assert_eq!(primary.dns_zone_name, "zone");
    }

    #[test]
    fn empty_payload_materializes_to_defaults() {
        let props = StackProps::from_value(ProjectType::Esxi, serde_yaml::Value::Null).unwrap();
        assert_eq!(props.as_esxi(), Some(&EsxiProps::default()));
    }
}
