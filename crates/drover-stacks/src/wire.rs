//! Engine-facing JSON shapes for VCF settings.
//!
//! The config file spells its fields camelCase; the VCF engine projects
//! read snake_case keys, with network names shortened to plain `name`.
//! These views carry the engine spelling so the two vocabularies stay
//! separate. Structs whose keys are single words (`externalNetwork`,
//! `nsxt`, `nsxtManagers`, `vcenter`, `reservedIPs` payloads) serialize
//! the same either way and need no view.

use drover_config::props;
use serde::Serialize;

fn is_zero(n: &i64) -> bool {
    *n == 0
}

#[derive(Debug, Serialize)]
pub(crate) struct ManagementNetwork {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet_gateway: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet_mask: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet_cidr: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub vlan_id: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub esxi_interface: String,
}

impl From<&props::ManagementNetwork> for ManagementNetwork {
    fn from(p: &props::ManagementNetwork) -> Self {
        Self {
            name: p.network_name.clone(),
            subnet_name: p.subnet_name.clone(),
            subnet_gateway: p.subnet_gateway.clone(),
            subnet_mask: p.subnet_mask.clone(),
            subnet_cidr: p.subnet_cidr.clone(),
            vlan_id: p.vlan_id,
            esxi_interface: p.esxi_interface.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DeploymentNetwork {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cidr: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub gateway_ip: String,
}

impl From<&props::DeploymentNetwork> for DeploymentNetwork {
    fn from(p: &props::DeploymentNetwork) -> Self {
        Self {
            name: p.network_name.clone(),
            subnet_name: p.subnet_name.clone(),
            cidr: p.cidr.clone(),
            gateway_ip: p.gateway_ip.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PrivateNetwork {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cidr: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub vlan_id: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub esxi_interface: String,
}

impl From<&props::PrivateNetwork> for PrivateNetwork {
    fn from(p: &props::PrivateNetwork) -> Self {
        Self {
            name: p.network_name.clone(),
            cidr: p.cidr.clone(),
            vlan_id: p.vlan_id,
            esxi_interface: p.esxi_interface.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EsxiNode {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_name: String,
}

impl From<&props::EsxiNode> for EsxiNode {
    fn from(p: &props::EsxiNode) -> Self {
        Self {
            name: p.name.clone(),
            id: p.id.clone(),
            ip: p.ip.clone(),
            image_name: p.image_name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NfsShare {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub share_name: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub share_size: i64,
}

impl From<&props::NfsShare> for NfsShare {
    fn from(p: &props::NfsShare) -> Self {
        Self {
            share_name: p.share_name.clone(),
            share_size: p.share_size,
        }
    }
}

/// Every field crosses the boundary, empty or not; the management engine
/// project indexes them unconditionally.
#[derive(Debug, Serialize)]
pub(crate) struct SddcManager {
    pub id: String,
    pub ip: String,
    pub hostname: String,
    pub domain: String,
    pub esx_license: String,
}

impl From<&props::SddcManager> for SddcManager {
    fn from(p: &props::SddcManager) -> Self {
        Self {
            id: p.id.clone(),
            ip: p.ip.clone(),
            hostname: p.hostname.clone(),
            domain: p.domain.clone(),
            esx_license: p.esx_license.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct HelperVm {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub flavor_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub flavor_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
}

impl From<&props::HelperVm> for HelperVm {
    fn from(p: &props::HelperVm) -> Self {
        Self {
            flavor_id: p.flavor_id.clone(),
            flavor_name: p.flavor_name.clone(),
            image_name: p.image_name.clone(),
            ip: p.ip.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn management_network_serializes_engine_field_names() {
        let net = ManagementNetwork::from(&props::ManagementNetwork {
            network_name: "mgmt-net".into(),
            subnet_name: "mgmt-sub".into(),
            subnet_gateway: "10.0.0.1".into(),
            ..Default::default()
        });
        let json = serde_json::to_value(&net).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "mgmt-net",
                "subnet_name": "mgmt-sub",
                "subnet_gateway": "10.0.0.1",
            })
        );
    }

    #[test]
    fn sddc_manager_always_carries_every_field() {
        let json = serde_json::to_value(SddcManager::from(&props::SddcManager::default())).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["domain", "esx_license", "hostname", "id", "ip"]);
    }
}
