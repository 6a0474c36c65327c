//! Typed configuration record for one (project type, stack name) pair.
//!
//! The on-disk YAML layout keeps the project-specific payload under
//! `props.stack`; its concrete shape is selected by the sibling
//! `projectType` field and materialized eagerly at parse time, so a
//! payload that does not match the project type fails loudly instead of
//! decoding into zero values.

use crate::error::{ConfigError, Result};
use crate::keypair::Keypair;
use crate::props::StackProps;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Category of infrastructure template driven by a stack.
///
/// Determines which stack adapter and which [`StackProps`] shape apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    #[serde(rename = "example", alias = "example-go")]
    Example,
    #[serde(rename = "esxi")]
    Esxi,
    #[serde(rename = "vcf-management", alias = "vcf/management")]
    VcfManagement,
    #[serde(rename = "vcf-workload", alias = "vcf/workload")]
    VcfWorkload,
}

impl ProjectType {
    /// Subdirectory of the project root holding this type's engine project.
    pub fn project_dir(&self) -> &'static str {
        match self {
            ProjectType::Example => "example-go",
            ProjectType::Esxi => "esxi",
            ProjectType::VcfManagement | ProjectType::VcfWorkload => "vcf",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectType::Example => "example",
            ProjectType::Esxi => "esxi",
            ProjectType::VcfManagement => "vcf-management",
            ProjectType::VcfWorkload => "vcf-workload",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ProjectType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "example" | "example-go" => Ok(ProjectType::Example),
            "esxi" => Ok(ProjectType::Esxi),
            "vcf-management" | "vcf/management" => Ok(ProjectType::VcfManagement),
            "vcf-workload" | "vcf/workload" => Ok(ProjectType::VcfWorkload),
            other => Err(ConfigError::UnknownProject(other.to_string())),
        }
    }
}

/// OpenStack connection properties shared by every project type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenstackProps {
    pub region: String,
    pub domain: String,
    pub tenant: String,
}

/// Configuration payload of a [`Config`]: the shared OpenStack settings
/// plus the project-specific stack properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    pub openstack: OpenstackProps,
    pub stack: StackProps,
}

impl Props {
    /// Empty props carrying the right payload shape for `project`.
    pub fn default_for(project: ProjectType) -> Self {
        Self {
            openstack: OpenstackProps::default(),
            stack: StackProps::default_for(project),
        }
    }
}

/// Configuration of one deployable stack.
///
/// `(project, stack)` uniquely identifies a config and its on-disk file;
/// neither changes for the lifetime of a controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub project: ProjectType,
    pub stack: String,
    /// Config file names whose stack props are layered underneath this
    /// config's own props (read-only base properties).
    pub depends_on: Vec<String>,
    pub props: Props,
    /// Base properties resolved from `depends_on`, in order. Populated by
    /// the store on read; never serialized.
    pub base_props: Vec<StackProps>,
    /// SSH keypair material, lazily loaded from disk. Never serialized.
    pub keypair: Option<Keypair>,
}

impl Config {
    pub fn new(project: ProjectType, stack: impl Into<String>, props: Props) -> Self {
        Self {
            project,
            stack: stack.into(),
            depends_on: Vec::new(),
            props,
            base_props: Vec::new(),
            keypair: None,
        }
    }

    /// Deterministic config file name: `{projectType}-{stackName}.yaml`.
    pub fn file_name(&self) -> String {
        format!("{}-{}.yaml", self.project, self.stack)
    }

    /// Rejects configs without a stack name. The project type is already
    /// guaranteed valid by the typed enum.
    pub fn validate(&self) -> Result<()> {
        if self.stack.is_empty() {
            return Err(ConfigError::StackNotSet);
        }
        Ok(())
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let stack_props = StackProps::from_value(raw.project, raw.props.stack)?;
        Ok(Self {
            project: raw.project,
            stack: raw.stack,
            depends_on: raw.depends_on,
            props: Props {
                openstack: raw.props.openstack,
                stack: stack_props,
            },
            base_props: Vec::new(),
            keypair: None,
        })
    }

    fn to_raw(&self) -> Result<RawConfig> {
        Ok(RawConfig {
            project: self.project,
            stack: self.stack.clone(),
            depends_on: self.depends_on.clone(),
            props: RawProps {
                openstack: self.props.openstack.clone(),
                stack: self.props.stack.to_value()?,
            },
        })
    }
}

/// Wire layout of a config. The stack props stay a raw value here and are
/// materialized into the typed shape in [`Config::from_raw`].
#[derive(Serialize, Deserialize)]
struct RawConfig {
    #[serde(rename = "projectType")]
    project: ProjectType,
    stack: String,
    #[serde(rename = "dependsOn", default, skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
    #[serde(default)]
    props: RawProps,
}

#[derive(Default, Serialize, Deserialize)]
struct RawProps {
    #[serde(default)]
    openstack: OpenstackProps,
    #[serde(default)]
    stack: serde_yaml::Value,
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let raw = self.to_raw().map_err(S::Error::custom)?;
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Config {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = RawConfig::deserialize(deserializer)?;
        Config::from_raw(raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::EsxiProps;

    #[test]
    fn project_type_round_trip() {
        for (s, t) in [
            ("example", ProjectType::Example),
            ("esxi", ProjectType::Esxi),
            ("vcf-management", ProjectType::VcfManagement),
            ("vcf-workload", ProjectType::VcfWorkload),
        ] {
            assert_eq!(s.parse::<ProjectType>().unwrap(), t);
            assert_eq!(t.to_string(), s);
        }
    }

    #[test]
    fn project_type_aliases() {
        assert_eq!(
            "vcf/management".parse::<ProjectType>().unwrap(),
            ProjectType::VcfManagement
        );
        assert_eq!(
            "example-go".parse::<ProjectType>().unwrap(),
            ProjectType::Example
        );
        assert!("mystery".parse::<ProjectType>().is_err());
    }

    #[test]
    fn file_name_is_deterministic() {
        let cfg = Config::new(ProjectType::Esxi, "foo", Props::default_for(ProjectType::Esxi));
        assert_eq!(cfg.file_name(), "esxi-foo.yaml");
    }

    #[test]
    fn validate_rejects_empty_stack_name() {
        let cfg = Config::new(ProjectType::Esxi, "", Props::default_for(ProjectType::Esxi));
        assert!(matches!(cfg.validate(), Err(ConfigError::StackNotSet)));
    }

    #[test]
    fn yaml_parse_materializes_typed_props() {
        let yaml = r#"
projectType: esxi
stack: node-pool
props:
  openstack:
    region: qa-de-1
    domain: acme
    tenant: lab
  stack:
    nodeSubnet: 10.0.0.0/24
    nodes:
      - name: node001
        ip: 10.0.0.5
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.project, ProjectType::Esxi);
        let props: &EsxiProps = cfg.props.stack.as_esxi().unwrap();
        assert_eq!(props.node_subnet, "10.0.0.0/24");
        assert_eq!(props.nodes.len(), 1);
        assert_eq!(props.nodes[0].ip, "10.0.0.5");
    }

    #[test]
    fn json_parse_works_for_the_http_surface() {
        let body = r#"{
            "projectType": "esxi",
            "stack": "foo",
            "props": {"stack": {"nodes": [{"name": "n1", "ip": "10.0.0.5"}]}}
        }"#;
        let cfg: Config = serde_json::from_str(body).unwrap();
        assert_eq!(cfg.stack, "foo");
        assert_eq!(cfg.props.stack.as_esxi().unwrap().nodes[0].name, "n1");
    }

    #[test]
    fn wrong_shape_is_rejected_not_zeroed() {
        // A scalar payload cannot be an esxi props mapping.
        let yaml = "projectType: esxi\nstack: foo\nprops:\n  stack: just-a-string\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }
}
