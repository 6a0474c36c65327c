//! Shared OpenStack engine settings.
//!
//! Every project type talks to OpenStack with the same provider settings.
//! Connection properties come from the config file; the account
//! credentials come from the service's own environment at configure time
//! and never touch the config YAML.

use crate::error::{Result, StackError};
use drover_config::{Keypair, OpenstackProps};
use drover_engine::{ConfigMap, ConfigValue};

pub const ENV_OS_USERNAME: &str = "DROVER_OS_USERNAME";
pub const ENV_OS_PASSWORD: &str = "DROVER_OS_PASSWORD";

/// Builds the `openstack:*` provider settings for one stack.
///
/// The identity endpoint is derived from the region; it is not
/// configurable per stack.
pub fn credential_settings(props: &OpenstackProps) -> Result<ConfigMap> {
    if props.region.is_empty() {
        return Err(StackError::OpenstackPropertyNotSet("region"));
    }
    if props.domain.is_empty() {
        return Err(StackError::OpenstackPropertyNotSet("domain"));
    }
    if props.tenant.is_empty() {
        return Err(StackError::OpenstackPropertyNotSet("tenant"));
    }
    let username =
        std::env::var(ENV_OS_USERNAME).map_err(|_| StackError::MissingCredential(ENV_OS_USERNAME))?;
    if username.is_empty() {
        return Err(StackError::MissingCredential(ENV_OS_USERNAME));
    }
    let password =
        std::env::var(ENV_OS_PASSWORD).map_err(|_| StackError::MissingCredential(ENV_OS_PASSWORD))?;
    if password.is_empty() {
        return Err(StackError::MissingCredential(ENV_OS_PASSWORD));
    }

    let auth_url = format!("https://identity-3.{}.cloud.sap/v3", props.region);
    let mut map = ConfigMap::new();
    map.insert("openstack:authUrl".into(), ConfigValue::plain(auth_url));
    map.insert("openstack:region".into(), ConfigValue::plain(&props.region));
    map.insert(
        "openstack:projectDomainName".into(),
        ConfigValue::plain(&props.domain),
    );
    map.insert(
        "openstack:tenantName".into(),
        ConfigValue::plain(&props.tenant),
    );
    map.insert(
        "openstack:userDomainName".into(),
        ConfigValue::plain(&props.domain),
    );
    map.insert("openstack:userName".into(), ConfigValue::plain(username));
    map.insert("openstack:insecure".into(), ConfigValue::plain("true"));
    map.insert("openstack:password".into(), ConfigValue::secret(password));
    Ok(map)
}

/// Builds the keypair settings for project types that install SSH keys on
/// provisioned hosts. The private key is always a secret.
pub fn keypair_settings(keypair: Option<&Keypair>) -> Result<ConfigMap> {
    let keypair = keypair.filter(|kp| kp.is_set()).ok_or(StackError::KeypairNotSet)?;
    let mut map = ConfigMap::new();
    map.insert("publicKey".into(), ConfigValue::plain(&keypair.public_key));
    map.insert(
        "privateKey".into(),
        ConfigValue::secret(&keypair.private_key),
    );
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> OpenstackProps {
        OpenstackProps {
            region: "qa-de-1".into(),
            domain: "acme".into(),
            tenant: "lab".into(),
        }
    }

    fn with_credentials<R>(f: impl FnOnce() -> R) -> R {
        temp_env::with_vars(
            [
                (ENV_OS_USERNAME, Some("svc-user")),
                (ENV_OS_PASSWORD, Some("hunter2")),
            ],
            f,
        )
    }

    #[test]
    fn credential_settings_derives_auth_url_from_region() {
        with_credentials(|| {
            let map = credential_settings(&props()).unwrap();
            assert_eq!(
                map["openstack:authUrl"].value,
                "https://identity-3.qa-de-1.cloud.sap/v3"
            );
            assert_eq!(map["openstack:userDomainName"].value, "acme");
            assert!(map["openstack:password"].secret);
            assert!(!map["openstack:userName"].secret);
        });
    }

    #[test]
    fn credential_settings_requires_connection_props() {
        with_credentials(|| {
            let mut p = props();
            p.tenant.clear();
            assert!(matches!(
                credential_settings(&p),
                Err(StackError::OpenstackPropertyNotSet("tenant"))
            ));
        });
    }

    #[test]
    fn credential_settings_requires_env_credentials() {
        temp_env::with_vars(
            [
                (ENV_OS_USERNAME, Some("svc-user")),
                (ENV_OS_PASSWORD, None),
            ],
            || {
                assert!(matches!(
                    credential_settings(&props()),
                    Err(StackError::MissingCredential(ENV_OS_PASSWORD))
                ));
            },
        );
    }

    #[test]
    fn keypair_settings_rejects_unset_keypair() {
        assert!(matches!(
            keypair_settings(None),
            Err(StackError::KeypairNotSet)
        ));
        assert!(matches!(
            keypair_settings(Some(&Keypair::default())),
            Err(StackError::KeypairNotSet)
        ));
    }

    #[test]
    fn keypair_settings_marks_private_key_secret() {
        let kp = Keypair {
            public_key: "ssh-rsa AAAA".into(),
            private_key: "\n-----BEGIN KEY-----".into(),
        };
        let map = keypair_settings(Some(&kp)).unwrap();
        assert!(!map["publicKey"].secret);
        assert!(map["privateKey"].secret);
        assert_eq!(map["privateKey"].value, "\n-----BEGIN KEY-----");
    }
}
