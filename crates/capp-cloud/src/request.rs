//! Create/update request bodies sent to the management API

use crate::model::Ingress;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Log Analytics workspace link for managed environments and cluster extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogAnalyticsConfig {
    pub customer_id: String,
    pub shared_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ManagedEnvironmentRequest {
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub logs: Option<LogAnalyticsConfig>,
}

impl ManagedEnvironmentRequest {
    pub fn to_body(&self) -> Value {
        let mut properties = json!({});
        if let Some(logs) = &self.logs {
            properties["appLogsConfiguration"] = json!({
                "destination": "log-analytics",
                "logAnalyticsConfiguration": {
                    "customerId": logs.customer_id,
                    "sharedKey": logs.shared_key,
                }
            });
        }
        json!({ "location": self.location, "properties": properties })
    }
}

#[derive(Debug, Clone)]
pub struct ConnectedEnvironmentRequest {
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub custom_location_id: String,
}

impl ConnectedEnvironmentRequest {
    pub fn to_body(&self) -> Value {
        json!({
            "location": self.location,
            "extendedLocation": { "name": self.custom_location_id, "type": "CustomLocation" },
            "properties": {}
        })
    }
}

#[derive(Debug, Clone)]
pub struct CustomLocationRequest {
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub host_resource_id: String,
    pub cluster_extension_ids: Vec<String>,
    pub namespace: String,
}

impl CustomLocationRequest {
    pub fn to_body(&self) -> Value {
        json!({
            "location": self.location,
            "properties": {
                "hostType": "Kubernetes",
                "hostResourceId": self.host_resource_id,
                "clusterExtensionIds": self.cluster_extension_ids,
                "namespace": self.namespace,
                "displayName": self.name,
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClusterExtensionRequest {
    pub connected_cluster_id: String,
    pub name: String,
    pub extension_type: String,
    pub release_namespace: String,
    pub configuration_settings: BTreeMap<String, String>,
    pub protected_settings: BTreeMap<String, String>,
}

impl ClusterExtensionRequest {
    pub fn to_body(&self) -> Value {
        json!({
            "properties": {
                "extensionType": self.extension_type,
                "autoUpgradeMinorVersion": true,
                "releaseTrain": "stable",
                "scope": { "cluster": { "releaseNamespace": self.release_namespace } },
                "configurationSettings": self.configuration_settings,
                "configurationProtectedSettings": self.protected_settings,
            }
        })
    }
}

/// Registry credentials attached to an app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCredentialRequest {
    pub server: String,
    pub username: String,
    pub password: String,
}

impl RegistryCredentialRequest {
    /// Secret name the password is stored under on the app
    pub fn secret_name(&self) -> String {
        let sanitized: String = self
            .server
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        format!("{}-{}", sanitized, self.username.to_ascii_lowercase())
    }
}

/// A container environment variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvVar {
    Value { name: String, value: String },
    SecretRef { name: String, secret: String },
}

impl EnvVar {
    fn to_body(&self) -> Value {
        match self {
            EnvVar::Value { name, value } => json!({ "name": name, "value": value }),
            EnvVar::SecretRef { name, secret } => json!({ "name": name, "secretRef": secret }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContainerAppRequest {
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub environment_id: String,
    pub custom_location_id: Option<String>,
    pub image: String,
    pub ingress: Option<Ingress>,
    pub target_port: Option<u16>,
    pub registry: Option<RegistryCredentialRequest>,
    pub env_vars: Vec<EnvVar>,
}

impl ContainerAppRequest {
    pub fn to_body(&self) -> Value {
        let mut configuration = json!({});
        if let Some(ingress) = self.ingress {
            configuration["ingress"] = json!({
                "external": ingress.is_external(),
                "targetPort": self.target_port,
                "transport": "auto",
            });
        }
        if let Some(registry) = &self.registry {
            let secret = registry.secret_name();
            configuration["secrets"] = json!([{ "name": secret, "value": registry.password }]);
            configuration["registries"] = json!([{
                "server": registry.server,
                "username": registry.username,
                "passwordSecretRef": secret,
            }]);
        }

        let env: Vec<Value> = self.env_vars.iter().map(EnvVar::to_body).collect();
        let mut body = json!({
            "location": self.location,
            "properties": {
                "environmentId": self.environment_id,
                "configuration": configuration,
                "template": {
                    "containers": [{ "name": self.name, "image": self.image, "env": env }]
                }
            }
        });
        if let Some(custom_location_id) = &self.custom_location_id {
            body["extendedLocation"] = json!({ "name": custom_location_id, "type": "CustomLocation" });
        }
        body
    }
}

/// Image build queued on a registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryBuildRequest {
    pub registry_name: String,
    pub resource_group: String,
    /// Repository and tag, without the registry server
    pub image: String,
    pub source_dir: PathBuf,
    pub dockerfile: String,
}

#[derive(Debug, Clone)]
pub struct SourceControlRequest {
    pub app_name: String,
    pub resource_group: String,
    pub repo_url: String,
    pub branch: String,
    pub token: String,
    pub registry: Option<RegistryCredentialRequest>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
    pub image: Option<String>,
    pub context_path: Option<String>,
}

impl SourceControlRequest {
    pub fn to_body(&self) -> Value {
        let registry_info = self.registry.as_ref().map(|r| {
            json!({
                "registryUrl": r.server,
                "registryUserName": r.username,
                "registryPassword": r.password,
            })
        });
        json!({
            "properties": {
                "repoUrl": self.repo_url,
                "branch": self.branch,
                "githubActionConfiguration": {
                    "registryInfo": registry_info,
                    "azureCredentials": {
                        "clientId": self.client_id,
                        "clientSecret": self.client_secret,
                        "tenantId": self.tenant_id,
                    },
                    "contextPath": self.context_path.as_deref().unwrap_or("./"),
                    "image": self.image,
                    "os": "Linux",
                }
            }
        })
    }
}
