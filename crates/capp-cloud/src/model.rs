//! Typed views of the ARM resources the up workflow reads
//!
//! Only the fields the resolver and executor look at are modelled; unknown
//! fields in the service JSON are ignored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `extendedLocation` block carried by connected resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedLocation {
    pub name: String,
    #[serde(rename = "type", default)]
    pub location_type: String,
}

impl ExtendedLocation {
    pub fn custom_location(id: impl Into<String>) -> Self {
        Self {
            name: id.into(),
            location_type: "CustomLocation".to_string(),
        }
    }
}

/// Resource group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceGroupInfo {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub location: String,
}

/// Container app (`Microsoft.App/containerApps`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAppInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub extended_location: Option<ExtendedLocation>,
    #[serde(default)]
    pub properties: ContainerAppProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAppProperties {
    #[serde(default, alias = "managedEnvironmentId")]
    pub environment_id: Option<String>,
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub configuration: Option<AppConfiguration>,
    #[serde(default)]
    pub template: Option<AppTemplate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfiguration {
    #[serde(default)]
    pub ingress: Option<IngressInfo>,
    #[serde(default)]
    pub registries: Vec<RegistryReference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressInfo {
    #[serde(default)]
    pub fqdn: Option<String>,
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub target_port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryReference {
    pub server: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppTemplate {
    #[serde(default)]
    pub containers: Vec<ContainerInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    pub image: String,
}

impl ContainerAppInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
            extended_location: None,
            properties: ContainerAppProperties::default(),
        }
    }

    pub fn with_environment(mut self, environment_id: impl Into<String>) -> Self {
        self.properties.environment_id = Some(environment_id.into());
        self
    }

    pub fn with_custom_location(mut self, custom_location_id: impl Into<String>) -> Self {
        self.extended_location = Some(ExtendedLocation::custom_location(custom_location_id));
        self
    }

    pub fn environment_id(&self) -> Option<&str> {
        self.properties.environment_id.as_deref()
    }

    pub fn custom_location_id(&self) -> Option<&str> {
        self.extended_location.as_ref().map(|l| l.name.as_str())
    }

    pub fn fqdn(&self) -> Option<&str> {
        self.properties
            .configuration
            .as_ref()?
            .ingress
            .as_ref()?
            .fqdn
            .as_deref()
    }

    pub fn registries(&self) -> &[RegistryReference] {
        self.properties
            .configuration
            .as_ref()
            .map(|c| c.registries.as_slice())
            .unwrap_or_default()
    }

    pub fn containers(&self) -> &[ContainerInfo] {
        self.properties
            .template
            .as_ref()
            .map(|t| t.containers.as_slice())
            .unwrap_or_default()
    }

    pub fn is_provisioning(&self) -> bool {
        self.properties
            .provisioning_state
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("InProgress"))
    }
}

/// Managed or connected environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub extended_location: Option<ExtendedLocation>,
    #[serde(default)]
    pub properties: EnvironmentProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub app_logs_configuration: Option<AppLogsConfiguration>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppLogsConfiguration {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub log_analytics_configuration: Option<LogAnalyticsInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogAnalyticsInfo {
    #[serde(default)]
    pub customer_id: Option<String>,
}

impl EnvironmentInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
            extended_location: None,
            properties: EnvironmentProperties::default(),
        }
    }

    pub fn with_logs_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.properties.app_logs_configuration = Some(AppLogsConfiguration {
            destination: Some("log-analytics".to_string()),
            log_analytics_configuration: Some(LogAnalyticsInfo {
                customer_id: Some(customer_id.into()),
            }),
        });
        self
    }

    pub fn with_custom_location(mut self, custom_location_id: impl Into<String>) -> Self {
        self.extended_location = Some(ExtendedLocation::custom_location(custom_location_id));
        self
    }

    pub fn logs_customer_id(&self) -> Option<&str> {
        self.properties
            .app_logs_configuration
            .as_ref()?
            .log_analytics_configuration
            .as_ref()?
            .customer_id
            .as_deref()
    }

    pub fn custom_location_id(&self) -> Option<&str> {
        self.extended_location.as_ref().map(|l| l.name.as_str())
    }
}

/// Custom location (`Microsoft.ExtendedLocation/customLocations`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomLocationInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub properties: CustomLocationProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomLocationProperties {
    #[serde(default)]
    pub host_resource_id: String,
    #[serde(default)]
    pub cluster_extension_ids: Vec<String>,
    #[serde(default)]
    pub namespace: String,
}

impl CustomLocationInfo {
    pub fn host_resource_id(&self) -> &str {
        &self.properties.host_resource_id
    }

    pub fn is_hosted_on(&self, connected_cluster_id: &str) -> bool {
        self.properties
            .host_resource_id
            .eq_ignore_ascii_case(connected_cluster_id)
    }

    pub fn binds_extension(&self, extension_id: &str) -> bool {
        self.properties
            .cluster_extension_ids
            .iter()
            .any(|id| id.eq_ignore_ascii_case(extension_id))
    }
}

/// Arc-enabled Kubernetes cluster (`Microsoft.Kubernetes/connectedClusters`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedClusterInfo {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub properties: ConnectedClusterProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedClusterProperties {
    #[serde(default)]
    pub connectivity_status: Option<String>,
}

/// Cluster extension (`Microsoft.KubernetesConfiguration/extensions`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterExtensionInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: ClusterExtensionProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterExtensionProperties {
    #[serde(default)]
    pub extension_type: String,
    #[serde(default)]
    pub scope: Option<ExtensionScope>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionScope {
    #[serde(default)]
    pub cluster: Option<ClusterScope>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterScope {
    #[serde(default)]
    pub release_namespace: String,
}

impl ClusterExtensionInfo {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        extension_type: impl Into<String>,
        release_namespace: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            properties: ClusterExtensionProperties {
                extension_type: extension_type.into(),
                scope: Some(ExtensionScope {
                    cluster: Some(ClusterScope {
                        release_namespace: release_namespace.into(),
                    }),
                }),
            },
        }
    }

    pub fn extension_type(&self) -> &str {
        &self.properties.extension_type
    }

    pub fn release_namespace(&self) -> Option<&str> {
        self.properties
            .scope
            .as_ref()?
            .cluster
            .as_ref()
            .map(|c| c.release_namespace.as_str())
    }
}

/// Azure container registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, alias = "loginServer")]
    pub login_server: String,
}

/// Admin credentials of a registry plus the group it lives in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
    pub resource_group: String,
}

/// Service principal used by the CI/CD pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePrincipal {
    #[serde(rename = "appId")]
    pub client_id: String,
    #[serde(rename = "password")]
    pub client_secret: String,
    #[serde(rename = "tenant")]
    pub tenant_id: String,
}

/// App source control binding (`containerApps/{name}/sourcecontrols/current`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceControlInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: SourceControlProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceControlProperties {
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

/// Ingress visibility of an app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ingress {
    External,
    Internal,
}

impl Ingress {
    pub fn is_external(self) -> bool {
        matches!(self, Ingress::External)
    }
}

impl fmt::Display for Ingress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ingress::External => write!(f, "external"),
            Ingress::Internal => write!(f, "internal"),
        }
    }
}

impl FromStr for Ingress {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "external" => Ok(Ingress::External),
            "internal" => Ok(Ingress::Internal),
            other => Err(format!("invalid ingress '{}': expected external or internal", other)),
        }
    }
}
