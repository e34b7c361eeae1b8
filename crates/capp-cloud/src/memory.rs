//! In-memory collaborators
//!
//! `InMemoryArm` behaves like a small subscription: creates land in the
//! inventory, lookups return `NotFound` for missing resources, and every call
//! is recorded so callers can assert which searches and mutations happened.
//! `InMemorySourceHost` does the same for a handful of hosted repositories.

use crate::error::{CloudError, Result};
use crate::model::{
    AppConfiguration, AppTemplate, ClusterExtensionInfo, ConnectedClusterInfo,
    ConnectedClusterProperties, ContainerAppInfo, ContainerAppProperties, ContainerInfo,
    CustomLocationInfo, CustomLocationProperties, EnvironmentInfo, IngressInfo,
    RegistryCredentials, RegistryInfo, RegistryReference, ResourceGroupInfo, ServicePrincipal,
    SourceControlInfo, SourceControlProperties,
};
use crate::provider::{ArmClient, RepoEntry, SourceHost};
use crate::request::{
    ClusterExtensionRequest, ConnectedEnvironmentRequest, ContainerAppRequest,
    CustomLocationRequest, ManagedEnvironmentRequest, RegistryBuildRequest, SourceControlRequest,
};
use crate::resource_id::{ResourceId, resource_group_scope, resource_id};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

pub const APP_NAMESPACE: &str = "Microsoft.App";
const DEFAULT_APP_LOCATIONS: [&str; 3] = ["East US", "West Europe", "North Central US (Stage)"];

/// Failure injected into one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    NotFound,
    Throttled,
    PermissionDenied,
}

impl InjectedFailure {
    fn to_error(self, operation: &str) -> CloudError {
        match self {
            InjectedFailure::NotFound => CloudError::NotFound(operation.to_string()),
            InjectedFailure::Throttled => {
                CloudError::Throttled(format!("{}: TooManyRequests", operation))
            }
            InjectedFailure::PermissionDenied => {
                CloudError::PermissionDenied(format!("{}: AuthorizationFailed", operation))
            }
        }
    }
}

#[derive(Default)]
struct Inventory {
    resource_groups: Vec<ResourceGroupInfo>,
    apps: Vec<ContainerAppInfo>,
    managed_environments: Vec<EnvironmentInfo>,
    connected_environments: Vec<EnvironmentInfo>,
    custom_locations: Vec<CustomLocationInfo>,
    clusters: Vec<ConnectedClusterInfo>,
    extensions: Vec<(String, ClusterExtensionInfo)>,
    registries: Vec<(RegistryInfo, RegistryCredentials)>,
    source_controls: Vec<(String, String, SourceControlInfo)>,
    provider_locations: HashMap<(String, String), Vec<String>>,
    registered_providers: Vec<String>,
    builds: Vec<RegistryBuildRequest>,
    app_requests: Vec<ContainerAppRequest>,
    source_control_requests: Vec<SourceControlRequest>,
    service_principal_scopes: Vec<Vec<String>>,
    failures: HashMap<String, InjectedFailure>,
    calls: Vec<String>,
}

/// In-memory `ArmClient`
pub struct InMemoryArm {
    subscription_id: String,
    inventory: Mutex<Inventory>,
}

impl InMemoryArm {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            inventory: Mutex::new(Inventory::default()),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn lock(&self) -> MutexGuard<'_, Inventory> {
        self.inventory
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call and apply any injected failure
    fn enter(&self, operation: &str) -> Result<MutexGuard<'_, Inventory>> {
        let mut inv = self.lock();
        inv.calls.push(operation.to_string());
        if let Some(failure) = inv.failures.get(operation) {
            return Err(failure.to_error(operation));
        }
        Ok(inv)
    }

    // --- ids ---

    pub fn app_id(&self, resource_group: &str, name: &str) -> String {
        resource_id(&self.subscription_id, resource_group, APP_NAMESPACE, "containerApps", name)
    }

    pub fn managed_environment_id(&self, resource_group: &str, name: &str) -> String {
        resource_id(
            &self.subscription_id,
            resource_group,
            APP_NAMESPACE,
            "managedEnvironments",
            name,
        )
    }

    pub fn connected_environment_id(&self, resource_group: &str, name: &str) -> String {
        resource_id(
            &self.subscription_id,
            resource_group,
            APP_NAMESPACE,
            "connectedEnvironments",
            name,
        )
    }

    pub fn custom_location_id(&self, resource_group: &str, name: &str) -> String {
        resource_id(
            &self.subscription_id,
            resource_group,
            "Microsoft.ExtendedLocation",
            "customLocations",
            name,
        )
    }

    pub fn connected_cluster_id(&self, resource_group: &str, name: &str) -> String {
        resource_id(
            &self.subscription_id,
            resource_group,
            "Microsoft.Kubernetes",
            "connectedClusters",
            name,
        )
    }

    pub fn extension_id(connected_cluster_id: &str, name: &str) -> String {
        format!(
            "{}/providers/Microsoft.KubernetesConfiguration/extensions/{}",
            connected_cluster_id, name
        )
    }

    // --- seeding ---

    pub fn add_resource_group(&self, name: &str, location: &str) {
        let id = resource_group_scope(&self.subscription_id, name);
        self.lock().resource_groups.push(ResourceGroupInfo {
            id,
            name: name.to_string(),
            location: location.to_string(),
        });
    }

    pub fn add_container_app(&self, app: ContainerAppInfo) {
        self.lock().apps.push(app);
    }

    pub fn add_managed_environment(&self, env: EnvironmentInfo) {
        self.lock().managed_environments.push(env);
    }

    pub fn add_connected_environment(&self, env: EnvironmentInfo) {
        self.lock().connected_environments.push(env);
    }

    pub fn add_custom_location(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
        host_resource_id: &str,
        cluster_extension_ids: Vec<String>,
        namespace: &str,
    ) -> String {
        let id = self.custom_location_id(resource_group, name);
        self.lock().custom_locations.push(CustomLocationInfo {
            id: id.clone(),
            name: name.to_string(),
            location: location.to_string(),
            properties: CustomLocationProperties {
                host_resource_id: host_resource_id.to_string(),
                cluster_extension_ids,
                namespace: namespace.to_string(),
            },
        });
        id
    }

    pub fn add_connected_cluster(&self, resource_group: &str, name: &str, location: &str) -> String {
        let id = self.connected_cluster_id(resource_group, name);
        self.lock().clusters.push(ConnectedClusterInfo {
            id: id.clone(),
            name: name.to_string(),
            location: location.to_string(),
            properties: ConnectedClusterProperties {
                connectivity_status: Some("Connected".to_string()),
            },
        });
        id
    }

    pub fn add_cluster_extension(
        &self,
        connected_cluster_id: &str,
        name: &str,
        extension_type: &str,
        release_namespace: &str,
    ) -> String {
        let id = Self::extension_id(connected_cluster_id, name);
        let info = ClusterExtensionInfo::new(id.clone(), name, extension_type, release_namespace);
        self.lock()
            .extensions
            .push((connected_cluster_id.to_string(), info));
        id
    }

    pub fn add_registry(&self, resource_group: &str, name: &str, location: &str) -> RegistryInfo {
        let info = RegistryInfo {
            id: resource_id(
                &self.subscription_id,
                resource_group,
                "Microsoft.ContainerRegistry",
                "registries",
                name,
            ),
            name: name.to_string(),
            location: location.to_string(),
            login_server: format!("{}.azurecr.io", name.to_ascii_lowercase()),
        };
        let credentials = RegistryCredentials {
            username: name.to_string(),
            password: format!("pw-{}", name),
            resource_group: resource_group.to_string(),
        };
        self.lock().registries.push((info.clone(), credentials));
        info
    }

    pub fn add_source_control(&self, resource_group: &str, app_name: &str, repo_url: &str) {
        let info = SourceControlInfo {
            id: format!("{}/sourcecontrols/current", self.app_id(resource_group, app_name)),
            name: "current".to_string(),
            properties: SourceControlProperties {
                repo_url: Some(repo_url.to_string()),
                branch: None,
            },
        };
        self.lock().source_controls.push((
            resource_group.to_string(),
            app_name.to_string(),
            info,
        ));
    }

    pub fn set_provider_locations(&self, namespace: &str, resource_type: &str, locations: &[&str]) {
        self.lock().provider_locations.insert(
            (namespace.to_ascii_lowercase(), resource_type.to_ascii_lowercase()),
            locations.iter().map(|l| l.to_string()).collect(),
        );
    }

    pub fn fail_on(&self, operation: &str, failure: InjectedFailure) {
        self.lock().failures.insert(operation.to_string(), failure);
    }

    // --- inspection ---

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == operation).count()
    }

    /// Inventory searches (list operations other than provider metadata)
    pub fn searches(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with("list_") && *c != "list_provider_locations")
            .cloned()
            .collect()
    }

    /// Calls that create or update resources
    pub fn creations(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with("create_"))
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn registered_providers(&self) -> Vec<String> {
        self.lock().registered_providers.clone()
    }

    pub fn builds(&self) -> Vec<RegistryBuildRequest> {
        self.lock().builds.clone()
    }

    pub fn app_requests(&self) -> Vec<ContainerAppRequest> {
        self.lock().app_requests.clone()
    }

    pub fn source_control_requests(&self) -> Vec<SourceControlRequest> {
        self.lock().source_control_requests.clone()
    }

    pub fn service_principal_scopes(&self) -> Vec<Vec<String>> {
        self.lock().service_principal_scopes.clone()
    }

    pub fn has_resource_group(&self, name: &str) -> bool {
        self.lock()
            .resource_groups
            .iter()
            .any(|g| g.name.eq_ignore_ascii_case(name))
    }

    pub fn registry_names(&self) -> Vec<String> {
        self.lock()
            .registries
            .iter()
            .map(|(r, _)| r.name.clone())
            .collect()
    }
}

fn in_group(id: &str, resource_group: &str) -> bool {
    ResourceId::parse(id).is_ok_and(|rid| rid.resource_group.eq_ignore_ascii_case(resource_group))
}

fn not_found(what: impl Into<String>) -> CloudError {
    CloudError::NotFound(what.into())
}

fn require_group(inv: &Inventory, resource_group: &str) -> Result<()> {
    if inv
        .resource_groups
        .iter()
        .any(|g| g.name.eq_ignore_ascii_case(resource_group))
    {
        Ok(())
    } else {
        Err(not_found(format!("ResourceGroupNotFound: {}", resource_group)))
    }
}

fn filter_group<T: Clone>(items: &[T], resource_group: Option<&str>, id: impl Fn(&T) -> &str) -> Vec<T> {
    items
        .iter()
        .filter(|item| resource_group.is_none_or(|rg| in_group(id(item), rg)))
        .cloned()
        .collect()
}

fn find_environment(
    items: &[EnvironmentInfo],
    resource_group: &str,
    name: &str,
) -> Option<EnvironmentInfo> {
    items
        .iter()
        .find(|e| e.name.eq_ignore_ascii_case(name) && in_group(&e.id, resource_group))
        .cloned()
}

#[async_trait]
impl ArmClient for InMemoryArm {
    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroupInfo> {
        let inv = self.enter("get_resource_group")?;
        inv.resource_groups
            .iter()
            .find(|g| g.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| not_found(format!("resource group {}", name)))
    }

    async fn create_resource_group(&self, name: &str, location: &str) -> Result<ResourceGroupInfo> {
        let mut inv = self.enter("create_resource_group")?;
        let info = ResourceGroupInfo {
            id: resource_group_scope(&self.subscription_id, name),
            name: name.to_string(),
            location: location.to_string(),
        };
        inv.resource_groups.retain(|g| !g.name.eq_ignore_ascii_case(name));
        inv.resource_groups.push(info.clone());
        Ok(info)
    }

    async fn list_container_apps(&self, resource_group: Option<&str>) -> Result<Vec<ContainerAppInfo>> {
        let inv = self.enter("list_container_apps")?;
        Ok(filter_group(&inv.apps, resource_group, |a| a.id.as_str()))
    }

    async fn get_container_app(&self, resource_group: &str, name: &str) -> Result<ContainerAppInfo> {
        let inv = self.enter("get_container_app")?;
        inv.apps
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name) && in_group(&a.id, resource_group))
            .cloned()
            .ok_or_else(|| not_found(format!("container app {}/{}", resource_group, name)))
    }

    async fn create_or_update_container_app(
        &self,
        request: &ContainerAppRequest,
    ) -> Result<ContainerAppInfo> {
        let mut inv = self.enter("create_or_update_container_app")?;
        require_group(&inv, &request.resource_group)?;

        let id = self.app_id(&request.resource_group, &request.name);
        let ingress = request.ingress.map(|i| IngressInfo {
            fqdn: Some(format!(
                "{}.{}.azurecontainerapps.io",
                request.name,
                request.location.to_ascii_lowercase().replace(' ', "")
            )),
            external: i.is_external(),
            target_port: request.target_port,
        });
        let registries = request
            .registry
            .iter()
            .map(|r| RegistryReference {
                server: r.server.clone(),
                username: Some(r.username.clone()),
            })
            .collect();
        let mut info = ContainerAppInfo {
            id: id.clone(),
            name: request.name.clone(),
            location: request.location.clone(),
            extended_location: None,
            properties: ContainerAppProperties {
                environment_id: Some(request.environment_id.clone()),
                provisioning_state: Some("Succeeded".to_string()),
                configuration: Some(AppConfiguration { ingress, registries }),
                template: Some(AppTemplate {
                    containers: vec![ContainerInfo {
                        name: request.name.clone(),
                        image: request.image.clone(),
                    }],
                }),
            },
        };
        if let Some(custom_location_id) = &request.custom_location_id {
            info = info.with_custom_location(custom_location_id.clone());
        }

        inv.apps.retain(|a| !a.id.eq_ignore_ascii_case(&id));
        inv.apps.push(info.clone());
        inv.app_requests.push(request.clone());
        Ok(info)
    }

    async fn list_managed_environments(
        &self,
        resource_group: Option<&str>,
    ) -> Result<Vec<EnvironmentInfo>> {
        let inv = self.enter("list_managed_environments")?;
        Ok(filter_group(&inv.managed_environments, resource_group, |e| e.id.as_str()))
    }

    async fn get_managed_environment(&self, resource_group: &str, name: &str) -> Result<EnvironmentInfo> {
        let inv = self.enter("get_managed_environment")?;
        find_environment(&inv.managed_environments, resource_group, name)
            .ok_or_else(|| not_found(format!("managed environment {}/{}", resource_group, name)))
    }

    async fn create_managed_environment(
        &self,
        request: &ManagedEnvironmentRequest,
    ) -> Result<EnvironmentInfo> {
        let mut inv = self.enter("create_managed_environment")?;
        require_group(&inv, &request.resource_group)?;
        let mut info = EnvironmentInfo::new(
            self.managed_environment_id(&request.resource_group, &request.name),
            &request.name,
            &request.location,
        );
        if let Some(logs) = &request.logs {
            info = info.with_logs_customer_id(logs.customer_id.clone());
        }
        inv.managed_environments.push(info.clone());
        Ok(info)
    }

    async fn list_connected_environments(
        &self,
        resource_group: Option<&str>,
    ) -> Result<Vec<EnvironmentInfo>> {
        let inv = self.enter("list_connected_environments")?;
        Ok(filter_group(&inv.connected_environments, resource_group, |e| e.id.as_str()))
    }

    async fn get_connected_environment(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<EnvironmentInfo> {
        let inv = self.enter("get_connected_environment")?;
        find_environment(&inv.connected_environments, resource_group, name)
            .ok_or_else(|| not_found(format!("connected environment {}/{}", resource_group, name)))
    }

    async fn create_connected_environment(
        &self,
        request: &ConnectedEnvironmentRequest,
    ) -> Result<EnvironmentInfo> {
        let mut inv = self.enter("create_connected_environment")?;
        require_group(&inv, &request.resource_group)?;
        if !inv
            .custom_locations
            .iter()
            .any(|c| c.id.eq_ignore_ascii_case(&request.custom_location_id))
        {
            return Err(CloudError::Api {
                status: 400,
                message: format!("custom location {} does not exist", request.custom_location_id),
            });
        }
        let info = EnvironmentInfo::new(
            self.connected_environment_id(&request.resource_group, &request.name),
            &request.name,
            &request.location,
        )
        .with_custom_location(request.custom_location_id.clone());
        inv.connected_environments.push(info.clone());
        Ok(info)
    }

    async fn get_custom_location(&self, id: &str) -> Result<CustomLocationInfo> {
        let inv = self.enter("get_custom_location")?;
        inv.custom_locations
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(id))
            .cloned()
            .ok_or_else(|| not_found(format!("custom location {}", id)))
    }

    async fn list_custom_locations(&self) -> Result<Vec<CustomLocationInfo>> {
        let inv = self.enter("list_custom_locations")?;
        Ok(inv.custom_locations.clone())
    }

    async fn create_custom_location(
        &self,
        request: &CustomLocationRequest,
    ) -> Result<CustomLocationInfo> {
        let mut inv = self.enter("create_custom_location")?;
        require_group(&inv, &request.resource_group)?;
        for extension_id in &request.cluster_extension_ids {
            if !inv
                .extensions
                .iter()
                .any(|(_, e)| e.id.eq_ignore_ascii_case(extension_id))
            {
                return Err(CloudError::Api {
                    status: 400,
                    message: format!("cluster extension {} does not exist", extension_id),
                });
            }
        }
        let info = CustomLocationInfo {
            id: self.custom_location_id(&request.resource_group, &request.name),
            name: request.name.clone(),
            location: request.location.clone(),
            properties: CustomLocationProperties {
                host_resource_id: request.host_resource_id.clone(),
                cluster_extension_ids: request.cluster_extension_ids.clone(),
                namespace: request.namespace.clone(),
            },
        };
        inv.custom_locations.push(info.clone());
        Ok(info)
    }

    async fn get_connected_cluster(&self, id: &str) -> Result<ConnectedClusterInfo> {
        let inv = self.enter("get_connected_cluster")?;
        inv.clusters
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(id))
            .cloned()
            .ok_or_else(|| not_found(format!("connected cluster {}", id)))
    }

    async fn list_cluster_extensions(
        &self,
        connected_cluster_id: &str,
    ) -> Result<Vec<ClusterExtensionInfo>> {
        let inv = self.enter("list_cluster_extensions")?;
        Ok(inv
            .extensions
            .iter()
            .filter(|(cluster, _)| cluster.eq_ignore_ascii_case(connected_cluster_id))
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn get_cluster_extension(&self, id: &str) -> Result<ClusterExtensionInfo> {
        let inv = self.enter("get_cluster_extension")?;
        inv.extensions
            .iter()
            .find(|(_, e)| e.id.eq_ignore_ascii_case(id))
            .map(|(_, e)| e.clone())
            .ok_or_else(|| not_found(format!("cluster extension {}", id)))
    }

    async fn create_cluster_extension(
        &self,
        request: &ClusterExtensionRequest,
    ) -> Result<ClusterExtensionInfo> {
        let mut inv = self.enter("create_cluster_extension")?;
        if !inv
            .clusters
            .iter()
            .any(|c| c.id.eq_ignore_ascii_case(&request.connected_cluster_id))
        {
            return Err(not_found(format!(
                "connected cluster {}",
                request.connected_cluster_id
            )));
        }
        let info = ClusterExtensionInfo::new(
            Self::extension_id(&request.connected_cluster_id, &request.name),
            &request.name,
            &request.extension_type,
            &request.release_namespace,
        );
        inv.extensions
            .push((request.connected_cluster_id.clone(), info.clone()));
        Ok(info)
    }

    async fn get_registry(&self, name: &str) -> Result<RegistryInfo> {
        let inv = self.enter("get_registry")?;
        inv.registries
            .iter()
            .find(|(r, _)| r.name.eq_ignore_ascii_case(name))
            .map(|(r, _)| r.clone())
            .ok_or_else(|| not_found(format!("registry {}", name)))
    }

    async fn create_registry(&self, resource_group: &str, name: &str, location: &str) -> Result<RegistryInfo> {
        {
            let inv = self.enter("create_registry")?;
            require_group(&inv, resource_group)?;
        }
        Ok(self.add_registry(resource_group, name, location))
    }

    async fn get_registry_credentials(&self, name: &str) -> Result<RegistryCredentials> {
        let inv = self.enter("get_registry_credentials")?;
        inv.registries
            .iter()
            .find(|(r, _)| r.name.eq_ignore_ascii_case(name))
            .map(|(_, c)| c.clone())
            .ok_or_else(|| not_found(format!("registry {}", name)))
    }

    async fn queue_registry_build(&self, request: &RegistryBuildRequest) -> Result<()> {
        let mut inv = self.enter("queue_registry_build")?;
        if !inv
            .registries
            .iter()
            .any(|(r, _)| r.name.eq_ignore_ascii_case(&request.registry_name))
        {
            return Err(not_found(format!("registry {}", request.registry_name)));
        }
        inv.builds.push(request.clone());
        Ok(())
    }

    async fn get_source_control(&self, resource_group: &str, app_name: &str) -> Result<SourceControlInfo> {
        let inv = self.enter("get_source_control")?;
        inv.source_controls
            .iter()
            .find(|(rg, app, _)| rg.eq_ignore_ascii_case(resource_group) && app.eq_ignore_ascii_case(app_name))
            .map(|(_, _, s)| s.clone())
            .ok_or_else(|| not_found(format!("source control for {}", app_name)))
    }

    async fn create_or_update_source_control(
        &self,
        request: &SourceControlRequest,
    ) -> Result<SourceControlInfo> {
        let info = SourceControlInfo {
            id: format!(
                "{}/sourcecontrols/current",
                self.app_id(&request.resource_group, &request.app_name)
            ),
            name: "current".to_string(),
            properties: SourceControlProperties {
                repo_url: Some(request.repo_url.clone()),
                branch: Some(request.branch.clone()),
            },
        };
        let mut inv = self.enter("create_or_update_source_control")?;
        inv.source_controls.retain(|(rg, app, _)| {
            !(rg.eq_ignore_ascii_case(&request.resource_group)
                && app.eq_ignore_ascii_case(&request.app_name))
        });
        inv.source_controls.push((
            request.resource_group.clone(),
            request.app_name.clone(),
            info.clone(),
        ));
        inv.source_control_requests.push(request.clone());
        Ok(info)
    }

    async fn create_service_principal(&self, scopes: &[String], _role: &str) -> Result<ServicePrincipal> {
        let mut inv = self.enter("create_service_principal")?;
        inv.service_principal_scopes.push(scopes.to_vec());
        let n = inv.service_principal_scopes.len();
        Ok(ServicePrincipal {
            client_id: format!("sp-client-{}", n),
            client_secret: format!("sp-secret-{}", n),
            tenant_id: "tenant-1".to_string(),
        })
    }

    async fn register_provider(&self, namespace: &str) -> Result<()> {
        let mut inv = self.enter("register_provider")?;
        if !inv
            .registered_providers
            .iter()
            .any(|p| p.eq_ignore_ascii_case(namespace))
        {
            inv.registered_providers.push(namespace.to_string());
        }
        Ok(())
    }

    async fn list_provider_locations(&self, namespace: &str, resource_type: &str) -> Result<Vec<String>> {
        let inv = self.enter("list_provider_locations")?;
        let key = (namespace.to_ascii_lowercase(), resource_type.to_ascii_lowercase());
        if let Some(locations) = inv.provider_locations.get(&key) {
            return Ok(locations.clone());
        }
        if namespace.eq_ignore_ascii_case(APP_NAMESPACE) {
            return Ok(DEFAULT_APP_LOCATIONS.iter().map(|l| l.to_string()).collect());
        }
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct HostedRepo {
    default_branch: String,
    files: BTreeMap<(String, String), String>,
}

#[derive(Default)]
struct HostState {
    repos: HashMap<String, HostedRepo>,
    dispatched: Vec<(String, String, String)>,
    fail_dispatch: bool,
}

/// In-memory `SourceHost`
#[derive(Default)]
pub struct InMemorySourceHost {
    state: Mutex<HostState>,
}

impl InMemorySourceHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_repo(&self, repo: &str, default_branch: &str) {
        self.lock().repos.insert(
            repo.to_ascii_lowercase(),
            HostedRepo {
                default_branch: default_branch.to_string(),
                files: BTreeMap::new(),
            },
        );
    }

    pub fn add_file(&self, repo: &str, branch: &str, path: &str, content: &str) {
        let mut state = self.lock();
        let hosted = state.repos.entry(repo.to_ascii_lowercase()).or_default();
        if hosted.default_branch.is_empty() {
            hosted.default_branch = branch.to_string();
        }
        hosted
            .files
            .insert((branch.to_string(), path.trim_start_matches('/').to_string()), content.to_string());
    }

    pub fn fail_dispatch(&self) {
        self.lock().fail_dispatch = true;
    }

    /// `(repo, app, branch)` of every dispatched workflow
    pub fn dispatched(&self) -> Vec<(String, String, String)> {
        self.lock().dispatched.clone()
    }
}

fn normalize_dir(path: &str) -> String {
    let trimmed = path.trim_start_matches("./").trim_matches('/');
    if trimmed == "." { String::new() } else { trimmed.to_string() }
}

#[async_trait]
impl SourceHost for InMemorySourceHost {
    async fn default_branch(&self, repo: &str, _token: &str) -> Result<String> {
        self.lock()
            .repos
            .get(&repo.to_ascii_lowercase())
            .map(|r| r.default_branch.clone())
            .ok_or_else(|| not_found(format!("repository {}", repo)))
    }

    async fn list_directory(&self, repo: &str, path: &str, branch: &str, _token: &str) -> Result<Vec<RepoEntry>> {
        let state = self.lock();
        let hosted = state
            .repos
            .get(&repo.to_ascii_lowercase())
            .ok_or_else(|| not_found(format!("repository {}", repo)))?;
        let dir = normalize_dir(path);
        let entries: Vec<RepoEntry> = hosted
            .files
            .keys()
            .filter(|(b, _)| b == branch)
            .filter_map(|(_, file)| {
                let parent = file.rsplit_once('/').map(|(p, _)| p).unwrap_or("");
                (parent == dir).then(|| RepoEntry {
                    path: file.clone(),
                    is_file: true,
                })
            })
            .collect();
        if entries.is_empty() && !hosted.files.keys().any(|(b, _)| b == branch) {
            return Err(not_found(format!("branch {}", branch)));
        }
        Ok(entries)
    }

    async fn read_file(&self, repo: &str, path: &str, branch: &str, _token: &str) -> Result<String> {
        self.lock()
            .repos
            .get(&repo.to_ascii_lowercase())
            .and_then(|r| r.files.get(&(branch.to_string(), path.to_string())).cloned())
            .ok_or_else(|| not_found(format!("{}:{}", branch, path)))
    }

    async fn dispatch_workflow(&self, repo: &str, app_name: &str, branch: &str, _token: &str) -> Result<()> {
        let mut state = self.lock();
        if state.fail_dispatch {
            return Err(CloudError::Api {
                status: 422,
                message: "workflow does not have a workflow_dispatch trigger".to_string(),
            });
        }
        state
            .dispatched
            .push((repo.to_string(), app_name.to_string(), branch.to_string()));
        Ok(())
    }
}
