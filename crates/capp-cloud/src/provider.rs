//! Collaborator traits driven by the up workflow
//!
//! `ArmClient` is the management-plane surface (show/list/create-or-update per
//! resource kind, registry build and credentials, provider registration).
//! `SourceHost` is the Git hosting surface used for `--repo` deployments.
//! Lookups return `CloudError::NotFound` when the resource does not exist;
//! every other error means the answer is unknown.

use crate::error::Result;
use crate::model::{
    ClusterExtensionInfo, ConnectedClusterInfo, ContainerAppInfo, CustomLocationInfo,
    EnvironmentInfo, RegistryCredentials, RegistryInfo, ResourceGroupInfo, ServicePrincipal,
    SourceControlInfo,
};
use crate::request::{
    ClusterExtensionRequest, ConnectedEnvironmentRequest, ContainerAppRequest,
    CustomLocationRequest, ManagedEnvironmentRequest, RegistryBuildRequest, SourceControlRequest,
};
use async_trait::async_trait;
use std::time::Duration;

/// Azure Resource Manager operations used by the planner and executor
#[async_trait]
pub trait ArmClient: Send + Sync {
    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroupInfo>;

    async fn create_resource_group(&self, name: &str, location: &str)
    -> Result<ResourceGroupInfo>;

    /// List apps in one resource group, or the whole subscription when `None`
    async fn list_container_apps(&self, resource_group: Option<&str>)
    -> Result<Vec<ContainerAppInfo>>;

    async fn get_container_app(&self, resource_group: &str, name: &str)
    -> Result<ContainerAppInfo>;

    async fn create_or_update_container_app(
        &self,
        request: &ContainerAppRequest,
    ) -> Result<ContainerAppInfo>;

    async fn list_managed_environments(
        &self,
        resource_group: Option<&str>,
    ) -> Result<Vec<EnvironmentInfo>>;

    async fn get_managed_environment(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<EnvironmentInfo>;

    async fn create_managed_environment(
        &self,
        request: &ManagedEnvironmentRequest,
    ) -> Result<EnvironmentInfo>;

    async fn list_connected_environments(
        &self,
        resource_group: Option<&str>,
    ) -> Result<Vec<EnvironmentInfo>>;

    async fn get_connected_environment(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<EnvironmentInfo>;

    async fn create_connected_environment(
        &self,
        request: &ConnectedEnvironmentRequest,
    ) -> Result<EnvironmentInfo>;

    async fn get_custom_location(&self, id: &str) -> Result<CustomLocationInfo>;

    async fn list_custom_locations(&self) -> Result<Vec<CustomLocationInfo>>;

    async fn create_custom_location(
        &self,
        request: &CustomLocationRequest,
    ) -> Result<CustomLocationInfo>;

    async fn get_connected_cluster(&self, id: &str) -> Result<ConnectedClusterInfo>;

    async fn list_cluster_extensions(
        &self,
        connected_cluster_id: &str,
    ) -> Result<Vec<ClusterExtensionInfo>>;

    async fn get_cluster_extension(&self, id: &str) -> Result<ClusterExtensionInfo>;

    async fn create_cluster_extension(
        &self,
        request: &ClusterExtensionRequest,
    ) -> Result<ClusterExtensionInfo>;

    /// Find a registry by name anywhere in the subscription
    async fn get_registry(&self, name: &str) -> Result<RegistryInfo>;

    async fn create_registry(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
    ) -> Result<RegistryInfo>;

    async fn get_registry_credentials(&self, name: &str) -> Result<RegistryCredentials>;

    /// Queue an image build on the registry and wait for it to finish
    async fn queue_registry_build(&self, request: &RegistryBuildRequest) -> Result<()>;

    async fn get_source_control(
        &self,
        resource_group: &str,
        app_name: &str,
    ) -> Result<SourceControlInfo>;

    async fn create_or_update_source_control(
        &self,
        request: &SourceControlRequest,
    ) -> Result<SourceControlInfo>;

    async fn create_service_principal(
        &self,
        scopes: &[String],
        role: &str,
    ) -> Result<ServicePrincipal>;

    /// Register a resource provider namespace if it is not registered yet
    async fn register_provider(&self, namespace: &str) -> Result<()>;

    /// Locations a provider offers for one of its resource types, display names as returned
    async fn list_provider_locations(
        &self,
        namespace: &str,
        resource_type: &str,
    ) -> Result<Vec<String>>;
}

/// A file or directory entry in a hosted repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
    pub path: String,
    pub is_file: bool,
}

/// Git hosting operations (`owner/repo` addressing)
#[async_trait]
pub trait SourceHost: Send + Sync {
    async fn default_branch(&self, repo: &str, token: &str) -> Result<String>;

    async fn list_directory(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
        token: &str,
    ) -> Result<Vec<RepoEntry>>;

    async fn read_file(&self, repo: &str, path: &str, branch: &str, token: &str)
    -> Result<String>;

    /// Dispatch the deployment workflow generated for `app_name` on `branch`
    async fn dispatch_workflow(
        &self,
        repo: &str,
        app_name: &str,
        branch: &str,
        token: &str,
    ) -> Result<()>;
}

/// Polling configuration for long-running operations
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between status checks
    pub interval: Duration,

    /// Maximum number of status checks before giving up
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 360,
        }
    }
}

impl PollConfig {
    /// Upper bound on the time spent polling one operation
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}
