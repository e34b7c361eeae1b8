//! ArmClient over the az CLI

use crate::az::AzCli;
use crate::error::AzError;
use async_trait::async_trait;
use capp_cloud::{
    ArmClient, ClusterExtensionInfo, ClusterExtensionRequest, CloudError,
    ConnectedClusterInfo, ConnectedEnvironmentRequest, ContainerAppInfo, ContainerAppRequest,
    CustomLocationInfo, CustomLocationRequest, EnvironmentInfo, ManagedEnvironmentRequest,
    PollConfig, RegistryBuildRequest, RegistryCredentials, RegistryInfo, ResourceGroupInfo,
    ResourceId, Result, ServicePrincipal, SourceControlInfo, SourceControlRequest, resource_id,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

const APP_API: &str = "2023-05-01";
const EXTENDED_LOCATION_API: &str = "2021-08-15";
const KUBERNETES_CONFIGURATION_API: &str = "2022-11-01";
const KUBERNETES_API: &str = "2024-01-01";
const REGISTRY_API: &str = "2023-07-01";
const RESOURCES_API: &str = "2021-04-01";

const APP_NS: &str = "Microsoft.App";
const REGISTRY_NS: &str = "Microsoft.ContainerRegistry";

/// `ArmClient` backed by `az rest` and a few dedicated az commands
pub struct AzArmClient {
    az: AzCli,
    subscription: String,
    poll: PollConfig,
}

impl AzArmClient {
    pub fn new(az: AzCli, subscription: impl Into<String>) -> Self {
        Self {
            az,
            subscription: subscription.into(),
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    fn subscription_path(&self) -> String {
        format!("/subscriptions/{}", self.subscription)
    }

    fn group_path(&self, resource_group: &str) -> String {
        format!("{}/resourceGroups/{}", self.subscription_path(), resource_group)
    }

    fn id(&self, resource_group: &str, namespace: &str, resource_type: &str, name: &str) -> String {
        resource_id(&self.subscription, resource_group, namespace, resource_type, name)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<T> {
        let value = self.az.rest("get", &with_api(path, api_version), None).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn put(&self, path: &str, api_version: &str, body: &Value) -> Result<Value> {
        Ok(self.az.rest("put", &with_api(path, api_version), Some(body)).await?)
    }

    /// Follow `nextLink` until the collection is exhausted
    async fn list<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(with_api(path, api_version));
        while let Some(url) = next {
            let page = self.az.rest("get", &url, None).await?;
            let (values, link) = split_page(page);
            for value in values {
                items.push(serde_json::from_value(value)?);
            }
            next = link;
        }
        Ok(items)
    }

    /// PUT then poll the resource until it leaves a non-terminal state
    async fn put_and_wait<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        body: &Value,
        state_field: &str,
    ) -> Result<T> {
        let mut current = self.put(path, api_version, body).await?;
        let mut attempts = 0;
        loop {
            match operation_state(&current, state_field) {
                OperationState::Succeeded => return Ok(serde_json::from_value(current)?),
                OperationState::Failed(state) => {
                    return Err(CloudError::OperationFailed(format!(
                        "{} finished in state {}",
                        path, state
                    )));
                }
                OperationState::Running => {}
            }
            if attempts >= self.poll.max_attempts {
                return Err(CloudError::Timeout(format!(
                    "{} did not finish within {:?}",
                    path,
                    self.poll.budget()
                )));
            }
            attempts += 1;
            tracing::debug!("Waiting for {} ({}/{})", path, attempts, self.poll.max_attempts);
            tokio::time::sleep(self.poll.interval).await;
            current = self.az.rest("get", &with_api(path, api_version), None).await?;
        }
    }

    async fn list_environments(
        &self,
        resource_group: Option<&str>,
        resource_type: &str,
    ) -> Result<Vec<EnvironmentInfo>> {
        let scope = match resource_group {
            Some(rg) => self.group_path(rg),
            None => self.subscription_path(),
        };
        self.list(&format!("{}/providers/{}/{}", scope, APP_NS, resource_type), APP_API)
            .await
    }
}

fn with_api(path: &str, api_version: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}api-version={}", path, separator, api_version)
}

/// Items and continuation link of one list response
fn split_page(page: Value) -> (Vec<Value>, Option<String>) {
    let next = page
        .get("nextLink")
        .and_then(Value::as_str)
        .filter(|l| !l.is_empty())
        .map(str::to_string);
    let values = match page {
        Value::Object(mut map) => match map.remove("value") {
            Some(Value::Array(values)) => values,
            _ => Vec::new(),
        },
        Value::Array(values) => values,
        _ => Vec::new(),
    };
    (values, next)
}

#[derive(Debug, PartialEq, Eq)]
enum OperationState {
    Succeeded,
    Running,
    Failed(String),
}

/// A resource without a state field is treated as done
fn operation_state(resource: &Value, field: &str) -> OperationState {
    let state = resource
        .get("properties")
        .and_then(|p| p.get(field))
        .and_then(Value::as_str);
    match state {
        None => OperationState::Succeeded,
        Some(s) if s.eq_ignore_ascii_case("Succeeded") => OperationState::Succeeded,
        Some(s) if s.eq_ignore_ascii_case("Failed") || s.eq_ignore_ascii_case("Canceled") => {
            OperationState::Failed(s.to_string())
        }
        Some(_) => OperationState::Running,
    }
}

fn not_found(what: String) -> CloudError {
    CloudError::NotFound(what)
}

#[async_trait]
impl ArmClient for AzArmClient {
    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroupInfo> {
        self.get(&self.group_path(name), RESOURCES_API).await
    }

    async fn create_resource_group(&self, name: &str, location: &str) -> Result<ResourceGroupInfo> {
        let value = self
            .put(&self.group_path(name), RESOURCES_API, &json!({ "location": location }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn list_container_apps(&self, resource_group: Option<&str>) -> Result<Vec<ContainerAppInfo>> {
        let scope = match resource_group {
            Some(rg) => self.group_path(rg),
            None => self.subscription_path(),
        };
        self.list(&format!("{}/providers/{}/containerApps", scope, APP_NS), APP_API)
            .await
    }

    async fn get_container_app(&self, resource_group: &str, name: &str) -> Result<ContainerAppInfo> {
        self.get(&self.id(resource_group, APP_NS, "containerApps", name), APP_API)
            .await
    }

    async fn create_or_update_container_app(
        &self,
        request: &ContainerAppRequest,
    ) -> Result<ContainerAppInfo> {
        let path = self.id(&request.resource_group, APP_NS, "containerApps", &request.name);
        self.put_and_wait(&path, APP_API, &request.to_body(), "provisioningState")
            .await
    }

    async fn list_managed_environments(&self, resource_group: Option<&str>) -> Result<Vec<EnvironmentInfo>> {
        self.list_environments(resource_group, "managedEnvironments").await
    }

    async fn get_managed_environment(&self, resource_group: &str, name: &str) -> Result<EnvironmentInfo> {
        self.get(&self.id(resource_group, APP_NS, "managedEnvironments", name), APP_API)
            .await
    }

    async fn create_managed_environment(
        &self,
        request: &ManagedEnvironmentRequest,
    ) -> Result<EnvironmentInfo> {
        let path = self.id(&request.resource_group, APP_NS, "managedEnvironments", &request.name);
        self.put_and_wait(&path, APP_API, &request.to_body(), "provisioningState")
            .await
    }

    async fn list_connected_environments(
        &self,
        resource_group: Option<&str>,
    ) -> Result<Vec<EnvironmentInfo>> {
        self.list_environments(resource_group, "connectedEnvironments").await
    }

    async fn get_connected_environment(&self, resource_group: &str, name: &str) -> Result<EnvironmentInfo> {
        self.get(&self.id(resource_group, APP_NS, "connectedEnvironments", name), APP_API)
            .await
    }

    async fn create_connected_environment(
        &self,
        request: &ConnectedEnvironmentRequest,
    ) -> Result<EnvironmentInfo> {
        let path = self.id(&request.resource_group, APP_NS, "connectedEnvironments", &request.name);
        self.put_and_wait(&path, APP_API, &request.to_body(), "provisioningState")
            .await
    }

    async fn get_custom_location(&self, id: &str) -> Result<CustomLocationInfo> {
        self.get(id, EXTENDED_LOCATION_API).await
    }

    async fn list_custom_locations(&self) -> Result<Vec<CustomLocationInfo>> {
        let path = format!(
            "{}/providers/Microsoft.ExtendedLocation/customLocations",
            self.subscription_path()
        );
        self.list(&path, EXTENDED_LOCATION_API).await
    }

    async fn create_custom_location(
        &self,
        request: &CustomLocationRequest,
    ) -> Result<CustomLocationInfo> {
        let path = self.id(
            &request.resource_group,
            "Microsoft.ExtendedLocation",
            "customLocations",
            &request.name,
        );
        self.put_and_wait(&path, EXTENDED_LOCATION_API, &request.to_body(), "provisioningState")
            .await
    }

    async fn get_connected_cluster(&self, id: &str) -> Result<ConnectedClusterInfo> {
        self.get(id, KUBERNETES_API).await
    }

    async fn list_cluster_extensions(&self, connected_cluster_id: &str) -> Result<Vec<ClusterExtensionInfo>> {
        let path = format!(
            "{}/providers/Microsoft.KubernetesConfiguration/extensions",
            connected_cluster_id
        );
        self.list(&path, KUBERNETES_CONFIGURATION_API).await
    }

    async fn get_cluster_extension(&self, id: &str) -> Result<ClusterExtensionInfo> {
        self.get(id, KUBERNETES_CONFIGURATION_API).await
    }

    async fn create_cluster_extension(
        &self,
        request: &ClusterExtensionRequest,
    ) -> Result<ClusterExtensionInfo> {
        let path = format!(
            "{}/providers/Microsoft.KubernetesConfiguration/extensions/{}",
            request.connected_cluster_id, request.name
        );
        self.put_and_wait(&path, KUBERNETES_CONFIGURATION_API, &request.to_body(), "provisioningState")
            .await
    }

    async fn get_registry(&self, name: &str) -> Result<RegistryInfo> {
        let path = format!("{}/providers/{}/registries", self.subscription_path(), REGISTRY_NS);
        let registries: Vec<Value> = self.list(&path, REGISTRY_API).await?;
        let found = registries.into_iter().find(|r| {
            r.get("name")
                .and_then(Value::as_str)
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        });
        match found {
            Some(value) => Ok(registry_info(value)?),
            None => Err(not_found(format!("registry {}", name))),
        }
    }

    async fn create_registry(&self, resource_group: &str, name: &str, location: &str) -> Result<RegistryInfo> {
        let path = self.id(resource_group, REGISTRY_NS, "registries", name);
        let body = json!({
            "location": location,
            "sku": { "name": "Basic" },
            "properties": { "adminUserEnabled": true }
        });
        let value: Value = self
            .put_and_wait(&path, REGISTRY_API, &body, "provisioningState")
            .await?;
        registry_info(value)
    }

    async fn get_registry_credentials(&self, name: &str) -> Result<RegistryCredentials> {
        let registry = self.get_registry(name).await?;
        let resource_group = ResourceId::parse(&registry.id)?.resource_group;
        let value = self
            .az
            .rest("post", &with_api(&format!("{}/listCredentials", registry.id), REGISTRY_API), None)
            .await?;
        parse_credentials(&value, resource_group)
    }

    async fn queue_registry_build(&self, request: &RegistryBuildRequest) -> Result<()> {
        let source_dir = request.source_dir.to_string_lossy();
        tracing::info!(
            "Building image {} on registry {}...",
            request.image,
            request.registry_name
        );
        self.az
            .run_command(&[
                "acr",
                "build",
                "--registry",
                request.registry_name.as_str(),
                "--resource-group",
                request.resource_group.as_str(),
                "--image",
                request.image.as_str(),
                "--file",
                request.dockerfile.as_str(),
                "--subscription",
                self.subscription.as_str(),
                source_dir.as_ref(),
            ])
            .await?;
        Ok(())
    }

    async fn get_source_control(&self, resource_group: &str, app_name: &str) -> Result<SourceControlInfo> {
        let path = format!(
            "{}/sourcecontrols/current",
            self.id(resource_group, APP_NS, "containerApps", app_name)
        );
        self.get(&path, APP_API).await
    }

    async fn create_or_update_source_control(
        &self,
        request: &SourceControlRequest,
    ) -> Result<SourceControlInfo> {
        let path = format!(
            "{}/sourcecontrols/current",
            self.id(&request.resource_group, APP_NS, "containerApps", &request.app_name)
        );
        self.put_and_wait(&path, APP_API, &request.to_body(), "operationState")
            .await
    }

    async fn create_service_principal(&self, scopes: &[String], role: &str) -> Result<ServicePrincipal> {
        let mut args = vec!["ad", "sp", "create-for-rbac", "--role", role, "--output", "json", "--scopes"];
        args.extend(scopes.iter().map(String::as_str));
        let value = self.az.run_json(&args).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn register_provider(&self, namespace: &str) -> Result<()> {
        let path = format!("{}/providers/{}", self.subscription_path(), namespace);
        let provider: Value = self.get(&path, RESOURCES_API).await?;
        let registered = provider
            .get("registrationState")
            .and_then(Value::as_str)
            .is_some_and(|s| s.eq_ignore_ascii_case("Registered"));
        if registered {
            return Ok(());
        }

        tracing::info!("Registering resource provider {}...", namespace);
        self.az
            .rest("post", &with_api(&format!("{}/register", path), RESOURCES_API), None)
            .await?;
        Ok(())
    }

    async fn list_provider_locations(&self, namespace: &str, resource_type: &str) -> Result<Vec<String>> {
        let path = format!("{}/providers/{}", self.subscription_path(), namespace);
        let provider: Value = self.get(&path, RESOURCES_API).await?;
        provider_locations(&provider, resource_type)
            .ok_or_else(|| not_found(format!("resource type {}/{}", namespace, resource_type)))
    }
}

fn registry_info(value: Value) -> Result<RegistryInfo> {
    let mut info: RegistryInfo = serde_json::from_value(value.clone())?;
    if info.login_server.is_empty() {
        if let Some(server) = value
            .get("properties")
            .and_then(|p| p.get("loginServer"))
            .and_then(Value::as_str)
        {
            info.login_server = server.to_string();
        }
    }
    Ok(info)
}

fn parse_credentials(value: &Value, resource_group: String) -> Result<RegistryCredentials> {
    let username = value.get("username").and_then(Value::as_str);
    let password = value
        .get("passwords")
        .and_then(Value::as_array)
        .and_then(|p| p.first())
        .and_then(|p| p.get("value"))
        .and_then(Value::as_str);
    match (username, password) {
        (Some(username), Some(password)) => Ok(RegistryCredentials {
            username: username.to_string(),
            password: password.to_string(),
            resource_group,
        }),
        _ => Err(AzError::UnexpectedOutput(
            "registry credentials are missing; is the admin user enabled?".to_string(),
        )
        .into()),
    }
}

fn provider_locations(provider: &Value, resource_type: &str) -> Option<Vec<String>> {
    let entry = provider
        .get("resourceTypes")?
        .as_array()?
        .iter()
        .find(|t| {
            t.get("resourceType")
                .and_then(Value::as_str)
                .is_some_and(|n| n.eq_ignore_ascii_case(resource_type))
        })?;
    let locations = entry
        .get("locations")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    Some(locations)
}
