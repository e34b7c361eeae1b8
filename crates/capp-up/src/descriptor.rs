//! Resource descriptors
//!
//! Each descriptor names one cloud resource and knows how to look itself up
//! and create itself. Lookups collapse only `NotFound` into "absent"; any
//! other failure is returned to the caller.

use crate::context::UpContext;
use crate::error::{Result, UpError};
use crate::naming::{self, DEFAULT_LOCATION, QUICKSTART_IMAGE, STAGING_LOCATION};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use capp_cloud::{
    ActionType, ApplyResult, ClusterExtensionInfo, ClusterExtensionRequest,
    ConnectedEnvironmentRequest, ContainerAppInfo, ContainerAppRequest, CloudResultExt,
    CustomLocationInfo, CustomLocationRequest, EnvVar, EnvironmentInfo, Ingress,
    LogAnalyticsConfig, ManagedEnvironmentRequest, RegistryCredentialRequest, RegistryInfo,
    ResourceGroupInfo, ResourceId, ResourceKind, resource_id,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const CONTAINER_APPS_RP: &str = "Microsoft.App";
pub const CUSTOM_LOCATION_RP: &str = "Microsoft.ExtendedLocation";
pub const KUBERNETES_CONFIGURATION_RP: &str = "Microsoft.KubernetesConfiguration";
pub const LOG_ANALYTICS_RP: &str = "Microsoft.OperationalInsights";
pub const MANAGED_ENVIRONMENT_TYPE: &str = "managedEnvironments";
pub const CONNECTED_ENVIRONMENT_TYPE: &str = "connectedEnvironments";

pub(crate) fn log_decision(ledger: &mut ApplyResult, action: ActionType, kind: ResourceKind, name: &str, scope: &str) {
    match action {
        ActionType::Create => {
            tracing::info!(kind = %kind, name, action = %action, "Creating {} '{}' {}", kind, name, scope)
        }
        ActionType::Update => {
            tracing::info!(kind = %kind, name, action = %action, "Updating {} '{}' {}", kind, name, scope)
        }
        ActionType::Reuse => {
            tracing::info!(kind = %kind, name, action = %action, "Using {} '{}' {}", kind, name, scope)
        }
        ActionType::Trigger => {
            tracing::info!(kind = %kind, name, action = %action, "Starting {} '{}' {}", kind, name, scope)
        }
    }
    ledger.record(action, kind, name, scope.trim());
}

fn unnamed(kind: ResourceKind) -> UpError {
    UpError::Validation(format!("No name was resolved for the {}", kind))
}

/// Location for a new resource group: given, else configured, else the first
/// region offered for managed environments, with the staging region remapped.
pub async fn default_location(ctx: &UpContext, location: Option<&str>) -> Result<String> {
    let location = match location.or(ctx.default_location.as_deref()) {
        Some(location) => location.to_string(),
        None => ctx
            .arm
            .list_provider_locations(CONTAINER_APPS_RP, MANAGED_ENVIRONMENT_TYPE)
            .await?
            .first()
            .map(|l| naming::format_location(l))
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
    };
    Ok(naming::remap_staging(location))
}

/// Allowed regions of `Microsoft.App` for one environment type, formatted
pub async fn environment_locations(ctx: &UpContext, resource_type: &str) -> Result<Vec<String>> {
    Ok(ctx
        .arm
        .list_provider_locations(CONTAINER_APPS_RP, resource_type)
        .await?
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| naming::format_location(l))
        .collect())
}

pub async fn ensure_location_allowed(ctx: &UpContext, location: &str, resource_type: &str) -> Result<()> {
    let allowed = environment_locations(ctx, resource_type).await?;
    if allowed.iter().any(|l| *l == naming::format_location(location)) {
        Ok(())
    } else {
        Err(UpError::external(
            format!("Location {} is not allowed for {}/{}", location, CONTAINER_APPS_RP, resource_type),
            format!("Use one of: {}", allowed.join(", ")),
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceGroupSpec {
    pub name: Option<String>,
    pub location: Option<String>,
    pub exists: bool,
}

impl ResourceGroupSpec {
    pub async fn get(&self, ctx: &UpContext) -> Result<Option<ResourceGroupInfo>> {
        match &self.name {
            Some(name) => Ok(ctx.arm.get_resource_group(name).await.found()?),
            None => Ok(None),
        }
    }

    pub async fn check_exists(&self, ctx: &UpContext) -> Result<bool> {
        Ok(self.get(ctx).await?.is_some())
    }

    pub async fn create(&self, ctx: &UpContext) -> Result<ResourceGroupInfo> {
        let name = self.name.as_deref().ok_or_else(|| unnamed(ResourceKind::ResourceGroup))?;
        let location = default_location(ctx, self.location.as_deref()).await?;
        Ok(ctx.arm.create_resource_group(name, &location).await?)
    }

    pub async fn create_if_needed(&mut self, ctx: &UpContext, ledger: &mut ApplyResult) -> Result<()> {
        let name = self.name.clone().ok_or_else(|| unnamed(ResourceKind::ResourceGroup))?;
        if self.check_exists(ctx).await? {
            log_decision(ledger, ActionType::Reuse, ResourceKind::ResourceGroup, &name, "");
        } else {
            log_decision(ledger, ActionType::Create, ResourceKind::ResourceGroup, &name, "");
            let created = self.create(ctx).await?;
            self.location = Some(created.location);
        }
        self.exists = true;
        Ok(())
    }
}

/// Environment variant, fixed once resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentVariant {
    Managed,
    Connected { custom_location_id: Option<String> },
}

impl EnvironmentVariant {
    fn from_resource_type(resource_type: &str, custom_location_id: Option<String>) -> Self {
        if resource_type.eq_ignore_ascii_case(CONNECTED_ENVIRONMENT_TYPE) {
            EnvironmentVariant::Connected { custom_location_id }
        } else {
            EnvironmentVariant::Managed
        }
    }

    pub fn resource_type(&self) -> &'static str {
        match self {
            EnvironmentVariant::Managed => MANAGED_ENVIRONMENT_TYPE,
            EnvironmentVariant::Connected { .. } => CONNECTED_ENVIRONMENT_TYPE,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            EnvironmentVariant::Managed => ResourceKind::ManagedEnvironment,
            EnvironmentVariant::Connected { .. } => ResourceKind::ConnectedEnvironment,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSpec {
    pub name: Option<String>,
    /// `None` while the environment lives in the app's resource group
    pub resource_group: Option<String>,
    pub location: Option<String>,
    /// `None` until resolved; creation defaults to managed
    pub variant: Option<EnvironmentVariant>,
    pub logs: Option<LogAnalyticsConfig>,
}

impl EnvironmentSpec {
    /// Environment from a name or resource id plus the cluster flags
    pub fn from_reference(
        reference: Option<&str>,
        custom_location_id: Option<&str>,
        connected_cluster_id: Option<&str>,
    ) -> Result<Self> {
        let connected = || EnvironmentVariant::Connected {
            custom_location_id: custom_location_id.map(str::to_string),
        };
        let mut spec = EnvironmentSpec::default();
        match reference {
            Some(value) if value.starts_with('/') => {
                let rid = ResourceId::parse(value).map_err(|_| {
                    UpError::InvalidArgumentValue(format!("Invalid environment resource id {}", value))
                })?;
                if !rid.is_type(MANAGED_ENVIRONMENT_TYPE) && !rid.is_type(CONNECTED_ENVIRONMENT_TYPE) {
                    return Err(UpError::InvalidArgumentValue(format!(
                        "{} is not a container apps environment",
                        value
                    )));
                }
                spec.variant = Some(EnvironmentVariant::from_resource_type(
                    &rid.resource_type,
                    custom_location_id.map(str::to_string),
                ));
                spec.name = Some(rid.name);
                spec.resource_group = Some(rid.resource_group);
            }
            Some(name) => spec.name = Some(name.to_string()),
            None => {}
        }
        if spec.variant.is_none() && (custom_location_id.is_some() || connected_cluster_id.is_some()) {
            spec.variant = Some(connected());
        }
        Ok(spec)
    }

    /// Take name, group and variant from an existing environment id
    pub fn adopt(self, id: &str) -> Result<Self> {
        let rid = ResourceId::parse(id)?;
        let custom_location_id = self.custom_location_id().map(str::to_string);
        Ok(EnvironmentSpec {
            name: Some(rid.name),
            resource_group: Some(rid.resource_group),
            variant: Some(EnvironmentVariant::from_resource_type(&rid.resource_type, custom_location_id)),
            ..self
        })
    }

    pub fn with_custom_location(self, custom_location_id: Option<String>) -> Self {
        EnvironmentSpec {
            variant: Some(EnvironmentVariant::Connected { custom_location_id }),
            ..self
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.variant, Some(EnvironmentVariant::Connected { .. }))
    }

    pub fn custom_location_id(&self) -> Option<&str> {
        match &self.variant {
            Some(EnvironmentVariant::Connected { custom_location_id }) => custom_location_id.as_deref(),
            _ => None,
        }
    }

    fn effective_variant(&self) -> EnvironmentVariant {
        self.variant.clone().unwrap_or(EnvironmentVariant::Managed)
    }

    pub fn kind(&self) -> ResourceKind {
        self.effective_variant().kind()
    }

    pub fn resource_id(&self, subscription: &str) -> Option<String> {
        Some(resource_id(
            subscription,
            self.resource_group.as_deref()?,
            CONTAINER_APPS_RP,
            self.effective_variant().resource_type(),
            self.name.as_deref()?,
        ))
    }

    pub async fn get(&self, ctx: &UpContext) -> Result<Option<EnvironmentInfo>> {
        let (Some(name), Some(group)) = (self.name.as_deref(), self.resource_group.as_deref()) else {
            return Ok(None);
        };
        let found = if self.is_connected() {
            ctx.arm.get_connected_environment(group, name).await.found()?
        } else {
            ctx.arm.get_managed_environment(group, name).await.found()?
        };
        Ok(found)
    }

    pub async fn check_exists(&self, ctx: &UpContext) -> Result<bool> {
        Ok(self.get(ctx).await?.is_some())
    }

    /// Create the environment; `fallback_location` is used when none was resolved
    pub async fn create(&self, ctx: &UpContext, fallback_location: Option<&str>) -> Result<EnvironmentInfo> {
        let name = self.name.clone().ok_or_else(|| unnamed(self.kind()))?;
        let resource_group = self.resource_group.clone().ok_or_else(|| unnamed(ResourceKind::ResourceGroup))?;
        let variant = self.effective_variant();

        let location = match self.location.as_deref().or(fallback_location) {
            Some(location) => {
                ensure_location_allowed(ctx, location, variant.resource_type()).await?;
                naming::format_location(location)
            }
            None => environment_locations(ctx, variant.resource_type())
                .await?
                .into_iter()
                .next()
                .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        };

        ctx.arm.register_provider(LOG_ANALYTICS_RP).await?;
        let created = match variant {
            EnvironmentVariant::Connected { custom_location_id } => {
                let custom_location_id = custom_location_id.ok_or_else(|| {
                    UpError::Validation(format!(
                        "Connected environment {} needs a custom location before it can be created",
                        name
                    ))
                })?;
                ctx.arm
                    .create_connected_environment(&ConnectedEnvironmentRequest {
                        name,
                        resource_group,
                        location,
                        custom_location_id,
                    })
                    .await?
            }
            EnvironmentVariant::Managed => {
                ctx.arm
                    .create_managed_environment(&ManagedEnvironmentRequest {
                        name,
                        resource_group,
                        location,
                        logs: self.logs.clone(),
                    })
                    .await?
            }
        };
        Ok(created)
    }

    /// Returns the environment definition, existing or new
    pub async fn create_if_needed(
        &mut self,
        ctx: &UpContext,
        fallback_location: Option<&str>,
        ledger: &mut ApplyResult,
    ) -> Result<EnvironmentInfo> {
        let name = self.name.clone().ok_or_else(|| unnamed(self.kind()))?;
        let scope = format!("in resource group {}", self.resource_group.as_deref().unwrap_or_default());
        let info = match self.get(ctx).await? {
            Some(existing) => {
                log_decision(ledger, ActionType::Reuse, self.kind(), &name, &scope);
                existing
            }
            None => {
                log_decision(ledger, ActionType::Create, self.kind(), &name, &scope);
                self.create(ctx, fallback_location).await?
            }
        };
        if !info.location.is_empty() {
            self.location = Some(naming::format_location(&info.location));
        }
        Ok(info)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomLocationSpec {
    pub name: Option<String>,
    pub resource_group: Option<String>,
    pub location: Option<String>,
    pub namespace: Option<String>,
    pub cluster_extension_id: Option<String>,
    pub connected_cluster_id: Option<String>,
    pub exists: bool,
}

impl CustomLocationSpec {
    pub fn from_args(custom_location_id: Option<&str>, connected_cluster_id: Option<&str>) -> Result<Self> {
        let spec = CustomLocationSpec {
            connected_cluster_id: connected_cluster_id.map(str::to_string),
            ..Default::default()
        };
        match custom_location_id {
            Some(id) => spec.adopt(id),
            None => Ok(spec),
        }
    }

    pub fn adopt(self, id: &str) -> Result<Self> {
        let rid = ResourceId::parse(id)?;
        Ok(CustomLocationSpec {
            name: Some(rid.name),
            resource_group: Some(rid.resource_group),
            ..self
        })
    }

    pub fn resource_id(&self, subscription: &str) -> Option<String> {
        Some(resource_id(
            subscription,
            self.resource_group.as_deref()?,
            CUSTOM_LOCATION_RP,
            "customLocations",
            self.name.as_deref()?,
        ))
    }

    pub async fn get(&self, ctx: &UpContext) -> Result<Option<CustomLocationInfo>> {
        match self.resource_id(&ctx.subscription_id) {
            Some(id) => Ok(ctx.arm.get_custom_location(&id).await.found()?),
            None => Ok(None),
        }
    }

    pub async fn create(&self, ctx: &UpContext) -> Result<CustomLocationInfo> {
        let missing = |what: &str| {
            UpError::Validation(format!("Cannot create custom location without {}", what))
        };
        let name = self.name.clone().ok_or_else(|| unnamed(ResourceKind::CustomLocation))?;
        let request = CustomLocationRequest {
            name,
            resource_group: self.resource_group.clone().ok_or_else(|| missing("a resource group"))?,
            location: self.location.clone().ok_or_else(|| missing("a location"))?,
            host_resource_id: self
                .connected_cluster_id
                .clone()
                .ok_or_else(|| missing("a connected cluster"))?,
            cluster_extension_ids: self.cluster_extension_id.iter().cloned().collect(),
            namespace: self.namespace.clone().ok_or_else(|| missing("a namespace"))?,
        };
        ctx.arm.register_provider(CUSTOM_LOCATION_RP).await?;
        Ok(ctx.arm.create_custom_location(&request).await?)
    }

    pub async fn create_if_needed(&mut self, ctx: &UpContext, ledger: &mut ApplyResult) -> Result<()> {
        let Some(name) = self.name.clone() else {
            return Ok(());
        };
        let scope = format!("in resource group {}", self.resource_group.as_deref().unwrap_or_default());
        if self.exists {
            log_decision(ledger, ActionType::Reuse, ResourceKind::CustomLocation, &name, &scope);
        } else {
            log_decision(ledger, ActionType::Create, ResourceKind::CustomLocation, &name, &scope);
            self.create(ctx).await?;
            self.exists = true;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSpec {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub connected_cluster_id: Option<String>,
    pub exists: bool,
    pub logs_resource_group: Option<String>,
    pub logs_location: Option<String>,
    pub logs: Option<LogAnalyticsConfig>,
    pub connected_environment_name: Option<String>,
}

impl ExtensionSpec {
    pub fn resource_id(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        if name.starts_with('/') {
            return Some(name.to_string());
        }
        Some(format!(
            "{}/providers/{}/extensions/{}",
            self.connected_cluster_id.as_deref()?,
            KUBERNETES_CONFIGURATION_RP,
            name
        ))
    }

    pub async fn get(&self, ctx: &UpContext) -> Result<Option<ClusterExtensionInfo>> {
        match self.resource_id() {
            Some(id) => Ok(ctx.arm.get_cluster_extension(&id).await.found()?),
            None => Ok(None),
        }
    }

    fn request(&self) -> Result<ClusterExtensionRequest> {
        let name = self.name.clone().ok_or_else(|| unnamed(ResourceKind::ClusterExtension))?;
        let connected_cluster_id = self.connected_cluster_id.clone().ok_or_else(|| {
            UpError::Validation("Cannot create a cluster extension without a connected cluster".to_string())
        })?;
        let namespace = self
            .namespace
            .clone()
            .unwrap_or_else(|| naming::DEFAULT_EXTENSION_NAMESPACE.to_string());

        let mut settings = BTreeMap::new();
        settings.insert("Microsoft.CustomLocation.ServiceAccount".to_string(), "default".to_string());
        settings.insert("appsNamespace".to_string(), namespace.clone());
        if let Some(env_name) = &self.connected_environment_name {
            settings.insert("clusterName".to_string(), env_name.clone());
        }
        if let Some(group) = &self.logs_resource_group {
            settings.insert(
                "envoy.annotations.service.beta.kubernetes.io/azure-load-balancer-resource-group".to_string(),
                group.clone(),
            );
        }

        let mut protected = BTreeMap::new();
        if let Some(logs) = &self.logs {
            settings.insert("logProcessor.appLogs.destination".to_string(), "log-analytics".to_string());
            protected.insert(
                "logProcessor.appLogs.logAnalyticsConfig.customerId".to_string(),
                STANDARD.encode(&logs.customer_id),
            );
            if let Some(key) = &logs.shared_key {
                protected.insert(
                    "logProcessor.appLogs.logAnalyticsConfig.sharedKey".to_string(),
                    STANDARD.encode(key),
                );
            }
        }

        Ok(ClusterExtensionRequest {
            connected_cluster_id,
            name,
            extension_type: naming::CONTAINER_APP_EXTENSION_TYPE.to_string(),
            release_namespace: namespace,
            configuration_settings: settings,
            protected_settings: protected,
        })
    }

    pub async fn create(&self, ctx: &UpContext) -> Result<ClusterExtensionInfo> {
        Ok(ctx.arm.create_cluster_extension(&self.request()?).await?)
    }

    pub async fn create_if_needed(&mut self, ctx: &UpContext, ledger: &mut ApplyResult) -> Result<()> {
        let Some(name) = self.name.clone() else {
            return Ok(());
        };
        let scope = format!("in cluster {}", self.connected_cluster_id.as_deref().unwrap_or_default());
        if self.exists {
            log_decision(ledger, ActionType::Reuse, ResourceKind::ClusterExtension, &name, &scope);
        } else {
            log_decision(ledger, ActionType::Create, ResourceKind::ClusterExtension, &name, &scope);
            self.create(ctx).await?;
            self.exists = true;
        }
        Ok(())
    }
}

/// Azure container registry an image is built into or pulled from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySpec {
    pub name: String,
    pub resource_group: String,
    pub should_create: bool,
}

impl RegistrySpec {
    /// Registry names are unique across the subscription, so the group is not needed
    pub async fn get(&self, ctx: &UpContext) -> Result<Option<RegistryInfo>> {
        Ok(ctx.arm.get_registry(&self.name).await.found()?)
    }

    pub async fn check_exists(&self, ctx: &UpContext) -> Result<bool> {
        Ok(self.get(ctx).await?.is_some())
    }

    /// Create next to the environment; the staging region falls back to the default
    pub async fn create(&self, ctx: &UpContext, environment_location: Option<&str>) -> Result<RegistryInfo> {
        let location = environment_location
            .filter(|l| !l.is_empty() && *l != STAGING_LOCATION)
            .unwrap_or(DEFAULT_LOCATION);
        Ok(ctx
            .arm
            .create_registry(&self.resource_group, &self.name, location)
            .await?)
    }

    /// Returns the registry when it had to be created
    pub async fn create_if_needed(
        &mut self,
        ctx: &UpContext,
        environment_location: Option<&str>,
        ledger: &mut ApplyResult,
    ) -> Result<Option<RegistryInfo>> {
        let scope = format!("in resource group {}", self.resource_group);
        if !self.should_create {
            log_decision(ledger, ActionType::Reuse, ResourceKind::Registry, &self.name, &scope);
            return Ok(None);
        }
        log_decision(ledger, ActionType::Create, ResourceKind::Registry, &self.name, &scope);
        let created = self.create(ctx, environment_location).await?;
        self.should_create = false;
        Ok(Some(created))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppSpec {
    pub name: String,
    pub image: Option<String>,
    pub target_port: Option<u16>,
    pub ingress: Option<Ingress>,
    pub env_vars: Vec<EnvVar>,
    pub registry_server: Option<String>,
    pub registry_username: Option<String>,
    pub registry_password: Option<String>,
    /// Definition of the app if it already exists
    pub existing: Option<ContainerAppInfo>,
}

/// Where a container app is placed
#[derive(Debug, Clone, Copy)]
pub struct AppPlacement<'a> {
    pub resource_group: &'a str,
    pub environment_id: &'a str,
    pub custom_location_id: Option<&'a str>,
    pub location: &'a str,
}

impl AppSpec {
    pub fn has_registry_credentials(&self) -> bool {
        self.registry_username.is_some() && self.registry_password.is_some()
    }

    pub async fn get(&self, ctx: &UpContext, resource_group: &str) -> Result<Option<ContainerAppInfo>> {
        Ok(ctx.arm.get_container_app(resource_group, &self.name).await.found()?)
    }

    pub async fn check_exists(&self, ctx: &UpContext, resource_group: &str) -> Result<bool> {
        Ok(self.get(ctx, resource_group).await?.is_some())
    }

    /// Request for the app definition.
    ///
    /// A pipeline deployment pushes the real image and wires the registry
    /// itself, so it keeps the current image and sends no credentials.
    pub fn request(&self, placement: AppPlacement<'_>, pipeline: bool) -> ContainerAppRequest {
        let existing_image = self
            .existing
            .as_ref()
            .and_then(|a| a.containers().first())
            .map(|c| c.image.clone());

        let (image, registry) = if pipeline {
            let image = self
                .image
                .clone()
                .or(existing_image)
                .unwrap_or_else(|| QUICKSTART_IMAGE.to_string());
            (image, None)
        } else {
            let registry = match (&self.registry_server, &self.registry_username, &self.registry_password) {
                (Some(server), Some(username), Some(password)) => Some(RegistryCredentialRequest {
                    server: server.clone(),
                    username: username.clone(),
                    password: password.clone(),
                }),
                _ => None,
            };
            let image = self.image.clone().unwrap_or_else(|| QUICKSTART_IMAGE.to_string());
            (image, registry)
        };

        ContainerAppRequest {
            name: self.name.clone(),
            resource_group: placement.resource_group.to_string(),
            location: placement.location.to_string(),
            environment_id: placement.environment_id.to_string(),
            custom_location_id: placement.custom_location_id.map(str::to_string),
            image,
            ingress: self.ingress,
            target_port: self.target_port,
            registry,
            env_vars: self.env_vars.clone(),
        }
    }

    pub async fn create(
        &self,
        ctx: &UpContext,
        placement: AppPlacement<'_>,
        pipeline: bool,
    ) -> Result<ContainerAppInfo> {
        Ok(ctx
            .arm
            .create_or_update_container_app(&self.request(placement, pipeline))
            .await?)
    }

    /// An app that exists is updated in place
    pub async fn create_if_needed(
        &self,
        ctx: &UpContext,
        placement: AppPlacement<'_>,
        pipeline: bool,
        ledger: &mut ApplyResult,
    ) -> Result<ContainerAppInfo> {
        let action = if self.existing.is_some() {
            ActionType::Update
        } else {
            ActionType::Create
        };
        let scope = format!("in resource group {}", placement.resource_group);
        log_decision(ledger, action, ResourceKind::ContainerApp, &self.name, &scope);
        self.create(ctx, placement, pipeline).await
    }
}

/// Service principal flags for pipeline deployments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicePrincipalArgs {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
}

impl ServicePrincipalArgs {
    pub fn is_complete(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.tenant_id.is_some()
    }
}

/// Where the app's image comes from
#[derive(Debug, Clone)]
pub enum Deployment {
    /// Prebuilt image
    Image,
    /// Local directory built on the registry
    Source { dir: PathBuf, dockerfile: String },
    /// Git repository built by a CI/CD pipeline
    Repo {
        url: String,
        /// `owner/repo`
        repo: String,
        branch: Option<String>,
        token: String,
        context_path: Option<String>,
        dockerfile: String,
        service_principal: ServicePrincipalArgs,
    },
}

impl Deployment {
    pub fn is_source(&self) -> bool {
        matches!(self, Deployment::Source { .. })
    }

    pub fn is_repo(&self) -> bool {
        matches!(self, Deployment::Repo { .. })
    }
}
