//! Registry resolution
//!
//! Runs after the resource group and environment are settled, so the default
//! registry name and any credential failure refer to final values.

use crate::context::UpContext;
use crate::descriptor::{Deployment, RegistrySpec};
use crate::error::{Result, UpError};
use crate::naming::{self, ACR_SUFFIX};
use crate::plan::UpPlan;
use capp_cloud::{CloudResultExt, ContainerAppInfo, ResourceId};

fn credentials_missing() -> UpError {
    UpError::external(
        "Failed to retrieve credentials for container registry",
        "provide --registry-username/--registry-password",
    )
}

/// Fill in missing credentials from the registry and return its resource group.
async fn lookup_credentials(ctx: &UpContext, plan: &mut UpPlan, registry_name: &str) -> Result<String> {
    if plan.app.has_registry_credentials() {
        let registry = ctx
            .arm
            .get_registry(registry_name)
            .await
            .found()?
            .ok_or_else(credentials_missing)?;
        return Ok(ResourceId::parse(&registry.id)?.resource_group);
    }

    tracing::info!("No credential was provided to access Azure Container Registry. Trying to look up...");
    let credentials = ctx
        .arm
        .get_registry_credentials(registry_name)
        .await
        .found()?
        .ok_or_else(credentials_missing)?;
    plan.app.registry_username = Some(credentials.username);
    plan.app.registry_password = Some(credentials.password);
    Ok(credentials.resource_group)
}

/// Registry server configured on an existing app, if it can be inferred
fn server_from_app(app: &ContainerAppInfo, acr_only: bool) -> Option<String> {
    let registries: Vec<&str> = app
        .registries()
        .iter()
        .map(|r| r.server.as_str())
        .filter(|server| !acr_only || naming::is_acr_server(server))
        .collect();

    match registries.as_slice() {
        [] => None,
        [server] => Some(server.to_string()),
        _ => {
            let image_server = app
                .containers()
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(&app.name))
                .and_then(|c| c.image.split('/').next())?;
            registries
                .iter()
                .find(|server| **server == image_server)
                .map(|server| server.to_string())
        }
    }
}

/// Registry named by an ACR host in the app image
async fn resolve_from_image(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    let Some(image) = plan.app.image.clone() else {
        return Ok(plan);
    };
    if !naming::is_acr_server(&image) {
        return Ok(plan);
    }

    let mut plan = plan;
    let server = image.split('/').next().unwrap_or(&image).to_string();
    let registry_name = naming::registry_name_from_server(&server);
    plan.app.registry_server = Some(server);
    let resource_group = lookup_credentials(ctx, &mut plan, &registry_name).await?;
    plan.registry = Some(RegistrySpec {
        name: registry_name,
        resource_group,
        should_create: false,
    });
    Ok(plan)
}

/// Registry that a source or repo build pushes to
async fn resolve_build_registry(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    let mut plan = plan;
    let source = plan.deployment.is_source();

    if plan.app.registry_server.is_none() {
        plan.app.registry_server = plan
            .app
            .existing
            .as_ref()
            .and_then(|app| server_from_app(app, source));
    }

    if let Some(server) = plan.app.registry_server.clone() {
        if !naming::is_acr_server(&server) {
            if source {
                return Err(UpError::Validation(
                    "Cannot supply non-Azure registry when using --source.".to_string(),
                ));
            }
            if !plan.app.has_registry_credentials() {
                return Err(UpError::RequiredArgumentMissing(format!(
                    "Registry {} is not an Azure container registry; provide --registry-username and --registry-password",
                    server
                )));
            }
            return Ok(plan);
        }
        let registry_name = naming::registry_name_from_server(&server);
        let resource_group = lookup_credentials(ctx, &mut plan, &registry_name).await?;
        plan.registry = Some(RegistrySpec {
            name: registry_name,
            resource_group,
            should_create: false,
        });
        return Ok(plan);
    }

    let env = plan.resolved_environment();
    let (Some(env_group), Some(env_name)) = (env.resource_group.as_deref(), env.name.as_deref()) else {
        return Err(UpError::Validation(
            "The environment must be resolved before the registry".to_string(),
        ));
    };
    let registry_name = naming::default_registry_name(&ctx.subscription_id, env_group, env_name);

    let resource_group = plan
        .resource_group
        .name
        .clone()
        .ok_or_else(|| UpError::Validation("No resource group was resolved for the registry".to_string()))?;
    let mut registry = RegistrySpec {
        name: registry_name,
        resource_group,
        should_create: true,
    };
    plan.app.registry_server = Some(format!("{}{}", registry.name, ACR_SUFFIX));
    if let Some(existing) = registry.get(ctx).await? {
        tracing::debug!("Found default registry {}", existing.id);
        registry.resource_group = lookup_credentials(ctx, &mut plan, &registry.name).await?;
        registry.should_create = false;
    }
    plan.registry = Some(registry);
    Ok(plan)
}

/// Settle the registry for the final plan.
pub async fn resolve(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    if plan.registry.is_some() {
        return Ok(plan);
    }
    let plan = match plan.deployment {
        Deployment::Image | Deployment::Repo { .. } => resolve_from_image(ctx, plan).await?,
        Deployment::Source { .. } => plan,
    };
    if plan.registry.is_some() || matches!(plan.deployment, Deployment::Image) {
        return Ok(plan);
    }
    resolve_build_registry(ctx, plan).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use capp_cloud::model::{AppConfiguration, AppTemplate, ContainerInfo, RegistryReference};

    fn app_with(registries: &[&str], image: &str) -> ContainerAppInfo {
        let mut app = ContainerAppInfo::new("/subscriptions/s/resourceGroups/rg/providers/Microsoft.App/containerApps/web", "web", "eastus");
        app.properties.configuration = Some(AppConfiguration {
            ingress: None,
            registries: registries
                .iter()
                .map(|s| RegistryReference {
                    server: s.to_string(),
                    username: None,
                })
                .collect(),
        });
        app.properties.template = Some(AppTemplate {
            containers: vec![ContainerInfo {
                name: "web".into(),
                image: image.into(),
            }],
        });
        app
    }

    #[test]
    fn test_single_registry_is_inferred() {
        let app = app_with(&["one.azurecr.io"], "one.azurecr.io/web:1");
        assert_eq!(server_from_app(&app, true).as_deref(), Some("one.azurecr.io"));
    }

    #[test]
    fn test_source_ignores_non_acr_registries() {
        let app = app_with(&["docker.io"], "docker.io/web:1");
        assert_eq!(server_from_app(&app, true), None);
        assert_eq!(server_from_app(&app, false).as_deref(), Some("docker.io"));
    }

    #[test]
    fn test_several_registries_follow_the_image() {
        let app = app_with(&["one.azurecr.io", "two.azurecr.io"], "two.azurecr.io/web:1");
        assert_eq!(server_from_app(&app, true).as_deref(), Some("two.azurecr.io"));

        let app = app_with(&["one.azurecr.io", "two.azurecr.io"], "nginx");
        assert_eq!(server_from_app(&app, true), None);
    }
}
