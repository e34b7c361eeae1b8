//! Resolution steps
//!
//! Each step takes the plan by value and returns an updated plan. A step only
//! filters on what the user supplied; omitted values match everything.

use crate::context::UpContext;
use crate::descriptor::{CustomLocationSpec, EnvironmentVariant, ResourceGroupSpec};
use crate::error::{Result, UpError};
use crate::naming::{self, CONTAINER_APP_EXTENSION_TYPE, DEFAULT_EXTENSION_NAME, DEFAULT_EXTENSION_NAMESPACE};
use crate::plan::UpPlan;
use capp_cloud::{CloudResultExt, ContainerAppInfo, EnvironmentInfo, ResourceId};

/// Attempts at drawing a suffix whose synthesized names are all free
const MAX_SUFFIX_ATTEMPTS: usize = 10;

fn same_location(resource_location: &str, wanted: &str) -> bool {
    naming::format_location(resource_location) == wanted
}

fn environment_of(app: &ContainerAppInfo) -> Option<ResourceId> {
    app.environment_id().and_then(|id| ResourceId::parse(id).ok())
}

fn adopt_group(plan: &mut UpPlan, resource_id: &str) -> Result<()> {
    let rid = ResourceId::parse(resource_id)?;
    plan.resource_group.name = Some(rid.resource_group);
    plan.resource_group.exists = true;
    Ok(())
}

/// Whether a custom location is hosted on the given cluster
async fn hosted_on(ctx: &UpContext, custom_location_id: Option<&str>, connected_cluster_id: &str) -> Result<bool> {
    let Some(id) = custom_location_id else {
        return Ok(false);
    };
    Ok(ctx
        .arm
        .get_custom_location(id)
        .await
        .found()?
        .is_some_and(|cl| cl.is_hosted_on(connected_cluster_id)))
}

/// Existence of the resource group the user named
pub async fn check_resource_group(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    let exists = plan.resource_group.check_exists(ctx).await?;
    Ok(UpPlan {
        resource_group: ResourceGroupSpec {
            exists,
            ..plan.resource_group
        },
        ..plan
    })
}

/// Adopt the group and environment of the one existing app with this name.
pub async fn resolve_from_existing_app(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    if plan.resource_group.name.is_some() || plan.resource_group.exists {
        return Ok(plan);
    }
    let mut plan = plan;

    let mut matched: Vec<ContainerAppInfo> = ctx
        .arm
        .list_container_apps(None)
        .await?
        .into_iter()
        .filter(|a| a.name.eq_ignore_ascii_case(&plan.app.name))
        .collect();

    if let Some(env_name) = &plan.environment.name {
        matched.retain(|a| environment_of(a).is_some_and(|e| e.name.eq_ignore_ascii_case(env_name)));
    }
    if let Some(custom_location_id) = plan.environment.custom_location_id() {
        matched.retain(|a| {
            a.custom_location_id()
                .is_some_and(|id| id.eq_ignore_ascii_case(custom_location_id))
        });
    } else if let Some(variant) = &plan.environment.variant {
        matched.retain(|a| environment_of(a).is_some_and(|e| e.is_type(variant.resource_type())));
    }
    if let Some(cluster) = plan.custom_location.connected_cluster_id.clone() {
        let mut on_cluster = Vec::new();
        for app in matched {
            if hosted_on(ctx, app.custom_location_id(), &cluster).await? {
                on_cluster.push(app);
            }
        }
        matched = on_cluster;
    }
    if let Some(location) = &plan.location {
        matched.retain(|a| same_location(&a.location, location));
    }

    match matched.as_slice() {
        [] => {}
        [app] => {
            tracing::debug!("Found existing container app {}", app.id);
            adopt_group(&mut plan, &app.id)?;
            if let Some(env_id) = app.environment_id() {
                plan.environment = plan.environment.adopt(env_id)?;
                if plan.environment.is_connected() {
                    let custom_location_id = app.custom_location_id().map(str::to_string);
                    plan.environment = plan.environment.with_custom_location(custom_location_id);
                }
            }
        }
        apps => return Err(UpError::ambiguous("container app", &plan.app.name, apps.len())),
    }
    Ok(plan)
}

/// Adopt the managed environment linked to the Log Analytics workspace (or
/// the one in the requested location) when no environment was named.
pub async fn resolve_from_log_analytics(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    if plan.environment.is_connected() || plan.environment.name.is_some() {
        return Ok(plan);
    }
    let searchable = match plan.requested_resource_group.as_deref() {
        None => true,
        Some(requested) => {
            plan.resource_group.exists && plan.resource_group.name.as_deref() == Some(requested)
        }
    };
    if !searchable {
        return Ok(plan);
    }

    let mut plan = plan;
    let mut environments = ctx
        .arm
        .list_managed_environments(plan.requested_resource_group.as_deref())
        .await?;
    if let Some(customer_id) = &plan.logs_customer_id {
        environments.retain(|e| e.logs_customer_id() == Some(customer_id.as_str()));
    }
    if let Some(location) = &plan.location {
        environments.retain(|e| same_location(&e.location, location));
    }

    match environments.as_slice() {
        [] => {}
        [env] => {
            tracing::debug!("Using managed environment {} found by workspace or location", env.id);
            plan.environment = plan.environment.adopt(&env.id)?;
            adopt_group(&mut plan, &env.id)?;
        }
        found => {
            let filter = plan
                .logs_customer_id
                .clone()
                .or_else(|| plan.location.clone())
                .unwrap_or_else(|| "any name".to_string());
            return Err(UpError::ambiguous("managed environment", filter, found.len()));
        }
    }
    Ok(plan)
}

/// Pin the variant of a named environment whose group is known, by direct lookup.
pub async fn probe_named_environment(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    if plan.environment.variant.is_some() {
        return Ok(plan);
    }
    let (Some(name), Some(group)) = (plan.environment.name.clone(), plan.environment_group().map(str::to_string)) else {
        return Ok(plan);
    };

    let mut plan = plan;
    if let Some(env) = ctx.arm.get_managed_environment(&group, &name).await.found()? {
        plan.environment = plan.environment.adopt(&env.id)?;
    } else if let Some(env) = ctx.arm.get_connected_environment(&group, &name).await.found()? {
        plan.environment = plan
            .environment
            .adopt(&env.id)?
            .with_custom_location(env.custom_location_id().map(str::to_string));
    } else {
        return Ok(plan);
    }
    if plan.resource_group.name.is_none() {
        plan.resource_group.name = Some(group);
        plan.resource_group.exists = true;
    }
    Ok(plan)
}

/// Find the group of a named managed environment.
pub async fn resolve_environment_by_name(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    if plan.environment.is_connected() || plan.resource_group.name.is_some() {
        return Ok(plan);
    }
    let Some(name) = plan.environment.name.clone() else {
        return Ok(plan);
    };

    let mut plan = plan;
    let mut environments: Vec<EnvironmentInfo> = ctx
        .arm
        .list_managed_environments(None)
        .await?
        .into_iter()
        .filter(|e| e.name.eq_ignore_ascii_case(&name))
        .collect();
    if let Some(location) = &plan.location {
        environments.retain(|e| same_location(&e.location, location));
    }

    match environments.as_slice() {
        [] => {}
        [env] => {
            plan.environment = plan.environment.adopt(&env.id)?;
            adopt_group(&mut plan, &env.id)?;
        }
        found => return Err(UpError::ambiguous("managed environment", name, found.len())),
    }
    Ok(plan)
}

/// Fall back to connected environments when no managed environment was pinned.
///
/// Several matches without a name constraint take the first one.
pub async fn resolve_connected_environment(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    let needed = match &plan.environment.variant {
        None => !(plan.environment.name.is_some() && plan.environment_group().is_some()),
        Some(EnvironmentVariant::Connected { custom_location_id }) => {
            plan.environment.name.is_none()
                || plan.resource_group.name.is_none()
                || custom_location_id.is_none()
        }
        Some(EnvironmentVariant::Managed) => false,
    };
    if !needed || !(plan.resource_group.exists || plan.resource_group.name.is_none()) {
        return Ok(plan);
    }

    let mut plan = plan;
    let custom_location_id = plan.custom_location.resource_id(&ctx.subscription_id);
    let mut matched = Vec::new();
    for env in ctx
        .arm
        .list_connected_environments(plan.resource_group.name.as_deref())
        .await?
    {
        if plan.environment.name.as_deref().is_some_and(|n| !n.eq_ignore_ascii_case(&env.name)) {
            continue;
        }
        if plan.location.as_deref().is_some_and(|l| !same_location(&env.location, l)) {
            continue;
        }
        if let Some(wanted) = custom_location_id.as_deref() {
            if !env.custom_location_id().is_some_and(|id| id.eq_ignore_ascii_case(wanted)) {
                continue;
            }
        }
        if let Some(cluster) = plan.custom_location.connected_cluster_id.as_deref() {
            if !hosted_on(ctx, env.custom_location_id(), cluster).await? {
                continue;
            }
        }
        matched.push(env);
    }

    let chosen = match matched.as_slice() {
        [] => None,
        [env] => Some(env),
        [first, ..] => match &plan.environment.name {
            Some(name) => {
                return Err(UpError::ambiguous("connected environment", name, matched.len()));
            }
            None => {
                tracing::debug!(
                    "{} connected environments match, using the first one ({})",
                    matched.len(),
                    first.id
                );
                Some(first)
            }
        },
    };

    if let Some(env) = chosen {
        adopt_group(&mut plan, &env.id)?;
        plan.environment = plan
            .environment
            .adopt(&env.id)?
            .with_custom_location(env.custom_location_id().map(str::to_string));
    }
    Ok(plan)
}

/// Bind a fresh connected environment to a custom location and extension,
/// reusing what the cluster has or synthesizing names for what it lacks.
pub async fn resolve_cluster_binding(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    if !plan.environment.is_connected() {
        return Ok(plan);
    }
    if let Some(existing) = plan.resolved_environment().get(ctx).await? {
        let mut plan = plan;
        if plan.environment.custom_location_id().is_none() {
            plan.environment = plan
                .environment
                .with_custom_location(existing.custom_location_id().map(str::to_string));
        }
        return Ok(plan);
    }

    let mut plan = discover_cluster_resources(ctx, plan).await?;
    if plan.custom_location.exists {
        let id = plan.custom_location.resource_id(&ctx.subscription_id);
        plan.environment = plan.environment.with_custom_location(id);
        return Ok(plan);
    }
    synthesize_cluster_names(ctx, plan).await
}

async fn discover_cluster_resources(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    let mut plan = plan;

    if plan.custom_location.name.is_some() {
        let found = plan.custom_location.get(ctx).await?;
        plan.custom_location.exists = found.is_some();
        if let Some(custom_location) = found {
            plan.custom_location.location = Some(naming::format_location(&custom_location.location));
            return Ok(plan);
        }
    }

    let Some(cluster_id) = plan.custom_location.connected_cluster_id.clone() else {
        return Err(UpError::Validation(
            "Please specify one of --connected-cluster-id or --custom-location to create the connected environment"
                .to_string(),
        ));
    };

    let cluster = ctx.arm.get_connected_cluster(&cluster_id).await?;
    if plan.custom_location.location.is_none() {
        plan.custom_location.location = Some(naming::format_location(&cluster.location));
    }

    let extensions = ctx.arm.list_cluster_extensions(&cluster_id).await?;
    let Some(extension) = extensions
        .iter()
        .find(|e| e.extension_type().eq_ignore_ascii_case(CONTAINER_APP_EXTENSION_TYPE))
    else {
        return Ok(plan);
    };

    let namespace = extension.release_namespace().unwrap_or_default().to_string();
    tracing::debug!("Found container apps extension {} in namespace {}", extension.id, namespace);
    plan.extension.exists = true;
    plan.extension.name = Some(extension.name.clone());
    plan.extension.namespace = Some(namespace.clone());
    plan.custom_location.cluster_extension_id = Some(extension.id.clone());
    plan.custom_location.namespace = Some(namespace.clone());

    if plan.custom_location.name.is_some() {
        return Ok(plan);
    }
    let bound = ctx
        .arm
        .list_custom_locations()
        .await?
        .into_iter()
        .filter(|c| c.is_hosted_on(&cluster_id))
        .find(|c| c.binds_extension(&extension.id) && c.properties.namespace == namespace);
    if let Some(custom_location) = bound {
        plan.custom_location = plan.custom_location.adopt(&custom_location.id)?;
        plan.custom_location.location = Some(naming::format_location(&custom_location.location));
        plan.custom_location.exists = true;
    }
    Ok(plan)
}

async fn names_taken(ctx: &UpContext, group: Option<&str>, custom_location: Option<CustomLocationSpec>) -> Result<bool> {
    if let Some(group) = group {
        if ctx.arm.get_resource_group(group).await.found()?.is_some() {
            return Ok(true);
        }
    }
    match custom_location {
        Some(probe) => Ok(probe.get(ctx).await?.is_some()),
        None => Ok(false),
    }
}

async fn synthesize_cluster_names(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    let mut plan = plan;
    let user = ctx.user_name.clone();
    let given_group = plan.resource_group.name.clone();
    let given_location_name = plan.custom_location.name.clone();
    let given_env = plan.environment.name.clone();

    let mut attempts = 0;
    let suffix = loop {
        attempts += 1;
        let suffix = ctx.suffixes.next_suffix();
        let group = naming::randomized_name(&user, given_group.as_deref(), "rg", suffix);
        let probe = given_location_name.is_none().then(|| CustomLocationSpec {
            name: Some(naming::randomized_name_with_dash(&user, None, "env-location", suffix)),
            resource_group: Some(group.clone()),
            ..Default::default()
        });
        let fresh_group = given_group.is_none().then_some(group.as_str());

        if !names_taken(ctx, fresh_group, probe).await? {
            break suffix;
        }
        if attempts >= MAX_SUFFIX_ATTEMPTS {
            return Err(UpError::Validation(
                "Could not find unused names for the connected environment resources. Pass --resource-group and --custom-location"
                    .to_string(),
            ));
        }
        tracing::debug!("Synthesized names with suffix {:04} are taken, drawing again", suffix);
    };

    let group = naming::randomized_name(&user, given_group.as_deref(), "rg", suffix);
    if given_group.is_none() {
        plan.resource_group.exists = false;
    }
    plan.resource_group.name = Some(group.clone());

    let env_name = naming::randomized_name_with_dash(&plan.app.name, given_env.as_deref(), "env", suffix);
    plan.environment.name = Some(env_name.clone());

    if given_location_name.is_none() {
        plan.custom_location.name = Some(naming::randomized_name_with_dash(&user, None, "env-location", suffix));
        plan.custom_location.resource_group = Some(group.clone());
    }
    if plan.custom_location.location.is_none() {
        plan.custom_location.location = plan.location.clone();
    }

    if !plan.extension.exists {
        plan.extension.name = Some(format!("{}-{:04}", DEFAULT_EXTENSION_NAME, suffix));
        plan.extension.namespace = Some(DEFAULT_EXTENSION_NAMESPACE.to_string());
        plan.extension.logs_resource_group = Some(group.clone());
        plan.extension.logs_location = plan.resource_group.location.clone();
        plan.extension.connected_environment_name = Some(env_name);
        plan.custom_location.namespace = Some(DEFAULT_EXTENSION_NAMESPACE.to_string());
        plan.custom_location.cluster_extension_id = plan.extension.resource_id();
    }

    let custom_location_id = plan.custom_location.resource_id(&ctx.subscription_id);
    plan.environment = plan.environment.with_custom_location(custom_location_id);
    Ok(plan)
}

/// Names for whatever is still unnamed after discovery
pub async fn fill_default_names(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    let mut plan = plan;
    if plan.resource_group.name.is_none() {
        let suffix = ctx.suffixes.next_suffix();
        plan.resource_group.name = Some(naming::randomized_name(&ctx.user_name, None, "rg", suffix));
        plan.resource_group.exists = false;
    }
    if plan.environment.name.is_none() {
        plan.environment.name = Some(naming::default_environment_name(&plan.app.name));
    }
    if plan.environment.resource_group.is_none() {
        plan.environment.resource_group = plan.resource_group.name.clone();
    }
    Ok(plan)
}

/// Load the app definition when it already exists.
///
/// An app still provisioning from an earlier run is refused.
pub async fn load_existing_app(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    let Some(group) = plan.resource_group.name.clone() else {
        return Ok(plan);
    };
    if !plan.resource_group.exists {
        return Ok(plan);
    }
    let mut plan = plan;
    let existing = plan.app.get(ctx, &group).await?;
    if existing.as_ref().is_some_and(ContainerAppInfo::is_provisioning) {
        return Err(UpError::Validation(format!(
            "Containerapp {} currently in provisioning state. Please wait for the provisioning to finish before running up again",
            plan.app.name
        )));
    }
    plan.app.existing = existing;
    Ok(plan)
}
