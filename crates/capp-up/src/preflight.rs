//! Checks against the cloud that run before planning

use crate::args::UpArgs;
use crate::context::UpContext;
use crate::descriptor::{
    CONNECTED_ENVIRONMENT_TYPE, CUSTOM_LOCATION_RP, EnvironmentSpec, KUBERNETES_CONFIGURATION_RP,
    MANAGED_ENVIRONMENT_TYPE, ensure_location_allowed,
};
use crate::error::{Result, UpError};
use crate::naming;
use capp_cloud::CloudResultExt;

pub async fn run(ctx: &UpContext, args: &UpArgs) -> Result<()> {
    if args.custom_location.is_some() || args.connected_cluster_id.is_some() {
        check_cluster_arguments(ctx, args).await?;
    }
    check_env_name_on_rg(ctx, args).await
}

async fn check_cluster_arguments(ctx: &UpContext, args: &UpArgs) -> Result<()> {
    ctx.arm.register_provider(CUSTOM_LOCATION_RP).await?;
    ctx.arm.register_provider(KUBERNETES_CONFIGURATION_RP).await?;

    if let Some(location) = args.location.as_deref() {
        ensure_location_allowed(ctx, location, CONNECTED_ENVIRONMENT_TYPE).await?;
    }

    if let Some(custom_location_id) = args.custom_location.as_deref() {
        match ctx.arm.get_custom_location(custom_location_id).await.found()? {
            Some(custom_location) => {
                if let Some(cluster) = args.connected_cluster_id.as_deref() {
                    if !custom_location.is_hosted_on(cluster) {
                        return Err(UpError::Validation(format!(
                            "Custom location {} is hosted on {}, not on connected cluster {}",
                            custom_location_id,
                            custom_location.host_resource_id(),
                            cluster
                        )));
                    }
                }
                if let Some(location) = args.formatted_location() {
                    if naming::format_location(&custom_location.location) != location {
                        return Err(UpError::Validation(format!(
                            "Location {} does not match custom location {} in {}",
                            location, custom_location_id, custom_location.location
                        )));
                    }
                }
            }
            None if args.connected_cluster_id.is_none() => {
                return Err(UpError::Validation(format!(
                    "Custom location {} does not exist. Pass --connected-cluster-id to create it",
                    custom_location_id
                )));
            }
            None => {}
        }
    }

    if let Some(cluster) = args.connected_cluster_id.as_deref() {
        if ctx.arm.get_connected_cluster(cluster).await.found()?.is_none() {
            return Err(UpError::Validation(format!(
                "Connected cluster {} does not exist",
                cluster
            )));
        }
    }
    Ok(())
}

/// Reject changes to the location or cluster binding of an existing environment.
pub async fn check_env_name_on_rg(ctx: &UpContext, args: &UpArgs) -> Result<()> {
    let mut env = EnvironmentSpec::from_reference(
        args.environment.as_deref(),
        args.custom_location.as_deref(),
        args.connected_cluster_id.as_deref(),
    )?;
    let location = args.formatted_location();

    if let Some(location) = location.as_deref() {
        if !env.is_connected() {
            ensure_location_allowed(ctx, location, MANAGED_ENVIRONMENT_TYPE).await?;
        }
    }

    if env.resource_group.is_none() {
        env.resource_group = args.resource_group.clone();
    }
    let (Some(name), Some(group)) = (env.name.clone(), env.resource_group.clone()) else {
        return Ok(());
    };
    let Some(existing) = env.get(ctx).await? else {
        return Ok(());
    };

    if let Some(location) = location.as_deref() {
        if naming::format_location(&existing.location) != location {
            return Err(UpError::Validation(format!(
                "Environment {} already exists in resource group {} on location {}, \
                 cannot change location of existing environment to {}.",
                name, group, existing.location, location
            )));
        }
    }
    if !env.is_connected() {
        return Ok(());
    }

    let current = existing.custom_location_id().unwrap_or_default();
    if let Some(wanted) = args.custom_location.as_deref() {
        if !current.eq_ignore_ascii_case(wanted) {
            return Err(UpError::Validation(format!(
                "Environment {} already exists in resource group {} with custom location {}, \
                 cannot change custom location of existing environment to {}.",
                name, group, current, wanted
            )));
        }
    }
    if let Some(cluster) = args.connected_cluster_id.as_deref() {
        let hosted = ctx
            .arm
            .get_custom_location(current)
            .await
            .found()?
            .is_some_and(|cl| cl.is_hosted_on(cluster));
        if !hosted {
            return Err(UpError::Validation(format!(
                "Environment {} already exists in resource group {} on another connected cluster, \
                 cannot change connected cluster of existing environment to {}.",
                name, group, cluster
            )));
        }
    }
    Ok(())
}
