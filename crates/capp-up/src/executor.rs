//! Executor: realizes a resolved plan
//!
//! Order is fixed: resource groups, cluster extension and custom location for
//! a fresh connected environment, environment, registry, image build, app,
//! pipeline. Nothing is rolled back when a later step fails.

use crate::context::UpContext;
use crate::descriptor::{AppPlacement, Deployment, ResourceGroupSpec, log_decision};
use crate::error::{Result, UpError};
use crate::naming;
use crate::plan::UpPlan;
use crate::workflow;
use capp_cloud::{ActionType, ApplyResult, ContainerAppInfo, RegistryBuildRequest, ResourceKind};
use chrono::Local;
use std::time::Instant;

/// What `up` produced
#[derive(Debug, Clone)]
pub struct UpOutcome {
    pub app: ContainerAppInfo,
    pub resource_group: String,
    pub result: ApplyResult,
}

fn unresolved(what: &str) -> UpError {
    UpError::Validation(format!("The plan has no {}", what))
}

pub async fn execute(ctx: &UpContext, plan: UpPlan) -> Result<UpOutcome> {
    let start = Instant::now();
    let mut plan = plan;
    let mut ledger = ApplyResult::new();

    plan.resource_group.create_if_needed(ctx, &mut ledger).await?;
    let app_group = plan.resource_group.name.clone().ok_or_else(|| unresolved("resource group"))?;
    create_other_groups(ctx, &plan, &app_group, &mut ledger).await?;

    let mut environment = plan.resolved_environment();
    if environment.is_connected() && !environment.check_exists(ctx).await? {
        plan.extension.create_if_needed(ctx, &mut ledger).await?;
        plan.custom_location.create_if_needed(ctx, &mut ledger).await?;
    }
    let fallback_location = if environment.is_connected() {
        plan.custom_location.location.clone()
    } else {
        None
    };
    let env_info = environment
        .create_if_needed(ctx, fallback_location.as_deref(), &mut ledger)
        .await?;

    realize_registry(ctx, &mut plan, environment.location.as_deref(), &mut ledger).await?;

    if let Deployment::Source { dir, dockerfile } = &plan.deployment {
        let registry = plan.registry.as_ref().ok_or_else(|| unresolved("registry for the build"))?;
        let server = plan.app.registry_server.clone().ok_or_else(|| unresolved("registry server"))?;
        let repository = plan.app.image.as_deref().unwrap_or(&plan.app.name);
        let image_name = format!("{}:{}", repository, naming::build_tag(Local::now()));

        log_decision(
            &mut ledger,
            ActionType::Trigger,
            ResourceKind::ImageBuild,
            &image_name,
            &format!("on registry {}", registry.name),
        );
        ctx.arm
            .queue_registry_build(&RegistryBuildRequest {
                registry_name: registry.name.clone(),
                resource_group: registry.resource_group.clone(),
                image: image_name.clone(),
                source_dir: dir.clone(),
                dockerfile: dockerfile.clone(),
            })
            .await?;
        plan.app.image = Some(format!("{}/{}", server, image_name));
    }

    let placement = AppPlacement {
        resource_group: &app_group,
        environment_id: &env_info.id,
        custom_location_id: environment.custom_location_id(),
        location: &env_info.location,
    };
    plan.app
        .create_if_needed(ctx, placement, plan.deployment.is_repo(), &mut ledger)
        .await?;

    if plan.deployment.is_repo() {
        workflow::wire_pipeline(ctx, &plan, &app_group, &mut ledger).await?;
    }

    let app = ctx.arm.get_container_app(&app_group, &plan.app.name).await?;
    ledger.duration_ms = start.elapsed().as_millis() as u64;
    Ok(UpOutcome {
        app,
        resource_group: app_group,
        result: ledger,
    })
}

/// Groups of a new custom location and of the environment, when not the app's
async fn create_other_groups(
    ctx: &UpContext,
    plan: &UpPlan,
    app_group: &str,
    ledger: &mut ApplyResult,
) -> Result<()> {
    let mut groups: Vec<String> = Vec::new();
    if plan.environment.is_connected() && !plan.custom_location.exists {
        groups.extend(plan.custom_location.resource_group.clone());
    }
    groups.extend(plan.environment_group().map(str::to_string));

    groups.retain(|g| g != app_group);
    groups.dedup();
    for name in groups {
        let mut group = ResourceGroupSpec {
            name: Some(name),
            location: plan.resource_group.location.clone(),
            exists: false,
        };
        group.create_if_needed(ctx, ledger).await?;
    }
    Ok(())
}

async fn realize_registry(
    ctx: &UpContext,
    plan: &mut UpPlan,
    environment_location: Option<&str>,
    ledger: &mut ApplyResult,
) -> Result<()> {
    let Some(registry) = plan.registry.as_mut() else {
        return Ok(());
    };
    let name = registry.name.clone();
    let Some(created) = registry.create_if_needed(ctx, environment_location, ledger).await? else {
        return Ok(());
    };
    if !created.login_server.is_empty() {
        plan.app.registry_server = Some(created.login_server);
    }

    let credentials = ctx.arm.get_registry_credentials(&name).await?;
    plan.app.registry_username = Some(credentials.username);
    plan.app.registry_password = Some(credentials.password);
    Ok(())
}
