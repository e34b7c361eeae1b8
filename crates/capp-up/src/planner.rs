//! Planner: runs the resolution steps in dependency order
//!
//! The environment variant is pinned before custom location and extension
//! discovery, and the registry is resolved last so credential failures refer
//! to the final resource group and environment.

use crate::args::UpArgs;
use crate::context::UpContext;
use crate::descriptor::Deployment;
use crate::dockerfile;
use crate::error::Result;
use crate::plan::UpPlan;
use crate::{registry, resolver};

pub async fn plan(ctx: &UpContext, args: &UpArgs) -> Result<UpPlan> {
    let plan = UpPlan::from_args(args)?;
    tracing::debug!(app = %plan.app.name, "Resolving deployment plan");

    let plan = resolver::check_resource_group(ctx, plan).await?;
    let plan = resolver::resolve_from_existing_app(ctx, plan).await?;
    let plan = resolver::resolve_from_log_analytics(ctx, plan).await?;
    let plan = resolver::probe_named_environment(ctx, plan).await?;
    let plan = resolver::resolve_environment_by_name(ctx, plan).await?;
    let plan = resolver::resolve_connected_environment(ctx, plan).await?;
    let plan = resolver::resolve_cluster_binding(ctx, plan).await?;
    let plan = resolver::fill_default_names(ctx, plan).await?;
    let plan = resolver::load_existing_app(ctx, plan).await?;
    let plan = inspect_dockerfile(ctx, plan).await?;
    let plan = registry::resolve(ctx, plan).await?;

    tracing::debug!(
        resource_group = plan.resource_group.name.as_deref().unwrap_or_default(),
        environment = plan.environment.name.as_deref().unwrap_or_default(),
        "Deployment plan resolved"
    );
    Ok(plan)
}

/// Ingress and target port from the Dockerfile being built, if any
async fn inspect_dockerfile(ctx: &UpContext, plan: UpPlan) -> Result<UpPlan> {
    let mut plan = plan;
    let lines = match &mut plan.deployment {
        Deployment::Image => Vec::new(),
        Deployment::Source { dir, dockerfile } => dockerfile::local_dockerfile(dir, dockerfile).await?,
        Deployment::Repo {
            repo,
            branch,
            token,
            context_path,
            dockerfile,
            ..
        } => {
            let (lines, resolved) = dockerfile::repo_dockerfile(
                ctx,
                repo,
                branch.as_deref(),
                token,
                context_path.as_deref(),
                dockerfile,
            )
            .await?;
            *branch = Some(resolved);
            lines
        }
    };

    let (ingress, target_port) = dockerfile::infer_ingress_and_port(plan.app.ingress, plan.app.target_port, &lines);
    plan.app.ingress = ingress;
    plan.app.target_port = target_port;
    Ok(plan)
}
