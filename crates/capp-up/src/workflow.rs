//! CI/CD pipeline wiring for `--repo` deployments

use crate::context::UpContext;
use crate::descriptor::{Deployment, ServicePrincipalArgs, log_decision};
use crate::error::Result;
use crate::plan::UpPlan;
use capp_cloud::{
    ActionType, ApplyResult, CloudResultExt, RegistryCredentialRequest, ResourceKind,
    SourceControlRequest, resource_group_scope,
};

const PIPELINE_ROLE: &str = "contributor";

/// Resource groups the pipeline identity needs access to
pub fn service_principal_scopes(subscription: &str, app_group: &str, env_group: Option<&str>) -> Vec<String> {
    let mut scopes = vec![resource_group_scope(subscription, app_group)];
    if let Some(env_group) = env_group.filter(|g| *g != app_group) {
        scopes.push(resource_group_scope(subscription, env_group));
    }
    scopes
}

/// Create or refresh the app's pipeline; an existing pipeline's workflow is
/// dispatched first so the update deploys right away.
pub async fn wire_pipeline(
    ctx: &UpContext,
    plan: &UpPlan,
    app_group: &str,
    ledger: &mut ApplyResult,
) -> Result<()> {
    let Deployment::Repo {
        url,
        repo,
        branch,
        token,
        context_path,
        service_principal,
        ..
    } = &plan.deployment
    else {
        return Ok(());
    };
    let app_name = plan.app.name.as_str();
    let branch = branch.clone().unwrap_or_else(|| "main".to_string());

    let existing = ctx.arm.get_source_control(app_group, app_name).await.found()?;

    let credentials = if service_principal.is_complete() || existing.is_some() {
        service_principal.clone()
    } else {
        tracing::info!("No valid service principal provided. Creating a new service principal...");
        let scopes = service_principal_scopes(&ctx.subscription_id, app_group, plan.environment_group());
        let created = ctx.arm.create_service_principal(&scopes, PIPELINE_ROLE).await?;
        log_decision(
            ledger,
            ActionType::Create,
            ResourceKind::ServicePrincipal,
            &created.client_id,
            &format!("with role {}", PIPELINE_ROLE),
        );
        ServicePrincipalArgs {
            client_id: Some(created.client_id),
            client_secret: Some(created.client_secret),
            tenant_id: Some(created.tenant_id),
        }
    };

    if existing.is_some() {
        match ctx.source_host.dispatch_workflow(repo, app_name, &branch, token).await {
            Ok(()) => log_decision(
                ledger,
                ActionType::Trigger,
                ResourceKind::Pipeline,
                app_name,
                &format!("on branch {}", branch),
            ),
            Err(e) => tracing::warn!("Failed to trigger the existing workflow for {}: {}", app_name, e),
        }
    }

    let registry = match (
        &plan.app.registry_server,
        &plan.app.registry_username,
        &plan.app.registry_password,
    ) {
        (Some(server), Some(username), Some(password)) => Some(RegistryCredentialRequest {
            server: server.clone(),
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    let action = if existing.is_some() {
        ActionType::Update
    } else {
        ActionType::Create
    };
    log_decision(ledger, action, ResourceKind::Pipeline, app_name, &format!("for {}", url));
    ctx.arm
        .create_or_update_source_control(&SourceControlRequest {
            app_name: app_name.to_string(),
            resource_group: app_group.to_string(),
            repo_url: url.clone(),
            branch,
            token: token.clone(),
            registry,
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            tenant_id: credentials.tenant_id,
            image: plan.app.image.clone(),
            context_path: context_path.clone(),
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_include_distinct_environment_group() {
        assert_eq!(
            service_principal_scopes("sub", "rg", Some("rg")),
            vec!["/subscriptions/sub/resourceGroups/rg".to_string()]
        );
        assert_eq!(
            service_principal_scopes("sub", "rg", Some("envrg")).len(),
            2
        );
    }
}
