use capp_cloud::{Ingress, PollConfig};
use capp_cloud_az::{AzArmClient, AzCli};
use capp_config::CappConfig;
use capp_github::GitHubClient;
use capp_up::{UpArgs, UpContext};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct UpCommand {
    /// Name of the container app
    #[arg(short = 'n', long)]
    pub name: String,

    /// Resource group of the app (created when missing)
    #[arg(short = 'g', long)]
    pub resource_group: Option<String>,

    /// Environment name or resource id
    #[arg(long)]
    pub environment: Option<String>,

    /// Region for new resources
    #[arg(short = 'l', long)]
    pub location: Option<String>,

    /// Custom location resource id (connected environments)
    #[arg(long)]
    pub custom_location: Option<String>,

    /// Arc-enabled Kubernetes cluster resource id (connected environments)
    #[arg(long)]
    pub connected_cluster_id: Option<String>,

    /// Container image to deploy, or the repository name to build into
    #[arg(short = 'i', long)]
    pub image: Option<String>,

    /// Local directory to build with the registry
    #[arg(long, conflicts_with = "repo")]
    pub source: Option<PathBuf>,

    /// GitHub repository URL to wire a deployment pipeline for
    #[arg(long)]
    pub repo: Option<String>,

    /// external or internal
    #[arg(long)]
    pub ingress: Option<Ingress>,

    #[arg(long)]
    pub target_port: Option<u16>,

    #[arg(long)]
    pub registry_server: Option<String>,

    #[arg(long)]
    pub registry_username: Option<String>,

    #[arg(long)]
    pub registry_password: Option<String>,

    /// KEY=VALUE or KEY=secretref:NAME, repeatable
    #[arg(long = "env-vars", num_args = 1..)]
    pub env_vars: Vec<String>,

    /// Log Analytics workspace customer id for a new environment
    #[arg(long)]
    pub logs_workspace_id: Option<String>,

    #[arg(long)]
    pub logs_workspace_key: Option<String>,

    /// Branch to deploy from (--repo)
    #[arg(short = 'b', long)]
    pub branch: Option<String>,

    /// GitHub token (--repo); falls back to the configured token or GITHUB_TOKEN
    #[arg(long)]
    pub token: Option<String>,

    /// Directory of the Dockerfile inside the repository (--repo)
    #[arg(long)]
    pub context_path: Option<String>,

    /// Dockerfile name
    #[arg(long)]
    pub dockerfile: Option<String>,

    #[arg(long)]
    pub service_principal_client_id: Option<String>,

    #[arg(long)]
    pub service_principal_client_secret: Option<String>,

    #[arg(long)]
    pub service_principal_tenant_id: Option<String>,
}

impl UpCommand {
    pub fn into_up_args(self, config: &CappConfig) -> UpArgs {
        UpArgs {
            name: self.name,
            resource_group: self.resource_group,
            environment: self.environment,
            location: self.location,
            custom_location: self.custom_location,
            connected_cluster_id: self.connected_cluster_id,
            image: self.image,
            source: self.source,
            repo: self.repo,
            ingress: self.ingress,
            target_port: self.target_port,
            registry_server: self.registry_server,
            registry_username: self.registry_username,
            registry_password: self.registry_password,
            env_vars: self.env_vars,
            logs_customer_id: self.logs_workspace_id,
            logs_key: self.logs_workspace_key,
            branch: self.branch,
            token: self.token.or_else(|| config.github_token.clone()),
            context_path: self.context_path,
            dockerfile: self.dockerfile,
            service_principal_client_id: self.service_principal_client_id,
            service_principal_client_secret: self.service_principal_client_secret,
            service_principal_tenant_id: self.service_principal_tenant_id,
        }
    }
}

pub async fn handle(cmd: UpCommand) -> anyhow::Result<()> {
    let config = CappConfig::load()?;
    let args = cmd.into_up_args(&config);

    // ネットワークに触れる前に引数を検証
    capp_up::validate_up_args(&args)?;

    let az = AzCli::new(config.az_program());
    let account = az.account().await?;
    tracing::debug!("Using subscription {}", account.subscription_id);

    let arm = AzArmClient::new(az, &account.subscription_id).with_poll(PollConfig {
        interval: config.poll_interval(),
        max_attempts: config.poll_max_attempts,
    });
    let mut ctx = UpContext::new(
        Arc::new(arm),
        Arc::new(GitHubClient::new()),
        &account.subscription_id,
        &account.user.name,
    )
    .with_default_location(config.default_location.clone());
    if let Some(user_name) = &config.user_name {
        ctx = ctx.with_user_name(user_name);
    }

    let outcome = capp_up::up(&ctx, &args).await?;

    println!();
    for line in capp_up::output::summary_lines(&outcome) {
        println!("{}", line);
    }
    println!(
        "{} {} ({} ms)",
        "✓".green(),
        outcome.result.summary(),
        outcome.result.duration_ms
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        up: UpCommand,
    }

    #[test]
    fn test_config_token_fills_missing_flag() {
        let cli = TestCli::parse_from(["capp", "-n", "web", "--repo", "https://github.com/o/r"]);
        let config = CappConfig {
            github_token: Some("ghp_config".into()),
            ..CappConfig::default()
        };
        let args = cli.up.into_up_args(&config);
        assert_eq!(args.token.as_deref(), Some("ghp_config"));
        assert!(capp_up::validate_up_args(&args).is_ok());
    }

    #[test]
    fn test_flags_map_to_args() {
        let cli = TestCli::parse_from([
            "capp",
            "-n",
            "web",
            "--image",
            "nginx",
            "--ingress",
            "internal",
            "--target-port",
            "8080",
            "--env-vars",
            "A=1",
            "B=secretref:b",
            "--logs-workspace-id",
            "cust",
        ]);
        let args = cli.up.into_up_args(&CappConfig::default());
        assert_eq!(args.ingress, Some(Ingress::Internal));
        assert_eq!(args.target_port, Some(8080));
        assert_eq!(args.env_vars, vec!["A=1".to_string(), "B=secretref:b".to_string()]);
        assert_eq!(args.logs_customer_id.as_deref(), Some("cust"));
    }
}
