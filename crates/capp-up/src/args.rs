//! `capp up` arguments and the checks that run before any network call

use crate::error::{Result, UpError};
use crate::naming::{self, MAX_SECRET_LENGTH};
use capp_cloud::{EnvVar, Ingress, is_valid_resource_id};
use std::path::PathBuf;

pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

#[derive(Debug, Clone, Default)]
pub struct UpArgs {
    pub name: String,
    pub resource_group: Option<String>,
    /// Environment name or full resource id
    pub environment: Option<String>,
    pub location: Option<String>,
    /// Custom location resource id
    pub custom_location: Option<String>,
    pub connected_cluster_id: Option<String>,

    pub image: Option<String>,
    pub source: Option<PathBuf>,
    pub repo: Option<String>,

    pub ingress: Option<Ingress>,
    pub target_port: Option<u16>,
    pub registry_server: Option<String>,
    pub registry_username: Option<String>,
    pub registry_password: Option<String>,
    /// `KEY=VALUE` or `KEY=secretref:NAME`
    pub env_vars: Vec<String>,

    pub logs_customer_id: Option<String>,
    pub logs_key: Option<String>,

    pub branch: Option<String>,
    pub token: Option<String>,
    pub context_path: Option<String>,
    pub dockerfile: Option<String>,
    pub service_principal_client_id: Option<String>,
    pub service_principal_client_secret: Option<String>,
    pub service_principal_tenant_id: Option<String>,
}

impl UpArgs {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn dockerfile(&self) -> &str {
        self.dockerfile.as_deref().unwrap_or(DEFAULT_DOCKERFILE)
    }

    /// Location as given, normalized for comparisons
    pub fn formatted_location(&self) -> Option<String> {
        self.location.as_deref().map(naming::format_location)
    }
}

/// Reject inconsistent or malformed arguments.
pub fn validate_up_args(args: &UpArgs) -> Result<()> {
    naming::validate_app_name(&args.name)?;

    if args.source.is_none() && args.image.is_none() && args.repo.is_none() {
        return Err(UpError::RequiredArgumentMissing(
            "You must specify either --source, --repo, or --image".to_string(),
        ));
    }
    if args.source.is_some() && args.repo.is_some() {
        return Err(UpError::MutuallyExclusiveArguments(
            "Cannot use --source and --repo together. \
             Can either deploy from a local directory or a GitHub repo"
                .to_string(),
        ));
    }

    if let Some(repo) = &args.repo {
        naming::repo_name(repo)?;
        if args.token.as_deref().is_none_or(str::is_empty) {
            return Err(UpError::RequiredArgumentMissing(
                "A GitHub token is required with --repo. Pass --token or set GITHUB_TOKEN".to_string(),
            ));
        }
        if let Some(server) = args.registry_server.as_deref().filter(|s| naming::is_acr_server(s)) {
            let registry_name = naming::registry_name_from_server(server);
            if registry_name.len() > MAX_SECRET_LENGTH {
                return Err(UpError::InvalidArgumentValue(format!(
                    "--registry-server ACR name must be at most {} characters when using --repo",
                    MAX_SECRET_LENGTH
                )));
            }
        }
    }

    if args.target_port == Some(0) {
        return Err(UpError::InvalidArgumentValue(
            "--target-port must be between 1 and 65535".to_string(),
        ));
    }

    for (flag, value) in [
        ("--custom-location", &args.custom_location),
        ("--connected-cluster-id", &args.connected_cluster_id),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !is_valid_resource_id(v)) {
            return Err(UpError::InvalidArgumentValue(format!(
                "{} must be a full resource id, got '{}'",
                flag, value
            )));
        }
    }

    parse_env_vars(&args.env_vars)?;
    Ok(())
}

pub fn parse_env_vars(entries: &[String]) -> Result<Vec<EnvVar>> {
    entries
        .iter()
        .map(|entry| {
            let (name, value) = entry
                .split_once('=')
                .filter(|(name, _)| !name.is_empty())
                .ok_or_else(|| {
                    UpError::InvalidArgumentValue(format!(
                        "Environment variables must be in the format \"<key>=<value>\" or \
                         \"<key>=secretref:<secret name>\", got '{}'",
                        entry
                    ))
                })?;
            Ok(match value.strip_prefix("secretref:") {
                Some(secret) => EnvVar::SecretRef {
                    name: name.to_string(),
                    secret: secret.to_string(),
                },
                None => EnvVar::Value {
                    name: name.to_string(),
                    value: value.to_string(),
                },
            })
        })
        .collect()
}
