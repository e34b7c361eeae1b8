//! The deployment plan threaded through resolution and consumed by execution

use crate::args::{UpArgs, parse_env_vars};
use crate::descriptor::{
    AppSpec, CustomLocationSpec, Deployment, EnvironmentSpec, ExtensionSpec, RegistrySpec,
    ResourceGroupSpec, ServicePrincipalArgs,
};
use crate::error::{Result, UpError};
use crate::naming;
use capp_cloud::LogAnalyticsConfig;

#[derive(Debug, Clone)]
pub struct UpPlan {
    pub app: AppSpec,
    pub resource_group: ResourceGroupSpec,
    pub environment: EnvironmentSpec,
    pub custom_location: CustomLocationSpec,
    pub extension: ExtensionSpec,
    /// Azure registry the app builds into or pulls from
    pub registry: Option<RegistrySpec>,
    pub deployment: Deployment,

    /// Resource group exactly as passed on the command line
    pub requested_resource_group: Option<String>,
    /// Location as passed on the command line, formatted
    pub location: Option<String>,
    pub logs_customer_id: Option<String>,
}

impl UpPlan {
    pub fn from_args(args: &UpArgs) -> Result<Self> {
        let location = args.formatted_location();
        let logs = args.logs_customer_id.as_ref().map(|customer_id| LogAnalyticsConfig {
            customer_id: customer_id.clone(),
            shared_key: args.logs_key.clone(),
        });

        let mut environment = EnvironmentSpec::from_reference(
            args.environment.as_deref(),
            args.custom_location.as_deref(),
            args.connected_cluster_id.as_deref(),
        )?;
        environment.location = location.clone();
        environment.logs = logs.clone();

        let custom_location = CustomLocationSpec::from_args(
            args.custom_location.as_deref(),
            args.connected_cluster_id.as_deref(),
        )?;
        let extension = ExtensionSpec {
            connected_cluster_id: args.connected_cluster_id.clone(),
            logs,
            ..Default::default()
        };

        let deployment = match (&args.source, &args.repo) {
            (Some(dir), _) => Deployment::Source {
                dir: dir.clone(),
                dockerfile: args.dockerfile().to_string(),
            },
            (None, Some(url)) => Deployment::Repo {
                url: url.clone(),
                repo: naming::repo_name(url)?,
                branch: args.branch.clone(),
                token: args.token.clone().ok_or_else(|| {
                    UpError::RequiredArgumentMissing("A GitHub token is required with --repo".to_string())
                })?,
                context_path: args.context_path.clone(),
                dockerfile: args.dockerfile().to_string(),
                service_principal: ServicePrincipalArgs {
                    client_id: args.service_principal_client_id.clone(),
                    client_secret: args.service_principal_client_secret.clone(),
                    tenant_id: args.service_principal_tenant_id.clone(),
                },
            },
            (None, None) => Deployment::Image,
        };

        let mut registry_server = args.registry_server.clone();
        let mut image = args.image.clone();
        if deployment.is_source() {
            if let Some(given) = image.as_deref() {
                // the registry in a source deployment's image is where the build goes
                if registry_server.is_none() && naming::is_acr_server(given) && given.contains('/') {
                    registry_server = given.split('/').next().map(str::to_string);
                }
                image = Some(naming::reformat_image(given));
            }
        }

        Ok(UpPlan {
            app: AppSpec {
                name: args.name.clone(),
                image,
                target_port: args.target_port,
                ingress: args.ingress,
                env_vars: parse_env_vars(&args.env_vars)?,
                registry_server,
                registry_username: args.registry_username.clone(),
                registry_password: args.registry_password.clone(),
                existing: None,
            },
            resource_group: ResourceGroupSpec {
                name: args.resource_group.clone(),
                location: location.clone(),
                exists: false,
            },
            environment,
            custom_location,
            extension,
            registry: None,
            deployment,
            requested_resource_group: args.resource_group.clone(),
            location,
            logs_customer_id: args.logs_customer_id.clone(),
        })
    }

    /// Resource group of the environment, defaulting to the app's
    pub fn environment_group(&self) -> Option<&str> {
        self.environment
            .resource_group
            .as_deref()
            .or(self.resource_group.name.as_deref())
    }

    /// The environment with its resource group filled in
    pub fn resolved_environment(&self) -> EnvironmentSpec {
        EnvironmentSpec {
            resource_group: self.environment_group().map(str::to_string),
            ..self.environment.clone()
        }
    }
}
