mod common;

use capp_cloud::{ActionType, ArmClient, CloudError, InjectedFailure, ResourceKind};
use capp_up::naming::{QUICKSTART_IMAGE, default_registry_name};
use capp_up::output::{app_url, summary_lines};
use capp_up::{UpArgs, UpError, up};
use common::{Cloud, SUBSCRIPTION};

const REPO_URL: &str = "https://github.com/contoso/web";

fn image_args(name: &str) -> UpArgs {
    UpArgs {
        image: Some("nginx".into()),
        ..UpArgs::new(name)
    }
}

fn repo_args(resource_group: &str, environment: &str) -> UpArgs {
    UpArgs {
        resource_group: Some(resource_group.into()),
        environment: Some(environment.into()),
        repo: Some(REPO_URL.into()),
        token: Some("ghp_x".into()),
        ..UpArgs::new("web")
    }
}

fn seed_repo(cloud: &Cloud) {
    cloud.host.add_repo("contoso/web", "main");
    cloud
        .host
        .add_file("contoso/web", "main", "Dockerfile", "FROM python\nEXPOSE 5000\n");
}

#[tokio::test]
async fn test_pure_reuse_creates_nothing() {
    let cloud = Cloud::new();
    let env_id = cloud.seed_managed_environment("rg", "env");
    cloud.seed_app("rg", "web", &env_id);
    let ctx = cloud.context();

    let args = UpArgs {
        resource_group: Some("rg".into()),
        environment: Some("env".into()),
        ..image_args("web")
    };
    let outcome = up(&ctx, &args).await.unwrap();

    let summary = outcome.result.summary();
    assert_eq!(summary.create, 0);
    assert_eq!(summary.update, 1);
    assert_eq!(cloud.arm.creations(), vec!["create_or_update_container_app".to_string()]);
    assert!(cloud.arm.searches().is_empty());
    assert_eq!(outcome.resource_group, "rg");
}

#[tokio::test]
async fn test_fresh_managed_deployment_creates_in_order() {
    let cloud = Cloud::new();
    let ctx = cloud.context();

    let args = UpArgs {
        target_port: Some(80),
        ..image_args("web")
    };
    let outcome = up(&ctx, &args).await.unwrap();

    assert_eq!(
        cloud.arm.creations(),
        vec![
            "create_resource_group".to_string(),
            "create_managed_environment".to_string(),
            "create_or_update_container_app".to_string(),
        ]
    );
    assert!(cloud.arm.has_resource_group("jane_rg_0042"));
    assert!(cloud
        .arm
        .registered_providers()
        .contains(&"Microsoft.OperationalInsights".to_string()));

    let request = &cloud.arm.app_requests()[0];
    assert_eq!(request.image, "nginx");
    assert_eq!(request.environment_id, cloud.arm.managed_environment_id("jane_rg_0042", "web-env"));
    assert!(request.registry.is_none());

    assert_eq!(outcome.result.summary().create, 3);
    assert_eq!(
        app_url(&outcome.app).as_deref(),
        Some("https://web.eastus.azurecontainerapps.io")
    );
    let lines = summary_lines(&outcome);
    assert!(lines[0].contains("web"));
    assert!(lines.iter().any(|l| l.ends_with("-n web -g jane_rg_0042")));
}

#[tokio::test]
async fn test_configured_defaults_shape_new_group() {
    let cloud = Cloud::new();
    let ctx = cloud
        .context()
        .with_user_name("ci")
        .with_default_location(Some("West Europe".into()));

    up(&ctx, &image_args("web")).await.unwrap();

    let group = cloud.arm.get_resource_group("ci_rg_0042").await.unwrap();
    assert_eq!(group.location, "westeurope");
}

#[tokio::test]
async fn test_fresh_connected_environment_creates_extension_before_custom_location() {
    let cloud = Cloud::new();
    let cluster = cloud.seed_cluster("k8s-rg", "arc");
    let ctx = cloud.context();

    let args = UpArgs {
        connected_cluster_id: Some(cluster),
        ..image_args("web")
    };
    let outcome = up(&ctx, &args).await.unwrap();

    assert_eq!(
        cloud.arm.creations(),
        vec![
            "create_resource_group".to_string(),
            "create_cluster_extension".to_string(),
            "create_custom_location".to_string(),
            "create_connected_environment".to_string(),
            "create_or_update_container_app".to_string(),
        ]
    );
    let custom_location = cloud.arm.custom_location_id("jane_rg_0042", "jane-env-location-0042");
    let request = &cloud.arm.app_requests()[0];
    assert_eq!(request.custom_location_id.as_deref(), Some(custom_location.as_str()));
    assert_eq!(
        request.environment_id,
        cloud.arm.connected_environment_id("jane_rg_0042", "web-env-0042")
    );
    assert!(outcome.result.find(ResourceKind::ClusterExtension).is_some());
    assert!(cloud
        .arm
        .registered_providers()
        .contains(&"Microsoft.KubernetesConfiguration".to_string()));
    assert_eq!(
        outcome.app.custom_location_id(),
        Some(custom_location.as_str())
    );
}

#[tokio::test]
async fn test_missing_cluster_fails_before_any_creation() {
    let cloud = Cloud::new();
    let ctx = cloud.context();
    let cluster = cloud.arm.connected_cluster_id("k8s-rg", "missing");

    let args = UpArgs {
        connected_cluster_id: Some(cluster),
        ..image_args("web")
    };
    let err = up(&ctx, &args).await.unwrap_err();
    assert!(matches!(err, UpError::Validation(_)));
    assert!(cloud.arm.creations().is_empty());
}

#[tokio::test]
async fn test_source_build_creates_registry_and_tags_image() {
    let cloud = Cloud::new();
    cloud.seed_managed_environment("rg", "env");
    let source = common::dockerfile_dir("FROM node\nEXPOSE 3000\n");
    let ctx = cloud.context();

    let args = UpArgs {
        resource_group: Some("rg".into()),
        environment: Some("env".into()),
        source: Some(source.path().to_path_buf()),
        ..UpArgs::new("web")
    };
    let outcome = up(&ctx, &args).await.unwrap();

    let registry = default_registry_name(SUBSCRIPTION, "rg", "env");
    assert_eq!(cloud.arm.registry_names(), vec![registry.clone()]);

    let builds = cloud.arm.builds();
    assert_eq!(builds.len(), 1);
    assert!(builds[0].image.starts_with("web:"));
    assert_eq!(builds[0].registry_name, registry);
    assert_eq!(builds[0].dockerfile, "Dockerfile");

    let request = &cloud.arm.app_requests()[0];
    assert_eq!(request.image, format!("{}.azurecr.io/{}", registry, builds[0].image));
    assert_eq!(request.target_port, Some(3000));
    let credentials = request.registry.as_ref().unwrap();
    assert_eq!(credentials.username, registry);

    let triggered = outcome.result.actions_by_type(ActionType::Trigger);
    assert_eq!(triggered.len(), 1);
    assert_eq!(triggered[0].kind, ResourceKind::ImageBuild);
}

#[tokio::test]
async fn test_failed_app_creation_keeps_created_registry() {
    let cloud = Cloud::new();
    cloud.seed_managed_environment("rg", "env");
    cloud
        .arm
        .fail_on("create_or_update_container_app", InjectedFailure::PermissionDenied);
    let source = common::dockerfile_dir("FROM node\n");
    let ctx = cloud.context();

    let args = UpArgs {
        resource_group: Some("rg".into()),
        environment: Some("env".into()),
        source: Some(source.path().to_path_buf()),
        ..UpArgs::new("web")
    };
    let err = up(&ctx, &args).await.unwrap_err();
    assert!(matches!(err, UpError::Cloud(CloudError::PermissionDenied(_))));
    assert_eq!(cloud.arm.registry_names().len(), 1);
}

#[tokio::test]
async fn test_repo_with_existing_pipeline_dispatches_workflow() {
    let cloud = Cloud::new();
    let env_id = cloud.seed_managed_environment("rg", "env");
    cloud.seed_app("rg", "web", &env_id);
    cloud.arm.add_source_control("rg", "web", REPO_URL);
    seed_repo(&cloud);
    let ctx = cloud.context();

    let outcome = up(&ctx, &repo_args("rg", "env")).await.unwrap();

    // 既存パイプラインは再実行され、サービスプリンシパルは作らない
    assert_eq!(
        cloud.host.dispatched(),
        vec![("contoso/web".to_string(), "web".to_string(), "main".to_string())]
    );
    assert!(cloud.arm.service_principal_scopes().is_empty());

    let app_request = &cloud.arm.app_requests()[0];
    assert_eq!(app_request.image, QUICKSTART_IMAGE);
    assert!(app_request.registry.is_none());

    let pipeline = &cloud.arm.source_control_requests()[0];
    assert_eq!(pipeline.branch, "main");
    assert!(pipeline.registry.is_some());
    assert!(outcome
        .result
        .actions
        .iter()
        .any(|a| a.kind == ResourceKind::Pipeline && a.action_type == ActionType::Trigger));
}

#[tokio::test]
async fn test_repo_without_pipeline_creates_scoped_service_principal() {
    let cloud = Cloud::new();
    let env_id = cloud.seed_managed_environment("env-rg", "env");
    cloud.arm.add_resource_group("rg", "eastus");
    seed_repo(&cloud);
    let ctx = cloud.context();

    let outcome = up(&ctx, &repo_args("rg", &env_id)).await.unwrap();

    assert_eq!(
        cloud.arm.service_principal_scopes(),
        vec![vec![
            format!("/subscriptions/{}/resourceGroups/rg", SUBSCRIPTION),
            format!("/subscriptions/{}/resourceGroups/env-rg", SUBSCRIPTION),
        ]]
    );
    assert!(cloud.host.dispatched().is_empty());

    let pipeline = &cloud.arm.source_control_requests()[0];
    assert_eq!(pipeline.client_id.as_deref(), Some("sp-client-1"));
    assert_eq!(pipeline.tenant_id.as_deref(), Some("tenant-1"));
    assert_eq!(
        outcome.result.find(ResourceKind::ServicePrincipal).map(|a| a.action_type),
        Some(ActionType::Create)
    );
}

#[tokio::test]
async fn test_failed_dispatch_does_not_fail_up() {
    let cloud = Cloud::new();
    let env_id = cloud.seed_managed_environment("rg", "env");
    cloud.seed_app("rg", "web", &env_id);
    cloud.arm.add_source_control("rg", "web", REPO_URL);
    seed_repo(&cloud);
    cloud.host.fail_dispatch();
    let ctx = cloud.context();

    let outcome = up(&ctx, &repo_args("rg", "env")).await.unwrap();

    assert!(cloud.host.dispatched().is_empty());
    let pipeline_actions: Vec<_> = outcome
        .result
        .actions
        .iter()
        .filter(|a| a.kind == ResourceKind::Pipeline)
        .map(|a| a.action_type)
        .collect();
    assert_eq!(pipeline_actions, vec![ActionType::Update]);
}

#[tokio::test]
async fn test_invalid_arguments_make_no_calls() {
    let cloud = Cloud::new();
    let ctx = cloud.context();

    let err = up(&ctx, &UpArgs::new("web")).await.unwrap_err();
    assert!(matches!(err, UpError::RequiredArgumentMissing(_)));
    assert!(cloud.arm.calls().is_empty());
}
