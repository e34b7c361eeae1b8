mod common;

use capp_cloud::{CloudError, ContainerAppInfo, EnvironmentInfo, InMemoryArm, InjectedFailure, Ingress};
use capp_up::naming::default_registry_name;
use capp_up::{UpArgs, UpError, planner};
use common::{Cloud, SUBSCRIPTION};

fn image_args(name: &str) -> UpArgs {
    UpArgs {
        image: Some("nginx".into()),
        ..UpArgs::new(name)
    }
}

#[tokio::test]
async fn test_fully_specified_existing_resources_need_no_search() {
    let cloud = Cloud::new();
    let env_id = cloud.seed_managed_environment("rg", "env");
    cloud.seed_app("rg", "web", &env_id);
    let ctx = cloud.context();

    let args = UpArgs {
        resource_group: Some("rg".into()),
        environment: Some("env".into()),
        ..image_args("web")
    };
    let plan = planner::plan(&ctx, &args).await.unwrap();

    assert!(cloud.arm.searches().is_empty(), "searches: {:?}", cloud.arm.searches());
    assert!(plan.resource_group.exists);
    assert_eq!(plan.environment.name.as_deref(), Some("env"));
    assert!(!plan.environment.is_connected());
    assert!(plan.app.existing.is_some());
    assert!(plan.registry.is_none());
}

#[tokio::test]
async fn test_same_app_name_in_two_groups_is_ambiguous() {
    let cloud = Cloud::new();
    let env_a = cloud.seed_managed_environment("rg-a", "env");
    let env_b = cloud.seed_managed_environment("rg-b", "env");
    cloud.seed_app("rg-a", "web", &env_a);
    cloud.seed_app("rg-b", "web", &env_b);
    let ctx = cloud.context();

    let err = planner::plan(&ctx, &image_args("web")).await.unwrap_err();
    match &err {
        UpError::Ambiguous { kind, name, count } => {
            assert_eq!(kind, "container app");
            assert_eq!(name, "web");
            assert_eq!(*count, 2);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
    assert!(err.hint().unwrap().contains("--resource-group"));
}

#[tokio::test]
async fn test_single_existing_app_pins_group_and_environment() {
    let cloud = Cloud::new();
    let env_id = cloud.seed_managed_environment("rg-a", "env-a");
    cloud.seed_managed_environment("rg-b", "env-b");
    cloud.seed_app("rg-a", "web", &env_id);
    let ctx = cloud.context();

    let plan = planner::plan(&ctx, &image_args("web")).await.unwrap();
    assert_eq!(plan.resource_group.name.as_deref(), Some("rg-a"));
    assert_eq!(plan.environment.name.as_deref(), Some("env-a"));
    assert_eq!(plan.environment_group(), Some("rg-a"));
    assert!(plan.app.existing.is_some());
}

#[tokio::test]
async fn test_default_registry_name_is_stable_across_runs() {
    let cloud = Cloud::new();
    cloud.seed_managed_environment("rg", "env");
    let source = common::dockerfile_dir("FROM node\nEXPOSE 3000\n");
    let args = UpArgs {
        resource_group: Some("rg".into()),
        environment: Some("env".into()),
        source: Some(source.path().to_path_buf()),
        ..UpArgs::new("web")
    };

    let first = planner::plan(&cloud.context(), &args).await.unwrap();
    let second = planner::plan(&cloud.context(), &args).await.unwrap();

    let first = first.registry.unwrap();
    let second = second.registry.unwrap();
    assert_eq!(first.name, second.name);
    assert_eq!(first.name, default_registry_name(SUBSCRIPTION, "rg", "env"));
    assert!(first.should_create);
    assert_eq!(first.resource_group, "rg");
}

#[tokio::test]
async fn test_existing_default_registry_is_reused_with_its_credentials() {
    let cloud = Cloud::new();
    cloud.seed_managed_environment("rg", "env");
    let registry = default_registry_name(SUBSCRIPTION, "rg", "env");
    cloud.arm.add_resource_group("acr-rg", "eastus");
    cloud.arm.add_registry("acr-rg", &registry, "eastus");
    let source = common::dockerfile_dir("FROM node\n");

    let args = UpArgs {
        resource_group: Some("rg".into()),
        environment: Some("env".into()),
        source: Some(source.path().to_path_buf()),
        ..UpArgs::new("web")
    };
    let plan = planner::plan(&cloud.context(), &args).await.unwrap();

    let resolved = plan.registry.unwrap();
    assert!(!resolved.should_create);
    assert_eq!(resolved.resource_group, "acr-rg");
    assert_eq!(plan.app.registry_username.as_deref(), Some(registry.as_str()));
    assert_eq!(plan.app.registry_server, Some(format!("{}.azurecr.io", registry)));
}

#[tokio::test]
async fn test_source_dockerfile_expose_sets_ingress() {
    let cloud = Cloud::new();
    cloud.seed_managed_environment("rg", "env");
    let source = common::dockerfile_dir("FROM node\nEXPOSE 3000/tcp\n");

    let args = UpArgs {
        resource_group: Some("rg".into()),
        environment: Some("env".into()),
        source: Some(source.path().to_path_buf()),
        ..UpArgs::new("web")
    };
    let plan = planner::plan(&cloud.context(), &args).await.unwrap();
    assert_eq!(plan.app.ingress, Some(Ingress::External));
    assert_eq!(plan.app.target_port, Some(3000));
}

#[tokio::test]
async fn test_fresh_connected_environment_names_share_one_suffix() {
    let cloud = Cloud::new();
    let cluster = cloud.seed_cluster("k8s-rg", "arc");
    let ctx = cloud.context();

    let args = UpArgs {
        connected_cluster_id: Some(cluster.clone()),
        ..image_args("web")
    };
    let plan = planner::plan(&ctx, &args).await.unwrap();

    assert_eq!(plan.resource_group.name.as_deref(), Some("jane_rg_0042"));
    assert!(!plan.resource_group.exists);
    assert_eq!(plan.environment.name.as_deref(), Some("web-env-0042"));
    assert_eq!(plan.custom_location.name.as_deref(), Some("jane-env-location-0042"));
    assert_eq!(plan.custom_location.resource_group.as_deref(), Some("jane_rg_0042"));
    assert_eq!(plan.extension.name.as_deref(), Some("containerapp-ext-0042"));
    assert_eq!(plan.extension.namespace.as_deref(), Some("containerapp-ns"));
    assert_eq!(
        plan.custom_location.cluster_extension_id.as_deref(),
        Some(InMemoryArm::extension_id(&cluster, "containerapp-ext-0042").as_str())
    );
    assert_eq!(
        plan.environment.custom_location_id(),
        Some(cloud.arm.custom_location_id("jane_rg_0042", "jane-env-location-0042").as_str())
    );
}

#[tokio::test]
async fn test_cluster_with_extension_and_custom_location_is_reused() {
    let cloud = Cloud::new();
    let cluster = cloud.seed_cluster("k8s-rg", "arc");
    let extension = cloud
        .arm
        .add_cluster_extension(&cluster, "appenv", "Microsoft.App.Environment", "apps");
    let custom_location = cloud
        .arm
        .add_custom_location("k8s-rg", "arc-location", "eastus", &cluster, vec![extension.clone()], "apps");
    let ctx = cloud.context();

    let args = UpArgs {
        connected_cluster_id: Some(cluster),
        ..image_args("web")
    };
    let plan = planner::plan(&ctx, &args).await.unwrap();

    assert!(plan.custom_location.exists);
    assert!(plan.extension.exists);
    assert_eq!(plan.environment.custom_location_id(), Some(custom_location.as_str()));
    assert_eq!(plan.environment.name.as_deref(), Some("web-env"));
}

#[tokio::test]
async fn test_connected_environment_found_on_cluster() {
    let cloud = Cloud::new();
    let cluster = cloud.seed_cluster("k8s-rg", "arc");
    let extension = cloud
        .arm
        .add_cluster_extension(&cluster, "appenv", "microsoft.app.environment", "apps");
    let custom_location = cloud
        .arm
        .add_custom_location("k8s-rg", "arc-location", "eastus", &cluster, vec![extension], "apps");
    let env_id = cloud.arm.connected_environment_id("k8s-rg", "arc-env");
    cloud.arm.add_connected_environment(
        EnvironmentInfo::new(&env_id, "arc-env", "eastus").with_custom_location(&custom_location),
    );
    let ctx = cloud.context();

    let args = UpArgs {
        connected_cluster_id: Some(cluster),
        ..image_args("web")
    };
    let plan = planner::plan(&ctx, &args).await.unwrap();
    assert_eq!(plan.resource_group.name.as_deref(), Some("k8s-rg"));
    assert_eq!(plan.environment.name.as_deref(), Some("arc-env"));
    assert!(plan.environment.is_connected());
}

#[tokio::test]
async fn test_log_analytics_workspace_selects_environment() {
    let cloud = Cloud::new();
    cloud.seed_managed_environment("rg-a", "env-a");
    cloud.arm.add_resource_group("rg-b", "eastus");
    let id = cloud.arm.managed_environment_id("rg-b", "env-b");
    cloud
        .arm
        .add_managed_environment(EnvironmentInfo::new(&id, "env-b", "East US").with_logs_customer_id("ws-1"));
    let ctx = cloud.context();

    let args = UpArgs {
        logs_customer_id: Some("ws-1".into()),
        ..image_args("web")
    };
    let plan = planner::plan(&ctx, &args).await.unwrap();
    assert_eq!(plan.environment.name.as_deref(), Some("env-b"));
    assert_eq!(plan.resource_group.name.as_deref(), Some("rg-b"));
}

#[tokio::test]
async fn test_two_unnamed_environment_candidates_are_ambiguous() {
    let cloud = Cloud::new();
    cloud.seed_managed_environment("rg-a", "env-a");
    cloud.seed_managed_environment("rg-b", "env-b");
    let ctx = cloud.context();

    let err = planner::plan(&ctx, &image_args("web")).await.unwrap_err();
    assert!(matches!(err, UpError::Ambiguous { ref kind, count: 2, .. } if kind == "managed environment"));
    assert!(err.hint().unwrap().contains("--environment"));
    assert!(cloud.arm.creations().is_empty());
}

#[tokio::test]
async fn test_environment_name_in_two_groups_is_ambiguous() {
    let cloud = Cloud::new();
    cloud.seed_managed_environment("rg-a", "shared");
    cloud.seed_managed_environment("rg-b", "shared");
    let ctx = cloud.context();

    let args = UpArgs {
        environment: Some("shared".into()),
        ..image_args("web")
    };
    let err = planner::plan(&ctx, &args).await.unwrap_err();
    assert!(matches!(err, UpError::Ambiguous { ref kind, count: 2, .. } if kind == "managed environment"));
}

#[tokio::test]
async fn test_nothing_found_gets_default_names() {
    let cloud = Cloud::new();
    let ctx = cloud.context();

    let plan = planner::plan(&ctx, &image_args("web")).await.unwrap();
    assert_eq!(plan.resource_group.name.as_deref(), Some("jane_rg_0042"));
    assert_eq!(plan.environment.name.as_deref(), Some("web-env"));
    assert_eq!(plan.environment_group(), Some("jane_rg_0042"));
}

#[tokio::test]
async fn test_throttled_lookup_is_not_treated_as_absent() {
    let cloud = Cloud::new();
    cloud.arm.fail_on("get_resource_group", InjectedFailure::Throttled);
    let ctx = cloud.context();

    let args = UpArgs {
        resource_group: Some("rg".into()),
        ..image_args("web")
    };
    let err = planner::plan(&ctx, &args).await.unwrap_err();
    assert!(matches!(err, UpError::Cloud(CloudError::Throttled(_))));
    assert!(cloud.arm.creations().is_empty());
}

#[tokio::test]
async fn test_permission_error_during_search_propagates() {
    let cloud = Cloud::new();
    cloud.arm.fail_on("list_container_apps", InjectedFailure::PermissionDenied);
    let ctx = cloud.context();

    let err = planner::plan(&ctx, &image_args("web")).await.unwrap_err();
    assert!(matches!(err, UpError::Cloud(CloudError::PermissionDenied(_))));
}

#[tokio::test]
async fn test_app_still_provisioning_is_refused() {
    let cloud = Cloud::new();
    let env_id = cloud.seed_managed_environment("rg", "env");
    let mut app = ContainerAppInfo::new(cloud.arm.app_id("rg", "web"), "web", "East US").with_environment(&env_id);
    app.properties.provisioning_state = Some("InProgress".into());
    cloud.arm.add_container_app(app);
    let ctx = cloud.context();

    let args = UpArgs {
        resource_group: Some("rg".into()),
        environment: Some("env".into()),
        ..image_args("web")
    };
    let err = planner::plan(&ctx, &args).await.unwrap_err();
    assert!(matches!(err, UpError::Validation(ref m) if m.contains("provisioning")));
}

#[tokio::test]
async fn test_acr_image_credentials_are_looked_up() {
    let cloud = Cloud::new();
    cloud.seed_managed_environment("rg", "env");
    cloud.arm.add_resource_group("acr-rg", "eastus");
    cloud.arm.add_registry("acr-rg", "myacr", "eastus");
    let ctx = cloud.context();

    let args = UpArgs {
        resource_group: Some("rg".into()),
        environment: Some("env".into()),
        image: Some("myacr.azurecr.io/web:1".into()),
        ..UpArgs::new("web")
    };
    let plan = planner::plan(&ctx, &args).await.unwrap();
    let registry = plan.registry.unwrap();
    assert_eq!(registry.name, "myacr");
    assert_eq!(registry.resource_group, "acr-rg");
    assert_eq!(plan.app.registry_server.as_deref(), Some("myacr.azurecr.io"));
    assert_eq!(plan.app.registry_password.as_deref(), Some("pw-myacr"));
}

#[tokio::test]
async fn test_missing_acr_credentials_suggest_flags() {
    let cloud = Cloud::new();
    cloud.seed_managed_environment("rg", "env");
    let ctx = cloud.context();

    let args = UpArgs {
        resource_group: Some("rg".into()),
        environment: Some("env".into()),
        image: Some("ghost.azurecr.io/web:1".into()),
        ..UpArgs::new("web")
    };
    let err = planner::plan(&ctx, &args).await.unwrap_err();
    assert!(matches!(err, UpError::External { .. }));
    assert!(err.hint().unwrap().contains("--registry-username"));
}

#[tokio::test]
async fn test_repo_reads_dockerfile_from_default_branch() {
    let cloud = Cloud::new();
    cloud.seed_managed_environment("rg", "env");
    cloud.host.add_repo("contoso/web", "trunk");
    cloud
        .host
        .add_file("contoso/web", "trunk", "Dockerfile", "FROM python\nEXPOSE 5000\n");
    let ctx = cloud.context();

    let args = UpArgs {
        resource_group: Some("rg".into()),
        environment: Some("env".into()),
        repo: Some("https://github.com/contoso/web".into()),
        token: Some("ghp_x".into()),
        ..UpArgs::new("web")
    };
    let plan = planner::plan(&ctx, &args).await.unwrap();
    assert_eq!(plan.app.target_port, Some(5000));
    match &plan.deployment {
        capp_up::Deployment::Repo { branch, repo, .. } => {
            assert_eq!(branch.as_deref(), Some("trunk"));
            assert_eq!(repo, "contoso/web");
        }
        other => panic!("expected repo deployment, got {other:?}"),
    }
    assert!(plan.registry.unwrap().should_create);
}
