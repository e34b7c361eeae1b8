mod common;

use capp_cloud::{ActionType, ApplyResult, ResourceKind};
use capp_up::descriptor::{AppPlacement, AppSpec, RegistrySpec};
use common::Cloud;

fn placement<'a>(environment_id: &'a str) -> AppPlacement<'a> {
    AppPlacement {
        resource_group: "rg",
        environment_id,
        custom_location_id: None,
        location: "East US",
    }
}

#[tokio::test]
async fn test_app_is_created_then_updated() {
    let cloud = Cloud::new();
    let env_id = cloud.seed_managed_environment("rg", "env");
    let ctx = cloud.context();
    let mut ledger = ApplyResult::new();

    let mut app = AppSpec {
        name: "web".into(),
        image: Some("nginx".into()),
        ..Default::default()
    };
    assert!(!app.check_exists(&ctx, "rg").await.unwrap());

    app.create_if_needed(&ctx, placement(&env_id), false, &mut ledger)
        .await
        .unwrap();
    app.existing = app.get(&ctx, "rg").await.unwrap();
    assert!(app.existing.is_some());

    app.create_if_needed(&ctx, placement(&env_id), false, &mut ledger)
        .await
        .unwrap();
    let actions: Vec<ActionType> = ledger.actions.iter().map(|a| a.action_type).collect();
    assert_eq!(actions, vec![ActionType::Create, ActionType::Update]);
    assert_eq!(cloud.arm.call_count("create_or_update_container_app"), 2);
}

#[tokio::test]
async fn test_pipeline_request_keeps_current_image_without_credentials() {
    let cloud = Cloud::new();
    let env_id = cloud.seed_managed_environment("rg", "env");
    cloud.seed_app("rg", "web", &env_id);
    let ctx = cloud.context();

    let mut app = AppSpec {
        name: "web".into(),
        registry_server: Some("reg.azurecr.io".into()),
        registry_username: Some("reg".into()),
        registry_password: Some("secret".into()),
        ..Default::default()
    };
    app.existing = app.get(&ctx, "rg").await.unwrap();
    let current = app.existing.as_ref().unwrap().containers().first().map(|c| c.image.clone());

    let request = app.request(placement(&env_id), true);
    assert!(request.registry.is_none());
    assert_eq!(Some(request.image), current.or(Some(capp_up::naming::QUICKSTART_IMAGE.to_string())));

    let request = app.request(placement(&env_id), false);
    assert_eq!(request.registry.map(|r| r.server), Some("reg.azurecr.io".to_string()));
}

#[tokio::test]
async fn test_registry_is_created_once() {
    let cloud = Cloud::new();
    cloud.arm.add_resource_group("rg", "eastus");
    let ctx = cloud.context();
    let mut ledger = ApplyResult::new();

    let mut registry = RegistrySpec {
        name: "caregistry".into(),
        resource_group: "rg".into(),
        should_create: true,
    };
    assert!(!registry.check_exists(&ctx).await.unwrap());

    let created = registry
        .create_if_needed(&ctx, Some("northcentralusstage"), &mut ledger)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.name, "caregistry");
    assert_eq!(created.location, "eastus");
    assert!(!registry.should_create);
    assert!(registry.check_exists(&ctx).await.unwrap());

    let again = registry.create_if_needed(&ctx, None, &mut ledger).await.unwrap();
    assert!(again.is_none());
    assert_eq!(cloud.arm.call_count("create_registry"), 1);
    let registry_actions: Vec<ActionType> = ledger
        .actions
        .iter()
        .filter(|a| a.kind == ResourceKind::Registry)
        .map(|a| a.action_type)
        .collect();
    assert_eq!(registry_actions, vec![ActionType::Create, ActionType::Reuse]);
}
