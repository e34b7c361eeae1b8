use capp_cloud::{ContainerAppInfo, EnvironmentInfo, InMemoryArm, InMemorySourceHost};
use capp_up::{SuffixSource, UpContext};
use std::sync::Arc;

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";
pub const USER: &str = "jane@contoso.com";
pub const SUFFIX: u16 = 42;

pub struct Cloud {
    pub arm: Arc<InMemoryArm>,
    pub host: Arc<InMemorySourceHost>,
}

impl Cloud {
    pub fn new() -> Self {
        Self {
            arm: Arc::new(InMemoryArm::new(SUBSCRIPTION)),
            host: Arc::new(InMemorySourceHost::new()),
        }
    }

    pub fn context(&self) -> UpContext {
        UpContext::new(self.arm.clone(), self.host.clone(), SUBSCRIPTION, USER)
            .with_suffixes(SuffixSource::fixed(SUFFIX))
    }

    /// Resource group with a managed environment in East US
    pub fn seed_managed_environment(&self, resource_group: &str, name: &str) -> String {
        self.arm.add_resource_group(resource_group, "eastus");
        let id = self.arm.managed_environment_id(resource_group, name);
        self.arm
            .add_managed_environment(EnvironmentInfo::new(&id, name, "East US"));
        id
    }

    /// App running in the given environment
    #[allow(dead_code)]
    pub fn seed_app(&self, resource_group: &str, name: &str, environment_id: &str) -> String {
        let id = self.arm.app_id(resource_group, name);
        self.arm.add_container_app(
            ContainerAppInfo::new(&id, name, "East US").with_environment(environment_id),
        );
        id
    }

    /// Connected cluster with nothing installed yet
    #[allow(dead_code)]
    pub fn seed_cluster(&self, resource_group: &str, name: &str) -> String {
        self.arm.add_resource_group(resource_group, "eastus");
        self.arm.add_connected_cluster(resource_group, name, "eastus")
    }
}

#[allow(dead_code)]
pub fn dockerfile_dir(content: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Dockerfile"), content).unwrap();
    dir
}
