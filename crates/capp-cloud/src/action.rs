//! Ledger of the actions the executor took

use serde::{Deserialize, Serialize};

/// Kind of cloud resource an action touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ResourceGroup,
    ManagedEnvironment,
    ConnectedEnvironment,
    CustomLocation,
    ClusterExtension,
    Registry,
    ImageBuild,
    ContainerApp,
    ServicePrincipal,
    Pipeline,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ResourceKind::ResourceGroup => "resource group",
            ResourceKind::ManagedEnvironment => "managed environment",
            ResourceKind::ConnectedEnvironment => "connected environment",
            ResourceKind::CustomLocation => "custom location",
            ResourceKind::ClusterExtension => "cluster extension",
            ResourceKind::Registry => "container registry",
            ResourceKind::ImageBuild => "image build",
            ResourceKind::ContainerApp => "container app",
            ResourceKind::ServicePrincipal => "service principal",
            ResourceKind::Pipeline => "deployment pipeline",
        };
        f.write_str(label)
    }
}

/// Type of action performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// A new resource was created
    Create,
    /// An existing resource was updated in place
    Update,
    /// An existing resource was used as-is
    Reuse,
    /// A side effect was started (build, workflow run)
    Trigger,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Reuse => write!(f, "reuse"),
            ActionType::Trigger => write!(f, "trigger"),
        }
    }
}

/// One executed action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub action_type: ActionType,
    pub kind: ResourceKind,
    /// Name or resource id of the target
    pub target: String,
    pub description: String,
}

/// Result of executing a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    pub actions: Vec<Action>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        action_type: ActionType,
        kind: ResourceKind,
        target: impl Into<String>,
        description: impl Into<String>,
    ) {
        self.actions.push(Action {
            action_type,
            kind,
            target: target.into(),
            description: description.into(),
        });
    }

    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn find(&self, kind: ResourceKind) -> Option<&Action> {
        self.actions.iter().find(|a| a.kind == kind)
    }

    pub fn summary(&self) -> ApplySummary {
        ApplySummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            reuse: self.actions_by_type(ActionType::Reuse).len(),
            trigger: self.actions_by_type(ActionType::Trigger).len(),
        }
    }
}

/// Summary of executed actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplySummary {
    pub create: usize,
    pub update: usize,
    pub reuse: usize,
    pub trigger: usize,
}

impl std::fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} reused, {} triggered",
            self.create, self.update, self.reuse, self.trigger
        )
    }
}
