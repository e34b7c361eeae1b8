//! capp Cloud Abstractions
//!
//! Typed views of the Azure resources that `capp up` reads and writes, the
//! collaborator traits the workflow drives, and an in-memory backend for tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    capp CLI                      │
//! │                   (capp up)                      │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                   capp-up                        │
//! │       resolver → planner → executor              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                  capp-cloud                      │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait ArmClient    trait SourceHost      │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Resource ids │  │ Action ledger│            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │ capp-cloud-az │ │  capp-github  │
//! │  (az CLI)     │ │  (REST API)   │
//! └───────────────┘ └───────────────┘
//! ```

pub mod action;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod model;
pub mod provider;
pub mod request;
pub mod resource_id;

// Re-exports
pub use action::{Action, ActionType, ApplyResult, ApplySummary, ResourceKind};
pub use error::{CloudError, CloudResultExt, Result};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{InMemoryArm, InMemorySourceHost, InjectedFailure};
pub use model::{
    ClusterExtensionInfo, ConnectedClusterInfo, ContainerAppInfo, CustomLocationInfo,
    EnvironmentInfo, ExtendedLocation, Ingress, RegistryCredentials, RegistryInfo,
    ResourceGroupInfo, ServicePrincipal, SourceControlInfo,
};
pub use provider::{ArmClient, PollConfig, RepoEntry, SourceHost};
pub use request::{
    ClusterExtensionRequest, ConnectedEnvironmentRequest, ContainerAppRequest,
    CustomLocationRequest, EnvVar, LogAnalyticsConfig, ManagedEnvironmentRequest,
    RegistryBuildRequest, RegistryCredentialRequest, SourceControlRequest,
};
pub use resource_id::{
    ChildResource, ResourceId, is_valid_resource_id, resource_group_scope, resource_id,
};
