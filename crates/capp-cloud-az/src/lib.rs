//! Azure CLI backend for capp
//!
//! Implements the `ArmClient` trait on top of the `az` CLI so `capp up`
//! reuses whatever login the user already has.
//!
//! # Features
//!
//! - Management-plane reads and writes through `az rest`, with `nextLink` paging
//! - Long-running PUTs polled until a terminal provisioning state
//! - Registry builds (`az acr build`) and service principals (`az ad sp`)
//!
//! # Requirements
//!
//! - `az` CLI must be installed and logged in (`az login`)
//!
//! # Example
//!
//! ```ignore
//! use capp_cloud_az::{AzArmClient, AzCli};
//!
//! let az = AzCli::default();
//! let account = az.account().await?;
//! let arm = AzArmClient::new(az, account.subscription_id);
//! ```

pub mod az;
pub mod error;
pub mod provider;

pub use az::{AzAccount, AzCli, AzUser, classify_failure};
pub use error::{AzError, Result};
pub use provider::AzArmClient;
