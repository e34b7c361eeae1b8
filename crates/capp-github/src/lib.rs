//! GitHub source host for capp
//!
//! Implements `SourceHost` over the GitHub REST API: default branch lookup,
//! Dockerfile discovery and workflow dispatch for `capp up --repo`.
//!
//! # Example
//!
//! ```ignore
//! use capp_github::GitHubClient;
//! use capp_cloud::SourceHost;
//!
//! let github = GitHubClient::new();
//! let branch = github.default_branch("contoso/web", &token).await?;
//! ```

pub mod client;
pub mod error;

pub use client::GitHubClient;
pub use error::{GitHubError, Result};
