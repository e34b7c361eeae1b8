//! capp up
//!
//! Turns a sparse set of `capp up` arguments into a complete deployment plan
//! for an Azure container app, then creates or reuses every resource the plan
//! names.
//!
//! ```text
//! UpArgs ─ validate ─ preflight ─ planner (resolver steps, registry) ─ UpPlan ─ executor ─ UpOutcome
//! ```
//!
//! All cloud access goes through the [`UpContext`] collaborators.

pub mod args;
pub mod context;
pub mod descriptor;
pub mod dockerfile;
pub mod error;
pub mod executor;
pub mod naming;
pub mod output;
pub mod plan;
pub mod planner;
pub mod preflight;
pub mod registry;
pub mod resolver;
pub mod workflow;

pub use args::{UpArgs, validate_up_args};
pub use context::{SuffixSource, UpContext};
pub use descriptor::{Deployment, EnvironmentSpec, EnvironmentVariant};
pub use error::{Result, UpError};
pub use executor::{UpOutcome, execute};
pub use plan::UpPlan;

/// Validate, plan and execute one `up` invocation.
pub async fn up(ctx: &UpContext, args: &UpArgs) -> Result<UpOutcome> {
    validate_up_args(args)?;
    preflight::run(ctx, args).await?;
    let plan = planner::plan(ctx, args).await?;
    executor::execute(ctx, plan).await
}
