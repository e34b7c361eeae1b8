//! az CLI wrapper
//!
//! Runs `az` through `tokio::process` and turns its stderr into the error
//! taxonomy the planner relies on.

use crate::error::{AzError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;

/// az CLI wrapper
#[derive(Debug, Clone)]
pub struct AzCli {
    program: String,
}

/// The signed-in account (`az account show`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzAccount {
    #[serde(rename = "id")]
    pub subscription_id: String,
    #[serde(default)]
    pub tenant_id: String,
    pub user: AzUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzUser {
    pub name: String,
}

impl Default for AzCli {
    fn default() -> Self {
        Self::new("az")
    }
}

impl AzCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check that az is installed and logged in
    pub async fn account(&self) -> Result<AzAccount> {
        let which = Command::new("which").arg(&self.program).output().await?;
        if !which.status.success() {
            return Err(AzError::AzNotFound);
        }

        let output = self
            .run_command(&["account", "show", "--output", "json"])
            .await
            .map_err(|e| match e {
                AzError::CommandFailed(m) => AzError::NotLoggedIn(m),
                other => other,
            })?;
        let account: AzAccount = serde_json::from_str(&output)?;
        Ok(account)
    }

    /// Run an az command and return stdout
    pub async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd.arg("--only-show-errors");
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {}", self.program, redact(args).join(" "));

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run an az command that prints JSON
    pub async fn run_json(&self, args: &[&str]) -> Result<Value> {
        let output = self.run_command(args).await?;
        if output.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&output)?)
    }

    /// `az rest` against the management endpoint. Empty responses (202/204) are `Null`.
    pub async fn rest(&self, method: &str, url: &str, body: Option<&Value>) -> Result<Value> {
        let body = body.map(Value::to_string);
        let mut args = vec!["rest", "--method", method, "--url", url];
        if let Some(body) = &body {
            args.push("--body");
            args.push(body.as_str());
            args.push("--headers");
            args.push("Content-Type=application/json");
        }
        self.run_json(&args).await
    }
}

const NOT_FOUND_CODES: &[&str] = &[
    "NotFound",
    "ResourceNotFound",
    "ResourceGroupNotFound",
    "ParentResourceNotFound",
];
const THROTTLED_CODES: &[&str] = &["TooManyRequests", "SubscriptionRequestsThrottled"];
const PERMISSION_CODES: &[&str] = &["AuthorizationFailed", "LinkedAuthorizationFailed", "Forbidden"];

/// Map az stderr to an error kind by its ARM error code.
///
/// Without a code, the HTTP reason phrase `az rest` prints (`Not Found(...)`)
/// decides. Anything unrecognised stays a command failure.
pub fn classify_failure(stderr: &str) -> AzError {
    let message = stderr.to_string();
    let has = |codes: &[&str], code: &str| codes.iter().any(|c| c.eq_ignore_ascii_case(code));

    if let Some(code) = error_code(stderr) {
        return if has(NOT_FOUND_CODES, code) {
            AzError::NotFound(message)
        } else if has(THROTTLED_CODES, code) {
            AzError::Throttled(message)
        } else if has(PERMISSION_CODES, code) {
            AzError::PermissionDenied(message)
        } else {
            AzError::CommandFailed(message)
        };
    }

    match http_reason(stderr) {
        Some("Not Found") => AzError::NotFound(message),
        Some("Too Many Requests") => AzError::Throttled(message),
        Some("Forbidden") => AzError::PermissionDenied(message),
        _ => AzError::CommandFailed(message),
    }
}

/// The ARM error code: `(Code) ...`, a `Code: ...` line, or `"code": "..."` in
/// an embedded response body
fn error_code(stderr: &str) -> Option<&str> {
    let is_code = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '.');

    for line in stderr.lines() {
        let line = line.trim();
        let body = line.strip_prefix("ERROR:").map(str::trim_start).unwrap_or(line);
        let parenthesized = body
            .strip_prefix('(')
            .and_then(|rest| rest.split_once(')'))
            .map(|(code, _)| code);
        let labelled = line.strip_prefix("Code:").map(str::trim);
        if let Some(code) = parenthesized.or(labelled).filter(|&c| is_code(c)) {
            return Some(code);
        }
    }

    let at = stderr.find("\"code\"")?;
    let rest = stderr[at + "\"code\"".len()..].trim_start().strip_prefix(':')?;
    let rest = rest.trim_start().strip_prefix('"')?;
    let (code, _) = rest.split_once('"')?;
    is_code(code).then_some(code)
}

/// `Not Found(...)`, `Forbidden(...)` and friends at the start of the error line
fn http_reason(stderr: &str) -> Option<&str> {
    let first = stderr.lines().next()?.trim();
    let body = first.strip_prefix("ERROR:").map(str::trim_start).unwrap_or(first);
    let (reason, _) = body.split_once('(')?;
    let reason = reason.trim_end();
    (!reason.is_empty() && reason.chars().all(|c| c.is_ascii_alphabetic() || c == ' ')).then_some(reason)
}

/// Hide secret values that follow known flags in debug logs
fn redact<'a>(args: &[&'a str]) -> Vec<&'a str> {
    let mut out = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for arg in args {
        if hide_next {
            out.push("***");
            hide_next = false;
            continue;
        }
        hide_next = matches!(*arg, "--body" | "--password" | "--client-secret");
        out.push(*arg);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_not_found() {
        let err = classify_failure(
            "ERROR: (ResourceNotFound) The Resource 'Microsoft.App/containerApps/web' under resource group 'rg' was not found.\n\
             Code: ResourceNotFound",
        );
        assert!(matches!(err, AzError::NotFound(_)));

        let err = classify_failure("ERROR: (ResourceGroupNotFound) Resource group 'rg' could not be found.");
        assert!(matches!(err, AzError::NotFound(_)));

        let err = classify_failure(
            r#"ERROR: Not Found({"error":{"code":"ResourceNotFound","message":"The Resource was not found."}})"#,
        );
        assert!(matches!(err, AzError::NotFound(_)));
    }

    #[test]
    fn test_classify_throttled_and_denied() {
        assert!(matches!(
            classify_failure("ERROR: Too Many Requests(TooManyRequests)"),
            AzError::Throttled(_)
        ));
        assert!(matches!(
            classify_failure("ERROR: (AuthorizationFailed) The client 'x' does not have authorization"),
            AzError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_failure(r#"ERROR: Forbidden({"error":{"code":"AuthorizationFailed","message":"denied"}})"#),
            AzError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_failure("ERROR: unrecognized arguments: --bogus"),
            AzError::CommandFailed(_)
        ));
    }

    #[test]
    fn test_classify_ignores_digits_and_free_text() {
        let err = classify_failure(
            "ERROR: (AuthorizationFailed) The client 'jane@contoso.com' with object id \
             '4290c1d2-0000-4000-8000-000000000429' does not have authorization to perform action \
             'Microsoft.App/containerApps/read'.",
        );
        assert!(matches!(err, AzError::PermissionDenied(_)));

        let err = classify_failure("ERROR: (InvalidParameter) The value 'web-403' is not valid for name.");
        assert!(matches!(err, AzError::CommandFailed(_)));

        let err = classify_failure("ERROR: The subscription '1234' could not be found.");
        assert!(matches!(err, AzError::CommandFailed(_)));

        let err = classify_failure(
            r#"ERROR: Not Found({"error":{"code":"SubscriptionNotFound","message":"The subscription '1234' could not be found."}})"#,
        );
        assert!(matches!(err, AzError::CommandFailed(_)));
    }

    #[test]
    fn test_redact_body() {
        let args = ["rest", "--method", "put", "--body", "{\"secret\":1}"];
        assert_eq!(redact(&args), vec!["rest", "--method", "put", "--body", "***"]);
    }

    #[test]
    fn test_account_from_json() {
        let account: AzAccount = serde_json::from_value(serde_json::json!({
            "id": "sub-1",
            "tenantId": "tenant-1",
            "user": { "name": "jane@contoso.com", "type": "user" }
        }))
        .unwrap();
        assert_eq!(account.subscription_id, "sub-1");
        assert_eq!(account.user.name, "jane@contoso.com");
    }
}
