//! Dockerfile loading and ingress inference

use crate::context::UpContext;
use crate::error::{Result, UpError};
use capp_cloud::{CloudResultExt, Ingress};
use std::path::Path;

/// Derive ingress and target port from the first usable `EXPOSE` line.
///
/// Only applies when neither was supplied; a port without ingress means
/// external ingress.
pub fn infer_ingress_and_port(
    ingress: Option<Ingress>,
    target_port: Option<u16>,
    lines: &[String],
) -> (Option<Ingress>, Option<u16>) {
    let mut ingress = ingress;
    let mut target_port = target_port;

    if ingress.is_none() && target_port.is_none() {
        for line in lines {
            let line = line
                .to_ascii_uppercase()
                .trim()
                .replace("/TCP", "")
                .replace("/UDP", "");
            if line.is_empty() || line.starts_with('#') || !line.contains("EXPOSE") {
                continue;
            }
            let parts: Vec<&str> = line.split(' ').collect();
            for pair in parts.windows(2) {
                if !pair[0].contains("EXPOSE") {
                    continue;
                }
                if let Ok(port) = pair[1].parse::<u16>() {
                    tracing::info!("Adding external ingress port {} based on dockerfile expose", port);
                    target_port = Some(port);
                    ingress = Some(Ingress::External);
                }
            }
        }
    }

    if target_port.is_some() && ingress.is_none() {
        ingress = Some(Ingress::External);
    }
    (ingress, target_port)
}

pub async fn local_dockerfile(source: &Path, dockerfile: &str) -> Result<Vec<String>> {
    let path = source.join(dockerfile);
    let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
        tracing::debug!("Failed to read {}: {}", path.display(), e);
        UpError::InvalidArgumentValue(format!(
            "Cannot open specified Dockerfile {}. Check dockerfile name, path, and permissions.",
            path.display()
        ))
    })?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Dockerfile lines from a hosted repository plus the branch they were read from
pub async fn repo_dockerfile(
    ctx: &UpContext,
    repo: &str,
    branch: Option<&str>,
    token: &str,
    context_path: Option<&str>,
    dockerfile: &str,
) -> Result<(Vec<String>, String)> {
    let host = &ctx.source_host;
    let branch = match branch {
        Some(branch) => branch.to_string(),
        None => host
            .default_branch(repo, token)
            .await
            .found()?
            .ok_or_else(|| {
                UpError::external(
                    format!("Could not find repo {}", repo),
                    "Check the --repo URL and that the token can read the repository",
                )
            })?,
    };

    let context_path = context_path.unwrap_or(".");
    let entries = host
        .list_directory(repo, context_path, &branch, token)
        .await
        .found()?
        .ok_or_else(|| {
            UpError::external(
                format!("Could not find branch {}", branch),
                "Check the --branch value",
            )
        })?;

    let suffix = format!("/{}", dockerfile);
    for entry in entries.iter().filter(|e| e.is_file) {
        if entry.path == dockerfile || entry.path.ends_with(&suffix) {
            let content = host.read_file(repo, &entry.path, &branch, token).await.found()?;
            if let Some(content) = content.filter(|c| !c.is_empty()) {
                return Ok((content.lines().map(str::to_string).collect(), branch));
            }
        }
    }

    Err(UpError::external(
        "Could not find Dockerfile in GitHub repo/branch",
        "Ensure it is named 'Dockerfile'. Set the path with --context-path if not in the root directory",
    ))
}
