//! GitHub REST API client
//!
//! Bearer token authentication, `owner/repo` addressing.

use crate::error::{GitHubError, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use capp_cloud::{RepoEntry, SourceHost};
use serde::Deserialize;
use serde_json::json;

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("capp/", env!("CARGO_PKG_VERSION"));

/// GitHub source host
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiRepo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct ApiContentEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
}

#[derive(Debug, Deserialize)]
struct ApiFile {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct ApiWorkflows {
    #[serde(default)]
    workflows: Vec<ApiWorkflow>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiWorkflow {
    id: u64,
    path: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubClient {
    pub fn new() -> Self {
        Self::with_base_url(GITHUB_API_BASE)
    }

    /// Point the client at another API root (GitHub Enterprise, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn repo_url(&self, repo: &str) -> Result<String> {
        let (owner, name) = split_repo(repo)?;
        Ok(format!("{}/repos/{}/{}", self.base_url, owner, name))
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        token: &str,
    ) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn list_workflows(&self, repo: &str, token: &str) -> Result<Vec<ApiWorkflow>> {
        let url = format!("{}/actions/workflows", self.repo_url(repo)?);
        let workflows: ApiWorkflows = self.get(&url, &[("per_page", "100")], token).await?;
        Ok(workflows.workflows)
    }
}

/// Error out on non-2xx with the API's message
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or(body);
    Err(GitHubError::ApiError {
        status: status.as_u16(),
        message,
    })
}

fn split_repo(repo: &str) -> Result<(&str, &str)> {
    match repo.trim_matches('/').split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(GitHubError::InvalidRepo(repo.to_string())),
    }
}

fn decode_content(file: &ApiFile) -> Result<String> {
    if !file.encoding.is_empty() && file.encoding != "base64" {
        return Err(GitHubError::UnsupportedEncoding(file.encoding.clone()));
    }
    // the API wraps base64 at 60 columns
    let compact: String = file.content.split_whitespace().collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}

/// The workflow file the container app pipeline generates for `app_name`
fn deployment_workflow<'a>(workflows: &'a [ApiWorkflow], app_name: &str) -> Option<&'a ApiWorkflow> {
    let prefix = format!(
        ".github/workflows/{}-autodeploytrigger-",
        app_name.to_ascii_lowercase()
    );
    workflows
        .iter()
        .find(|w| w.path.to_ascii_lowercase().starts_with(&prefix))
}

#[async_trait]
impl SourceHost for GitHubClient {
    async fn default_branch(&self, repo: &str, token: &str) -> capp_cloud::Result<String> {
        let api: ApiRepo = self.get(&self.repo_url(repo)?, &[], token).await?;
        Ok(api.default_branch)
    }

    async fn list_directory(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
        token: &str,
    ) -> capp_cloud::Result<Vec<RepoEntry>> {
        let url = format!(
            "{}/contents/{}",
            self.repo_url(repo)?,
            path.trim_matches('/').trim_start_matches("./")
        );
        let entries: Vec<ApiContentEntry> = self.get(&url, &[("ref", branch)], token).await?;
        Ok(entries
            .into_iter()
            .map(|e| RepoEntry {
                path: e.path,
                is_file: e.entry_type == "file",
            })
            .collect())
    }

    async fn read_file(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
        token: &str,
    ) -> capp_cloud::Result<String> {
        let url = format!("{}/contents/{}", self.repo_url(repo)?, path.trim_start_matches('/'));
        let file: ApiFile = self.get(&url, &[("ref", branch)], token).await?;
        Ok(decode_content(&file)?)
    }

    async fn dispatch_workflow(
        &self,
        repo: &str,
        app_name: &str,
        branch: &str,
        token: &str,
    ) -> capp_cloud::Result<()> {
        let workflows = self.list_workflows(repo, token).await?;
        let workflow = deployment_workflow(&workflows, app_name).ok_or_else(|| {
            GitHubError::WorkflowNotFound {
                repo: repo.to_string(),
                app: app_name.to_string(),
            }
        })?;

        let url = format!(
            "{}/actions/workflows/{}/dispatches",
            self.repo_url(repo)?,
            workflow.id
        );
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .json(&json!({ "ref": branch }))
            .send()
            .await
            .map_err(GitHubError::from)?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capp_cloud::CloudError;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_split_repo() {
        assert_eq!(split_repo("contoso/web").unwrap(), ("contoso", "web"));
        assert!(split_repo("contoso").is_err());
        assert!(split_repo("a/b/c").is_err());
    }

    #[test]
    fn test_decode_wrapped_content() {
        let file = ApiFile {
            content: "RlJPTSBub2RlCkVY\nUE9TRSAzMDAwCg==\n".to_string(),
            encoding: "base64".to_string(),
        };
        assert_eq!(decode_content(&file).unwrap(), "FROM node\nEXPOSE 3000\n");
    }

    #[test]
    fn test_deployment_workflow_match() {
        let workflows = vec![
            ApiWorkflow { id: 1, path: ".github/workflows/ci.yml".into() },
            ApiWorkflow { id: 2, path: ".github/workflows/Web-AutoDeployTrigger-1234.yml".into() },
        ];
        assert_eq!(deployment_workflow(&workflows, "web").map(|w| w.id), Some(2));
        assert!(deployment_workflow(&workflows, "api").is_none());
    }

    #[tokio::test]
    async fn test_default_branch_and_read_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/contoso/web"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "default_branch": "trunk" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/contoso/web/contents/Dockerfile"))
            .and(query_param("ref", "trunk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": STANDARD.encode("FROM python\n"),
                "encoding": "base64"
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::with_base_url(server.uri());
        let branch = client.default_branch("contoso/web", "t").await.unwrap();
        assert_eq!(branch, "trunk");
        let content = client.read_file("contoso/web", "Dockerfile", &branch, "t").await.unwrap();
        assert_eq!(content, "FROM python\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/contoso/web/contents/app/Dockerfile"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
            .mount(&server)
            .await;

        let client = GitHubClient::with_base_url(server.uri());
        let err = client
            .read_file("contoso/web", "app/Dockerfile", "main", "t")
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::NotFound(m) if m == "Not Found"));
    }

    #[tokio::test]
    async fn test_list_directory_marks_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/contoso/web/contents/src"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "path": "src/Dockerfile", "type": "file" },
                { "path": "src/lib", "type": "dir" }
            ])))
            .mount(&server)
            .await;

        let client = GitHubClient::with_base_url(server.uri());
        let entries = client.list_directory("contoso/web", "./src/", "main", "t").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_file);
        assert!(!entries[1].is_file);
    }

    #[tokio::test]
    async fn test_dispatch_posts_to_generated_workflow() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/contoso/web/actions/workflows"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 1,
                "workflows": [{ "id": 77, "path": ".github/workflows/web-AutoDeployTrigger-abcd.yml" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/contoso/web/actions/workflows/77/dispatches"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitHubClient::with_base_url(server.uri());
        client.dispatch_workflow("contoso/web", "web", "main", "t").await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_without_workflow_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/contoso/web/actions/workflows"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "workflows": [] })))
            .mount(&server)
            .await;

        let client = GitHubClient::with_base_url(server.uri());
        let err = client.dispatch_workflow("contoso/web", "web", "main", "t").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
