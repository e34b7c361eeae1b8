//! Naming rules and default-name synthesis

use crate::error::{Result, UpError};
use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use url::Url;

pub const MAX_APP_NAME_LENGTH: usize = 32;
/// Longest ACR name usable as a pipeline secret name
pub const MAX_SECRET_LENGTH: usize = 20;
pub const ACR_SUFFIX: &str = ".azurecr.io";
pub const CONTAINER_APP_EXTENSION_TYPE: &str = "microsoft.app.environment";
pub const DEFAULT_EXTENSION_NAME: &str = "containerapp-ext";
pub const DEFAULT_EXTENSION_NAMESPACE: &str = "containerapp-ns";
pub const QUICKSTART_IMAGE: &str = "mcr.microsoft.com/k8se/quickstart:latest";
pub const DEFAULT_LOCATION: &str = "eastus";
pub const STAGING_LOCATION: &str = "northcentralusstage";

/// Check a container app name.
///
/// Lowercase alphanumerics and `-`, starting with a letter, ending with an
/// alphanumeric, no `--`, at most 32 characters.
pub fn validate_app_name(name: &str) -> Result<()> {
    let stripped: String = name.chars().filter(|c| *c != '-').collect();
    let valid = !name.is_empty()
        && name.len() <= MAX_APP_NAME_LENGTH
        && !name.contains("--")
        && stripped
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && name.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());

    if valid {
        Ok(())
    } else {
        Err(UpError::InvalidArgumentValue(format!(
            "Invalid Container App name {}. A name must consist of lower case alphanumeric characters or '-', \
             start with a letter, end with an alphanumeric character, cannot have '--', \
             and must be at most {} characters.",
            name, MAX_APP_NAME_LENGTH
        )))
    }
}

/// `{prefix}_{initial}_{suffix:04}`, or the given name untouched
pub fn randomized_name(prefix: &str, name: Option<&str>, initial: &str, suffix: u16) -> String {
    match name {
        Some(name) => name.to_string(),
        None => format!("{}_{}_{:04}", prefix, initial, suffix),
    }
}

/// Same as [`randomized_name`] with `-` separators, for resources that reject `_`
pub fn randomized_name_with_dash(
    prefix: &str,
    name: Option<&str>,
    initial: &str,
    suffix: u16,
) -> String {
    match name {
        Some(name) => name.to_string(),
        None => format!("{}-{}-{:04}", prefix, initial, suffix),
    }
}

pub fn default_environment_name(app_name: &str) -> String {
    format!("{}-env", app_name).replace('_', "-")
}

/// Deterministic registry name for one environment.
///
/// Same subscription, environment group and environment name always give the
/// same name, so repeated runs find the registry created the first time.
pub fn default_registry_name(subscription: &str, env_resource_group: &str, env_name: &str) -> String {
    let digest = Sha256::digest(format!("{}/{}/{}", subscription, env_resource_group, env_name));
    let hex = hex::encode(digest);
    format!("ca{}acr", &hex[..10])
}

/// Lowercase with spaces and parentheses removed (`"East US"` -> `"eastus"`)
pub fn format_location(location: &str) -> String {
    location
        .to_ascii_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '(' | ')'))
        .collect()
}

/// Remap the staging region that cannot host new resources
pub fn remap_staging(location: String) -> String {
    if location.eq_ignore_ascii_case(STAGING_LOCATION) {
        DEFAULT_LOCATION.to_string()
    } else {
        location
    }
}

pub fn is_acr_server(server: &str) -> bool {
    server.to_ascii_lowercase().contains("azurecr.io")
}

/// Registry name from a server or image reference (`myacr.azurecr.io/web:1` -> `myacr`)
pub fn registry_name_from_server(server: &str) -> String {
    let host = match server.split_once("://") {
        Some((_, rest)) => rest.split('/').next().unwrap_or(rest),
        None => server.split('/').next().unwrap_or(server),
    };
    host.split('.').next().unwrap_or(host).to_string()
}

/// Last path segment of an image with `:` removed, used as the build repository name
pub fn reformat_image(image: &str) -> String {
    image.rsplit('/').next().unwrap_or(image).replace(':', "")
}

/// Image tag for registry builds: the local timestamp with separators removed
pub fn build_tag(now: DateTime<Local>) -> String {
    now.format("%Y%m%d%H%M%S%6f").to_string()
}

/// `owner/repo` from a repository URL
pub fn repo_name(repo_url: &str) -> Result<String> {
    let segments: Vec<String> = match Url::parse(repo_url) {
        Ok(url) => url
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default(),
        Err(_) => repo_url
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    };

    match segments.as_slice() {
        [.., owner, repo] => Ok(format!("{}/{}", owner, repo.trim_end_matches(".git"))),
        _ => Err(UpError::InvalidArgumentValue(format!(
            "Invalid repository URL {}. Expected https://github.com/<owner>/<repo>",
            repo_url
        ))),
    }
}

/// Account user reduced to a name prefix (`live.com#jane@contoso.com` -> `jane`)
pub fn profile_user_name(account_user: &str) -> String {
    let user = account_user.split('@').next().unwrap_or(account_user);
    match user.split_once('#') {
        Some((_, rest)) => rest.to_string(),
        None => user.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_validate_app_name() {
        assert!(validate_app_name("my-app1").is_ok());
        assert!(validate_app_name("My-App").is_err());
        assert!(validate_app_name("a--b").is_err());
        assert!(validate_app_name("1abc").is_err());
        assert!(validate_app_name("app-").is_err());
        assert!(validate_app_name("my_app").is_err());
        assert!(validate_app_name(&"a".repeat(32)).is_ok());
        assert!(validate_app_name(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_randomized_names() {
        assert_eq!(randomized_name("jane", None, "rg", 42), "jane_rg_0042");
        assert_eq!(randomized_name("jane", Some("mine"), "rg", 42), "mine");
        assert_eq!(
            randomized_name_with_dash("jane", None, "env-location", 7),
            "jane-env-location-0007"
        );
        assert_eq!(default_environment_name("my_app"), "my-app-env");
    }

    #[test]
    fn test_default_registry_name_is_deterministic() {
        let a = default_registry_name("sub", "rg", "env");
        let b = default_registry_name("sub", "rg", "env");
        assert_eq!(a, b);
        assert!(a.starts_with("ca") && a.ends_with("acr"));
        assert_eq!(a.len(), 15);
        assert_ne!(a, default_registry_name("sub", "rg", "env2"));
    }

    #[test]
    fn test_locations() {
        assert_eq!(format_location("North Central US (Stage)"), "northcentralusstage");
        assert_eq!(remap_staging("northcentralusstage".into()), "eastus");
        assert_eq!(remap_staging("westeurope".into()), "westeurope");
    }

    #[test]
    fn test_registry_name_and_image_helpers() {
        assert_eq!(registry_name_from_server("myacr.azurecr.io/web:1"), "myacr");
        assert_eq!(registry_name_from_server("https://myacr.azurecr.io"), "myacr");
        assert_eq!(reformat_image("myacr.azurecr.io/team/web:v1"), "webv1");
        assert!(is_acr_server("MyAcr.AzureCR.io"));
        assert!(!is_acr_server("docker.io"));
    }

    #[test]
    fn test_build_tag() {
        let now = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(build_tag(now), "20240102030405000000");
    }

    #[test]
    fn test_repo_name() {
        assert_eq!(repo_name("https://github.com/owner/app").unwrap(), "owner/app");
        assert_eq!(repo_name("https://github.com/owner/app.git/").unwrap(), "owner/app");
        assert!(repo_name("https://github.com/").is_err());
    }

    #[test]
    fn test_profile_user_name() {
        assert_eq!(profile_user_name("jane@contoso.com"), "jane");
        assert_eq!(profile_user_name("live.com#jane@contoso.com"), "jane");
        assert_eq!(profile_user_name("ci-bot"), "ci-bot");
    }
}
