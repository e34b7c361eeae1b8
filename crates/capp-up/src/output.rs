//! Summary printed after a successful `up`

use crate::executor::UpOutcome;
use capp_cloud::ContainerAppInfo;

/// Browsable URL of the app, when it has ingress
pub fn app_url(app: &ContainerAppInfo) -> Option<String> {
    let fqdn = app.fqdn().filter(|f| !f.is_empty())?;
    if fqdn.starts_with("http") {
        Some(fqdn.to_string())
    } else {
        Some(format!("https://{}", fqdn))
    }
}

pub fn summary_lines(outcome: &UpOutcome) -> Vec<String> {
    let name = &outcome.app.name;
    let group = &outcome.resource_group;
    let mut lines = vec![format!("Your container app {} has been created and deployed! Congrats!", name)];
    if let Some(url) = app_url(&outcome.app) {
        lines.push(format!("Browse to your container app at: {}", url));
    }
    lines.push(format!(
        "Stream logs for your container with: az containerapp logs show -n {} -g {}",
        name, group
    ));
    lines.push(format!("See full output using: az containerapp show -n {} -g {}", name, group));
    lines
}
