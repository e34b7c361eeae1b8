//! ARM resource id parsing and formatting
//!
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}`
//! optionally followed by child segments such as
//! `/providers/Microsoft.KubernetesConfiguration/extensions/{name}`.

use crate::error::{CloudError, Result};
use std::fmt;

/// A child segment of a resource id (`{type}/{name}`, optionally under another provider)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildResource {
    pub namespace: Option<String>,
    pub resource_type: String,
    pub name: String,
}

/// A parsed ARM resource id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription: String,
    pub resource_group: String,
    pub namespace: String,
    pub resource_type: String,
    pub name: String,
    pub children: Vec<ChildResource>,
}

impl ResourceId {
    pub fn new(
        subscription: impl Into<String>,
        resource_group: impl Into<String>,
        namespace: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription: subscription.into(),
            resource_group: resource_group.into(),
            namespace: namespace.into(),
            resource_type: resource_type.into(),
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Parse a full resource id. Segment keywords match case-insensitively.
    pub fn parse(id: &str) -> Result<Self> {
        let invalid = || CloudError::InvalidResourceId(id.to_string());

        let trimmed = id.trim().trim_end_matches('/');
        let rest = trimmed.strip_prefix('/').ok_or_else(invalid)?;
        let segments: Vec<&str> = rest.split('/').collect();

        if segments.len() < 8 || segments.iter().any(|s| s.is_empty()) {
            return Err(invalid());
        }
        if !segments[0].eq_ignore_ascii_case("subscriptions")
            || !segments[2].eq_ignore_ascii_case("resourceGroups")
            || !segments[4].eq_ignore_ascii_case("providers")
        {
            return Err(invalid());
        }

        let mut parsed = ResourceId::new(
            segments[1],
            segments[3],
            segments[5],
            segments[6],
            segments[7],
        );

        let mut i = 8;
        while i < segments.len() {
            let namespace = if segments[i].eq_ignore_ascii_case("providers") {
                let ns = segments.get(i + 1).ok_or_else(invalid)?;
                i += 2;
                Some(ns.to_string())
            } else {
                None
            };
            let resource_type = segments.get(i).ok_or_else(invalid)?;
            let name = segments.get(i + 1).ok_or_else(invalid)?;
            parsed.children.push(ChildResource {
                namespace,
                resource_type: resource_type.to_string(),
                name: name.to_string(),
            });
            i += 2;
        }

        Ok(parsed)
    }

    /// Append a child resource under another provider namespace
    pub fn with_child(
        mut self,
        namespace: Option<&str>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.children.push(ChildResource {
            namespace: namespace.map(str::to_string),
            resource_type: resource_type.into(),
            name: name.into(),
        });
        self
    }

    /// Name of the deepest segment (the child's name for nested ids)
    pub fn leaf_name(&self) -> &str {
        self.children
            .last()
            .map(|c| c.name.as_str())
            .unwrap_or(&self.name)
    }

    /// Case-insensitive type comparison against the top-level resource type
    pub fn is_type(&self, resource_type: &str) -> bool {
        self.resource_type.eq_ignore_ascii_case(resource_type)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription, self.resource_group, self.namespace, self.resource_type, self.name
        )?;
        for child in &self.children {
            if let Some(ns) = &child.namespace {
                write!(f, "/providers/{}", ns)?;
            }
            write!(f, "/{}/{}", child.resource_type, child.name)?;
        }
        Ok(())
    }
}

/// Whether the string is a well-formed resource id rather than a bare name
pub fn is_valid_resource_id(value: &str) -> bool {
    ResourceId::parse(value).is_ok()
}

/// Format a top-level resource id
pub fn resource_id(
    subscription: &str,
    resource_group: &str,
    namespace: &str,
    resource_type: &str,
    name: &str,
) -> String {
    ResourceId::new(subscription, resource_group, namespace, resource_type, name).to_string()
}

/// `/subscriptions/{sub}/resourceGroups/{rg}` scope string
pub fn resource_group_scope(subscription: &str, resource_group: &str) -> String {
    format!("/subscriptions/{}/resourceGroups/{}", subscription, resource_group)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_ID: &str = "/subscriptions/sub-1/resourceGroups/rg-a/providers/Microsoft.App/managedEnvironments/env-a";

    #[test]
    fn test_parse_top_level() {
        let id = ResourceId::parse(ENV_ID).unwrap();
        assert_eq!(id.subscription, "sub-1");
        assert_eq!(id.resource_group, "rg-a");
        assert_eq!(id.namespace, "Microsoft.App");
        assert!(id.is_type("managedenvironments"));
        assert_eq!(id.name, "env-a");
        assert!(id.children.is_empty());
        assert_eq!(id.to_string(), ENV_ID);
    }

    #[test]
    fn test_parse_nested_provider_child() {
        let raw = "/subscriptions/s/resourcegroups/rg/providers/Microsoft.Kubernetes/connectedClusters/c1/providers/Microsoft.KubernetesConfiguration/extensions/ext";
        let id = ResourceId::parse(raw).unwrap();
        assert_eq!(id.name, "c1");
        assert_eq!(id.leaf_name(), "ext");
        assert_eq!(
            id.children[0].namespace.as_deref(),
            Some("Microsoft.KubernetesConfiguration")
        );
    }

    #[test]
    fn test_bare_names_are_not_ids() {
        assert!(!is_valid_resource_id("env-a"));
        assert!(!is_valid_resource_id("/subscriptions/s/resourceGroups/rg"));
        assert!(!is_valid_resource_id(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.App/containerApps"
        ));
        assert!(is_valid_resource_id(ENV_ID));
    }

    #[test]
    fn test_child_with_missing_name_is_invalid() {
        let raw = format!("{}/sourcecontrols", ENV_ID);
        assert!(ResourceId::parse(&raw).is_err());
    }

    #[test]
    fn test_resource_id_builder() {
        assert_eq!(
            resource_id("sub-1", "rg-a", "Microsoft.App", "managedEnvironments", "env-a"),
            ENV_ID
        );
        let ext = ResourceId::new("s", "rg", "Microsoft.Kubernetes", "connectedClusters", "c1")
            .with_child(Some("Microsoft.KubernetesConfiguration"), "extensions", "ext");
        assert!(ext.to_string().ends_with("/providers/Microsoft.KubernetesConfiguration/extensions/ext"));
    }
}
