//! Resource identity types shared by the resolver, cache and remote service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Kinds of named resources the engine can locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Space,
    Project,
    Environment,
    Tenant,
    Channel,
    Runbook,
    Release,
    Deployment,
    Task,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Space,
        ResourceKind::Project,
        ResourceKind::Environment,
        ResourceKind::Tenant,
        ResourceKind::Channel,
        ResourceKind::Runbook,
        ResourceKind::Release,
        ResourceKind::Deployment,
        ResourceKind::Task,
    ];

    /// Literal prefix every server-assigned Id of this kind starts with.
    pub fn id_prefix(self) -> &'static str {
        match self {
            ResourceKind::Space => "Spaces-",
            ResourceKind::Project => "Projects-",
            ResourceKind::Environment => "Environments-",
            ResourceKind::Tenant => "Tenants-",
            ResourceKind::Channel => "Channels-",
            ResourceKind::Runbook => "Runbooks-",
            ResourceKind::Release => "Releases-",
            ResourceKind::Deployment => "Deployments-",
            ResourceKind::Task => "ServerTasks-",
        }
    }

    /// True when `value` is already a canonical Id for this kind.
    pub fn is_canonical_id(self, value: &str) -> bool {
        value
            .strip_prefix(self.id_prefix())
            .is_some_and(|rest| !rest.is_empty())
    }

    /// REST collection segment, e.g. `Projects`.
    pub fn collection_segment(self) -> &'static str {
        match self {
            ResourceKind::Space => "Spaces",
            ResourceKind::Project => "Projects",
            ResourceKind::Environment => "Environments",
            ResourceKind::Tenant => "Tenants",
            ResourceKind::Channel => "Channels",
            ResourceKind::Runbook => "Runbooks",
            ResourceKind::Release => "Releases",
            ResourceKind::Deployment => "Deployments",
            ResourceKind::Task => "Tasks",
        }
    }

    /// JSON field holding the human-facing name.
    pub fn name_field(self) -> &'static str {
        match self {
            ResourceKind::Release => "Version",
            _ => "Name",
        }
    }

    /// Query parameter used for the server-side partial-name filter.
    pub fn name_filter_param(self) -> &'static str {
        match self {
            ResourceKind::Release => "searchByVersion",
            _ => "partialName",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::Space => "Space",
            ResourceKind::Project => "Project",
            ResourceKind::Environment => "Environment",
            ResourceKind::Tenant => "Tenant",
            ResourceKind::Channel => "Channel",
            ResourceKind::Runbook => "Runbook",
            ResourceKind::Release => "Release",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Task => "Task",
        };
        f.pad(label)
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        let singular = lowered.strip_suffix('s').unwrap_or(&lowered);
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.to_string().to_lowercase() == singular)
            .ok_or_else(|| Error::InvalidArgument(format!("Unknown resource kind: {s}")))
    }
}

/// A resolved resource: its kind, canonical Id, display name and the raw record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
    pub name: String,
    /// Full JSON record as returned by the server.
    #[serde(default)]
    pub attributes: Value,
}

impl ResourceRef {
    /// A resource with no extra attributes.
    pub fn new(kind: ResourceKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            attributes: Value::Null,
        }
    }

    /// Build a reference from a server record, keeping the record as attributes.
    pub fn from_json(kind: ResourceKind, record: Value) -> Result<Self> {
        let id = record
            .get("Id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::Decode(serde::de::Error::custom(format!(
                    "{kind} record is missing an Id"
                )))
            })?
            .to_string();
        let name = record
            .get(kind.name_field())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            kind,
            id,
            name,
            attributes: record,
        })
    }

    pub fn with_attributes(mut self, attributes: Value) -> Self {
        self.attributes = attributes;
        self
    }

    /// String attribute of the raw record.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Boolean attribute of the raw record. Missing counts as `false`.
    pub fn attribute_bool(&self, key: &str) -> bool {
        self.attributes
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// The (server, space) pair that bounds almost every lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpaceScope {
    pub server_url: String,
    pub space_id: String,
}

impl SpaceScope {
    pub fn new(server_url: impl Into<String>, space_id: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            space_id: space_id.into(),
        }
    }

    /// Scope used for space listing itself, which is not bound to a space.
    pub fn server(server_url: impl Into<String>) -> Self {
        Self::new(server_url, "")
    }
}

/// A listable collection: a kind, optionally owned by a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Collection {
    pub kind: ResourceKind,
    pub project_id: Option<String>,
}

impl Collection {
    /// A space-level collection.
    pub fn of(kind: ResourceKind) -> Self {
        Self {
            kind,
            project_id: None,
        }
    }

    /// A collection owned by a project, such as its runbooks or channels.
    pub fn in_project(kind: ResourceKind, project_id: impl Into<String>) -> Self {
        Self {
            kind,
            project_id: Some(project_id.into()),
        }
    }

    /// Path segments of the listing endpoint, relative to the server root.
    pub fn segments(&self, scope: &SpaceScope) -> Vec<String> {
        let segment = self.kind.collection_segment().to_string();
        if self.kind == ResourceKind::Space {
            return vec!["api".into(), segment];
        }
        match &self.project_id {
            Some(project_id) => vec![
                "api".into(),
                scope.space_id.clone(),
                "Projects".into(),
                project_id.clone(),
                segment,
            ],
            None => vec!["api".into(), scope.space_id.clone(), segment],
        }
    }

    /// Path segments of a single item. Items are addressed space-wide even when
    /// the collection is project-owned.
    pub fn item_segments(&self, scope: &SpaceScope, id: &str) -> Vec<String> {
        let mut segments = Collection::of(self.kind).segments(scope);
        segments.push(id.to_string());
        segments
    }
}
