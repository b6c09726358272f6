//! Wire models exchanged with the remote service.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::logs::LogNode;

/// A deployment as listed by `api/{space}/Deployments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentSummary {
    pub id: String,
    pub release_id: String,
    pub environment_id: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub task_id: String,
}

/// A task as listed by the task list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Filters for locating runs of a runbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunbookRunQuery {
    pub project_id: String,
    pub runbook_id: String,
    pub environment_id: Option<String>,
    pub tenant_id: Option<String>,
}

/// A task together with its activity-log forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetails {
    #[serde(rename = "Task", default)]
    pub task: Value,
    #[serde(rename = "ActivityLogs", default)]
    pub activity_logs: Vec<LogNode>,
}

/// Package slots a release needs versions for.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseTemplate {
    #[serde(default)]
    pub packages: Vec<TemplatePackage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplatePackage {
    pub action_name: String,
    #[serde(default)]
    pub package_reference_name: Option<String>,
    pub feed_id: String,
    pub package_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedPackage {
    pub action_name: String,
    pub package_reference_name: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReleaseRequest {
    pub project_id: String,
    pub channel_id: String,
    pub version: String,
    /// Only set for version-controlled projects.
    pub git_ref: Option<String>,
    pub selected_packages: Vec<SelectedPackage>,
}

impl CreateReleaseRequest {
    pub fn to_json(&self) -> Value {
        let mut version_control = serde_json::Map::new();
        if let Some(git_ref) = &self.git_ref {
            version_control.insert("GitRef".into(), Value::String(git_ref.clone()));
        }
        let packages: Vec<Value> = self
            .selected_packages
            .iter()
            .map(|p| {
                json!({
                    "ActionName": p.action_name,
                    "PackageReferenceName": p.package_reference_name,
                    "Version": p.version,
                })
            })
            .collect();

        json!({
            "ChannelId": self.channel_id,
            "ProjectId": self.project_id,
            "Version": self.version,
            "VersionControlReference": version_control,
            "SelectedPackages": packages,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReleaseRequest {
    pub project_id: String,
    pub release_id: String,
    pub environment_id: String,
    pub tenant_id: Option<String>,
}

impl DeployReleaseRequest {
    pub fn to_json(&self) -> Value {
        json!({
            "EnvironmentId": self.environment_id,
            "ProjectId": self.project_id,
            "ReleaseId": self.release_id,
            "TenantId": self.tenant_id,
            "Priority": "LifecycleDefault",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunbookRunRequest {
    pub runbook_id: String,
    pub snapshot_id: String,
    pub environment_id: String,
    pub tenant_id: Option<String>,
}

impl RunbookRunRequest {
    pub fn to_json(&self) -> Value {
        json!({
            "RunbookId": self.runbook_id,
            "RunbookSnapshotId": self.snapshot_id,
            "EnvironmentId": self.environment_id,
            "TenantId": self.tenant_id,
            "SkipActions": Value::Null,
            "SpecificMachineIds": Value::Null,
            "ExcludedMachineIds": Value::Null,
        })
    }
}
