use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::Engine;
use crate::error::{Result, ensure_not_empty};
use crate::logs::LogNode;
use crate::remote::{DeploymentSummary, RunbookRunQuery};
use crate::types::{Collection, ResourceKind, SpaceScope};

/// How many recent deployments and releases are searched.
const RECENT_LIMIT: usize = 100;

/// Which release's deployment to read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReleaseSelector {
    #[default]
    Latest,
    Version(String),
}

impl ReleaseSelector {
    /// Empty input and `latest` (any case) select the most recent deployment.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => ReleaseSelector::Latest,
            Some(value) if value.eq_ignore_ascii_case("latest") => ReleaseSelector::Latest,
            Some(value) => ReleaseSelector::Version(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeploymentLogQuery {
    pub project: String,
    pub environment: Option<String>,
    pub tenant: Option<String>,
    pub release: ReleaseSelector,
}

#[derive(Debug, Clone, Default)]
pub struct RunbookLogQuery {
    pub project: String,
    pub runbook: String,
    pub environment: Option<String>,
    pub tenant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentLogs {
    pub task: Value,
    pub activity_logs: Vec<LogNode>,
    /// Version of the deployed release, when it could be read.
    pub release_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunbookLogs {
    pub task_id: String,
    pub task: Value,
    pub activity_logs: Vec<LogNode>,
}

impl Engine {
    /// Activity logs of a project's deployment.
    ///
    /// `Ok(None)` when no deployment matches the query, or when a specific
    /// release version is asked for and no recent release has it.
    pub async fn deployment_logs(
        &self,
        scope: &SpaceScope,
        query: &DeploymentLogQuery,
    ) -> Result<Option<DeploymentLogs>> {
        ensure_not_empty(&query.project, "project_name")?;
        let project = self
            .resolve(scope, &Collection::of(ResourceKind::Project), &query.project)
            .await?;
        let environment = self
            .resolve_optional(scope, ResourceKind::Environment, query.environment.as_deref())
            .await?;
        let tenant = self
            .resolve_optional(scope, ResourceKind::Tenant, query.tenant.as_deref())
            .await?;

        let deployments: Vec<DeploymentSummary> = self
            .service()
            .list_deployments(scope, &project.id, RECENT_LIMIT)
            .await?
            .into_iter()
            .filter(|d| environment.as_ref().is_none_or(|env| d.environment_id == env.id))
            .filter(|d| {
                tenant
                    .as_ref()
                    .is_none_or(|tenant| d.tenant_id.as_deref() == Some(tenant.id.as_str()))
            })
            .collect();
        debug!(project = %project.name, candidates = deployments.len(), "filtered deployments");

        let (task_id, release_version) = match &query.release {
            ReleaseSelector::Latest => {
                let Some(newest) = deployments.first() else {
                    return Ok(None);
                };
                let release = self
                    .service()
                    .get_by_id(scope, ResourceKind::Release, &newest.release_id)
                    .await?;
                (newest.task_id.clone(), release.map(|r| r.name))
            }
            ReleaseSelector::Version(version) => {
                let releases = self
                    .service()
                    .list_page(
                        scope,
                        &Collection::in_project(ResourceKind::Release, project.id.clone()),
                        None,
                        0,
                        RECENT_LIMIT,
                    )
                    .await?;
                let Some(release) = releases.into_iter().find(|r| r.name == version.trim()) else {
                    info!(project = %project.name, %version, "release not among recent releases");
                    return Ok(None);
                };
                let Some(deployment) = deployments.iter().find(|d| d.release_id == release.id)
                else {
                    return Ok(None);
                };
                (deployment.task_id.clone(), Some(release.name))
            }
        };

        let details = self.service().get_task_details(scope, &task_id).await?;
        Ok(Some(DeploymentLogs {
            task: details.task,
            activity_logs: details.activity_logs,
            release_version,
        }))
    }

    /// Activity logs of a runbook's newest run, `Ok(None)` when it never ran.
    pub async fn runbook_logs(
        &self,
        scope: &SpaceScope,
        query: &RunbookLogQuery,
    ) -> Result<Option<RunbookLogs>> {
        ensure_not_empty(&query.project, "project_name")?;
        ensure_not_empty(&query.runbook, "runbook_name")?;
        let project = self
            .resolve(scope, &Collection::of(ResourceKind::Project), &query.project)
            .await?;
        let runbook = self
            .resolve(
                scope,
                &Collection::in_project(ResourceKind::Runbook, project.id.clone()),
                &query.runbook,
            )
            .await?;
        let environment = self
            .resolve_optional(scope, ResourceKind::Environment, query.environment.as_deref())
            .await?;
        let tenant = self
            .resolve_optional(scope, ResourceKind::Tenant, query.tenant.as_deref())
            .await?;

        let runs = self
            .service()
            .list_task_runs(
                scope,
                &RunbookRunQuery {
                    project_id: project.id,
                    runbook_id: runbook.id,
                    environment_id: environment.map(|env| env.id),
                    tenant_id: tenant.map(|tenant| tenant.id),
                },
            )
            .await?;
        let Some(newest) = runs.into_iter().next() else {
            return Ok(None);
        };

        let details = self.service().get_task_details(scope, &newest.id).await?;
        Ok(Some(RunbookLogs {
            task_id: newest.id,
            task: details.task,
            activity_logs: details.activity_logs,
        }))
    }
}
