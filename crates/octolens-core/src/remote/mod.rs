//! The remote resource service consumed by the engine, and its HTTP
//! implementation.

mod client;
mod model;

pub use client::{ClientSettings, OctopusClient};
pub use model::{
    CreateReleaseRequest, DeployReleaseRequest, DeploymentSummary, ReleaseTemplate,
    RunbookRunQuery, RunbookRunRequest, SelectedPackage, TaskDetails, TaskSummary,
    TemplatePackage,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{Collection, ResourceKind, ResourceRef, SpaceScope};

/// Read and mutation calls against the deployment server.
///
/// Mutations take fully resolved Ids, never names.
#[async_trait]
pub trait RemoteResourceService: Send + Sync {
    /// Fetch one resource by Id. `Ok(None)` when the server has no such resource.
    async fn get_by_id(
        &self,
        scope: &SpaceScope,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Option<ResourceRef>>;

    /// Fetch one page of a collection, optionally narrowed by a server-side name filter.
    async fn list_page(
        &self,
        scope: &SpaceScope,
        collection: &Collection,
        name_filter: Option<&str>,
        skip: usize,
        take: usize,
    ) -> Result<Vec<ResourceRef>>;

    /// Newest deployments of a project, newest first.
    async fn list_deployments(
        &self,
        scope: &SpaceScope,
        project_id: &str,
        take: usize,
    ) -> Result<Vec<DeploymentSummary>>;

    /// Runs of a runbook, newest first.
    async fn list_task_runs(
        &self,
        scope: &SpaceScope,
        query: &RunbookRunQuery,
    ) -> Result<Vec<TaskSummary>>;

    async fn get_task_details(&self, scope: &SpaceScope, task_id: &str) -> Result<TaskDetails>;

    /// Release/deployment progression of a project.
    async fn get_progression(&self, scope: &SpaceScope, project_id: &str) -> Result<Value>;

    async fn get_release_template(
        &self,
        scope: &SpaceScope,
        project: &ResourceRef,
        channel_id: &str,
        git_ref: Option<&str>,
    ) -> Result<ReleaseTemplate>;

    async fn get_git_branch(
        &self,
        scope: &SpaceScope,
        project_id: &str,
        branch: &str,
    ) -> Result<Value>;

    /// Newest version of a package in a feed, if any.
    async fn latest_package_version(
        &self,
        scope: &SpaceScope,
        feed_id: &str,
        package_id: &str,
    ) -> Result<Option<String>>;

    async fn create_release(
        &self,
        scope: &SpaceScope,
        request: &CreateReleaseRequest,
    ) -> Result<Value>;

    async fn deploy_release(
        &self,
        scope: &SpaceScope,
        request: &DeployReleaseRequest,
    ) -> Result<Value>;

    async fn run_runbook(&self, scope: &SpaceScope, request: &RunbookRunRequest) -> Result<Value>;
}
