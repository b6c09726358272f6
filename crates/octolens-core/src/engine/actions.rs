//! Mutations driven by names: every name is resolved first, and only Ids are
//! sent to the server.

use serde_json::Value;
use tracing::info;

use super::Engine;
use crate::error::{Error, Result, ensure_not_empty};
use crate::paginate::{CollectionPages, Paginator};
use crate::remote::{CreateReleaseRequest, DeployReleaseRequest, RunbookRunRequest, SelectedPackage};
use crate::types::{Collection, ResourceKind, ResourceRef, SpaceScope};

#[derive(Debug, Clone, Default)]
pub struct RunbookRunOptions {
    pub project: String,
    pub runbook: String,
    pub environment: String,
    pub tenant: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateReleaseOptions {
    pub project: String,
    pub version: String,
    /// Defaults to the project's default channel.
    pub channel: Option<String>,
    /// Defaults to the default branch of a version-controlled project.
    pub git_ref: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub project: String,
    /// Release version or Id.
    pub release: String,
    pub environment: String,
    pub tenant: Option<String>,
}

impl Engine {
    /// Run the published snapshot of a runbook.
    pub async fn run_published_runbook(
        &self,
        scope: &SpaceScope,
        options: &RunbookRunOptions,
    ) -> Result<Value> {
        ensure_not_empty(&options.project, "project_name")?;
        ensure_not_empty(&options.runbook, "runbook_name")?;
        ensure_not_empty(&options.environment, "environment_name")?;

        let project = self.project(scope, &options.project).await?;
        let runbook = self
            .resolve(
                scope,
                &Collection::in_project(ResourceKind::Runbook, project.id.clone()),
                &options.runbook,
            )
            .await?;
        let environment = self
            .resolve(scope, &Collection::of(ResourceKind::Environment), &options.environment)
            .await?;
        let tenant = self
            .resolve_optional(scope, ResourceKind::Tenant, options.tenant.as_deref())
            .await?;

        let snapshot_id = runbook
            .attribute_str("PublishedRunbookSnapshotId")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::RunbookNotPublished(options.runbook.clone()))?;

        let request = RunbookRunRequest {
            runbook_id: runbook.id.clone(),
            snapshot_id: snapshot_id.to_string(),
            environment_id: environment.id,
            tenant_id: tenant.map(|tenant| tenant.id),
        };
        info!(
            project = %project.id,
            runbook = %request.runbook_id,
            snapshot = %request.snapshot_id,
            environment = %request.environment_id,
            tenant = ?request.tenant_id,
            "running published runbook"
        );
        self.service().run_runbook(scope, &request).await
    }

    /// Create a release, selecting the newest version of every package the
    /// deployment process uses.
    pub async fn create_release(
        &self,
        scope: &SpaceScope,
        options: &CreateReleaseOptions,
    ) -> Result<Value> {
        ensure_not_empty(&options.project, "project_name")?;
        ensure_not_empty(&options.version, "release_version")?;

        let project = self.project(scope, &options.project).await?;
        let channel = match options.channel.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(name) => {
                self.resolve(
                    scope,
                    &Collection::in_project(ResourceKind::Channel, project.id.clone()),
                    name,
                )
                .await?
            }
            None => self.default_channel(scope, &project).await?,
        };

        let version_controlled = project.attribute_bool("IsVersionControlled");
        let git_ref = match options.git_ref.clone().filter(|r| !r.trim().is_empty()) {
            Some(git_ref) => Some(git_ref),
            None if version_controlled => Some(self.default_branch(scope, &project).await?),
            None => None,
        };

        let template = self
            .service()
            .get_release_template(scope, &project, &channel.id, git_ref.as_deref())
            .await?;
        let mut selected_packages = Vec::with_capacity(template.packages.len());
        for package in template.packages {
            let version = self
                .service()
                .latest_package_version(scope, &package.feed_id, &package.package_id)
                .await?
                .ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "package {} has no versions in feed {}",
                        package.package_id, package.feed_id
                    ))
                })?;
            selected_packages.push(SelectedPackage {
                action_name: package.action_name,
                package_reference_name: package.package_reference_name,
                version,
            });
        }

        let request = CreateReleaseRequest {
            project_id: project.id.clone(),
            channel_id: channel.id.clone(),
            version: options.version.clone(),
            git_ref: if version_controlled { git_ref } else { None },
            selected_packages,
        };
        info!(
            project = %request.project_id,
            channel = %request.channel_id,
            version = %request.version,
            git_ref = ?request.git_ref,
            packages = request.selected_packages.len(),
            "creating release"
        );
        self.service().create_release(scope, &request).await
    }

    /// Deploy an existing release to an environment.
    pub async fn deploy_release(&self, scope: &SpaceScope, options: &DeployOptions) -> Result<Value> {
        ensure_not_empty(&options.project, "project_name")?;
        ensure_not_empty(&options.release, "release")?;
        ensure_not_empty(&options.environment, "environment_name")?;

        let project = self.project(scope, &options.project).await?;
        let release = self
            .resolve_release(scope, &project.id, &options.release)
            .await?;
        let environment = self
            .resolve(scope, &Collection::of(ResourceKind::Environment), &options.environment)
            .await?;
        let tenant = self
            .resolve_optional(scope, ResourceKind::Tenant, options.tenant.as_deref())
            .await?;

        let request = DeployReleaseRequest {
            project_id: project.id,
            release_id: release.id,
            environment_id: environment.id,
            tenant_id: tenant.map(|tenant| tenant.id),
        };
        info!(
            project = %request.project_id,
            release = %request.release_id,
            environment = %request.environment_id,
            tenant = ?request.tenant_id,
            "deploying release"
        );
        self.service().deploy_release(scope, &request).await
    }

    async fn project(&self, scope: &SpaceScope, name: &str) -> Result<ResourceRef> {
        self.resolve(scope, &Collection::of(ResourceKind::Project), name)
            .await
    }

    async fn default_channel(&self, scope: &SpaceScope, project: &ResourceRef) -> Result<ResourceRef> {
        let collection = Collection::in_project(ResourceKind::Channel, project.id.clone());
        let pages = CollectionPages::new(self.service(), scope, &collection);
        Paginator::with_page_size(pages, self.page_size)
            .collect_all()
            .await?
            .into_iter()
            .find(|channel| channel.attribute_bool("IsDefault"))
            .ok_or_else(|| {
                Error::not_found(ResourceKind::Channel, format!("default channel of {}", project.name))
            })
    }

    /// Canonical name of a version-controlled project's default branch.
    async fn default_branch(&self, scope: &SpaceScope, project: &ResourceRef) -> Result<String> {
        let branch_name = project
            .attributes
            .pointer("/PersistenceSettings/DefaultBranch")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("project {} has no default branch", project.name))
            })?;
        let branch = self
            .service()
            .get_git_branch(scope, &project.id, branch_name)
            .await?;
        branch
            .get("CanonicalName")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("branch {branch_name} has no canonical name"))
            })
    }
}
