//! The engine: cached resolution plus the workflows built on top of it.
//!
//! An [`Engine`] owns its [`ResolutionCache`]; dropping the engine drops every
//! cached resolution. Front ends build one engine per session and route every
//! lookup through it.

mod actions;
mod logs;

pub use actions::{CreateReleaseOptions, DeployOptions, RunbookRunOptions};
pub use logs::{DeploymentLogQuery, DeploymentLogs, ReleaseSelector, RunbookLogQuery, RunbookLogs};

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::cache::{CacheKey, ResolutionCache};
use crate::error::{Error, Result, ensure_not_empty};
use crate::paginate::{CollectionPages, DEFAULT_PAGE_SIZE, Paginator};
use crate::remote::RemoteResourceService;
use crate::resolve::FuzzyResolver;
use crate::transport::TAKE_ALL;
use crate::types::{Collection, ResourceKind, ResourceRef, SpaceScope};
use crate::workflow::{self, ProjectWorkflow, ReleaseWorkflowRun};

/// Newest deployment of a project to an environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentStatus {
    pub project: ResourceRef,
    pub environment: ResourceRef,
    /// The deployment entry from the project progression.
    pub deployment: Value,
}

/// Names that are known to exist in a space, for building example queries.
/// The three are not guaranteed to be configured to work together.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SampleTargets {
    pub project: Option<ResourceRef>,
    pub runbook: Option<ResourceRef>,
    pub environment: Option<ResourceRef>,
}

pub struct Engine {
    service: Arc<dyn RemoteResourceService>,
    resolver: FuzzyResolver,
    cache: ResolutionCache,
    page_size: usize,
}

impl Engine {
    /// Engine over `service` with an empty resolution cache.
    pub fn new(service: Arc<dyn RemoteResourceService>) -> Self {
        Self {
            resolver: FuzzyResolver::new(service.clone()),
            service,
            cache: ResolutionCache::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Page size for listings the engine walks lazily.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The remote service every query goes through.
    pub fn service(&self) -> &dyn RemoteResourceService {
        self.service.as_ref()
    }

    /// Resolutions remembered so far.
    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Cached fuzzy resolution of a name (or Id) in a collection.
    pub async fn resolve(
        &self,
        scope: &SpaceScope,
        collection: &Collection,
        name: &str,
    ) -> Result<ResourceRef> {
        let key = CacheKey::new(scope, collection, name);
        self.cache
            .get_or_resolve(key, move || self.resolver.resolve(scope, collection, name))
            .await
    }

    /// Resolve a space on a server and return the scope it defines.
    pub async fn resolve_space(
        &self,
        server_url: &str,
        name: &str,
    ) -> Result<(SpaceScope, ResourceRef)> {
        ensure_not_empty(server_url, "server_url")?;
        let server = SpaceScope::server(server_url);
        let space = self
            .resolve(&server, &Collection::of(ResourceKind::Space), name)
            .await?;
        Ok((SpaceScope::new(server_url, space.id.clone()), space))
    }

    /// Resolve several names, stopping at the first failure.
    pub async fn resolve_many<S: AsRef<str>>(
        &self,
        scope: &SpaceScope,
        collection: &Collection,
        names: &[S],
    ) -> Result<Vec<ResourceRef>> {
        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            resolved.push(self.resolve(scope, collection, name.as_ref()).await?);
        }
        Ok(resolved)
    }

    /// A project's release with exactly this version (or this Id).
    pub async fn resolve_release(
        &self,
        scope: &SpaceScope,
        project_id: &str,
        version: &str,
    ) -> Result<ResourceRef> {
        ensure_not_empty(project_id, "project_id")?;
        ensure_not_empty(version, "release version")?;
        let collection = Collection::in_project(ResourceKind::Release, project_id);
        let key = CacheKey::new(scope, &collection, version);
        let collection = &collection;

        self.cache
            .get_or_resolve(key, move || async move {
                if ResourceKind::Release.is_canonical_id(version) {
                    return self
                        .service
                        .get_by_id(scope, ResourceKind::Release, version)
                        .await?
                        .ok_or_else(|| Error::not_found(ResourceKind::Release, version));
                }
                let releases = self
                    .service
                    .list_page(scope, collection, Some(version), 0, TAKE_ALL)
                    .await?;
                releases
                    .into_iter()
                    .find(|release| release.name == version)
                    .ok_or_else(|| Error::not_found(ResourceKind::Release, version))
            })
            .await
    }

    /// Every space on the server.
    pub async fn list_spaces(&self, server_url: &str) -> Result<Vec<ResourceRef>> {
        let server = SpaceScope::server(server_url);
        let collection = Collection::of(ResourceKind::Space);
        let pages = CollectionPages::new(self.service.as_ref(), &server, &collection);
        Paginator::with_page_size(pages, self.page_size)
            .collect_all()
            .await
    }

    /// Latest deployment of a project to an environment, from the project's
    /// progression.
    pub async fn deployment_status(
        &self,
        scope: &SpaceScope,
        project_name: &str,
        environment_name: &str,
    ) -> Result<DeploymentStatus> {
        let project = self
            .resolve(scope, &Collection::of(ResourceKind::Project), project_name)
            .await?;
        let environment = self
            .resolve(scope, &Collection::of(ResourceKind::Environment), environment_name)
            .await?;

        let progression = self.service.get_progression(scope, &project.id).await?;
        let deployment = progression
            .get("Releases")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find_map(|release| {
                release
                    .get("Deployments")?
                    .get(&environment.id)?
                    .as_array()?
                    .first()
                    .cloned()
            })
            .ok_or_else(|| {
                Error::not_found(
                    ResourceKind::Deployment,
                    format!("{project_name} in {environment_name}"),
                )
            })?;

        Ok(DeploymentStatus {
            project,
            environment,
            deployment,
        })
    }

    /// The workflow named in a project's description, if it names one.
    pub async fn project_workflow(
        &self,
        scope: &SpaceScope,
        project_name: &str,
    ) -> Result<Option<ProjectWorkflow>> {
        let project = self
            .resolve(scope, &Collection::of(ResourceKind::Project), project_name)
            .await?;
        Ok(workflow::project_workflow(&project))
    }

    /// Workflow runs that produced a release.
    pub async fn release_workflows(
        &self,
        scope: &SpaceScope,
        release_id: &str,
    ) -> Result<Vec<ReleaseWorkflowRun>> {
        ensure_not_empty(release_id, "release_id")?;
        let release = self
            .service
            .get_by_id(scope, ResourceKind::Release, release_id)
            .await?
            .ok_or_else(|| Error::not_found(ResourceKind::Release, release_id))?;
        Ok(workflow::release_workflows(&release))
    }

    /// First runbook, project and environment of a space.
    ///
    /// Pulls one item from each listing. When a runbook exists its owning
    /// project is returned with it; otherwise a project is only returned
    /// together with an environment.
    pub async fn sample_targets(&self, scope: &SpaceScope) -> Result<SampleTargets> {
        let runbook = self.first_of(scope, ResourceKind::Runbook).await?;
        let project = self.first_of(scope, ResourceKind::Project).await?;
        let environment = self.first_of(scope, ResourceKind::Environment).await?;

        if let Some(runbook) = runbook {
            let owner = match runbook.attribute_str("ProjectId") {
                Some(project_id) => {
                    self.service
                        .get_by_id(scope, ResourceKind::Project, project_id)
                        .await?
                }
                None => None,
            };
            info!(runbook = %runbook.name, "sampled runbook");
            return Ok(SampleTargets {
                project: owner,
                runbook: Some(runbook),
                environment,
            });
        }

        if project.is_some() && environment.is_some() {
            return Ok(SampleTargets {
                project,
                runbook: None,
                environment,
            });
        }
        Ok(SampleTargets::default())
    }

    async fn first_of(&self, scope: &SpaceScope, kind: ResourceKind) -> Result<Option<ResourceRef>> {
        let collection = Collection::of(kind);
        let pages = CollectionPages::new(self.service.as_ref(), scope, &collection);
        Paginator::with_page_size(pages, self.page_size).next().await
    }

    async fn resolve_optional(
        &self,
        scope: &SpaceScope,
        kind: ResourceKind,
        name: Option<&str>,
    ) -> Result<Option<ResourceRef>> {
        match name.filter(|name| !name.trim().is_empty()) {
            Some(name) => self
                .resolve(scope, &Collection::of(kind), name)
                .await
                .map(Some),
            None => Ok(None),
        }
    }
}
