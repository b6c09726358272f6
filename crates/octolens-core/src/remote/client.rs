//! HTTP implementation of [`RemoteResourceService`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::model::{
    CreateReleaseRequest, DeployReleaseRequest, DeploymentSummary, ReleaseTemplate,
    RunbookRunQuery, RunbookRunRequest, TaskDetails, TaskSummary,
};
use super::RemoteResourceService;
use crate::error::{Error, Result};
use crate::transport::{
    CallPolicy, HttpRequest, HttpResponse, HttpTransport, RetryPolicy, Transport, build_url,
};
use crate::types::{Collection, ResourceKind, ResourceRef, SpaceScope};

const API_KEY_HEADER: &str = "X-Octopus-ApiKey";

/// Everything needed to talk to one server.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: String,
    pub user_agent: String,
    pub retry: RetryPolicy,
    pub max_concurrent_requests: usize,
    pub timeout: Duration,
}

impl ClientSettings {
    /// Default settings with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            user_agent: "OctopusAI".to_string(),
            retry: RetryPolicy::default(),
            max_concurrent_requests: 10,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Talks to the REST API through a [`Transport`], wrapping every call in the
/// shared [`CallPolicy`].
#[derive(Clone)]
pub struct OctopusClient {
    transport: Arc<dyn Transport>,
    policy: CallPolicy,
    api_key: String,
    user_agent: String,
}

impl std::fmt::Debug for OctopusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctopusClient")
            .field("policy", &self.policy)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl OctopusClient {
    /// Build a client over the reqwest transport.
    pub fn connect(settings: &ClientSettings) -> Result<Self> {
        let transport = HttpTransport::new(settings.timeout)?;
        Ok(Self::with_transport(Arc::new(transport), settings))
    }

    /// Client sending every exchange through `transport`.
    pub fn with_transport(transport: Arc<dyn Transport>, settings: &ClientSettings) -> Self {
        Self {
            transport,
            policy: CallPolicy::new(settings.retry, settings.max_concurrent_requests),
            api_key: settings.api_key.clone(),
            user_agent: settings.user_agent.clone(),
        }
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        request
            .with_header(API_KEY_HEADER, self.api_key.as_str())
            .with_header("User-Agent", self.user_agent.as_str())
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request = self.authorize(request);
        self.policy.execute(self.transport.as_ref(), &request).await
    }

    async fn get_json<S: AsRef<str>>(
        &self,
        scope: &SpaceScope,
        segments: &[S],
        query: &[(&str, String)],
    ) -> Result<Value> {
        let url = build_url(&scope.server_url, segments, query)?;
        self.send(HttpRequest::get(url)).await?.json()
    }

    async fn get_typed<T: DeserializeOwned, S: AsRef<str>>(
        &self,
        scope: &SpaceScope,
        segments: &[S],
        query: &[(&str, String)],
    ) -> Result<T> {
        let value = self.get_json(scope, segments, query).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn post_json(&self, scope: &SpaceScope, segments: &[&str], body: Value) -> Result<Value> {
        let url = build_url(&scope.server_url, segments, &[])?;
        self.send(HttpRequest::post(url, body)).await?.json()
    }
}

/// Pull the `Items` array out of a listing envelope. A body without one is a
/// decode error, never an empty listing.
fn items(envelope: Value) -> Result<Vec<Value>> {
    match envelope {
        Value::Object(mut map) => match map.remove("Items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(missing_items()),
        },
        _ => Err(missing_items()),
    }
}

fn missing_items() -> Error {
    Error::Decode(serde::de::Error::custom(
        "response is missing the Items array",
    ))
}

fn typed_items<T: DeserializeOwned>(envelope: Value) -> Result<Vec<T>> {
    items(envelope)?
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(Error::from))
        .collect()
}

#[async_trait]
impl RemoteResourceService for OctopusClient {
    async fn get_by_id(
        &self,
        scope: &SpaceScope,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Option<ResourceRef>> {
        let segments = Collection::of(kind).item_segments(scope, id);
        let url = build_url(&scope.server_url, &segments, &[])?;
        let request = self.authorize(HttpRequest::get(url));
        let response = self
            .policy
            .execute_allowing(self.transport.as_ref(), &request, &[404])
            .await?;
        if response.status == 404 {
            debug!(%kind, id, "resource not found by id");
            return Ok(None);
        }
        ResourceRef::from_json(kind, response.json()?).map(Some)
    }

    async fn list_page(
        &self,
        scope: &SpaceScope,
        collection: &Collection,
        name_filter: Option<&str>,
        skip: usize,
        take: usize,
    ) -> Result<Vec<ResourceRef>> {
        let mut query = Vec::new();
        if let Some(name) = name_filter {
            query.push((collection.kind.name_filter_param(), name.to_string()));
        }
        query.push(("skip", skip.to_string()));
        query.push(("take", take.to_string()));

        let envelope = self
            .get_json(scope, &collection.segments(scope), &query)
            .await?;
        items(envelope)?
            .into_iter()
            .map(|item| ResourceRef::from_json(collection.kind, item))
            .collect()
    }

    async fn list_deployments(
        &self,
        scope: &SpaceScope,
        project_id: &str,
        take: usize,
    ) -> Result<Vec<DeploymentSummary>> {
        let envelope = self
            .get_json(
                scope,
                &["api", scope.space_id.as_str(), "Deployments"],
                &[
                    ("take", take.to_string()),
                    ("skip", "0".to_string()),
                    ("projects", project_id.to_string()),
                ],
            )
            .await?;
        typed_items(envelope)
    }

    async fn list_task_runs(
        &self,
        scope: &SpaceScope,
        query: &RunbookRunQuery,
    ) -> Result<Vec<TaskSummary>> {
        let mut params = vec![
            ("skip", "0".to_string()),
            ("project", query.project_id.clone()),
            ("runbook", query.runbook_id.clone()),
            ("spaces", scope.space_id.clone()),
            ("includeSystem", "false".to_string()),
        ];
        if let Some(environment_id) = &query.environment_id {
            params.push(("environment", environment_id.clone()));
        }
        if let Some(tenant_id) = &query.tenant_id {
            params.push(("tenant", tenant_id.clone()));
        }

        let envelope = self.get_json(scope, &["bff", "tasks", "list"], &params).await?;
        typed_items(envelope)
    }

    async fn get_task_details(&self, scope: &SpaceScope, task_id: &str) -> Result<TaskDetails> {
        self.get_typed(scope, &["api", scope.space_id.as_str(), "Tasks", task_id, "details"], &[])
            .await
    }

    async fn get_progression(&self, scope: &SpaceScope, project_id: &str) -> Result<Value> {
        self.get_json(
            scope,
            &["api", scope.space_id.as_str(), "Projects", project_id, "Progression"],
            &[],
        )
        .await
    }

    async fn get_release_template(
        &self,
        scope: &SpaceScope,
        project: &ResourceRef,
        channel_id: &str,
        git_ref: Option<&str>,
    ) -> Result<ReleaseTemplate> {
        let query = [("channel", channel_id.to_string())];
        if project.attribute_bool("IsVersionControlled") {
            let git_ref = git_ref.ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "a git ref is required for version controlled project {}",
                    project.name
                ))
            })?;
            return self
                .get_typed(
                    scope,
                    &[
                        "api",
                        scope.space_id.as_str(),
                        "projects",
                        project.id.as_str(),
                        git_ref,
                        "deploymentprocesses",
                        "template",
                    ],
                    &query,
                )
                .await;
        }

        let process = format!("deploymentprocess-{}", project.id);
        self.get_typed(
            scope,
            &["api", scope.space_id.as_str(), "deploymentprocesses", process.as_str(), "template"],
            &query,
        )
        .await
    }

    async fn get_git_branch(
        &self,
        scope: &SpaceScope,
        project_id: &str,
        branch: &str,
    ) -> Result<Value> {
        self.get_json(
            scope,
            &["api", scope.space_id.as_str(), "projects", project_id, "git", "branches", branch],
            &[],
        )
        .await
    }

    async fn latest_package_version(
        &self,
        scope: &SpaceScope,
        feed_id: &str,
        package_id: &str,
    ) -> Result<Option<String>> {
        let envelope = self
            .get_json(
                scope,
                &["api", scope.space_id.as_str(), "feeds", feed_id, "packages", "versions"],
                &[("take", "1".to_string()), ("packageId", package_id.to_string())],
            )
            .await?;
        Ok(items(envelope)?
            .first()
            .and_then(|package| package.get("Version"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn create_release(
        &self,
        scope: &SpaceScope,
        request: &CreateReleaseRequest,
    ) -> Result<Value> {
        self.post_json(scope, &["api", scope.space_id.as_str(), "releases"], request.to_json())
            .await
    }

    async fn deploy_release(
        &self,
        scope: &SpaceScope,
        request: &DeployReleaseRequest,
    ) -> Result<Value> {
        self.post_json(scope, &["api", scope.space_id.as_str(), "deployments"], request.to_json())
            .await
    }

    async fn run_runbook(&self, scope: &SpaceScope, request: &RunbookRunRequest) -> Result<Value> {
        self.post_json(scope, &["api", scope.space_id.as_str(), "runbookRuns"], request.to_json())
            .await
    }
}
