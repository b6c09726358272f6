#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use octolens_core::Error;
use octolens_core::Result;
use octolens_core::engine::Engine;
use octolens_core::logs::LogNode;
use octolens_core::remote::{
    CreateReleaseRequest, DeployReleaseRequest, DeploymentSummary, ReleaseTemplate,
    RemoteResourceService, RunbookRunQuery, RunbookRunRequest, TaskDetails, TaskSummary,
};
use octolens_core::types::{Collection, ResourceKind, ResourceRef, SpaceScope};

pub const SERVER: &str = "https://octopus.example";

pub fn scope() -> SpaceScope {
    SpaceScope::new(SERVER, "Spaces-1")
}

pub fn resource(kind: ResourceKind, id: &str, name: &str) -> ResourceRef {
    let mut record = json!({ "Id": id });
    record[kind.name_field()] = Value::String(name.to_string());
    ResourceRef::from_json(kind, record).unwrap()
}

pub fn resource_with(kind: ResourceKind, id: &str, name: &str, extra: Value) -> ResourceRef {
    let mut record = json!({ "Id": id });
    record[kind.name_field()] = Value::String(name.to_string());
    if let (Some(target), Value::Object(extra)) = (record.as_object_mut(), extra) {
        target.extend(extra);
    }
    ResourceRef::from_json(kind, record).unwrap()
}

/// One recorded call against the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetById {
        kind: ResourceKind,
        id: String,
    },
    ListPage {
        kind: ResourceKind,
        project_id: Option<String>,
        name_filter: Option<String>,
        skip: usize,
        take: usize,
    },
    ListDeployments,
    ListTaskRuns(RunbookRunQuery),
    TaskDetails(String),
    Progression(String),
    ReleaseTemplate {
        channel_id: String,
        git_ref: Option<String>,
    },
    GitBranch(String),
    PackageVersion(String),
    CreateRelease(CreateReleaseRequest),
    DeployRelease(DeployReleaseRequest),
    RunRunbook(RunbookRunRequest),
}

/// In-memory server. Collections answer the partial-name filter with a
/// case-insensitive substring match, except for ids marked hidden, which only
/// appear in unfiltered listings.
#[derive(Default)]
pub struct FakeService {
    pub collections: HashMap<Collection, Vec<ResourceRef>>,
    pub hidden_from_name_filter: HashSet<String>,
    pub deployments: Vec<DeploymentSummary>,
    pub task_runs: Vec<TaskSummary>,
    pub task_details: HashMap<String, TaskDetails>,
    pub progression: Value,
    pub release_template: ReleaseTemplate,
    pub git_branches: HashMap<String, String>,
    pub package_versions: HashMap<String, String>,
    calls: Mutex<Vec<Call>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, collection: Collection, items: Vec<ResourceRef>) -> Self {
        self.collections.entry(collection).or_default().extend(items);
        self
    }

    pub fn hide_from_name_filter(mut self, id: &str) -> Self {
        self.hidden_from_name_filter.insert(id.to_string());
        self
    }

    pub fn with_task(mut self, task_id: &str, roots: Vec<LogNode>) -> Self {
        self.task_details.insert(
            task_id.to_string(),
            TaskDetails {
                task: json!({ "Id": task_id, "State": "Success" }),
                activity_logs: roots,
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn listing_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::ListPage { .. }))
            .count()
    }

    pub fn into_engine(self) -> (Engine, Arc<FakeService>) {
        let service = Arc::new(self);
        (Engine::new(service.clone()), service)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteResourceService for FakeService {
    async fn get_by_id(
        &self,
        _scope: &SpaceScope,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Option<ResourceRef>> {
        self.record(Call::GetById {
            kind,
            id: id.to_string(),
        });
        Ok(self
            .collections
            .iter()
            .filter(|(collection, _)| collection.kind == kind)
            .flat_map(|(_, items)| items.iter())
            .find(|item| item.id == id)
            .cloned())
    }

    async fn list_page(
        &self,
        _scope: &SpaceScope,
        collection: &Collection,
        name_filter: Option<&str>,
        skip: usize,
        take: usize,
    ) -> Result<Vec<ResourceRef>> {
        self.record(Call::ListPage {
            kind: collection.kind,
            project_id: collection.project_id.clone(),
            name_filter: name_filter.map(str::to_string),
            skip,
            take,
        });
        let items = self.collections.get(collection).cloned().unwrap_or_default();
        Ok(items
            .into_iter()
            .filter(|item| match name_filter {
                Some(filter) => {
                    !self.hidden_from_name_filter.contains(&item.id)
                        && item.name.to_lowercase().contains(&filter.to_lowercase())
                }
                None => true,
            })
            .skip(skip)
            .take(take)
            .collect())
    }

    async fn list_deployments(
        &self,
        _scope: &SpaceScope,
        _project_id: &str,
        take: usize,
    ) -> Result<Vec<DeploymentSummary>> {
        self.record(Call::ListDeployments);
        Ok(self.deployments.iter().take(take).cloned().collect())
    }

    async fn list_task_runs(
        &self,
        _scope: &SpaceScope,
        query: &RunbookRunQuery,
    ) -> Result<Vec<TaskSummary>> {
        self.record(Call::ListTaskRuns(query.clone()));
        Ok(self.task_runs.clone())
    }

    async fn get_task_details(&self, _scope: &SpaceScope, task_id: &str) -> Result<TaskDetails> {
        self.record(Call::TaskDetails(task_id.to_string()));
        self.task_details
            .get(task_id)
            .cloned()
            .ok_or_else(|| Error::RequestFailed {
                status: 404,
                body: format!("no task {task_id}"),
            })
    }

    async fn get_progression(&self, _scope: &SpaceScope, project_id: &str) -> Result<Value> {
        self.record(Call::Progression(project_id.to_string()));
        Ok(self.progression.clone())
    }

    async fn get_release_template(
        &self,
        _scope: &SpaceScope,
        _project: &ResourceRef,
        channel_id: &str,
        git_ref: Option<&str>,
    ) -> Result<ReleaseTemplate> {
        self.record(Call::ReleaseTemplate {
            channel_id: channel_id.to_string(),
            git_ref: git_ref.map(str::to_string),
        });
        Ok(self.release_template.clone())
    }

    async fn get_git_branch(
        &self,
        _scope: &SpaceScope,
        _project_id: &str,
        branch: &str,
    ) -> Result<Value> {
        self.record(Call::GitBranch(branch.to_string()));
        Ok(match self.git_branches.get(branch) {
            Some(canonical) => json!({ "Name": branch, "CanonicalName": canonical }),
            None => json!({}),
        })
    }

    async fn latest_package_version(
        &self,
        _scope: &SpaceScope,
        _feed_id: &str,
        package_id: &str,
    ) -> Result<Option<String>> {
        self.record(Call::PackageVersion(package_id.to_string()));
        Ok(self.package_versions.get(package_id).cloned())
    }

    async fn create_release(
        &self,
        _scope: &SpaceScope,
        request: &CreateReleaseRequest,
    ) -> Result<Value> {
        self.record(Call::CreateRelease(request.clone()));
        Ok(json!({ "Id": "Releases-100", "Version": request.version }))
    }

    async fn deploy_release(
        &self,
        _scope: &SpaceScope,
        request: &DeployReleaseRequest,
    ) -> Result<Value> {
        self.record(Call::DeployRelease(request.clone()));
        Ok(json!({ "Id": "Deployments-100", "TaskId": "ServerTasks-100" }))
    }

    async fn run_runbook(&self, _scope: &SpaceScope, request: &RunbookRunRequest) -> Result<Value> {
        self.record(Call::RunRunbook(request.clone()));
        Ok(json!({ "Id": "RunbookRuns-100" }))
    }
}
