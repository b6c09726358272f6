//! Locates the GitHub workflow behind a project or release.
//!
//! Two sources are understood. Free text (a project description or release
//! notes) may carry tagged lines such as
//!
//! ```text
//! * GitHub Owner: acme
//! * GitHub Repo: web
//! * GitHub Workflow: build.yaml
//! ```
//!
//! and release build information may carry a build URL of the form
//! `/{owner}/{repo}/actions/runs/{run_id}`. Build information wins when both
//! are present. Missing data is never an error; the extractors just return
//! nothing.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::types::ResourceRef;

static OWNER_TAG: LazyLock<Regex> = LazyLock::new(|| tag_regex("github owner"));
static REPO_TAG: LazyLock<Regex> = LazyLock::new(|| tag_regex("github repo"));
static WORKFLOW_TAG: LazyLock<Regex> = LazyLock::new(|| tag_regex("github workflow"));
static RUN_ID_TAG: LazyLock<Regex> = LazyLock::new(|| tag_regex(r"github run\s?id"));
static RUN_URL_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(?P<owner>[^/]+)/(?P<repo>[^/]+)/actions/runs/(?P<run_id>[^/]+)")
        .expect("valid run url regex")
});

fn tag_regex(label: &str) -> Regex {
    Regex::new(&format!(r"(?i)^(\s*(\*|-)\s*)?{label}:")).expect("valid tag regex")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectWorkflow {
    pub project_id: String,
    pub owner: String,
    pub repo: String,
    pub workflow: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseWorkflowRun {
    pub release_id: String,
    /// Set when the run came from a package's build information.
    pub package_id: Option<String>,
    pub owner: String,
    pub repo: String,
    pub run_id: String,
}

/// Value of the first line tagged with `tag`, if it is non-empty.
fn tagged_value(text: &str, tag: &Regex) -> Option<String> {
    text.split('\n')
        .find_map(|line| tag.find(line).map(|found| line[found.end()..].trim()))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Workflow named by the owner, repo and workflow tags of a project
/// description. All three tags are required.
pub fn extract_project_workflow(project_id: &str, description: &str) -> Option<ProjectWorkflow> {
    Some(ProjectWorkflow {
        project_id: project_id.to_string(),
        owner: tagged_value(description, &OWNER_TAG)?,
        repo: tagged_value(description, &REPO_TAG)?,
        workflow: tagged_value(description, &WORKFLOW_TAG)?,
    })
}

/// Run named by the owner, repo and run id tags of release notes.
pub fn extract_release_notes_workflow(release_id: &str, notes: &str) -> Option<ReleaseWorkflowRun> {
    Some(ReleaseWorkflowRun {
        release_id: release_id.to_string(),
        package_id: None,
        owner: tagged_value(notes, &OWNER_TAG)?,
        repo: tagged_value(notes, &REPO_TAG)?,
        run_id: tagged_value(notes, &RUN_ID_TAG)?,
    })
}

/// One run per build-information entry whose `BuildUrl` points at a GitHub
/// Actions run.
pub fn extract_build_info_workflows(
    release_id: &str,
    build_information: &[Value],
) -> Vec<ReleaseWorkflowRun> {
    build_information
        .iter()
        .filter_map(|info| {
            let build_url = info.get("BuildUrl").and_then(Value::as_str)?;
            let url = Url::parse(build_url).ok()?;
            let captures = RUN_URL_PATH.captures(url.path())?;
            Some(ReleaseWorkflowRun {
                release_id: release_id.to_string(),
                package_id: info
                    .get("PackageId")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                owner: captures["owner"].to_string(),
                repo: captures["repo"].to_string(),
                run_id: captures["run_id"].to_string(),
            })
        })
        .collect()
}

/// Workflow declared in a resolved project's description.
pub fn project_workflow(project: &ResourceRef) -> Option<ProjectWorkflow> {
    let description = project.attribute_str("Description")?;
    extract_project_workflow(&project.id, description)
}

/// Runs linked to a release, from build information when it has any,
/// otherwise from the release notes.
pub fn release_workflows(release: &ResourceRef) -> Vec<ReleaseWorkflowRun> {
    let build_information = release
        .attributes
        .get("BuildInformation")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let from_build_info = extract_build_info_workflows(&release.id, build_information);
    if !from_build_info.is_empty() {
        return from_build_info;
    }

    release
        .attribute_str("ReleaseNotes")
        .and_then(|notes| extract_release_notes_workflow(&release.id, notes))
        .into_iter()
        .collect()
}
