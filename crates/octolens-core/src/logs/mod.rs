//! Activity log trees and their flattening into readable transcripts.
//!
//! A task's activity log is a forest: each root is a task (depth 0), its
//! children are top-level steps (depth 1) and anything deeper belongs to a
//! step. [`render`] walks one root pre-order and applies two filters:
//!
//! - a category filter on individual lines, applied at every depth;
//! - a [`StepFilter`] evaluated only at depth 1. A step that fails it keeps
//!   its own name and lines but none of its descendants are visited.

mod filter;
mod similarity;

pub use filter::{STEP_NAME_MATCH_RATIO, StepFilter, StepToken, normalize_step_name, step_matches};
pub use similarity::ratio;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogLine {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub message_text: String,
}

impl LogLine {
    pub fn new(category: impl Into<String>, message_text: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            message_text: message_text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "LogElements", default)]
    pub lines: Vec<LogLine>,
    #[serde(default)]
    pub children: Vec<LogNode>,
}

impl LogNode {
    /// Node with no lines or children.
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            lines: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_line(mut self, category: &str, message: &str) -> Self {
        self.lines.push(LogLine::new(category, message));
        self
    }

    pub fn with_child(mut self, child: LogNode) -> Self {
        self.children.push(child);
        self
    }
}

/// How a forest is turned into a single transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub steps: StepFilter,
    /// Empty means every category.
    pub categories: Vec<String>,
    /// Emit each node's name before its lines.
    pub include_name: bool,
    pub separator: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            steps: StepFilter::all(),
            categories: Vec::new(),
            include_name: true,
            separator: "\n".to_string(),
        }
    }
}

/// Flatten one task root into an ordered list of lines.
pub fn render(
    root: &LogNode,
    steps: &StepFilter,
    categories: &[String],
    include_name: bool,
) -> Vec<String> {
    if root.lines.is_empty() && root.children.is_empty() {
        if categories.is_empty() {
            return vec![format!("No logs found (status: {}).", root.status)];
        }
        return Vec::new();
    }

    let mut out = Vec::new();
    walk(root, 0, steps, categories, include_name, &mut out);
    out
}

fn walk(
    node: &LogNode,
    depth: usize,
    steps: &StepFilter,
    categories: &[String],
    include_name: bool,
    out: &mut Vec<String>,
) {
    if include_name {
        out.push(node.name.clone());
    }
    out.extend(
        node.lines
            .iter()
            .filter(|line| categories.is_empty() || categories.contains(&line.category))
            .map(|line| line.message_text.clone()),
    );

    if depth == 1 && !step_matches(node, steps) {
        return;
    }
    for child in &node.children {
        walk(child, depth + 1, steps, categories, include_name, out);
    }
}

/// Render every root of a forest and join the lines with the separator.
/// An empty forest renders to the empty string.
pub fn render_activity_logs(roots: &[LogNode], options: &RenderOptions) -> String {
    roots
        .iter()
        .flat_map(|root| render(root, &options.steps, &options.categories, options.include_name))
        .collect::<Vec<_>>()
        .join(&options.separator)
}
