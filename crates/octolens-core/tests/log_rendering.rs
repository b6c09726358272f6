use serde_json::json;

use octolens_core::logs::{LogNode, RenderOptions, StepFilter, render, render_activity_logs};
use octolens_core::remote::TaskDetails;

/// A task with two top-level steps, each with a nested action.
fn task() -> LogNode {
    LogNode::new("Deploy Web release 1.4.0 to Production", "Success")
        .with_line("Info", "Task queued")
        .with_child(
            LogNode::new("Step 1 Deploy", "Success")
                .with_line("Info", "Deploying package")
                .with_child(
                    LogNode::new("web-01", "Success")
                        .with_line("Info", "Extracted package")
                        .with_line("Verbose", "Checksum verified"),
                ),
        )
        .with_child(
            LogNode::new("Step 2 Notify", "Success")
                .with_line("Info", "Sending notification")
                .with_child(LogNode::new("slack", "Success").with_line("Info", "Posted to #releases")),
        )
}

fn no_categories() -> Vec<String> {
    Vec::new()
}

#[test]
fn rendering_twice_gives_identical_output() {
    let root = task();
    let steps = StepFilter::parse(["notify"]);
    let categories = vec!["Info".to_string()];

    let first = render(&root, &steps, &categories, true);
    let second = render(&root, &steps, &categories, true);

    assert_eq!(first, second);
}

#[test]
fn unmatched_step_keeps_only_its_own_lines() {
    let lines = render(&task(), &StepFilter::parse(["1"]), &no_categories(), false);

    assert_eq!(
        lines,
        vec![
            "Task queued",
            "Deploying package",
            "Extracted package",
            "Checksum verified",
            "Sending notification",
        ]
    );
}

#[test]
fn step_filter_matches_names_fuzzily() {
    let lines = render(&task(), &StepFilter::parse(["notfy"]), &no_categories(), true);

    assert!(lines.contains(&"Posted to #releases".to_string()));
    assert!(!lines.contains(&"Extracted package".to_string()));
    assert!(lines.contains(&"Step 1 Deploy".to_string()));
}

#[test]
fn category_filter_applies_at_every_depth() {
    let categories = vec!["Verbose".to_string()];

    let lines = render(&task(), &StepFilter::all(), &categories, false);

    assert_eq!(lines, vec!["Checksum verified"]);
}

#[test]
fn empty_root_reports_status_unless_filtered() {
    let root = LogNode::new("Deploy Web", "Failed");

    assert_eq!(
        render(&root, &StepFilter::all(), &no_categories(), true),
        vec!["No logs found (status: Failed)."]
    );
    assert!(render(&root, &StepFilter::all(), &["Error".to_string()], true).is_empty());
}

#[test]
fn task_details_from_server_render_as_transcript() {
    let details: TaskDetails = serde_json::from_value(json!({
        "Task": {"Id": "ServerTasks-12", "State": "Failed"},
        "ActivityLogs": [{
            "Name": "Deploy Web release 1.4.0 to Production",
            "Status": "Failed",
            "LogElements": [],
            "Children": [
                {
                    "Name": "Step 1: Acquire packages",
                    "Status": "Success",
                    "LogElements": [{"Category": "Info", "MessageText": "Acquired web 1.4.0"}],
                    "Children": []
                },
                {
                    "Name": "Step 2: Run migrations",
                    "Status": "Failed",
                    "LogElements": [{"Category": "Error", "MessageText": "Migration 42 failed"}],
                    "Children": []
                }
            ]
        }]
    }))
    .unwrap();

    let options = RenderOptions {
        categories: vec!["Error".to_string()],
        include_name: false,
        separator: " | ".to_string(),
        ..Default::default()
    };

    assert_eq!(
        render_activity_logs(&details.activity_logs, &options),
        "Migration 42 failed"
    );
}
