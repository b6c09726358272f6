//! Octolens - resolve deployment resources and read their logs
//!
//! Usage:
//!   octolens spaces                                  # List spaces
//!   octolens resolve project "web app" --space Dev   # Resolve a name
//!   octolens logs --space Dev --project Web          # Latest deployment log
//!   octolens status --space Dev --project Web --environment Production

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use octolens_core::prelude::*;
use octolens_core::workflow::{ProjectWorkflow, ReleaseWorkflowRun};

#[derive(Parser)]
#[command(name = "octolens")]
#[command(about = "Resolve deployment resources and read their activity logs", long_about = None)]
struct Cli {
    /// Path to octolens.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server URL, overrides server.url
    #[arg(long, global = true, env = "OCTOPUS_URL")]
    server: Option<String>,

    /// API key, overrides server.api_key
    #[arg(long, global = true, env = "OCTOPUS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the spaces on the server
    Spaces,

    /// Resolve a name (or Id) to a single resource
    Resolve {
        /// Resource kind (project, environment, tenant, channel, runbook, release, space)
        kind: String,

        /// Name or Id to resolve
        name: String,

        #[arg(long)]
        space: Option<String>,

        /// Owning project, for channels, runbooks and releases
        #[arg(long)]
        project: Option<String>,
    },

    /// Show the activity log of a deployment
    Logs {
        #[command(flatten)]
        target: DeploymentTarget,

        /// Release version, or "latest"
        #[arg(long)]
        release: Option<String>,

        #[command(flatten)]
        filters: LogFilterArgs,
    },

    /// Show the activity log of the newest run of a runbook
    RunbookLogs {
        #[command(flatten)]
        target: DeploymentTarget,

        #[arg(long)]
        runbook: String,

        #[command(flatten)]
        filters: LogFilterArgs,
    },

    /// Show the newest deployment of a project to an environment
    Status {
        #[arg(long)]
        space: String,

        #[arg(long)]
        project: String,

        #[arg(long)]
        environment: String,
    },

    /// Find the GitHub workflow behind a project or release
    Workflow(WorkflowArgs),

    /// Print a project, runbook and environment that exist in a space
    Sample {
        #[arg(long)]
        space: String,
    },

    /// Run the published snapshot of a runbook
    RunRunbook {
        #[arg(long)]
        space: String,

        #[arg(long)]
        project: String,

        #[arg(long)]
        runbook: String,

        #[arg(long)]
        environment: String,

        #[arg(long)]
        tenant: Option<String>,
    },

    /// Create a release with the newest package versions
    CreateRelease {
        #[arg(long)]
        space: String,

        #[arg(long)]
        project: String,

        /// Version of the new release
        #[arg(long)]
        version: String,

        /// Channel (defaults to the project's default channel)
        #[arg(long)]
        channel: Option<String>,

        /// Git reference for version-controlled projects
        #[arg(long)]
        git_ref: Option<String>,
    },

    /// Deploy an existing release
    Deploy {
        #[arg(long)]
        space: String,

        #[arg(long)]
        project: String,

        /// Release version or Id
        #[arg(long)]
        release: String,

        #[arg(long)]
        environment: String,

        #[arg(long)]
        tenant: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct DeploymentTarget {
    #[arg(long)]
    space: String,

    #[arg(long)]
    project: String,

    #[arg(long)]
    environment: Option<String>,

    #[arg(long)]
    tenant: Option<String>,
}

#[derive(Args)]
struct LogFilterArgs {
    /// Step index or approximate step name (repeatable)
    #[arg(long = "step")]
    steps: Vec<String>,

    /// Only lines in this category (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Omit step and action names
    #[arg(long)]
    no_names: bool,

    /// Line separator
    #[arg(long, default_value = "\n")]
    separator: String,
}

impl LogFilterArgs {
    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            steps: StepFilter::parse(&self.steps),
            categories: self.categories.clone(),
            include_name: !self.no_names,
            separator: self.separator.clone(),
        }
    }
}

#[derive(Args)]
struct WorkflowArgs {
    #[command(subcommand)]
    command: WorkflowSubcommand,
}

#[derive(Subcommand)]
enum WorkflowSubcommand {
    /// Workflow named in a project's description
    Project {
        #[arg(long)]
        space: String,

        #[arg(long)]
        project: String,
    },
    /// Workflow runs that built a release
    Release {
        #[arg(long)]
        space: String,

        #[arg(long)]
        release_id: String,
    },
}

/// An engine bound to one server for the lifetime of the command.
struct Session {
    engine: Engine,
    server_url: String,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let store = match &cli.config {
            Some(path) => ConfigStore::from_path(path.clone()),
            None => ConfigStore::from_default_location()?,
        };
        let config = store
            .load()?
            .with_overrides(cli.server.clone(), cli.api_key.clone());
        let server_url = config.server_url()?.to_string();
        let settings = config.client_settings()?;
        let client = OctopusClient::connect(&settings).context("Failed to build HTTP client")?;
        tracing::debug!(server = %server_url, config = %store.config_path().display(), "session opened");

        Ok(Self {
            engine: Engine::new(Arc::new(client)).with_page_size(config.client.page_size),
            server_url,
        })
    }

    async fn scope(&self, space: &str) -> Result<SpaceScope> {
        let (scope, _) = self.engine.resolve_space(&self.server_url, space).await?;
        Ok(scope)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "octolens=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let session = Session::open(&cli)?;
    run_cli(&session, cli.command, cli.format).await
}

async fn run_cli(session: &Session, command: Commands, format: OutputFormat) -> Result<()> {
    let engine = &session.engine;
    match command {
        Commands::Spaces => {
            let spaces = engine.list_spaces(&session.server_url).await?;
            print_resources(&spaces, format)?;
        }
        Commands::Resolve {
            kind,
            name,
            space,
            project,
        } => {
            let kind: ResourceKind = kind.parse()?;
            let resource = run_resolve(session, kind, &name, space, project).await?;
            print_resources(std::slice::from_ref(&resource), format)?;
        }
        Commands::Logs {
            target,
            release,
            filters,
        } => {
            let scope = session.scope(&target.space).await?;
            let query = DeploymentLogQuery {
                project: target.project,
                environment: target.environment,
                tenant: target.tenant,
                release: ReleaseSelector::parse(release.as_deref()),
            };
            match engine.deployment_logs(&scope, &query).await? {
                Some(logs) => {
                    let text = render_activity_logs(&logs.activity_logs, &filters.render_options());
                    print_transcript(logs.release_version.as_deref(), &logs.task, &text, format)?;
                }
                None => println!("No matching deployment found."),
            }
        }
        Commands::RunbookLogs {
            target,
            runbook,
            filters,
        } => {
            let scope = session.scope(&target.space).await?;
            let query = RunbookLogQuery {
                project: target.project,
                runbook,
                environment: target.environment,
                tenant: target.tenant,
            };
            match engine.runbook_logs(&scope, &query).await? {
                Some(logs) => {
                    let text = render_activity_logs(&logs.activity_logs, &filters.render_options());
                    print_transcript(None, &logs.task, &text, format)?;
                }
                None => println!("The runbook has not been run."),
            }
        }
        Commands::Status {
            space,
            project,
            environment,
        } => {
            let scope = session.scope(&space).await?;
            let status = engine
                .deployment_status(&scope, &project, &environment)
                .await?;
            print_status(&status, format)?;
        }
        Commands::Workflow(args) => match args.command {
            WorkflowSubcommand::Project { space, project } => {
                let scope = session.scope(&space).await?;
                let workflow = engine.project_workflow(&scope, &project).await?;
                print_project_workflow(workflow.as_ref(), format)?;
            }
            WorkflowSubcommand::Release { space, release_id } => {
                let scope = session.scope(&space).await?;
                let runs = engine.release_workflows(&scope, &release_id).await?;
                print_release_workflows(&runs, format)?;
            }
        },
        Commands::Sample { space } => {
            let scope = session.scope(&space).await?;
            let sample = engine.sample_targets(&scope).await?;
            print_sample(&sample, format)?;
        }
        Commands::RunRunbook {
            space,
            project,
            runbook,
            environment,
            tenant,
        } => {
            let scope = session.scope(&space).await?;
            let options = RunbookRunOptions {
                project,
                runbook,
                environment,
                tenant,
            };
            let run = engine.run_published_runbook(&scope, &options).await?;
            print_mutation("Started runbook run", &run, format)?;
        }
        Commands::CreateRelease {
            space,
            project,
            version,
            channel,
            git_ref,
        } => {
            let scope = session.scope(&space).await?;
            let options = CreateReleaseOptions {
                project,
                version,
                channel,
                git_ref,
            };
            let release = engine.create_release(&scope, &options).await?;
            print_mutation("Created release", &release, format)?;
        }
        Commands::Deploy {
            space,
            project,
            release,
            environment,
            tenant,
        } => {
            let scope = session.scope(&space).await?;
            let options = DeployOptions {
                project,
                release,
                environment,
                tenant,
            };
            let deployment = engine.deploy_release(&scope, &options).await?;
            print_mutation("Queued deployment", &deployment, format)?;
        }
    }

    Ok(())
}

async fn run_resolve(
    session: &Session,
    kind: ResourceKind,
    name: &str,
    space: Option<String>,
    project: Option<String>,
) -> Result<ResourceRef> {
    if kind == ResourceKind::Space {
        let (_, space) = session.engine.resolve_space(&session.server_url, name).await?;
        return Ok(space);
    }

    let space = space.context("--space is required for this resource kind")?;
    let scope = session.scope(&space).await?;
    let engine = &session.engine;
    let collection = match project {
        Some(project) => {
            let project = engine
                .resolve(&scope, &Collection::of(ResourceKind::Project), &project)
                .await?;
            if kind == ResourceKind::Release {
                return Ok(engine.resolve_release(&scope, &project.id, name).await?);
            }
            Collection::in_project(kind, project.id)
        }
        None => Collection::of(kind),
    };
    Ok(engine.resolve(&scope, &collection, name).await?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_resources(resources: &[ResourceRef], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if resources.is_empty() {
                println!("Nothing found.");
                return Ok(());
            }
            println!("{:<12} {:<24} Name", "Kind", "Id");
            println!("{}", "-".repeat(70));
            for resource in resources {
                println!("{:<12} {:<24} {}", resource.kind, resource.id, resource.name);
            }
        }
        OutputFormat::Json => print_json(resources)?,
    }
    Ok(())
}

fn print_transcript(
    release_version: Option<&str>,
    task: &serde_json::Value,
    text: &str,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if let Some(version) = release_version {
                println!("Release: {}", version);
            }
            if let Some(state) = task.get("State").and_then(serde_json::Value::as_str) {
                println!("State:   {}", state);
            }
            println!();
            println!("{}", text);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "release_version": release_version,
                "task": task,
                "logs": text,
            });
            print_json(&output)?;
        }
    }
    Ok(())
}

fn print_status(status: &DeploymentStatus, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            let field = |name: &str| {
                status
                    .deployment
                    .get(name)
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("-")
                    .to_string()
            };
            println!("Project:     {}", status.project.name);
            println!("Environment: {}", status.environment.name);
            println!("Release:     {}", field("ReleaseVersion"));
            println!("State:       {}", field("State"));
            println!("Completed:   {}", field("CompletedTime"));
        }
        OutputFormat::Json => print_json(status)?,
    }
    Ok(())
}

fn print_project_workflow(workflow: Option<&ProjectWorkflow>, format: OutputFormat) -> Result<()> {
    match (format, workflow) {
        (OutputFormat::Json, workflow) => print_json(&workflow)?,
        (OutputFormat::Table, None) => println!("The project description names no workflow."),
        (OutputFormat::Table, Some(workflow)) => {
            println!("Owner:    {}", workflow.owner);
            println!("Repo:     {}", workflow.repo);
            println!("Workflow: {}", workflow.workflow);
        }
    }
    Ok(())
}

fn print_release_workflows(runs: &[ReleaseWorkflowRun], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if runs.is_empty() {
                println!("No workflow runs are linked to this release.");
                return Ok(());
            }
            println!("{:<20} {:<20} {:<24} Run", "Package", "Owner", "Repo");
            println!("{}", "-".repeat(80));
            for run in runs {
                println!(
                    "{:<20} {:<20} {:<24} {}",
                    run.package_id.as_deref().unwrap_or("-"),
                    run.owner,
                    run.repo,
                    run.run_id
                );
            }
        }
        OutputFormat::Json => print_json(runs)?,
    }
    Ok(())
}

fn print_sample(sample: &SampleTargets, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            let name = |resource: &Option<ResourceRef>| {
                resource
                    .as_ref()
                    .map(|r| r.name.clone())
                    .unwrap_or_else(|| "-".to_string())
            };
            println!("Project:     {}", name(&sample.project));
            println!("Runbook:     {}", name(&sample.runbook));
            println!("Environment: {}", name(&sample.environment));
        }
        OutputFormat::Json => print_json(sample)?,
    }
    Ok(())
}

fn print_mutation(label: &str, response: &serde_json::Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            let id = response
                .get("Id")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("-");
            println!("✓ {} {}", label, id);
        }
        OutputFormat::Json => print_json(response)?,
    }
    Ok(())
}
