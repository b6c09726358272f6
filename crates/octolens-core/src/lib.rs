//! Octolens Core Library
//!
//! Resolves human-typed resource names against a deployment server and turns
//! task activity logs into filtered transcripts.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod logs;
pub mod paginate;
pub mod remote;
pub mod resolve;
pub mod transport;
pub mod types;
pub mod workflow;

pub use error::{Error, Result};

/// Re-exports of commonly used types
pub mod prelude {
    // Engine
    pub use crate::engine::{
        CreateReleaseOptions, DeployOptions, DeploymentLogQuery, DeploymentLogs,
        DeploymentStatus, Engine, ReleaseSelector, RunbookLogQuery, RunbookLogs,
        RunbookRunOptions, SampleTargets,
    };

    // Resolution
    pub use crate::cache::{CacheKey, ResolutionCache};
    pub use crate::resolve::{FuzzyResolver, ResolutionTier};
    pub use crate::types::{Collection, ResourceKind, ResourceRef, SpaceScope};

    // Logs
    pub use crate::logs::{LogLine, LogNode, RenderOptions, StepFilter, render, render_activity_logs};

    // Remote
    pub use crate::remote::{ClientSettings, OctopusClient, RemoteResourceService};
    pub use crate::transport::{CallPolicy, HttpTransport, RetryPolicy, Transport};

    // Configuration
    pub use crate::config::{ConfigStore, OctolensConfig};

    // Errors
    pub use crate::error::{Error, Result};
}
