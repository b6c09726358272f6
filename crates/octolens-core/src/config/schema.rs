//! Configuration schema for octolens.toml

use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::paginate::DEFAULT_PAGE_SIZE;
use crate::remote::ClientSettings;
use crate::transport::RetryPolicy;

/// Root configuration structure for octolens.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OctolensConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub client: ClientSection,
}

/// Which server to talk to and how to authenticate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Call behaviour shared by every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_retry_attempts() -> usize {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_max_concurrent_requests() -> usize {
    10
}

fn default_user_agent() -> String {
    "OctopusAI".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            max_concurrent_requests: default_max_concurrent_requests(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OctolensConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.client.page_size == 0 {
            bail!("client.page_size must be at least 1");
        }
        if self.client.retry_attempts == 0 {
            bail!("client.retry_attempts must be at least 1");
        }
        if self.client.max_concurrent_requests == 0 {
            bail!("client.max_concurrent_requests must be at least 1");
        }
        if let Some(url) = &self.server.url {
            Url::parse(url).with_context(|| format!("Invalid server.url: '{}'", url))?;
        }
        Ok(())
    }

    /// Apply command-line or environment overrides on top of the file.
    pub fn with_overrides(mut self, url: Option<String>, api_key: Option<String>) -> Self {
        if url.is_some() {
            self.server.url = url;
        }
        if api_key.is_some() {
            self.server.api_key = api_key;
        }
        self
    }

    /// The configured server URL. Blank counts as missing.
    pub fn server_url(&self) -> anyhow::Result<&str> {
        self.server
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .context("No server URL configured; set server.url or pass --server")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.client.retry_attempts,
            Duration::from_millis(self.client.retry_delay_ms),
        )
    }

    /// Settings for building a client. Fails when no API key is available.
    pub fn client_settings(&self) -> anyhow::Result<ClientSettings> {
        let api_key = self
            .server
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .context("No API key configured; set server.api_key, OCTOPUS_API_KEY or --api-key")?;

        Ok(ClientSettings {
            api_key: api_key.to_string(),
            user_agent: self.client.user_agent.clone(),
            retry: self.retry_policy(),
            max_concurrent_requests: self.client.max_concurrent_requests,
            timeout: Duration::from_secs(self.client.timeout_secs),
        })
    }
}
