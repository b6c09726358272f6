//! Transport boundary: raw HTTP exchange, status classification and the
//! retry/concurrency call wrapper applied to every remote call.

mod classify;
mod http;
mod policy;

pub use classify::classify;
pub use http::HttpTransport;
pub use policy::{CallPolicy, RetryPolicy};

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::Result;

/// Page size that asks the server for every item in a single page.
pub const TAKE_ALL: usize = 2_147_483_647;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    /// A `GET` with no headers.
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// A `POST` carrying `body` as JSON.
    pub fn post(url: Url, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Issues a single HTTP exchange. Implementations do not interpret status codes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Join path segments onto the server URL and append query pairs.
///
/// The server URL is treated as a directory, so `https://host/octopus` and
/// `https://host/octopus/` produce the same result. Each segment is
/// percent-encoded individually.
pub fn build_url<S: AsRef<str>>(
    server_url: &str,
    segments: &[S],
    query: &[(&str, String)],
) -> Result<Url> {
    let mut url = Url::parse(server_url)?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment.as_ref());
        }
    }
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}
