use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use octolens_core::Error;
use octolens_core::Result;
use octolens_core::engine::Engine;
use octolens_core::remote::{ClientSettings, OctopusClient, RemoteResourceService};
use octolens_core::transport::{HttpRequest, HttpResponse, RetryPolicy, Transport};
use octolens_core::types::{Collection, ResourceKind, SpaceScope};

/// Replays scripted replies in order and records every request it sees.
/// Once the script runs out it answers with an empty listing.
struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<Result<HttpResponse>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn query(&self, index: usize, key: &str) -> Option<String> {
        self.requests()[index]
            .url
            .query_pairs()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::new(200, r#"{"Items": []}"#)))
    }
}

fn client(transport: Arc<ScriptedTransport>) -> OctopusClient {
    let mut settings = ClientSettings::new("API-TEST");
    settings.retry = RetryPolicy::new(3, Duration::from_millis(1));
    OctopusClient::with_transport(transport, &settings)
}

fn page(prefix: &str, range: std::ops::RangeInclusive<u32>) -> Result<HttpResponse> {
    let items: Vec<_> = range
        .map(|i| json!({"Id": format!("{prefix}-{i}"), "Name": format!("{prefix} {i}")}))
        .collect();
    Ok(HttpResponse::new(200, json!({ "Items": items }).to_string()))
}

fn scope() -> SpaceScope {
    SpaceScope::new("https://octopus.example/", "Spaces-1")
}

#[tokio::test]
async fn failed_page_is_retried_in_place() {
    let transport = ScriptedTransport::new(vec![
        page("Spaces", 1..=30),
        Ok(HttpResponse::new(503, "busy")),
        page("Spaces", 31..=60),
        page("Spaces", 61..=65),
    ]);
    let engine = Engine::new(Arc::new(client(transport.clone())));

    let spaces = engine.list_spaces("https://octopus.example").await.unwrap();

    assert_eq!(spaces.len(), 65);
    assert_eq!(spaces[30].id, "Spaces-31");
    let skips: Vec<Option<String>> = (0..4).map(|i| transport.query(i, "skip")).collect();
    assert_eq!(
        skips,
        vec![
            Some("0".to_string()),
            Some("30".to_string()),
            Some("30".to_string()),
            Some("60".to_string()),
        ]
    );
}

#[tokio::test]
async fn exhausted_retries_abort_listing() {
    let transport = ScriptedTransport::new(vec![
        page("Spaces", 1..=30),
        Err(Error::Network("connection reset".into())),
        Err(Error::Network("connection reset".into())),
        Err(Error::Network("connection reset".into())),
    ]);
    let engine = Engine::new(Arc::new(client(transport.clone())));

    let err = engine
        .list_spaces("https://octopus.example")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Network(_)));
    assert_eq!(transport.requests().len(), 4);
}

#[tokio::test]
async fn invalid_api_key_is_not_retried() {
    let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(401, "nope"))]);
    let client = client(transport.clone());

    let err = client
        .list_page(&scope(), &Collection::of(ResourceKind::Project), Some("Web"), 0, 30)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AuthenticationInvalid));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn requests_carry_api_key_and_name_filter() {
    let transport = ScriptedTransport::new(vec![page("Projects", 1..=1)]);
    let client = client(transport.clone());

    let projects = client
        .list_page(&scope(), &Collection::of(ResourceKind::Project), Some("My Web"), 0, 30)
        .await
        .unwrap();

    assert_eq!(projects[0].name, "Projects 1");
    let request = &transport.requests()[0];
    assert_eq!(request.url.path(), "/api/Spaces-1/Projects");
    assert!(
        request
            .headers
            .contains(&("X-Octopus-ApiKey".to_string(), "API-TEST".to_string()))
    );
    assert_eq!(transport.query(0, "partialName").as_deref(), Some("My Web"));
}

#[tokio::test]
async fn missing_resource_by_id_is_none() {
    let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(404, "missing"))]);
    let client = client(transport.clone());

    let found = client
        .get_by_id(&scope(), ResourceKind::Environment, "Environments-9")
        .await
        .unwrap();

    assert!(found.is_none());
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(
        transport.requests()[0].url.path(),
        "/api/Spaces-1/Environments/Environments-9"
    );
}

#[tokio::test]
async fn release_lookup_searches_by_version() {
    let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(
        200,
        json!({"Items": [{"Id": "Releases-3", "Version": "1.2.3"}]}).to_string(),
    ))]);
    let engine = Engine::new(Arc::new(client(transport.clone())));

    let release = engine
        .resolve_release(&scope(), "Projects-1", "1.2.3")
        .await
        .unwrap();

    assert_eq!(release.id, "Releases-3");
    assert_eq!(
        transport.requests()[0].url.path(),
        "/api/Spaces-1/Projects/Projects-1/Releases"
    );
    assert_eq!(transport.query(0, "searchByVersion").as_deref(), Some("1.2.3"));
}

#[tokio::test]
async fn listing_without_items_is_a_decode_error() {
    let odd_body = || -> Result<HttpResponse> {
        Ok(HttpResponse::new(200, r#"{"ErrorMessage": "unexpected shape"}"#))
    };
    let transport = ScriptedTransport::new(vec![odd_body(), odd_body(), odd_body()]);
    let client = Arc::new(client(transport.clone()));

    let page = client
        .list_page(&scope(), &Collection::of(ResourceKind::Project), Some("Web"), 0, 30)
        .await;
    assert!(matches!(page, Err(Error::Decode(_))), "{page:?}");

    let version = client
        .latest_package_version(&scope(), "Feeds-1", "web")
        .await;
    assert!(matches!(version, Err(Error::Decode(_))), "{version:?}");

    let engine = Engine::new(client);
    let resolved = engine
        .resolve(&scope(), &Collection::of(ResourceKind::Project), "Web")
        .await;
    assert!(matches!(resolved, Err(Error::Decode(_))), "{resolved:?}");
    assert_eq!(transport.requests().len(), 3);
}

/// Holds every exchange open for a while and tracks how many overlap.
struct SlowTransport {
    body: String,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Transport for SlowTransport {
    async fn request(&self, _request: &HttpRequest) -> Result<HttpResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(HttpResponse::new(200, self.body.clone()))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_resolutions_respect_the_concurrency_limit() {
    let projects: Vec<_> = (1..=12)
        .map(|i| json!({"Id": format!("Projects-{i}"), "Name": format!("Service {i}")}))
        .collect();
    let transport = Arc::new(SlowTransport {
        body: json!({ "Items": projects }).to_string(),
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let mut settings = ClientSettings::new("API-TEST");
    settings.max_concurrent_requests = 3;
    let client = OctopusClient::with_transport(transport.clone(), &settings);
    let engine = Arc::new(Engine::new(Arc::new(client)));

    let tasks: Vec<_> = (1..=12)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .resolve(
                        &scope(),
                        &Collection::of(ResourceKind::Project),
                        &format!("Service {i}"),
                    )
                    .await
            })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        let project = task.await.unwrap().unwrap();
        assert_eq!(project.id, format!("Projects-{}", i + 1));
    }
    let peak = transport.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight calls was {peak}");
    assert!(peak >= 2, "calls never overlapped");
    assert_eq!(engine.cache().len(), 12);
}
