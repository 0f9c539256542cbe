#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ad_normalizer::app::create_app;
use ad_normalizer::config::settings::{AppConfig, DEFAULT_KEY_REGEX, KeyConfig, KeyField, StoreBackend};
use ad_normalizer::infrastructure::adserver::client::AdServerClient;
use ad_normalizer::infrastructure::encore::client::{EncoreClient, EncoreError};
use ad_normalizer::infrastructure::encore::types::{EncoreJob, EncoreOutput, EncoreVideoStream};
use ad_normalizer::modules::ads::creative::CreativeAsset;
use ad_normalizer::modules::jobs::model::{PackagingQueueMessage, TranscodeRecord};
use ad_normalizer::state::AppState;
use ad_normalizer::store::memory::MemoryTranscodeStore;
use ad_normalizer::store::{StoreResult, TranscodeStore};
use ad_normalizer::workers::kpi::{AdsHandled, KpiReporter};
use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::http::{Request, StatusCode};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::ServiceExt;
use url::Url;

/// Memory store that counts mutations.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryTranscodeStore,
    pub sets: AtomicUsize,
    pub deletes: AtomicUsize,
    pub written: Mutex<Vec<(String, TranscodeRecord, Option<u64>)>>,
}

impl CountingStore {
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn last_write(&self) -> Option<(String, TranscodeRecord, Option<u64>)> {
        self.written.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TranscodeStore for CountingStore {
    async fn get(&self, key: &str) -> StoreResult<Option<TranscodeRecord>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, record: &TranscodeRecord, ttl_secs: Option<u64>) -> StoreResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.written
            .lock()
            .unwrap()
            .push((key.to_string(), record.clone(), ttl_secs));
        self.inner.set(key, record, ttl_secs).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }

    async fn list(&self, page: usize, size: usize) -> StoreResult<(Vec<TranscodeRecord>, u64)> {
        self.inner.list(page, size).await
    }

    async fn blacklist(&self, url: &str) -> StoreResult<()> {
        self.inner.blacklist(url).await
    }

    async fn in_blacklist(&self, url: &str) -> StoreResult<bool> {
        self.inner.in_blacklist(url).await
    }

    async fn remove_from_blacklist(&self, url: &str) -> StoreResult<()> {
        self.inner.remove_from_blacklist(url).await
    }

    async fn list_blacklist(&self, page: usize, size: usize) -> StoreResult<(Vec<String>, u64)> {
        self.inner.list_blacklist(page, size).await
    }

    async fn enqueue_packaging_job(&self, queue_name: &str, message: &PackagingQueueMessage) -> StoreResult<()> {
        self.inner.enqueue_packaging_job(queue_name, message).await
    }
}

/// Transcode service double. Jobs returned by `get_job` are registered up front.
#[derive(Default)]
pub struct StubEncore {
    pub created: Mutex<Vec<CreativeAsset>>,
    pub jobs: Mutex<HashMap<String, EncoreJob>>,
    pub fail_create: bool,
}

impl StubEncore {
    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Default::default()
        }
    }

    pub fn create_calls(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn add_job(&self, job: EncoreJob) {
        self.jobs.lock().unwrap().insert(job.id.clone(), job);
    }
}

#[async_trait]
impl EncoreClient for StubEncore {
    async fn create_job(&self, creative: &CreativeAsset) -> Result<EncoreJob, EncoreError> {
        if self.fail_create {
            return Err(EncoreError::Status {
                status: 500,
                body: "boom".into(),
            });
        }
        let mut created = self.created.lock().unwrap();
        created.push(creative.clone());
        Ok(EncoreJob {
            id: format!("job-{}", created.len()),
            external_id: creative.creative_id.clone(),
            status: "NEW".into(),
            ..Default::default()
        })
    }

    async fn get_job(&self, job_id: &str) -> Result<EncoreJob, EncoreError> {
        self.jobs
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(|| EncoreError::Status {
                status: 404,
                body: "not found".into(),
            })
    }
}

pub fn finished_job(job_id: &str, creative_id: &str) -> EncoreJob {
    EncoreJob {
        id: job_id.into(),
        external_id: creative_id.into(),
        status: "SUCCESSFUL".into(),
        base_name: creative_id.into(),
        output_folder: format!("s3://bucket/out/{creative_id}/abc/"),
        outputs: vec![EncoreOutput {
            video_streams: vec![EncoreVideoStream {
                codec: "h264".into(),
                width: 1920,
                height: 1080,
                frame_rate: "25/1".into(),
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn test_config(ad_server_url: Url, jit_packaging: bool) -> AppConfig {
    let url = |raw: &str| Url::parse(raw).unwrap();
    AppConfig {
        server_port: 0,
        store_backend: StoreBackend::Memory,
        redis_url: None,
        encore_url: url("https://encore.example.com"),
        encore_jobs_path: "encoreJobs".into(),
        encore_profile: "program".into(),
        ad_server_url,
        asset_server_url: url("https://assets.example.com"),
        output_bucket_url: url("s3://bucket/out"),
        root_url: url("https://normalizer.example.com"),
        key: KeyConfig::new(KeyField::UniversalAdId, DEFAULT_KEY_REGEX).unwrap(),
        jit_packaging,
        packaging_queue: "package".into(),
        in_flight_ttl: Some(3600),
        osc_access_token: None,
        environment: "dev".into(),
        kpi_post_url: None,
        kpi_export_interval: Duration::from_secs(60),
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<CountingStore>,
    pub encore: Arc<StubEncore>,
    pub kpi_events: mpsc::Receiver<AdsHandled>,
}

pub fn test_app(config: AppConfig, encore: StubEncore) -> TestApp {
    let store = Arc::new(CountingStore::default());
    let encore = Arc::new(encore);
    let ad_server = AdServerClient::new(config.ad_server_url.clone()).unwrap();
    let (kpi, kpi_events) = KpiReporter::channel();
    let state = AppState::new(config, store.clone(), encore.clone(), ad_server, kpi);
    TestApp {
        router: create_app(state),
        store,
        encore,
        kpi_events,
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

pub const VAST_TWO_ADS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<VAST version="4.0">
  <Ad id="cached-ad" sequence="1">
    <InLine>
      <AdSystem>Test</AdSystem>
      <AdTitle>Cached</AdTitle>
      <Creatives>
        <Creative id="c1">
          <UniversalAdId idRegistry="ad-id.org">CACHED-1</UniversalAdId>
          <Linear>
            <Duration>00:00:15</Duration>
            <MediaFiles>
              <MediaFile delivery="progressive" type="video/mp4" width="1920" height="1080" bitrate="4000"><![CDATA[https://media.example.com/cached.mp4]]></MediaFile>
            </MediaFiles>
          </Linear>
        </Creative>
      </Creatives>
    </InLine>
  </Ad>
  <Ad id="new-ad" sequence="2">
    <InLine>
      <AdSystem>Test</AdSystem>
      <AdTitle>New</AdTitle>
      <Creatives>
        <Creative id="c2">
          <UniversalAdId idRegistry="ad-id.org">NEW-2</UniversalAdId>
          <Linear>
            <Duration>00:00:30</Duration>
            <MediaFiles>
              <MediaFile delivery="progressive" type="video/mp4" width="1280" height="720" bitrate="2000"><![CDATA[https://media.example.com/new.mp4]]></MediaFile>
            </MediaFiles>
          </Linear>
        </Creative>
      </Creatives>
    </InLine>
  </Ad>
</VAST>"#;
