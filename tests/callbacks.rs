mod common;

use std::io::Write;

use ad_normalizer::modules::jobs::model::{TranscodeRecord, TranscodeStatus};
use ad_normalizer::store::TranscodeStore;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::json;
use url::Url;

fn app(jit: bool) -> TestApp {
    let ad_server = Url::parse("http://127.0.0.1:9/ads").unwrap();
    test_app(test_config(ad_server, jit), StubEncore::default())
}

async fn seed_queued(app: &TestApp, key: &str) {
    app.store
        .inner
        .set(key, &TranscodeRecord::queued("https://media.example.com/a.mp4"), Some(3600))
        .await
        .unwrap();
}

fn progress(job_id: &str, external_id: &str, status: &str) -> Request<Body> {
    json_request(
        "POST",
        "/encoreCallback",
        json!({ "jobId": job_id, "externalId": external_id, "progress": 50, "status": status }),
    )
}

#[tokio::test]
async fn in_progress_callbacks_do_not_touch_the_store() {
    let app = app(true);
    seed_queued(&app, "CREATIVE1").await;

    let (status, _) = send(&app.router, progress("job-1", "CREATIVE1", "IN_PROGRESS")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.sets(), 0);
    assert_eq!(app.store.deletes(), 0);
    assert_eq!(
        app.store.get("CREATIVE1").await.unwrap().unwrap().status,
        TranscodeStatus::Queued
    );
}

#[tokio::test]
async fn unknown_statuses_are_ignored() {
    let app = app(true);
    let (status, _) = send(&app.router, progress("job-1", "CREATIVE1", "PAUSED")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.sets() + app.store.deletes(), 0);
}

#[tokio::test]
async fn failed_jobs_drop_the_entry() {
    for outcome in ["FAILED", "CANCELLED"] {
        let app = app(true);
        seed_queued(&app, "CREATIVE1").await;

        let (status, _) = send(&app.router, progress("job-1", "CREATIVE1", outcome)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.store.deletes(), 1);
        assert_eq!(app.store.sets(), 0);
        assert!(app.store.get("CREATIVE1").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn gzipped_callback_bodies_are_decompressed() {
    let app = app(true);
    seed_queued(&app, "CREATIVE1").await;

    let body = json!({ "jobId": "job-1", "externalId": "CREATIVE1", "progress": 0, "status": "FAILED" });
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.to_string().as_bytes()).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/encoreCallback")
        .header("content-type", "application/json")
        .header("content-encoding", "gzip")
        .body(Body::from(encoder.finish().unwrap()))
        .unwrap();

    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.deletes(), 1);
    assert!(app.store.get("CREATIVE1").await.unwrap().is_none());
}

#[tokio::test]
async fn successful_job_completes_with_jit_packaging() {
    let app = app(true);
    seed_queued(&app, "CREATIVE1").await;
    app.encore.add_job(finished_job("job-1", "CREATIVE1"));

    let (status, _) = send(&app.router, progress("job-1", "CREATIVE1", "SUCCESSFUL")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.sets(), 1);

    let (key, record, ttl) = app.store.last_write().unwrap();
    assert_eq!(key, "CREATIVE1");
    assert_eq!(record.status, TranscodeStatus::Completed);
    assert_eq!(
        record.url,
        "https://assets.example.com/out/CREATIVE1/abc/CREATIVE1.m3u8"
    );
    assert_eq!(record.aspect_ratio, "16:9");
    assert_eq!(record.frame_rates, vec![25.0]);
    assert_eq!(ttl, None);
    assert!(app.store.inner.queued_messages("package").await.is_empty());
}

#[tokio::test]
async fn successful_job_without_jit_waits_for_packaging() {
    let app = app(false);
    seed_queued(&app, "CREATIVE1").await;
    app.encore.add_job(finished_job("job-1", "CREATIVE1"));

    let (status, _) = send(&app.router, progress("job-1", "CREATIVE1", "SUCCESSFUL")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, record, ttl) = app.store.last_write().unwrap();
    assert_eq!(record.status, TranscodeStatus::Packaging);
    assert!(record.url.is_empty());
    assert_eq!(ttl, Some(3600));

    let queued = app.store.inner.queued_messages("package").await;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].job_id, "job-1");
    assert_eq!(queued[0].url, "https://encore.example.com/encoreJobs/job-1");
}

#[tokio::test]
async fn successful_job_without_outputs_drops_the_entry() {
    let app = app(true);
    seed_queued(&app, "CREATIVE1").await;
    let mut job = finished_job("job-1", "CREATIVE1");
    job.outputs.clear();
    app.encore.add_job(job);

    let (status, _) = send(&app.router, progress("job-1", "CREATIVE1", "SUCCESSFUL")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.sets(), 0);
    assert_eq!(app.store.deletes(), 1);
}

#[tokio::test]
async fn successful_job_that_cannot_be_fetched_is_a_server_error() {
    let app = app(true);
    seed_queued(&app, "CREATIVE1").await;

    let (status, _) = send(&app.router, progress("missing", "CREATIVE1", "SUCCESSFUL")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.store.sets(), 0);
}

#[tokio::test]
async fn malformed_callbacks_are_rejected() {
    let app = app(true);
    let request = Request::builder()
        .method("POST")
        .uri("/encoreCallback")
        .header("content-type", "application/json")
        .body(Body::from("{\"jobId\": 1"))
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing_status = json_request("POST", "/encoreCallback", json!({ "jobId": "job-1" }));
    let (status, _) = send(&app.router, missing_status).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn packaging_success_completes_the_entry() {
    let app = app(false);
    seed_queued(&app, "CREATIVE1").await;
    app.encore.add_job(finished_job("job-1", "CREATIVE1"));

    let request = json_request(
        "POST",
        "/packagerCallback/success",
        json!({ "jobId": "job-1", "url": "https://encore.example.com/encoreJobs/job-1", "outputPath": "s3://bucket/packaged/CREATIVE1/abc/" }),
    );
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);

    let (key, record, ttl) = app.store.last_write().unwrap();
    assert_eq!(key, "CREATIVE1");
    assert_eq!(record.status, TranscodeStatus::Completed);
    assert_eq!(
        record.url,
        "https://assets.example.com/packaged/CREATIVE1/abc/index.m3u8"
    );
    assert_eq!(ttl, None);
}

#[tokio::test]
async fn packaging_failure_drops_the_entry() {
    let app = app(false);
    seed_queued(&app, "CREATIVE1").await;
    app.encore.add_job(finished_job("job-1", "CREATIVE1"));

    let request = json_request(
        "POST",
        "/packagerCallback/failure",
        json!({ "message": { "jobId": "job-1", "url": "https://encore.example.com/encoreJobs/job-1" } }),
    );
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.deletes(), 1);
    assert!(app.store.get("CREATIVE1").await.unwrap().is_none());
}

#[tokio::test]
async fn packaging_callbacks_for_unknown_jobs_are_not_found() {
    let app = app(false);
    let success = json_request(
        "POST",
        "/packagerCallback/success",
        json!({ "jobId": "nope", "outputPath": "s3://bucket/x/" }),
    );
    let (status, _) = send(&app.router, success).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let failure = json_request(
        "POST",
        "/packagerCallback/failure",
        json!({ "message": { "jobId": "nope" } }),
    );
    let (status, _) = send(&app.router, failure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn packaging_callback_for_job_without_external_id_is_not_found() {
    let app = app(false);
    let mut job = finished_job("job-1", "");
    job.external_id.clear();
    app.encore.add_job(job);

    let request = json_request(
        "POST",
        "/packagerCallback/success",
        json!({ "jobId": "job-1", "outputPath": "s3://bucket/x/" }),
    );
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.sets(), 0);
}
