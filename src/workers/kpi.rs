//! Per-tenant ad counters, aggregated in memory and posted periodically.
use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

pub const CHANNEL_CAPACITY: usize = 1000;
const POST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdsHandled {
    pub subdomain: String,
    pub broken: usize,
    pub ingested: usize,
    pub served: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizerMetrics {
    pub service: String,
    pub broken_ads: usize,
    pub ingested_ads: usize,
    pub served_ads: usize,
}

/// Handle used by request handlers. Never blocks.
#[derive(Clone)]
pub struct KpiReporter {
    tx: mpsc::Sender<AdsHandled>,
}

impl KpiReporter {
    pub fn channel() -> (Self, mpsc::Receiver<AdsHandled>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    pub fn ads_handled(&self, event: AdsHandled) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(subdomain = %event.subdomain, "KPI channel full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("KPI worker stopped, dropping event");
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct KpiAggregator {
    metrics: HashMap<String, NormalizerMetrics>,
}

impl KpiAggregator {
    pub fn record(&mut self, event: AdsHandled) {
        let entry = self
            .metrics
            .entry(event.subdomain.clone())
            .or_insert_with(|| NormalizerMetrics {
                service: event.subdomain.clone(),
                ..Default::default()
            });
        entry.broken_ads += event.broken;
        entry.ingested_ads += event.ingested;
        entry.served_ads += event.served;
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Current totals, resetting the aggregator.
    pub fn take(&mut self) -> HashMap<String, NormalizerMetrics> {
        std::mem::take(&mut self.metrics)
    }
}

async fn post_metrics(
    http: reqwest::Client,
    url: Url,
    metrics: HashMap<String, NormalizerMetrics>,
) {
    let result = http
        .post(url)
        .timeout(POST_TIMEOUT)
        .json(&metrics)
        .send()
        .await;
    match result {
        Ok(resp) if resp.status().is_client_error() || resp.status().is_server_error() => {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            error!(status, body = %body, "KPI receiver rejected report");
        }
        Ok(_) => debug!(tenants = metrics.len(), "KPIs reported"),
        Err(e) => error!(error = %e, "Could not report KPIs"),
    }
}

struct Exporter {
    http: reqwest::Client,
    post_url: Option<Url>,
}

impl Exporter {
    fn payload(&self, aggregator: &mut KpiAggregator) -> Option<(Url, HashMap<String, NormalizerMetrics>)> {
        if aggregator.is_empty() {
            return None;
        }
        let metrics = aggregator.take();
        match &self.post_url {
            Some(url) => Some((url.clone(), metrics)),
            None => {
                debug!(tenants = metrics.len(), "No KPI receiver configured, discarding KPIs");
                None
            }
        }
    }
}

/// Drains `events` into per-tenant totals and posts them every `interval`.
/// On cancellation the remaining events are drained and flushed once.
pub async fn run_kpi_worker(
    mut events: mpsc::Receiver<AdsHandled>,
    post_url: Option<Url>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    info!("📊 Starting KPI worker...");
    let exporter = Exporter {
        http: reqwest::Client::new(),
        post_url,
    };
    let mut aggregator = KpiAggregator::default();
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => aggregator.record(event),
                None => break,
            },
            _ = ticker.tick() => {
                if let Some((url, metrics)) = exporter.payload(&mut aggregator) {
                    tokio::spawn(post_metrics(exporter.http.clone(), url, metrics));
                }
            }
        }
    }

    events.close();
    while let Ok(event) = events.try_recv() {
        aggregator.record(event);
    }
    if let Some((url, metrics)) = exporter.payload(&mut aggregator) {
        post_metrics(exporter.http.clone(), url, metrics).await;
    }
    info!("📊 KPI worker stopped");
}
