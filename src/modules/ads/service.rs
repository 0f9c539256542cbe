use futures_util::future::join_all;
use thiserror::Error;
use tracing::debug;

use super::creative::{get_creatives, make_creatives};
use super::dispatch::dispatch_jobs;
use super::model::{AdBreak, DocumentError, Vast, Vmap, decode_vast, decode_vmap};
use super::partition::partition_creatives;
use super::rewrite::{append_filler, replace_media_files};
use crate::infrastructure::adserver::client::{AdServerError, AdServerRequest};
use crate::state::AppState;
use crate::workers::kpi::AdsHandled;

#[derive(Debug, Error)]
pub enum AdsError {
    #[error(transparent)]
    AdServer(#[from] AdServerError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

pub struct AdsService;

impl AdsService {
    /// Fetches a VAST document upstream and returns it normalized.
    pub async fn normalize_vast(
        state: AppState,
        request: AdServerRequest,
        filler: Option<String>,
    ) -> Result<Vast, AdsError> {
        let body = state.ad_server.fetch(&request).await?;
        let mut vast = decode_vast(&body)?;
        debug!(ads = vast.ads.len(), "Decoded VAST");

        let subdomain = request.subdomain().unwrap_or_default();
        Self::process_vast(&state, &mut vast, subdomain).await;
        if let Some(url) = filler.as_deref().filter(|u| !u.is_empty()) {
            append_filler(&mut vast, url);
        }
        Ok(vast)
    }

    /// Fetches a VMAP document upstream and normalizes the VAST embedded in
    /// every ad break. Breaks are processed concurrently.
    pub async fn normalize_vmap(
        state: AppState,
        request: AdServerRequest,
        filler: Option<String>,
    ) -> Result<Vmap, AdsError> {
        let body = state.ad_server.fetch(&request).await?;
        let mut vmap = decode_vmap(&body)?;
        debug!(breaks = vmap.ad_breaks.len(), "Decoded VMAP");

        let subdomain = request.subdomain().unwrap_or_default();
        join_all(
            vmap.ad_breaks
                .iter_mut()
                .filter_map(AdBreak::vast_mut)
                .map(|vast| Self::process_vast(&state, vast, subdomain)),
        )
        .await;

        if let Some(url) = filler.as_deref().filter(|u| !u.is_empty()) {
            for vast in vmap.ad_breaks.iter_mut().filter_map(AdBreak::vast_mut) {
                append_filler(vast, url);
            }
        }
        Ok(vmap)
    }

    /// Classifies the creatives of `vast`, dispatches jobs for the missing
    /// ones and rewrites the document to reference ready renditions only.
    pub async fn process_vast(state: &AppState, vast: &mut Vast, subdomain: &str) {
        let key = &state.config.key;
        let creatives = get_creatives(vast, key);
        let partition = partition_creatives(state.store.as_ref(), creatives, true).await;

        let ingested = dispatch_jobs(
            &state.encore,
            &state.store,
            partition.to_dispatch(),
            state.config.in_flight_ttl,
        );

        state.kpi.ads_handled(AdsHandled {
            subdomain: subdomain.to_string(),
            broken: partition.blacklisted,
            ingested,
            served: partition.ready.len(),
        });

        replace_media_files(vast, &partition.ready, key);
    }

    /// Starts transcoding for any listed media URL that has no rendition yet.
    /// The blacklist is not consulted here.
    pub async fn pre_ingest(state: AppState, media_urls: Vec<String>) -> usize {
        let creatives = make_creatives(&media_urls, &state.config.key);
        let partition = partition_creatives(state.store.as_ref(), creatives, false).await;
        dispatch_jobs(
            &state.encore,
            &state.store,
            partition.to_dispatch(),
            state.config.in_flight_ttl,
        );
        partition.missing.len()
    }
}
