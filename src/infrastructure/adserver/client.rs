//! Fetches ad documents from the upstream ad-decisioning server.
use std::io::Read;
use std::time::Duration;

use bytes::Bytes;
use flate2::read::GzDecoder;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONTENT_ENCODING, USER_AGENT};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::common::url::replace_subdomain;

pub const DEVICE_USER_AGENT: &str = "X-Device-User-Agent";
pub const FORWARDED_FOR: &str = "X-Forwarded-For";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum AdServerError {
    #[error("ad server responded with status {0}")]
    Status(u16),
    #[error("ad server request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decompress ad server response: {0}")]
    Gzip(#[from] std::io::Error),
}

/// The parts of an inbound ad request that are passed on upstream.
#[derive(Debug, Clone, Default)]
pub struct AdServerRequest {
    pub query: Vec<(String, String)>,
    pub device_user_agent: Option<String>,
    pub forwarded_for: Option<String>,
}

impl AdServerRequest {
    /// Tenant subdomain, matched case-insensitively on the parameter name.
    pub fn subdomain(&self) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(k, v)| k.eq_ignore_ascii_case("subdomain") && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    pub fn forwarded_query(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query
            .iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case("subdomain"))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Clone)]
pub struct AdServerClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AdServerClient {
    pub fn new(base_url: Url) -> Result<Self, AdServerError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base_url })
    }

    pub fn target_url(&self, request: &AdServerRequest) -> Url {
        let mut url = match request.subdomain() {
            Some(subdomain) => replace_subdomain(&self.base_url, subdomain),
            None => self.base_url.clone(),
        };
        let forwarded: Vec<(&str, &str)> = request.forwarded_query().collect();
        if !forwarded.is_empty() {
            url.query_pairs_mut().extend_pairs(forwarded);
        }
        url
    }

    /// Raw, decompressed response body.
    pub async fn fetch(&self, request: &AdServerRequest) -> Result<Bytes, AdServerError> {
        let url = self.target_url(request);
        debug!(url = %url, "Requesting ad document");

        let mut builder = self
            .http
            .get(url)
            .header(USER_AGENT, "ad-normalizer")
            .header(ACCEPT, "application/xml")
            .header(ACCEPT_ENCODING, "gzip");
        if let Some(ua) = &request.device_user_agent {
            builder = builder.header(DEVICE_USER_AGENT, ua);
        }
        if let Some(ff) = &request.forwarded_for {
            builder = builder.header(FORWARDED_FOR, ff);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            error!(status = status.as_u16(), "Ad server returned an error");
            return Err(AdServerError::Status(status.as_u16()));
        }

        let gzipped = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("gzip"));
        let body = response.bytes().await?;
        if gzipped { gunzip(&body) } else { Ok(body) }
    }
}

fn gunzip(data: &[u8]) -> Result<Bytes, AdServerError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::{Compression, write::GzEncoder};

    use super::*;

    fn request(pairs: &[(&str, &str)]) -> AdServerRequest {
        AdServerRequest {
            query: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn subdomain_is_not_forwarded() {
        let client = AdServerClient::new(Url::parse("https://ads.example.com/api/vast").unwrap()).unwrap();
        let req = request(&[("SubDomain", "tenant"), ("dur", "30"), ("filler", "x")]);
        assert_eq!(req.subdomain(), Some("tenant"));
        assert_eq!(
            client.target_url(&req).as_str(),
            "https://tenant.example.com/api/vast?dur=30&filler=x"
        );
    }

    #[test]
    fn no_query_keeps_base_url() {
        let client = AdServerClient::new(Url::parse("https://ads.example.com/api/vast").unwrap()).unwrap();
        assert_eq!(
            client.target_url(&AdServerRequest::default()).as_str(),
            "https://ads.example.com/api/vast"
        );
    }

    #[test]
    fn gzip_bodies_are_decoded() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<VAST version=\"4.0\"/>").unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(&gunzip(&compressed).unwrap()[..], b"<VAST version=\"4.0\"/>");
        assert!(gunzip(b"not gzip").is_err());
    }
}
