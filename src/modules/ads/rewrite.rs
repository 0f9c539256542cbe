use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use super::creative::{CreativeAsset, best_media_file, derive_key};
use super::model::{
    Ad, AdSystem, Creative, Creatives, InLine, Linear, MediaFile, MediaFiles, UniversalAdId, Vast,
};
use crate::config::settings::KeyConfig;

pub const HLS_MEDIA_TYPE: &str = "application/x-mpegURL";
pub const FILLER_ID: &str = "NORMALIZER_FILLER";

/// Interstitial-style descriptor returned to clients asking for JSON.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AssetDescription {
    #[serde(rename = "URI")]
    pub uri: String,
    /// Seconds.
    #[serde(rename = "DURATION")]
    pub duration: f64,
}

/// Keeps only ads whose creative is ready, pointing each at its transcoded
/// rendition. The linear creative is left with a single media file.
pub fn replace_media_files(
    vast: &mut Vast,
    ready: &BTreeMap<String, CreativeAsset>,
    key: &KeyConfig,
) {
    let ads = std::mem::take(&mut vast.ads);
    vast.ads = ads
        .into_iter()
        .filter_map(|ad| {
            let best = best_media_file(&ad);
            let asset = ready.get(&derive_key(&ad, best, key))?;
            let replacement = MediaFile {
                url: asset.master_playlist_url.clone(),
                media_type: HLS_MEDIA_TYPE.to_string(),
                ..best.cloned().unwrap_or_default()
            };
            Some(with_media_file(ad, replacement))
        })
        .collect();
}

fn with_media_file(mut ad: Ad, media_file: MediaFile) -> Ad {
    let linear = ad
        .in_line
        .as_mut()
        .and_then(|il| il.creatives.items.iter_mut().find_map(|c| c.linear.as_mut()));
    if let Some(linear) = linear {
        linear.media_files.items = vec![media_file];
    }
    ad
}

/// Synthetic ad that plays `url`, so players never get an empty document.
pub fn filler_ad(url: &str, sequence: u32) -> Ad {
    Ad {
        id: Some(FILLER_ID.to_string()),
        sequence: Some(sequence),
        in_line: Some(InLine {
            ad_system: Some(AdSystem {
                version: None,
                name: "ad-normalizer".to_string(),
            }),
            ad_title: Some(FILLER_ID.to_string()),
            creatives: Creatives {
                items: vec![Creative {
                    id: Some(FILLER_ID.to_string()),
                    universal_ad_ids: vec![UniversalAdId {
                        id_registry: "ad-normalizer".to_string(),
                        id_value: None,
                        id: FILLER_ID.to_string(),
                    }],
                    linear: Some(Linear {
                        media_files: MediaFiles {
                            items: vec![MediaFile {
                                delivery: "streaming".to_string(),
                                media_type: HLS_MEDIA_TYPE.to_string(),
                                bitrate: Some(1),
                                url: url.to_string(),
                                ..Default::default()
                            }],
                            ..Default::default()
                        },
                        ..Default::default()
                    }),
                    ..Default::default()
                }],
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn append_filler(vast: &mut Vast, url: &str) {
    let sequence = u32::try_from(vast.ads.len() + 1).unwrap_or(u32::MAX);
    vast.ads.push(filler_ad(url, sequence));
}

/// `HH:MM:SS[.mmm]` to seconds. Malformed values count as zero.
pub fn parse_duration(raw: &str) -> f64 {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    let [h, m, s] = parts.as_slice() else {
        return 0.0;
    };
    match (h.parse::<f64>(), m.parse::<f64>(), s.parse::<f64>()) {
        (Ok(h), Ok(m), Ok(s)) => h * 3600.0 + m * 60.0 + s,
        _ => 0.0,
    }
}

fn ad_duration(ad: &Ad) -> f64 {
    ad.in_line
        .as_ref()
        .and_then(|il| il.creatives.items.first())
        .and_then(|c| c.linear.as_ref())
        .and_then(|l| l.duration.as_deref())
        .map(parse_duration)
        .unwrap_or(0.0)
}

pub fn asset_descriptions(vast: &Vast) -> Vec<AssetDescription> {
    vast.ads
        .iter()
        .map(|ad| AssetDescription {
            uri: best_media_file(ad)
                .map(|m| m.url.trim().to_string())
                .unwrap_or_default(),
            duration: ad_duration(ad),
        })
        .collect()
}
