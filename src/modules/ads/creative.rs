use std::collections::BTreeMap;

use tracing::debug;

use super::model::{Ad, MediaFile, Vast};
use crate::config::settings::{KeyConfig, KeyField};

/// A creative found in an ad request, identified by its cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreativeAsset {
    pub creative_id: String,
    pub source_url: String,
    /// Rendition served for this creative; the source until a transcode is ready.
    pub master_playlist_url: String,
}

impl CreativeAsset {
    pub fn new(creative_id: impl Into<String>, source_url: impl Into<String>) -> Self {
        let source_url = source_url.into();
        Self {
            creative_id: creative_id.into(),
            master_playlist_url: source_url.clone(),
            source_url,
        }
    }
}

/// Highest-bitrate media file across the ad's linear creatives. The first one
/// wins on equal bitrate. `None` when the ad carries no media file with a
/// positive bitrate.
pub fn best_media_file(ad: &Ad) -> Option<&MediaFile> {
    let mut best: Option<&MediaFile> = None;
    let files = ad
        .in_line
        .iter()
        .flat_map(|il| il.creatives.items.iter())
        .filter_map(|c| c.linear.as_ref())
        .flat_map(|l| l.media_files.items.iter());
    for file in files {
        if file.bitrate() > best.map_or(0, MediaFile::bitrate) {
            best = Some(file);
        }
    }
    best
}

fn universal_ad_id(ad: &Ad) -> &str {
    ad.in_line
        .as_ref()
        .and_then(|il| il.creatives.items.first())
        .and_then(|c| c.universal_ad_ids.first())
        .map(|id| id.value())
        .unwrap_or_default()
}

pub fn url_to_key(url: &str, key: &KeyConfig) -> String {
    key.regex.replace_all(url, "").into_owned()
}

pub fn derive_key(ad: &Ad, media_file: Option<&MediaFile>, key: &KeyConfig) -> String {
    match key.field {
        KeyField::Resolution => {
            let (w, h) = media_file
                .map(|m| (m.width.unwrap_or(0), m.height.unwrap_or(0)))
                .unwrap_or((0, 0));
            format!("{w}x{h}")
        }
        KeyField::Url => url_to_key(media_file.map_or("", |m| m.url.trim()), key),
        KeyField::UniversalAdId => key.regex.replace_all(universal_ad_id(ad), "").into_owned(),
    }
}

pub fn creative_for_ad(ad: &Ad, key: &KeyConfig) -> CreativeAsset {
    let media_file = best_media_file(ad);
    let creative_id = derive_key(ad, media_file, key);
    let url = media_file.map_or("", |m| m.url.trim());
    CreativeAsset::new(creative_id, url)
}

/// Creatives referenced by a VAST document, keyed by creative id. Ads that
/// resolve to the same key collapse into one entry.
pub fn get_creatives(vast: &Vast, key: &KeyConfig) -> BTreeMap<String, CreativeAsset> {
    let mut creatives = BTreeMap::new();
    for ad in &vast.ads {
        let creative = creative_for_ad(ad, key);
        debug!(
            creative_id = %creative.creative_id,
            url = %creative.source_url,
            "Mapped creative"
        );
        creatives.insert(creative.creative_id.clone(), creative);
    }
    creatives
}

/// Creatives for a plain list of media URLs, always keyed by URL.
pub fn make_creatives(urls: &[String], key: &KeyConfig) -> BTreeMap<String, CreativeAsset> {
    urls.iter()
        .map(|url| {
            let creative = CreativeAsset::new(url_to_key(url, key), url.as_str());
            (creative.creative_id.clone(), creative)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::DEFAULT_KEY_REGEX;
    use crate::modules::ads::model::{Creative, Creatives, InLine, Linear, MediaFiles, UniversalAdId};

    fn media(url: &str, bitrate: u32, w: u32, h: u32) -> MediaFile {
        MediaFile {
            delivery: "progressive".into(),
            media_type: "video/mp4".into(),
            width: Some(w),
            height: Some(h),
            bitrate: Some(bitrate),
            url: url.into(),
            ..Default::default()
        }
    }

    fn ad(universal_id: &str, files: Vec<MediaFile>) -> Ad {
        Ad {
            id: Some("ad".into()),
            in_line: Some(InLine {
                creatives: Creatives {
                    items: vec![Creative {
                        universal_ad_ids: vec![UniversalAdId {
                            id_registry: "ad-id.org".into(),
                            id: universal_id.into(),
                            ..Default::default()
                        }],
                        linear: Some(Linear {
                            media_files: MediaFiles {
                                items: files,
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

    fn key(field: KeyField) -> KeyConfig {
        KeyConfig::new(field, DEFAULT_KEY_REGEX).unwrap()
    }

    #[test]
    fn best_media_file_prefers_strictly_higher_bitrate() {
        let ad = ad(
            "id",
            vec![
                media("https://m/a.mp4", 1000, 640, 360),
                media("https://m/b.mp4", 3000, 1280, 720),
                media("https://m/c.mp4", 3000, 1920, 1080),
            ],
        );
        assert_eq!(best_media_file(&ad).unwrap().url, "https://m/b.mp4");
    }

    #[test]
    fn ad_without_media_has_no_best_file() {
        let empty = ad("id", vec![]);
        assert!(best_media_file(&empty).is_none());
        assert!(best_media_file(&Ad::default()).is_none());
    }

    #[test]
    fn keys_follow_configured_field() {
        let ad = ad("CNPA-0484.000H", vec![media("https://m.example.com/a.mp4", 1000, 1920, 1080)]);
        let best = best_media_file(&ad);

        assert_eq!(derive_key(&ad, best, &key(KeyField::Resolution)), "1920x1080");
        assert_eq!(derive_key(&ad, best, &key(KeyField::Url)), "httpsmexamplecomamp4");
        assert_eq!(derive_key(&ad, best, &key(KeyField::UniversalAdId)), "CNPA0484000H");
    }

    #[test]
    fn key_derivation_is_stable() {
        let ad = ad("same-id", vec![media("https://m/x.mp4", 1, 1, 1)]);
        let config = key(KeyField::UniversalAdId);
        let first = creative_for_ad(&ad, &config);
        for _ in 0..3 {
            assert_eq!(creative_for_ad(&ad, &config), first);
        }
    }

    #[test]
    fn ad_without_creatives_still_gets_a_key() {
        let creative = creative_for_ad(&Ad::default(), &key(KeyField::Resolution));
        assert_eq!(creative.creative_id, "0x0");
        assert!(creative.source_url.is_empty());
    }

    #[test]
    fn url_list_is_keyed_by_url() {
        let urls = vec!["https://m/a.mp4".to_string(), "https://m/a.mp4".to_string()];
        let creatives = make_creatives(&urls, &key(KeyField::UniversalAdId));
        assert_eq!(creatives.len(), 1);
        let creative = creatives.get("httpsmamp4").unwrap();
        assert_eq!(creative.source_url, "https://m/a.mp4");
        assert_eq!(creative.master_playlist_url, "https://m/a.mp4");
    }
}
