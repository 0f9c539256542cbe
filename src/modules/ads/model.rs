//! Serde model of the VAST and VMAP documents handled by the normalizer.
//!
//! Elements the service reads or rewrites are typed. Elements it only has to
//! hand back to the player (extensions, verifications, companions and the
//! like) are kept as opaque [`XmlNode`] trees so they survive a rewrite.
//! VMAP elements carry the `vmap:` prefix on output; the prefix is stripped
//! by the XML deserializer, so decoding matches on the local name.
use std::fmt;
use std::str::FromStr;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const VMAP_NAMESPACE: &str = "http://www.iab.net/videosuite/vmap";
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("failed to decode document: {0}")]
    Decode(#[from] quick_xml::de::DeError),
    #[error("failed to encode document: {0}")]
    Encode(#[from] quick_xml::se::SeError),
}

/// Numeric attribute that reads empty or malformed values as absent.
fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| v.trim().parse().ok()))
}

/// An element kept as-is: attributes, text and child elements in document
/// order. Mixed content is written back with the text first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<(String, XmlNode)>,
}

impl XmlNode {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

impl Serialize for XmlNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.attributes.len() + self.children.len() + usize::from(self.text.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (name, value) in &self.attributes {
            map.serialize_entry(&format!("@{name}"), value)?;
        }
        if let Some(text) = &self.text {
            map.serialize_entry("$text", text)?;
        }
        for (name, child) in &self.children {
            map.serialize_entry(name, child)?;
        }
        map.end()
    }
}

struct XmlNodeVisitor;

impl<'de> Visitor<'de> for XmlNodeVisitor {
    type Value = XmlNode;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an XML element")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<XmlNode, A::Error> {
        let mut node = XmlNode::default();
        while let Some(key) = map.next_key::<String>()? {
            if let Some(attribute) = key.strip_prefix('@') {
                node.attributes.push((attribute.to_string(), map.next_value()?));
            } else if key == "$text" || key == "$value" {
                let text: String = map.next_value()?;
                if !text.is_empty() {
                    node.text = Some(text);
                }
            } else {
                let child = map.next_value()?;
                node.children.push((key, child));
            }
        }
        Ok(node)
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<XmlNode, E> {
        Ok(XmlNode {
            text: (!v.is_empty()).then(|| v.to_string()),
            ..Default::default()
        })
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<XmlNode, E> {
        Ok(XmlNode::default())
    }
}

impl<'de> Deserialize<'de> for XmlNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(XmlNodeVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "VAST")]
pub struct Vast {
    #[serde(rename = "@version", default)]
    pub version: String,
    #[serde(rename = "Ad", default)]
    pub ads: Vec<Ad>,
    #[serde(rename = "Error", default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ad {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "@sequence",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub sequence: Option<u32>,
    #[serde(rename = "@adType", default, skip_serializing_if = "Option::is_none")]
    pub ad_type: Option<String>,
    #[serde(rename = "@conditionalAd", default, skip_serializing_if = "Option::is_none")]
    pub conditional_ad: Option<String>,
    #[serde(rename = "InLine", default, skip_serializing_if = "Option::is_none")]
    pub in_line: Option<InLine>,
    /// Wrapper ads are passed through untouched.
    #[serde(rename = "Wrapper", default, skip_serializing_if = "Option::is_none")]
    pub wrapper: Option<XmlNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InLine {
    #[serde(rename = "AdSystem", default, skip_serializing_if = "Option::is_none")]
    pub ad_system: Option<AdSystem>,
    #[serde(rename = "Error", default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(rename = "Extensions", default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<XmlNode>,
    #[serde(rename = "Impression", default, skip_serializing_if = "Vec::is_empty")]
    pub impressions: Vec<UriElement>,
    #[serde(rename = "Pricing", default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<XmlNode>,
    #[serde(rename = "AdServingId", default, skip_serializing_if = "Option::is_none")]
    pub ad_serving_id: Option<String>,
    #[serde(rename = "AdTitle", default, skip_serializing_if = "Option::is_none")]
    pub ad_title: Option<String>,
    #[serde(rename = "Category", default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<XmlNode>,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Advertiser", default, skip_serializing_if = "Option::is_none")]
    pub advertiser: Option<String>,
    #[serde(rename = "AdVerifications", default, skip_serializing_if = "Option::is_none")]
    pub ad_verifications: Option<XmlNode>,
    #[serde(rename = "Survey", default, skip_serializing_if = "Option::is_none")]
    pub survey: Option<XmlNode>,
    #[serde(rename = "Creatives", default)]
    pub creatives: Creatives,
    #[serde(rename = "ViewableImpression", default, skip_serializing_if = "Option::is_none")]
    pub viewable_impression: Option<XmlNode>,
    #[serde(rename = "Expires", default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdSystem {
    #[serde(rename = "@version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "$text", default)]
    pub name: String,
}

/// Element whose text is a URI, optionally identified by an `id` attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UriElement {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "$text", default)]
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Creatives {
    #[serde(rename = "Creative", default)]
    pub items: Vec<Creative>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Creative {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "@adId", default, skip_serializing_if = "Option::is_none")]
    pub ad_id: Option<String>,
    #[serde(
        rename = "@sequence",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub sequence: Option<u32>,
    #[serde(rename = "@apiFramework", default, skip_serializing_if = "Option::is_none")]
    pub api_framework: Option<String>,
    #[serde(rename = "UniversalAdId", default, skip_serializing_if = "Vec::is_empty")]
    pub universal_ad_ids: Vec<UniversalAdId>,
    #[serde(rename = "CreativeExtensions", default, skip_serializing_if = "Option::is_none")]
    pub creative_extensions: Option<XmlNode>,
    #[serde(rename = "Linear", default, skip_serializing_if = "Option::is_none")]
    pub linear: Option<Linear>,
    #[serde(rename = "NonLinearAds", default, skip_serializing_if = "Option::is_none")]
    pub non_linear_ads: Option<XmlNode>,
    #[serde(rename = "CompanionAds", default, skip_serializing_if = "Option::is_none")]
    pub companion_ads: Option<XmlNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniversalAdId {
    #[serde(rename = "@idRegistry", default)]
    pub id_registry: String,
    /// VAST 4.0 carries the identifier in an attribute, later versions in the text.
    #[serde(rename = "@idValue", default, skip_serializing_if = "Option::is_none")]
    pub id_value: Option<String>,
    #[serde(rename = "$text", default)]
    pub id: String,
}

impl UniversalAdId {
    pub fn value(&self) -> &str {
        let text = self.id.trim();
        if text.is_empty() {
            self.id_value.as_deref().map(str::trim).unwrap_or_default()
        } else {
            text
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    #[serde(rename = "@skipoffset", default, skip_serializing_if = "Option::is_none")]
    pub skip_offset: Option<String>,
    #[serde(rename = "Duration", default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(rename = "AdParameters", default, skip_serializing_if = "Option::is_none")]
    pub ad_parameters: Option<XmlNode>,
    #[serde(rename = "MediaFiles", default)]
    pub media_files: MediaFiles,
    #[serde(rename = "VideoClicks", default, skip_serializing_if = "Option::is_none")]
    pub video_clicks: Option<VideoClicks>,
    #[serde(rename = "TrackingEvents", default, skip_serializing_if = "Option::is_none")]
    pub tracking_events: Option<TrackingEvents>,
    #[serde(rename = "Icons", default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<XmlNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvents {
    #[serde(rename = "Tracking", default)]
    pub items: Vec<Tracking>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tracking {
    #[serde(rename = "@event", default)]
    pub event: String,
    #[serde(rename = "@offset", default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    #[serde(rename = "$text", default)]
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoClicks {
    #[serde(rename = "ClickThrough", default, skip_serializing_if = "Option::is_none")]
    pub click_through: Option<UriElement>,
    #[serde(rename = "ClickTracking", default, skip_serializing_if = "Vec::is_empty")]
    pub click_tracking: Vec<UriElement>,
    #[serde(rename = "CustomClick", default, skip_serializing_if = "Vec::is_empty")]
    pub custom_clicks: Vec<UriElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaFiles {
    #[serde(rename = "MediaFile", default)]
    pub items: Vec<MediaFile>,
    #[serde(rename = "Mezzanine", default, skip_serializing_if = "Vec::is_empty")]
    pub mezzanines: Vec<XmlNode>,
    #[serde(rename = "InteractiveCreativeFile", default, skip_serializing_if = "Vec::is_empty")]
    pub interactive_creative_files: Vec<XmlNode>,
    #[serde(rename = "ClosedCaptionFiles", default, skip_serializing_if = "Option::is_none")]
    pub closed_caption_files: Option<XmlNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "@delivery", default)]
    pub delivery: String,
    #[serde(rename = "@type", default)]
    pub media_type: String,
    #[serde(
        rename = "@width",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub width: Option<u32>,
    #[serde(
        rename = "@height",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub height: Option<u32>,
    #[serde(
        rename = "@bitrate",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub bitrate: Option<u32>,
    #[serde(rename = "@minBitrate", default, skip_serializing_if = "Option::is_none")]
    pub min_bitrate: Option<String>,
    #[serde(rename = "@maxBitrate", default, skip_serializing_if = "Option::is_none")]
    pub max_bitrate: Option<String>,
    #[serde(rename = "@scalable", default, skip_serializing_if = "Option::is_none")]
    pub scalable: Option<String>,
    #[serde(rename = "@maintainAspectRatio", default, skip_serializing_if = "Option::is_none")]
    pub maintain_aspect_ratio: Option<String>,
    #[serde(rename = "@apiFramework", default, skip_serializing_if = "Option::is_none")]
    pub api_framework: Option<String>,
    #[serde(rename = "@fileSize", default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,
    /// VAST 4.1 `mediaType`, e.g. `2D` or `3D`. Not the MIME type.
    #[serde(rename = "@mediaType", default, skip_serializing_if = "Option::is_none")]
    pub media_kind: Option<String>,
    #[serde(rename = "@codec", default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(rename = "$text", default)]
    pub url: String,
}

impl MediaFile {
    pub fn bitrate(&self) -> u32 {
        self.bitrate.unwrap_or(0)
    }
}

fn vmap_namespace() -> String {
    VMAP_NAMESPACE.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename(serialize = "vmap:VMAP", deserialize = "VMAP"))]
pub struct Vmap {
    #[serde(rename = "@xmlns:vmap", default = "vmap_namespace")]
    pub namespace: String,
    #[serde(rename = "@version", default)]
    pub version: String,
    #[serde(
        rename(serialize = "vmap:AdBreak", deserialize = "AdBreak"),
        default
    )]
    pub ad_breaks: Vec<AdBreak>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdBreak {
    #[serde(rename = "@timeOffset", default)]
    pub time_offset: String,
    #[serde(rename = "@breakType", default)]
    pub break_type: String,
    #[serde(rename = "@breakId", default, skip_serializing_if = "Option::is_none")]
    pub break_id: Option<String>,
    #[serde(
        rename(serialize = "vmap:AdSource", deserialize = "AdSource"),
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ad_source: Option<AdSource>,
    #[serde(
        rename(serialize = "vmap:TrackingEvents", deserialize = "TrackingEvents"),
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tracking_events: Option<VmapTrackingEvents>,
}

impl AdBreak {
    pub fn vast_mut(&mut self) -> Option<&mut Vast> {
        self.ad_source
            .as_mut()?
            .vast_ad_data
            .as_mut()?
            .vast
            .as_mut()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdSource {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "@allowMultipleAds", default, skip_serializing_if = "Option::is_none")]
    pub allow_multiple_ads: Option<String>,
    #[serde(rename = "@followRedirects", default, skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<String>,
    #[serde(
        rename(serialize = "vmap:VASTAdData", deserialize = "VASTAdData"),
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vast_ad_data: Option<VastAdData>,
    #[serde(
        rename(serialize = "vmap:AdTagURI", deserialize = "AdTagURI"),
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ad_tag_uri: Option<AdTagUri>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VastAdData {
    #[serde(rename = "VAST", default, skip_serializing_if = "Option::is_none")]
    pub vast: Option<Vast>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdTagUri {
    #[serde(rename = "@templateType", default, skip_serializing_if = "Option::is_none")]
    pub template_type: Option<String>,
    #[serde(rename = "$text", default)]
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmapTrackingEvents {
    #[serde(
        rename(serialize = "vmap:Tracking", deserialize = "Tracking"),
        default
    )]
    pub items: Vec<VmapTracking>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmapTracking {
    #[serde(rename = "@event", default)]
    pub event: String,
    #[serde(rename = "$text", default)]
    pub uri: String,
}

pub fn decode_vast(raw: &[u8]) -> Result<Vast, DocumentError> {
    let text = std::str::from_utf8(raw)?;
    Ok(quick_xml::de::from_str(text)?)
}

pub fn decode_vmap(raw: &[u8]) -> Result<Vmap, DocumentError> {
    let text = std::str::from_utf8(raw)?;
    Ok(quick_xml::de::from_str(text)?)
}

/// Serializes any document type with an XML declaration in front.
pub fn encode_xml<T: Serialize>(document: &T) -> Result<String, DocumentError> {
    let body = quick_xml::se::to_string(document)?;
    Ok(format!("{XML_DECLARATION}{body}"))
}
