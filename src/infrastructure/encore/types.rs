use serde::{Deserialize, Deserializer, Serialize};

/// Reads an explicit JSON `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A transcode job as submitted to, and reported back by, the Encore service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoreJob {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub output_folder: String,
    #[serde(default)]
    pub base_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<EncoreInput>,
    #[serde(
        rename = "output",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub outputs: Vec<EncoreOutput>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub progress_callback_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoreInput {
    pub uri: String,
    #[serde(default)]
    pub seek_to: f64,
    #[serde(default)]
    pub copy_ts: bool,
    #[serde(rename = "type", default)]
    pub media_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoreOutput {
    #[serde(rename = "type", default)]
    pub media_type: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub overall_bitrate: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub video_streams: Vec<EncoreVideoStream>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub audio_streams: Vec<EncoreAudioStream>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoreVideoStream {
    #[serde(default)]
    pub codec: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub frame_rate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoreAudioStream {
    #[serde(default)]
    pub codec: String,
    #[serde(default)]
    pub channels: u32,
    #[serde(default)]
    pub sampling_rate: u32,
    #[serde(default)]
    pub profile: String,
}

impl EncoreJob {
    pub fn source_uri(&self) -> Option<&str> {
        self.inputs.first().map(|i| i.uri.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_lists_read_as_empty() {
        let job: EncoreJob = serde_json::from_str(
            r#"{
                "id": "job-1",
                "externalId": "CREATIVE1",
                "status": "SUCCESSFUL",
                "inputs": null,
                "output": [
                    {"type": "VideoFile", "videoStreams": [{"width": 1280, "height": 720, "frameRate": "25/1"}], "audioStreams": null},
                    {"type": "AudioFile", "videoStreams": null}
                ]
            }"#,
        )
        .unwrap();

        assert!(job.inputs.is_empty());
        assert_eq!(job.source_uri(), None);
        assert_eq!(job.outputs.len(), 2);
        assert_eq!(job.outputs[0].video_streams[0].width, 1280);
        assert!(job.outputs[0].audio_streams.is_empty());
        assert!(job.outputs[1].video_streams.is_empty());

        let no_outputs: EncoreJob = serde_json::from_str(r#"{"id": "job-2", "output": null}"#).unwrap();
        assert!(no_outputs.outputs.is_empty());
    }
}
