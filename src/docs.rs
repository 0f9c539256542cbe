use utoipa::OpenApi;

use crate::modules::ads::dto::{PreIngestRequest, PreIngestResponse};
use crate::modules::ads::rewrite::AssetDescription;
use crate::modules::blacklist::dto::{BlacklistRequest, BlacklistResponse};
use crate::modules::jobs::dto::{
    EncoreJobProgress, PackagingFailureBody, PackagingFailureMessage, PackagingSuccessBody,
    StatusResponse,
};
use crate::modules::jobs::model::{TranscodeRecord, TranscodeStatus};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::ads::handler::get_vast,
        crate::modules::ads::handler::get_vmap,
        crate::modules::ads::handler::pre_ingest,
        crate::modules::blacklist::handler::add_to_blacklist,
        crate::modules::blacklist::handler::remove_from_blacklist,
        crate::modules::blacklist::handler::list_blacklist,
        crate::modules::jobs::handler::list_status,
        crate::modules::jobs::handler::encore_callback,
        crate::modules::jobs::handler::packaging_success,
        crate::modules::jobs::handler::packaging_failure,
    ),
    components(
        schemas(
            AssetDescription, PreIngestRequest, PreIngestResponse,
            BlacklistRequest, BlacklistResponse,
            TranscodeRecord, TranscodeStatus, StatusResponse,
            EncoreJobProgress, PackagingSuccessBody, PackagingFailureBody, PackagingFailureMessage,
        )
    ),
    tags(
        (name = "Ads", description = "VAST/VMAP normalization"),
        (name = "Blacklist", description = "Media URLs that are never transcoded"),
        (name = "Jobs", description = "Transcode job status"),
        (name = "Callbacks", description = "Webhooks for the transcode and packaging services")
    )
)]
pub struct ApiDoc;
