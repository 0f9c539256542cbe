use tracing::info;

use super::dto::BlacklistResponse;
use crate::common::pagination::Page;
use crate::state::AppState;
use crate::store::StoreResult;

pub const BLACKLIST_PATH: &str = "/api/v1/blacklist";

pub struct BlacklistService;

impl BlacklistService {
    pub async fn add(state: AppState, media_url: &str) -> StoreResult<()> {
        state.store.blacklist(media_url).await?;
        info!(media_url, "🚫 Media URL blacklisted");
        Ok(())
    }

    pub async fn remove(state: AppState, media_url: &str) -> StoreResult<()> {
        state.store.remove_from_blacklist(media_url).await?;
        info!(media_url, "Media URL removed from blacklist");
        Ok(())
    }

    pub async fn list(state: AppState, page: Page) -> StoreResult<BlacklistResponse> {
        let (media_urls, total) = state.store.list_blacklist(page.page, page.size).await?;
        Ok(BlacklistResponse {
            next: page.next_link(BLACKLIST_PATH, media_urls.len()),
            prev: page.prev_link(BLACKLIST_PATH),
            page: page.page,
            size: media_urls.len(),
            media_urls,
            total_count: total,
        })
    }
}
