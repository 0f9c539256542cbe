use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::adserver::client::AdServerClient;
use crate::infrastructure::encore::client::EncoreClient;
use crate::store::TranscodeStore;
use crate::workers::kpi::KpiReporter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn TranscodeStore>,
    pub encore: Arc<dyn EncoreClient>,
    pub ad_server: AdServerClient,
    pub kpi: KpiReporter,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn TranscodeStore>,
        encore: Arc<dyn EncoreClient>,
        ad_server: AdServerClient,
        kpi: KpiReporter,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            encore,
            ad_server,
            kpi,
        }
    }
}
