use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: AppConfig,
}
