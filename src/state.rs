use std::sync::Arc;

use crate::{config::AppConfig, db::DbPool, payments::PaymentGateway};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub payments: Arc<dyn PaymentGateway>,
    pub config: AppConfig,
}
