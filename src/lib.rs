pub mod api;
pub mod config;
pub mod db;
pub mod notifications;
pub mod orders;
pub mod settings;

pub use db::DbPool;

use std::sync::Arc;

use config::Config;
use notifications::PendingOrderEmail;
use orders::SqliteOrderRepository;
use settings::SettingsStore;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub settings: Arc<dyn SettingsStore>,
    pub orders: Arc<SqliteOrderRepository>,
    pub notifier: Arc<PendingOrderEmail>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: DbPool,
        settings: Arc<dyn SettingsStore>,
        orders: Arc<SqliteOrderRepository>,
        notifier: Arc<PendingOrderEmail>,
    ) -> Self {
        Self {
            config,
            db,
            settings,
            orders,
            notifier,
        }
    }
}
