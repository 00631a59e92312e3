//! Application state and initialization
//!
//! Wires the store configuration, the document store, and the services
//! together. A caller (the rendering layer) builds one `AppState` at startup
//! and hands clones of the services to its screens.

use crate::config::{StoreConfig, CONFIG_FILE_NAME};
use crate::database::{create_pool, SqliteGateway};
use crate::error::Result;
use crate::gateway::RemoteCollectionGateway;
use crate::services::{ProfileService, RecipesService};
use std::path::PathBuf;
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub config: StoreConfig,
    pub recipes_service: RecipesService,
    pub profile_service: ProfileService,
}

impl AppState {
    /// Build state over an already constructed gateway
    pub fn with_gateway(
        app_data_dir: PathBuf,
        config: StoreConfig,
        gateway: Arc<dyn RemoteCollectionGateway>,
    ) -> Self {
        Self {
            app_data_dir,
            config,
            recipes_service: RecipesService::new(gateway.clone()),
            profile_service: ProfileService::new(gateway),
        }
    }
}

/// Application setup - called once on startup
pub async fn setup(app_data_dir: PathBuf) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("App data directory: {:?}", app_data_dir);

    tokio::fs::create_dir_all(&app_data_dir).await?;

    let config = StoreConfig::load(&app_data_dir.join(CONFIG_FILE_NAME)).await?;
    let pool = create_pool(&app_data_dir.join(&config.database_file_name), &config).await?;
    let gateway: Arc<dyn RemoteCollectionGateway> = Arc::new(SqliteGateway::new(pool));

    let state = AppState::with_gateway(app_data_dir, config, gateway);

    tracing::info!("Application initialized successfully");

    Ok(state)
}
