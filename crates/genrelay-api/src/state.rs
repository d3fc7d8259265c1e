//! Application state wiring the pipeline together.
//!
//! The pipeline is generic over repositories, generators, and the
//! responder; `AppState` pins it to the concrete infra implementations and
//! the stdio responder.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use genrelay_core::classify::PrefixSet;
use genrelay_core::conversation::ConversationService;
use genrelay_core::gate::AdmissionGate;
use genrelay_core::pipeline::Pipeline;
use genrelay_core::retry::RetryPolicy;
use genrelay_infra::config::{self, CONFIG_PATH_ENV};
use genrelay_infra::gateway::GatewayClient;
use genrelay_infra::sqlite::{
    DatabasePool, SqliteConversationRepository, SqliteMessageRepository,
    SqlitePreferencesRepository, SqliteStatusRepository,
};

use crate::stdio::StdioResponder;

/// The pipeline pinned to the concrete infra implementations.
pub type ConcretePipeline = Pipeline<
    SqliteMessageRepository,
    SqliteConversationRepository,
    SqliteStatusRepository,
    SqlitePreferencesRepository,
    GatewayClient,
    GatewayClient,
    StdioResponder,
>;

/// Shared application state for all commands.
pub struct AppState {
    pub pipeline: Arc<ConcretePipeline>,
    /// Separate status handle for the admin commands.
    pub statuses: SqliteStatusRepository,
    /// Separate preferences handle for the admin commands.
    pub prefs: SqlitePreferencesRepository,
}

impl AppState {
    /// Initialize the application state: load config, connect to the
    /// database, wire the pipeline.
    pub async fn init() -> anyhow::Result<Self> {
        let config_path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));
        let config = config::load_config(&config_path).await;

        let db_pool = DatabasePool::new(&config.database_url).await?;

        let api_key = match std::env::var("GENRELAY_API_KEY") {
            Ok(key) => SecretString::from(key),
            Err(_) => {
                tracing::warn!("GENRELAY_API_KEY is not set; gateway calls will be rejected");
                SecretString::from(String::new())
            }
        };
        let gateway = GatewayClient::new(
            api_key,
            config.gateway.base_url.clone(),
            config.gateway.text_model.clone(),
            config.gateway.art_model.clone(),
        )
        .with_timeout(Duration::from_secs(config.gateway.timeout_secs));

        let prefixes = PrefixSet::new(
            config.triggers.text_prefixes.clone(),
            config.triggers.art_prefixes.clone(),
            config.triggers.ignore_prefixes.clone(),
            config.triggers.ignore_postfixes.clone(),
        );

        let pipeline = Pipeline::new(
            SqliteMessageRepository::new(db_pool.clone()),
            ConversationService::new(SqliteConversationRepository::new(db_pool.clone())),
            SqliteStatusRepository::new(db_pool.clone()),
            SqlitePreferencesRepository::new(db_pool.clone()),
            gateway.clone(),
            gateway,
            StdioResponder::new(),
            AdmissionGate::new(config.limits.rate_per_sec, config.limits.concurrent)?,
            RetryPolicy::new(config.limits.retry_attempts)?,
            prefixes,
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
            statuses: SqliteStatusRepository::new(db_pool.clone()),
            prefs: SqlitePreferencesRepository::new(db_pool),
        })
    }
}
