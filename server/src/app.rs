//! Core application

use std::sync::Arc;

use anyhow::Result;

use crate::api::ApiServer;
use crate::core::cli::{self, CliConfig, Commands, LogFormat};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG, ENV_LOG_FORMAT};
use crate::core::shutdown::ShutdownService;
use crate::data::Store;
use crate::domain::analytics::AnalyticsService;
use crate::domain::ingest::IngestionService;
use crate::domain::pricing::PricingTable;
use crate::domain::traces::TraceService;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub store: Arc<Store>,
    pub pricing: Arc<PricingTable>,
    pub ingestion: Arc<IngestionService>,
    pub traces: Arc<TraceService>,
    pub analytics: Arc<AnalyticsService>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();

        let (cli_config, command) = cli::parse();
        Self::init_logging(&cli_config);

        tracing::debug!("Application starting");

        match command {
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let store = Arc::new(Store::init(&config.database.url).await?);

        let pricing = Arc::new(PricingTable::embedded()?);
        tracing::debug!(models = pricing.model_count(), "Pricing table loaded");

        let shutdown = ShutdownService::new();
        let ingestion =
            IngestionService::start(store.clone(), pricing.clone(), &config.ingest, &shutdown)
                .await;
        let traces = Arc::new(TraceService::new(store.clone()));
        let analytics = Arc::new(AnalyticsService::new(store.clone()));

        Ok(Self {
            shutdown,
            config,
            store,
            pricing,
            ingestion,
            traces,
            analytics,
        })
    }

    fn init_logging(cli: &CliConfig) {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        let format = cli.log_format.unwrap_or_else(|| {
            match std::env::var(ENV_LOG_FORMAT).as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Compact,
            }
        });

        let builder = tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_env_filter(filter);

        match format {
            LogFormat::Json => builder.json().init(),
            LogFormat::Compact => builder.compact().init(),
        }
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        tracing::info!(
            workers = app.config.ingest.workers,
            queue_capacity = app.config.ingest.queue_capacity,
            "Starting {}",
            APP_NAME_LOWER
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;

        // HTTP listener is down; drain the worker pool, then close the store
        app.shutdown.shutdown().await;
        if let Err(e) = app.store.checkpoint().await {
            tracing::warn!(error = %e, "Final checkpoint failed");
        }
        app.store.close().await;

        tracing::debug!("Shutdown complete");
        Ok(())
    }
}
