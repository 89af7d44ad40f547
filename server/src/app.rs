//! Core application

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{ENV_LOG, LOG_TARGET};
use crate::core::shutdown::ShutdownService;
use crate::data::{ConsistencyWaiter, GraphReader, Neo4jHttpReader, WaitOutcome};
use crate::domain::query::EntityType;
use crate::domain::search::compile_search;
use crate::domain::{SearchRequest, SearchService};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub reader: Arc<dyn GraphReader>,
    pub search: SearchService,
    pub waiter: ConsistencyWaiter,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        let (cli_config, command) = cli::parse();
        Self::init_logging(cli_config.debug);

        tracing::debug!("Application starting");
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Compile {
                tenant,
                entity,
                request,
            }) => Self::print_compiled(&cli_config, &tenant, entity, &request),
            Some(Commands::Wait {
                tenant,
                entity,
                id,
                deleted,
                timeout_secs,
            }) => {
                let app = Self::init(&cli_config)?;
                app.shutdown.install_signal_handlers();
                app.wait_for_node(&tenant, entity, &id, deleted, timeout_secs)
                    .await
            }
            Some(Commands::Serve) | None => {
                let app = Self::init(&cli_config)?;
                Self::start_server(app).await
            }
        }
    }

    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let reader: Arc<dyn GraphReader> = Arc::new(
            Neo4jHttpReader::new(&config.graph).context("Failed to initialize graph client")?,
        );
        let search = SearchService::new(reader.clone(), config.query.limits());
        let waiter = ConsistencyWaiter::new(reader.clone(), config.consistency.wait_config());

        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            reader,
            search,
            waiter,
        })
    }

    /// Compile a search request offline and print statements with parameters
    fn print_compiled(
        cli: &CliConfig,
        tenant: &str,
        entity: EntityType,
        request: &str,
    ) -> Result<()> {
        let config = AppConfig::load(cli)?;
        let request: SearchRequest =
            serde_json::from_str(request).context("Failed to parse search request JSON")?;
        let compiled = compile_search(tenant, entity, &request, config.query.limits())?;
        println!("{}", serde_json::to_string_pretty(&compiled)?);
        Ok(())
    }

    async fn wait_for_node(
        &self,
        tenant: &str,
        entity: EntityType,
        id: &str,
        deleted: bool,
        timeout_secs: Option<u64>,
    ) -> Result<()> {
        let token = self.shutdown.token();
        let label = entity.label();
        let outcome = match (deleted, timeout_secs) {
            (true, Some(secs)) => {
                self.waiter
                    .wait_for_deleted_with_timeout(
                        &token,
                        tenant,
                        id,
                        label,
                        Duration::from_secs(secs),
                    )
                    .await
            }
            (true, None) => self.waiter.wait_for_deleted(&token, tenant, id, label).await,
            (false, Some(secs)) => {
                self.waiter
                    .wait_for_created_with_timeout(
                        &token,
                        tenant,
                        id,
                        label,
                        Duration::from_secs(secs),
                    )
                    .await
            }
            (false, None) => self.waiter.wait_for_created(&token, tenant, id, label).await,
        };

        match outcome {
            WaitOutcome::Confirmed { attempts } => {
                println!("{} {} confirmed after {} attempt(s)", label, id, attempts);
            }
            WaitOutcome::GaveUp { .. } | WaitOutcome::Cancelled { .. } => {
                outcome.into_result()?;
            }
        }
        Ok(())
    }

    fn init_logging(debug: bool) {
        let level = if debug { "debug" } else { "info" };
        let default_filter = format!("info,{}={}", LOG_TARGET, level);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        tracing::info!(
            host = %app.config.server.host,
            port = app.config.server.port,
            graph = %app.config.graph.url,
            database = %app.config.graph.database,
            "Starting crmgraph server"
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.trigger();
        tracing::debug!("Shutdown complete");

        Ok(())
    }
}
