pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use config::Config;
use db::Store;
use state::SharedState;

#[derive(Parser)]
#[command(name = "prospektor")]
#[command(author, version, about = "WordPress lead discovery and outreach backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    #[command(alias = "daemon")]
    Serve,

    /// Run one search cycle from the command line
    #[command(alias = "s")]
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,

        /// Owner identity to store results under
        #[arg(long, default_value = "local")]
        user: String,

        /// Start over from offset 0 instead of resuming
        #[arg(long)]
        reset: bool,
    },

    /// Show stored queries and result counts
    #[command(alias = "h")]
    History {
        /// Owner identity to list
        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Create default config file
    Init,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Init)) {
        Config::create_default_if_missing()?;
        println!("✓ Config file created. Edit config.toml and run again.");
        return Ok(());
    }

    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let mut log_level = config.general.log_level.clone();
    if config.general.suppress_connection_errors {
        log_level.push_str(",reqwest::retry=off,hyper_util=off");
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "prospektor")?
            .extra_field("env", "production")?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    match cli.command {
        None | Some(Commands::Serve) => run_server(config, prometheus_handle).await,
        Some(Commands::Search { query, user, reset }) => {
            let query = query.join(" ");
            cmd_search(config, &query, &user, reset).await
        }
        Some(Commands::History { user }) => cmd_history(config, &user).await,
        Some(Commands::Init) => unreachable!("handled above"),
    }
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "Prospektor v{} starting in server mode...",
        env!("CARGO_PKG_VERSION")
    );

    if !config.server.enabled {
        anyhow::bail!("server.enabled is false; nothing to do");
    }

    let port = config.server.port;
    let state = api::create_app_state_from_config(config, prometheus_handle).await?;
    let app = api::router(state).await;

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Web server running at http://{}", addr);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {}", e);
        }
    });

    info!("Server running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }

    server.abort();
    info!("Server stopped");

    Ok(())
}

async fn cmd_search(config: Config, query: &str, user: &str, reset: bool) -> anyhow::Result<()> {
    println!("Searching for: {}", query);

    let shared = Arc::new(SharedState::new(config).await?);
    let outcome = shared
        .search_service
        .run_cycle(query, user, reset)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if outcome.results.is_empty() {
        println!("No new domains found.");
    } else {
        println!();
        println!("New domains ({} total):", outcome.results.len());
        println!("{:-<60}", "");
        for row in &outcome.results {
            let title = row.title.as_deref().unwrap_or("(no title)");
            println!("• {}", row.link);
            println!("  {}", title);
        }
    }

    println!();
    println!(
        "Requests this cycle: {} | overall: {} | next offset: {}",
        outcome.requests_made, outcome.total_requests_overall, outcome.next_start_position
    );

    Ok(())
}

async fn cmd_history(config: Config, user: &str) -> anyhow::Result<()> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let history = store.search_history(Some(user)).await?;

    if history.is_empty() {
        println!("No stored searches.");
        println!();
        println!("Run: prospektor search \"<query>\"");
        return Ok(());
    }

    let total = store.total_count(Some(user)).await?;

    println!("Stored Searches ({} results total)", total);
    println!("{:-<60}", "");

    for entry in history {
        println!("• {} [{} results]", entry.search_query, entry.count);
        println!("  Last search: {}", entry.last_search);
    }

    Ok(())
}
