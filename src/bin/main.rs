use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use quill::{DatabaseConfig, bootstrap, config, create_connection, create_router, ensure_schema};

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Multi-author blogging backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Bind address, e.g. 0.0.0.0:3000
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        db_url: Option<String>,
        /// Secret used to sign session tokens
        #[arg(long, env = "QUILL_JWT_SECRET", hide_env_values = true)]
        jwt_secret: Option<String>,
        /// JSON configuration file (defaults to $QUILL_CONFIG or ./quill.json)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Initialize the database
    Init {
        #[arg(long, default_value = "memory")]
        db_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("quill=info".parse()?)
                .add_directive("surrealdb=warn".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            db_url,
            jwt_secret,
            config: config_path,
        } => {
            let mut app_config = config::load_config(config_path.or_else(config::resolve_config_path))?;
            if let Some(bind) = bind {
                app_config.server.bind = bind;
            }
            if let Some(url) = db_url {
                app_config.database.url = url;
            }
            if let Some(secret) = jwt_secret {
                app_config.auth.jwt_secret = secret;
            }
            info!("Using database url: {}", app_config.database.url);

            let state = bootstrap(&app_config).await?;
            let app = create_router(state);

            let listener = tokio::net::TcpListener::bind(&app_config.server.bind).await?;
            info!("Listening on http://{}", app_config.server.bind);

            axum::serve(listener, app).await?;
        }
        Commands::Init { db_url } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url for initialization: {}", db_config.url);

            info!("Initializing database...");
            let db = create_connection(db_config).await?;
            ensure_schema(&db).await?;
            info!("Database initialized successfully");
        }
    }

    Ok(())
}
