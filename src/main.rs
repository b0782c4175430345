use dotenvy::dotenv;
use machine_catalog::{
    api::{AppState, create_router},
    config::{self, database},
    errors::{Error, Result},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the main application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection(&database::get_database_url(&app_config))
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Serve
    let bind_address = app_config.bind_address.clone();
    let app = create_router(AppState::from_config(app_config, db));
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind_address, e))?;
    info!("Listening on {}", bind_address);

    axum::serve(listener, app).await.map_err(Error::Io)?;

    Ok(())
}
