//! Inventory site server.
//!
//! Run from repo root: `cargo run -p inventory-server`
//! Settings come from `instance/site_settings.json` (or `SITE_SETTINGS`), overridden by env / `.env`.

use shotglass_inventory::{
    create_user, init_tracing, initialize_all_tables, load_site_config, settings_path, site_routes, AppError, AppState,
    DatabaseHandle,
};
use tokio::net::TcpListener;

/// Create the admin named by `ADMIN_USERNAME` / `ADMIN_PASSWORD` unless it already exists.
async fn bootstrap_admin(state: &AppState) -> Result<(), AppError> {
    let (Ok(username), Ok(password)) = (std::env::var("ADMIN_USERNAME"), std::env::var("ADMIN_PASSWORD")) else {
        return Ok(());
    };
    let mut db = DatabaseHandle::open(&state.config.database_path).await?;
    let result = create_user(&mut db, &username, &password, "admin").await;
    db.close().await;
    match result {
        Ok(_) => tracing::info!(user = %username, "created admin user"),
        Err(AppError::BadRequest(msg)) => tracing::info!("admin bootstrap skipped: {}", msg),
        Err(e) => return Err(e),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = load_site_config(&settings_path())?;
    init_tracing(config.log_file_path.as_deref())?;

    let state = AppState::new(config);
    if state.config.initialize_on_start {
        initialize_all_tables(&state, None).await?;
        bootstrap_admin(&state).await?;
    }

    let app = site_routes(state.clone());
    let listener = TcpListener::bind(&state.config.bind_addr).await?;
    tracing::info!(
        module = state.config.module.as_deref().unwrap_or("-"),
        "{} listening on http://{}",
        state.config.site_name,
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;
    Ok(())
}
