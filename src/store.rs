//! Table initialization for the whole site: user tables first, then every registered module.

use crate::db::DatabaseHandle;
use crate::error::AppError;
use crate::state::AppState;
use crate::users::initialize_user_tables;

/// Create all tables. Safe to call on an initialized database (`IF NOT EXISTS` / `INSERT OR IGNORE`).
///
/// Without a handle, opens the configured `DATABASE_PATH` and closes it afterwards.
/// A failure stops the sequence: module tables are not attempted when user tables fail.
pub async fn initialize_all_tables(state: &AppState, db: Option<&mut DatabaseHandle>) -> Result<(), AppError> {
    match db {
        Some(db) => initialize_with(state, db).await,
        None => {
            let lock = state.db_init.for_path(&state.config.database_path);
            let _guard = lock.lock().await;
            let mut db = DatabaseHandle::open(&state.config.database_path).await?;
            let result = initialize_with(state, &mut db).await;
            db.close().await;
            result
        }
    }
}

async fn initialize_with(state: &AppState, db: &mut DatabaseHandle) -> Result<(), AppError> {
    tracing::info!(db = %db.path().display(), "initializing tables");
    initialize_user_tables(db).await?;
    for module in state.modules.iter() {
        tracing::debug!(module = module.tag(), "initializing module tables");
        module.initialize_tables(db).await?;
    }
    Ok(())
}
