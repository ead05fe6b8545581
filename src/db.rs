//! Per-request SQLite access. A fresh connection is opened for every request and closed at teardown.

use crate::context::RequestContext;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::initialize_all_tables;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Ensure the parent directories of `path` exist.
/// Returns `true` when the database file itself is absent and must be initialized after opening.
pub async fn make_db_path(path: &Path) -> Result<bool, AppError> {
    if tokio::fs::try_exists(path).await? {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(true)
}

/// One async lock per database path. Creating and initializing a file happens under its lock,
/// so a concurrent first request never sees a file without tables.
#[derive(Default)]
pub struct InitLocks {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl InitLocks {
    pub fn for_path(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(path.to_path_buf()).or_default().clone()
    }
}

/// One open connection. Closed exactly once; use after close is an error.
pub struct DatabaseHandle {
    path: PathBuf,
    conn: Option<SqliteConnection>,
    created: bool,
}

impl DatabaseHandle {
    /// Open the database at `path`, creating the file (and its directories) when missing.
    pub async fn open(path: &Path) -> Result<Self, AppError> {
        let created = make_db_path(path).await?;
        let conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .connect()
            .await?;
        if created {
            tracing::info!(db = %path.display(), "created database file");
        }
        Ok(DatabaseHandle {
            path: path.to_path_buf(),
            conn: Some(conn),
            created,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when opening this handle created the database file.
    pub fn was_created(&self) -> bool {
        self.created
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub fn conn(&mut self) -> Result<&mut SqliteConnection, AppError> {
        self.conn
            .as_mut()
            .ok_or_else(|| AppError::Internal(format!("database {} used after close", self.path.display())))
    }

    /// Close the connection. Returns `false` when it was already closed.
    /// Close failures are logged, never returned, so they cannot mask a request error.
    pub async fn close(&mut self) -> bool {
        match self.conn.take() {
            Some(conn) => {
                if let Err(e) = conn.close().await {
                    tracing::warn!(db = %self.path.display(), error = %e, "error closing database");
                }
                true
            }
            None => false,
        }
    }
}

impl Drop for DatabaseHandle {
    fn drop(&mut self) {
        if self.conn.is_some() {
            tracing::debug!(db = %self.path.display(), "database handle dropped while open");
        }
    }
}

impl std::fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .field("created", &self.created)
            .finish()
    }
}

/// Return the request's database handle, opening it on first use.
///
/// The path is `filespec` when given, otherwise the `DATABASE_PATH` applied to this request.
/// A newly created database file gets all tables initialized before the handle is returned;
/// concurrent requests for the same path wait on its init lock meanwhile.
pub async fn get_db<'a>(
    state: &AppState,
    ctx: &'a mut RequestContext,
    filespec: Option<&Path>,
) -> Result<&'a mut DatabaseHandle, AppError> {
    match ctx.db.as_ref().map(DatabaseHandle::is_open) {
        Some(false) => {
            return Err(AppError::Internal("database requested after teardown".into()));
        }
        Some(true) => {}
        None => {
            let path = filespec
                .map(Path::to_path_buf)
                .unwrap_or_else(|| ctx.site.database_path.clone());
            let lock = state.db_init.for_path(&path);
            let _guard = lock.lock().await;
            let mut db = DatabaseHandle::open(&path).await?;
            if db.was_created() {
                if let Err(e) = initialize_all_tables(state, Some(&mut db)).await {
                    db.close().await;
                    return Err(e);
                }
            }
            ctx.db = Some(db);
        }
    }
    ctx.db_mut()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn make_db_path_creates_directories_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/site.sqlite");
        assert!(make_db_path(&path).await.unwrap());
        assert!(path.parent().unwrap().is_dir());
        std::fs::write(&path, b"").unwrap();
        assert!(!make_db_path(&path).await.unwrap());
    }

    #[tokio::test]
    async fn make_db_path_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let err = make_db_path(&blocker.join("sub/site.sqlite")).await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_blocks_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DatabaseHandle::open(&dir.path().join("a.sqlite")).await.unwrap();
        assert!(db.was_created());
        sqlx::query("SELECT 1").execute(db.conn().unwrap()).await.unwrap();
        assert!(db.close().await);
        assert!(!db.close().await);
        assert!(matches!(db.conn(), Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn reopening_existing_file_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.sqlite");
        DatabaseHandle::open(&path).await.unwrap().close().await;
        let mut again = DatabaseHandle::open(&path).await.unwrap();
        assert!(!again.was_created());
        again.close().await;
    }

    #[test]
    fn init_locks_are_shared_per_path() {
        let locks = InitLocks::default();
        let a = locks.for_path(Path::new("one.sqlite"));
        assert!(Arc::ptr_eq(&a, &locks.for_path(Path::new("one.sqlite"))));
        assert!(!Arc::ptr_eq(&a, &locks.for_path(Path::new("two.sqlite"))));
    }

    struct BrokenModule;

    #[async_trait::async_trait]
    impl crate::modules::SiteModule for BrokenModule {
        fn tag(&self) -> &'static str {
            "broken"
        }

        fn menu_items(&self) -> Vec<crate::modules::MenuItem> {
            crate::modules::default_menu()
        }

        fn register_admin(&self, _admin: &mut crate::users::Admin) {}

        async fn initialize_tables(&self, _db: &mut DatabaseHandle) -> Result<(), AppError> {
            Err(AppError::Internal("broken schema".into()))
        }

        fn routes(&self) -> axum::Router<AppState> {
            axum::Router::new()
        }
    }

    #[tokio::test]
    async fn failed_initialization_releases_handle_and_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.sqlite");
        let mut state = AppState::new(crate::config::SiteConfig {
            database_path: path.clone(),
            secret_key: "k".into(),
            ..Default::default()
        });
        let mut registry = crate::modules::ModuleRegistry::new();
        registry.register(Arc::new(BrokenModule));
        state.modules = Arc::new(registry);

        let mut ctx = RequestContext::default();
        ctx.site.database_path = path.clone();
        let err = get_db(&state, &mut ctx, None).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(ctx.db.is_none());
        assert!(state.db_init.for_path(&path).try_lock().is_ok());

        // the file is left behind; the next request opens it without initializing
        let db = get_db(&state, &mut ctx, None).await.unwrap();
        assert!(!db.was_created());
        assert!(ctx.teardown().await);
    }
}
