//! Per-request access control: which entries exist and which the current user may reach.

use crate::db::DatabaseHandle;
use crate::error::AppError;
use crate::modules::MenuItem;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PermissionEntry {
    /// Table or model the entry guards (e.g. "user", "item").
    pub entity: String,
    pub url: String,
    pub display_name: String,
    pub top_level: bool,
    pub minimum_rank_required: i64,
}

#[derive(Clone, Debug)]
pub struct Admin {
    user_rank: i64,
    entries: Vec<PermissionEntry>,
}

impl Admin {
    /// Build the access context for `user` by reading its highest role rank.
    /// Anonymous and unknown users get rank 0.
    pub async fn new(db: &mut DatabaseHandle, user: Option<&str>) -> Result<Self, AppError> {
        let user_rank = match user {
            Some(username) => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COALESCE(MAX(r.rank), 0)
                    FROM user u
                    JOIN user_role ur ON ur.user_id = u.id
                    JOIN role r ON r.id = ur.role_id
                    WHERE u.username = ? AND u.active = 1
                    "#,
                )
                .bind(username)
                .fetch_one(db.conn()?)
                .await?
            }
            None => 0,
        };
        Ok(Admin {
            user_rank,
            entries: Vec::new(),
        })
    }

    pub fn user_rank(&self) -> i64 {
        self.user_rank
    }

    /// Declare a permission entry. Registering the same display name again replaces it.
    pub fn register(
        &mut self,
        entity: &str,
        url: &str,
        display_name: &str,
        top_level: bool,
        minimum_rank_required: i64,
    ) {
        let entry = PermissionEntry {
            entity: entity.to_string(),
            url: url.to_string(),
            display_name: display_name.to_string(),
            top_level,
            minimum_rank_required,
        };
        match self.entries.iter_mut().find(|e| e.display_name == display_name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn entries(&self) -> &[PermissionEntry] {
        &self.entries
    }

    pub fn has_access(&self, display_name: &str) -> bool {
        self.entries
            .iter()
            .find(|e| e.display_name == display_name)
            .map(|e| self.user_rank >= e.minimum_rank_required)
            .unwrap_or(false)
    }

    /// Top-level entries the current user may reach, in registration order.
    pub fn top_level_items(&self) -> Vec<MenuItem> {
        self.entries
            .iter()
            .filter(|e| e.top_level && self.user_rank >= e.minimum_rank_required)
            .map(|e| MenuItem::new(&e.display_name, &e.url))
            .collect()
    }
}
