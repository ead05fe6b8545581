//! Inventory module: items, stock movements, and the stock report.

pub mod schema;

use crate::db::DatabaseHandle;
use crate::error::AppError;
use crate::modules::{MenuItem, SiteModule};
use crate::routes::inventory_routes;
use crate::state::AppState;
use crate::users::USER_RANK;
use async_trait::async_trait;
use axum::Router;

pub use schema::{add_item, initialize_tables, list_items, record_transaction, stock_report, ItemSummary};

pub const MODULE_TAG: &str = "inventory";

pub const ITEMS_URL: &str = "/item/";
pub const STOCK_REPORT_URL: &str = "/item/stock_report";

pub const ITEMS_TITLE: &str = "Inventory Items";
pub const STOCK_REPORT_TITLE: &str = "Stock Report";

pub struct InventoryModule;

#[async_trait]
impl SiteModule for InventoryModule {
    fn tag(&self) -> &'static str {
        MODULE_TAG
    }

    fn menu_items(&self) -> Vec<MenuItem> {
        vec![
            MenuItem::new("Home", "/"),
            MenuItem::new(ITEMS_TITLE, ITEMS_URL),
            MenuItem::new(STOCK_REPORT_TITLE, STOCK_REPORT_URL),
        ]
    }

    fn register_admin(&self, admin: &mut crate::users::Admin) {
        admin.register("item", ITEMS_URL, ITEMS_TITLE, false, 0);
        admin.register("item_transaction", STOCK_REPORT_URL, STOCK_REPORT_TITLE, false, USER_RANK);
    }

    async fn initialize_tables(&self, db: &mut DatabaseHandle) -> Result<(), AppError> {
        initialize_tables(db).await
    }

    fn routes(&self) -> Router<AppState> {
        inventory_routes()
    }
}
