//! Inventory views. The item listing doubles as the home page.

use crate::context::RequestScope;
use crate::error::AppError;
use crate::inventory::{list_items, stock_report as low_stock, STOCK_REPORT_TITLE};
use crate::response::success_one_ok;
use axum::response::IntoResponse;

/// GET / and GET /item/
pub async fn display(scope: RequestScope) -> Result<impl IntoResponse, AppError> {
    let mut ctx = scope.lock().await;
    let items = list_items(ctx.db_mut()?).await?;
    Ok(success_one_ok(items, Some(ctx.page_meta())))
}

/// GET /item/stock_report — items below their minimum stock.
pub async fn stock_report(scope: RequestScope) -> Result<impl IntoResponse, AppError> {
    let mut ctx = scope.lock().await;
    if !ctx.admin()?.has_access(STOCK_REPORT_TITLE) {
        return Err(AppError::Forbidden(STOCK_REPORT_TITLE.into()));
    }
    let items = low_stock(ctx.db_mut()?).await?;
    Ok(success_one_ok(items, Some(ctx.page_meta())))
}
