//! Sale aggregate: one `sales` row plus its `sale_details` line items.
//!
//! Both writes of a sale share one transaction. Stock in `inventory` is
//! neither checked nor decremented.

use crate::{
    db,
    errors::AppError,
    structs::{CartItem, SaleDetail},
    AppState,
};

/// Records a checkout for `user_id` and returns the new sale id.
pub async fn create_sale(
    state: &AppState,
    user_id: i64,
    items: &[CartItem],
) -> Result<i64, AppError> {
    if db::get_user_by_id(state, user_id).await?.is_none() {
        log::warn!("Sale requested for missing user ID: {}", user_id);
        return Err(AppError::UserNotFound);
    }
    if items.is_empty() {
        return Err(AppError::EmptyCart);
    }
    if let Some(item) = items.iter().find(|item| item.qty <= 0) {
        return Err(AppError::InvalidQuantity(item.product_id));
    }

    // Dropping `tx` on any early return rolls back the sale row.
    let mut tx = state.db_pool.begin().await?;
    let sale = db::insert_sale(&mut *tx).await.map_err(AppError::from_write)?;
    let written = db::insert_line_items(&mut *tx, sale.id, user_id, items)
        .await
        .map_err(AppError::from_write)?;
    tx.commit().await?;

    log::info!(
        "Sale {} created for user ID {} with {} line items",
        sale.id,
        user_id,
        written
    );
    Ok(sale.id)
}

pub async fn get_sale(state: &AppState, sale_id: i64) -> Result<Vec<SaleDetail>, AppError> {
    if db::get_sale_by_id(state, sale_id).await?.is_none() {
        return Err(AppError::SaleNotFound);
    }

    db::get_sale_details(state, sale_id)
        .await?
        .into_iter()
        .map(|row| row.resolve().ok_or(AppError::DanglingReference(sale_id)))
        .collect()
}
