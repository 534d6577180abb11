//! SQLite access: pool setup, migrations and every query the app runs.
//!
//! The HTTP surface never writes the catalog. `create_shop`,
//! `create_product` and `set_inventory` are the seeding API for shops,
//! products and stock; `get_line_items` and `count_sales` expose the
//! stored sale rows for inspection.

use std::str::FromStr;
use std::time::Duration;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    QueryBuilder, Sqlite, SqliteConnection, SqlitePool,
};

use crate::{
    errors::AppError,
    structs::{CartItem, InventoryRecord, Product, Sale, SaleDetailRow, SaleLineItem, Shop, User},
    AppState,
};

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .read_only(false)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePool::connect_with(opts).await
}

/// Fresh in-memory database with the schema applied.
///
/// Limited to a single connection that is never recycled: every SQLite
/// `:memory:` connection is its own database.
pub async fn memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}

pub async fn create_user(
    state: &AppState,
    email: &str,
    pwd_hash: &str,
    name: &str,
    lastname: Option<&str>,
) -> Result<User, AppError> {
    let created_at = chrono::Utc::now().to_rfc3339();
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, pwd_hash, name, lastname, created_at) VALUES (?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(email)
    .bind(pwd_hash)
    .bind(name)
    .bind(lastname)
    .bind(&created_at)
    .fetch_one(&state.db_pool)
    .await
    .map_err(AppError::from_write)?;
    log::info!("User created: id={} email={}", user.id, user.email);
    Ok(user)
}

pub async fn get_user_by_id(state: &AppState, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await
}

pub async fn get_user_by_email(state: &AppState, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(&state.db_pool)
        .await
}

pub async fn create_shop(
    state: &AppState,
    name: &str,
    location: Option<&str>,
) -> Result<Shop, sqlx::Error> {
    let shop = sqlx::query_as::<_, Shop>(
        "INSERT INTO shops (name, location) VALUES (?, ?) RETURNING *",
    )
    .bind(name)
    .bind(location)
    .fetch_one(&state.db_pool)
    .await?;
    log::info!("Shop created: {:?}", shop);
    Ok(shop)
}

pub async fn get_all_shops(state: &AppState) -> Result<Vec<Shop>, sqlx::Error> {
    sqlx::query_as::<_, Shop>("SELECT * FROM shops ORDER BY id")
        .fetch_all(&state.db_pool)
        .await
}

pub async fn get_shop_by_id(state: &AppState, id: i64) -> Result<Option<Shop>, sqlx::Error> {
    sqlx::query_as::<_, Shop>("SELECT * FROM shops WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await
}

pub async fn create_product(state: &AppState, name: &str, price: f64) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (name, price) VALUES (?, ?) RETURNING *",
    )
    .bind(name)
    .bind(price)
    .fetch_one(&state.db_pool)
    .await?;
    log::info!("Product created: {:?}", product);
    Ok(product)
}

/// Products stocked by a shop, i.e. those with an inventory record there.
pub async fn get_products_for_shop(state: &AppState, shop_id: i64) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT p.id, p.name, p.price
        FROM products p
        JOIN inventory i ON i.product_id = p.id
        WHERE i.shop_id = ?
        ORDER BY p.id
        "#,
    )
    .bind(shop_id)
    .fetch_all(&state.db_pool)
    .await
}

/// Inserts or overwrites the stock of a product in a shop.
pub async fn set_inventory(
    state: &AppState,
    product_id: i64,
    shop_id: i64,
    qty: i64,
) -> Result<InventoryRecord, AppError> {
    let record = sqlx::query_as::<_, InventoryRecord>(
        r#"
        INSERT INTO inventory (qty, product_id, shop_id) VALUES (?, ?, ?)
        ON CONFLICT (product_id, shop_id) DO UPDATE SET qty = excluded.qty
        RETURNING *
        "#,
    )
    .bind(qty)
    .bind(product_id)
    .bind(shop_id)
    .fetch_one(&state.db_pool)
    .await
    .map_err(AppError::from_write)?;
    log::info!("Inventory set: {:?}", record);
    Ok(record)
}

pub async fn get_inventory(
    state: &AppState,
    product_id: i64,
    shop_id: i64,
) -> Result<Option<InventoryRecord>, sqlx::Error> {
    sqlx::query_as::<_, InventoryRecord>(
        "SELECT * FROM inventory WHERE product_id = ? AND shop_id = ?",
    )
    .bind(product_id)
    .bind(shop_id)
    .fetch_optional(&state.db_pool)
    .await
}

pub async fn insert_sale(conn: &mut SqliteConnection) -> Result<Sale, sqlx::Error> {
    let created_date = chrono::Utc::now().to_rfc3339();
    sqlx::query_as::<_, Sale>("INSERT INTO sales (created_date) VALUES (?) RETURNING *")
        .bind(created_date)
        .fetch_one(conn)
        .await
}

/// Writes every cart item of a sale with one multi-row INSERT.
pub async fn insert_line_items(
    conn: &mut SqliteConnection,
    sale_id: i64,
    user_id: i64,
    items: &[CartItem],
) -> Result<u64, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "INSERT INTO sale_details (qty, user_id, product_id, shop_id, sale_id) ",
    );
    builder.push_values(items, |mut row, item| {
        row.push_bind(item.qty)
            .push_bind(user_id)
            .push_bind(item.product_id)
            .push_bind(item.shop_id)
            .push_bind(sale_id);
    });
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn get_sale_by_id(state: &AppState, id: i64) -> Result<Option<Sale>, sqlx::Error> {
    sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await
}

pub async fn get_line_items(state: &AppState, sale_id: i64) -> Result<Vec<SaleLineItem>, sqlx::Error> {
    sqlx::query_as::<_, SaleLineItem>("SELECT * FROM sale_details WHERE sale_id = ? ORDER BY id")
        .bind(sale_id)
        .fetch_all(&state.db_pool)
        .await
}

/// Line items of a sale joined with their product and shop in one query.
pub async fn get_sale_details(state: &AppState, sale_id: i64) -> Result<Vec<SaleDetailRow>, sqlx::Error> {
    sqlx::query_as::<_, SaleDetailRow>(
        r#"
        SELECT d.qty,
               p.id AS product_id, p.name AS product_name, p.price AS product_price,
               s.id AS shop_id, s.name AS shop_name, s.location AS shop_location
        FROM sale_details d
        LEFT JOIN products p ON p.id = d.product_id
        LEFT JOIN shops s ON s.id = d.shop_id
        WHERE d.sale_id = ?
        ORDER BY d.id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&state.db_pool)
    .await
}

pub async fn count_sales(state: &AppState) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales")
        .fetch_one(&state.db_pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_state;

    #[actix_web::test]
    async fn shop_products_come_from_inventory() {
        let state = test_state().await;
        let shop = create_shop(&state, "Centro", Some("Madrid")).await.unwrap();
        let other = create_shop(&state, "Norte", None).await.unwrap();
        let apple = create_product(&state, "Apple", 0.5).await.unwrap();
        let pear = create_product(&state, "Pear", 0.75).await.unwrap();
        set_inventory(&state, apple.id, shop.id, 10).await.unwrap();
        set_inventory(&state, pear.id, other.id, 3).await.unwrap();

        let products = get_products_for_shop(&state, shop.id).await.unwrap();
        assert_eq!(products, vec![apple]);
        assert_eq!(get_all_shops(&state).await.unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn set_inventory_overwrites_existing_record() {
        let state = test_state().await;
        let shop = create_shop(&state, "Centro", None).await.unwrap();
        let apple = create_product(&state, "Apple", 0.5).await.unwrap();

        let first = set_inventory(&state, apple.id, shop.id, 10).await.unwrap();
        let second = set_inventory(&state, apple.id, shop.id, 4).await.unwrap();
        assert_eq!(first.id, second.id);
        let stored = get_inventory(&state, apple.id, shop.id).await.unwrap().unwrap();
        assert_eq!(stored.qty, 4);
    }

    #[actix_web::test]
    async fn negative_stock_and_prices_are_rejected() {
        let state = test_state().await;
        let shop = create_shop(&state, "Centro", None).await.unwrap();
        let apple = create_product(&state, "Apple", 0.5).await.unwrap();

        assert!(set_inventory(&state, apple.id, shop.id, -1).await.is_err());
        assert!(create_product(&state, "Debt", -2.0).await.is_err());
    }

    #[actix_web::test]
    async fn inventory_for_unknown_product_is_an_unknown_reference() {
        let state = test_state().await;
        let shop = create_shop(&state, "Centro", None).await.unwrap();
        let err = set_inventory(&state, 99, shop.id, 1).await.unwrap_err();
        assert!(matches!(err, AppError::UnknownReference));
    }

    #[actix_web::test]
    async fn duplicate_email_maps_to_email_taken() {
        let state = test_state().await;
        create_user(&state, "a@x.com", "hash", "A", None).await.unwrap();
        let err = create_user(&state, "a@x.com", "hash", "B", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmailTaken));
    }
}
