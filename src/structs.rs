use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub pwd_hash: String,
    pub name: String,
    pub lastname: Option<String>,
    pub created_at: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct Shop {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
}

/// Stock of one product in one shop. Sales never touch it.
#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct InventoryRecord {
    pub id: i64,
    pub qty: i64,
    pub product_id: i64,
    pub shop_id: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Sale {
    pub id: i64,
    pub created_date: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct SaleLineItem {
    pub id: i64,
    pub qty: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub shop_id: i64,
    pub sale_id: i64,
}

/// One cart entry as posted by the client.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: i64,
    pub shop_id: i64,
    pub qty: i64,
}

/// A line item of a stored sale with its product and shop resolved.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SaleDetail {
    pub product: Product,
    pub shop: Shop,
    pub qty: i64,
}

/// Flat row of the sale detail join. Product and shop columns are
/// nullable because the join is a LEFT JOIN.
#[derive(Debug, FromRow)]
pub struct SaleDetailRow {
    pub qty: i64,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub product_price: Option<f64>,
    pub shop_id: Option<i64>,
    pub shop_name: Option<String>,
    pub shop_location: Option<String>,
}

impl SaleDetailRow {
    /// `None` when the referenced product or shop row is gone.
    pub fn resolve(self) -> Option<SaleDetail> {
        let product = Product {
            id: self.product_id?,
            name: self.product_name?,
            price: self.product_price?,
        };
        let shop = Shop {
            id: self.shop_id?,
            name: self.shop_name?,
            location: self.shop_location,
        };
        Some(SaleDetail {
            product,
            shop,
            qty: self.qty,
        })
    }
}
