//! JSON backend for shop listings and sale recording.

use sqlx::SqlitePool;

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod routes;
pub mod sales;
pub mod structs;
pub mod utils;

use auth::TokenKeys;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub tokens: TokenKeys,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, tokens: TokenKeys) -> Self {
        AppState { db_pool, tokens }
    }
}

#[cfg(test)]
pub(crate) async fn test_state() -> AppState {
    let pool = db::memory_pool().await.expect("in-memory database");
    AppState::new(
        pool,
        TokenKeys::new("test-secret", std::time::Duration::from_secs(60)),
    )
}
