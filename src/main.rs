use std::io::{Error, ErrorKind};

use actix_web::{middleware, web::Data, App, HttpServer};
use log::info;
use shop_sales::{auth::TokenKeys, config::Config, db, routes, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("FATAL: {}", e);
        Error::new(ErrorKind::Other, e)
    })?;
    info!("Loaded configuration: {:?}", config);

    let db_pool = db::connect(&config.database_url).await.map_err(|e| {
        log::error!("FATAL: cannot open database {}: {}", config.database_url, e);
        Error::new(ErrorKind::Other, e)
    })?;

    db::migrate(&db_pool).await.map_err(|e| {
        log::error!("FATAL: migration failed: {}", e);
        Error::new(ErrorKind::Other, e)
    })?;

    info!("Database migrated successfully");

    let state = AppState::new(db_pool, TokenKeys::new(&config.secret_key, config.token_ttl));

    info!("Starting HTTP server on http://{}:{}/", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .app_data(Data::new(state.clone()))
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
