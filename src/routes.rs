use actix_web::{
    error::{JsonPayloadError, PathError},
    get, post,
    web::{self, Data},
    HttpRequest, HttpResponse, Responder,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{self, AuthenticatedUser, NewUser},
    db,
    errors::AppError,
    sales,
    structs::CartItem,
    AppState,
};

/// Registers every endpoint plus the JSON body, path and fallback handlers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .service(register_handler)
        .service(login_handler)
        .service(shops_handler)
        .service(shop_products_handler)
        .service(make_sale_handler)
        .service(get_sale_handler)
        .default_service(web::to(default_handler));
}

fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::warn!("Rejected body for {} {}: {}", req.method(), req.path(), err);
    AppError::MissingBody.into()
}

fn path_error_handler(err: PathError, req: &HttpRequest) -> actix_web::Error {
    log::warn!("Rejected path {}: {}", req.path(), err);
    AppError::RouteNotFound.into()
}

/// Trims a field, treating absent and blank values alike.
fn required(value: Option<String>, field: &'static str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingFields(field))
}

#[derive(Deserialize)]
pub struct Register {
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
    lastname: Option<String>,
}

impl Register {
    fn validate(self) -> Result<NewUser, AppError> {
        Ok(NewUser {
            email: required(self.email, "email")?,
            password: self
                .password
                .filter(|p| !p.is_empty())
                .ok_or(AppError::MissingFields("password"))?,
            name: required(self.name, "name")?,
            lastname: self.lastname.filter(|l| !l.trim().is_empty()),
        })
    }
}

#[post("/user")]
pub async fn register_handler(
    web::Json(body): web::Json<Register>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let new_user = body.validate()?;
    auth::register(&state, new_user).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "User registered successfully" })))
}

#[derive(Deserialize)]
pub struct Login {
    email: Option<String>,
    password: Option<String>,
}

#[post("/login")]
pub async fn login_handler(
    web::Json(body): web::Json<Login>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let email = required(body.email, "email")?;
    let password = body
        .password
        .filter(|p| !p.is_empty())
        .ok_or(AppError::MissingFields("password"))?;

    let token = auth::login(&state, &email, &password).await?;
    Ok(HttpResponse::Ok().json(token))
}

#[get("/shops")]
pub async fn shops_handler(state: Data<AppState>) -> Result<impl Responder, AppError> {
    let shops = db::get_all_shops(&state).await.map_err(|e| {
        log::error!("Failed to get shops: {}", e);
        AppError::DatabaseError(e)
    })?;
    Ok(HttpResponse::Ok().json(json!({ "shops": shops })))
}

#[get("/shops/{shop_id}/products")]
pub async fn shop_products_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let shop_id = path.into_inner();
    if db::get_shop_by_id(&state, shop_id).await?.is_none() {
        return Err(AppError::ShopNotFound);
    }
    let products = db::get_products_for_shop(&state, shop_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "products": products })))
}

#[derive(Deserialize)]
pub struct SaleRequest {
    products: Option<Vec<CartItem>>,
}

#[post("/sale")]
pub async fn make_sale_handler(
    user: AuthenticatedUser,
    web::Json(body): web::Json<SaleRequest>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let items = body.products.unwrap_or_default();
    let sale_id = sales::create_sale(&state, user.0, &items).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Sale created successfully",
        "sale_id": sale_id,
    })))
}

#[get("/sale/{sale_id}")]
pub async fn get_sale_handler(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let details = sales::get_sale(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "sale_detail": details })))
}

/// Any unmatched method or path, including a wrong method on a known path.
pub async fn default_handler(req: HttpRequest) -> Result<HttpResponse, AppError> {
    log::debug!("No route for {} {}", req.method(), req.path());
    Err(AppError::RouteNotFound)
}
