use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};
use utoipa::ToSchema;

use super::required;
use crate::config::Config;
use crate::error::AppError;
use crate::service::admin;
use crate::store::Store;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminLogin {
    #[schema(example = "admin")]
    pub username: Option<String>,
    #[schema(example = "change-me")]
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Login successful")]
    pub message: String,
    /// Bearer token for the `/admin` routes
    pub token: String,
}

/// Admin login
#[utoipa::path(
    post,
    path = "/api/admin_login",
    request_body = AdminLogin,
    responses(
        (status = 200, description = "Credentials accepted", body = LoginResponse),
        (status = 400, description = "Missing username or password", body = ErrorResponse),
        (status = 401, description = "Wrong username or password", body = ErrorResponse, example = json!({
            "success": false,
            "message": "Invalid credentials"
        })),
        (status = 429, description = "Too many requests")
    ),
    tag = "Admin"
)]
#[instrument(name = "admin_login_request", skip_all)]
pub async fn admin_login(
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
    payload: web::Json<AdminLogin>,
) -> Result<HttpResponse, AppError> {
    let username = required(&payload.username)?;
    let password = payload
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("Missing data"))?;

    let Some(secret) = config.jwt_secret.as_deref() else {
        error!("JWT secret is not configured");
        return Err(AppError::internal("JWT_SECRET missing"));
    };

    let token = admin::admin_login(
        store.get_ref(),
        username,
        password,
        secret,
        config.access_token_ttl,
    )
    .await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
    }))
}
