use crate::auth::auth::AuthAdmin;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::{debug, error};

fn reject(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(json!({"success": false, "message": message}));
    req.into_response(resp.map_into_boxed_body())
}

/// Requires `Authorization: Bearer <access token>` and exposes the admin to
/// handlers through [`AuthAdmin`].
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let secret = match req
        .app_data::<Data<Config>>()
        .and_then(|c| c.jwt_secret.clone())
    {
        Some(secret) => secret,
        None => {
            error!("JWT secret is not configured");
            let resp = HttpResponse::InternalServerError()
                .json(json!({"success": false, "message": "Authentication is not configured"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v.to_owned(),
            Err(_) => return Ok(reject(req, "Invalid Authorization header encoding")),
        },
        None => return Ok(reject(req, "Missing Authorization header")),
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return Ok(reject(req, "Authorization header must start with Bearer"));
    };

    let claims = match verify_token(token, &secret) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Rejected access token");
            return Ok(reject(req, "Invalid or expired token"));
        }
    };

    req.extensions_mut().insert(AuthAdmin {
        admin_id: claims.admin_id,
        username: claims.sub,
    });

    next.call(req).await
}
