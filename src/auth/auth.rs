use crate::error::AppError;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

/// The admin behind a verified access token. Only resolvable on routes
/// wrapped by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthAdmin {
    pub admin_id: u64,
    pub username: String,
}

impl FromRequest for AuthAdmin {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthAdmin>()
                .cloned()
                .ok_or(AppError::Unauthorized("Missing token")),
        )
    }
}
