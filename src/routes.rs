use crate::{
    api::{admin, attendance, face, student},
    auth::middleware::auth_middleware,
    config::Config,
    docs::ApiDoc,
    error::{json_error_handler, query_error_handler},
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, Route, Scope, middleware::from_fn, web};
use utoipa::OpenApi;

// Per-route limiter; `None` when the rate is 0.
fn build_limiter(requests_per_min: u32) -> Option<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    if requests_per_min == 0 {
        return None;
    }
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()?;
    Some(Governor::new(&cfg))
}

fn limited(scope: Scope, path: &str, route: Route, requests_per_min: u32) -> Scope {
    let resource = web::resource(path).route(route);
    match build_limiter(requests_per_min) {
        Some(limiter) => scope.service(resource.wrap(limiter)),
        None => scope.service(resource),
    }
}

async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Request body and query string settings shared by every route.
pub fn extractor_config(config: &Config) -> (web::JsonConfig, web::QueryConfig) {
    (
        web::JsonConfig::default()
            .limit(config.max_payload_bytes)
            .error_handler(json_error_handler),
        web::QueryConfig::default().error_handler(query_error_handler),
    )
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let (json_cfg, query_cfg) = extractor_config(config);
    cfg.app_data(json_cfg).app_data(query_cfg);

    cfg.service(web::resource("/api-doc/openapi.json").route(web::get().to(openapi_json)));

    let mut api = web::scope(&config.api_prefix);

    // Public, rate limited
    api = limited(
        api,
        "/register",
        web::post().to(student::register_student),
        config.rate_register_per_min,
    );
    api = limited(
        api,
        "/admin_login",
        web::post().to(admin::admin_login),
        config.rate_login_per_min,
    );
    api = limited(
        api,
        "/mark_attendance",
        web::post().to(attendance::mark_attendance),
        config.rate_attendance_per_min,
    );

    cfg.service(
        api.service(web::resource("/capture_face").route(web::post().to(face::capture_face)))
            .service(web::resource("/students").route(web::get().to(student::list_students)))
            .service(web::resource("/students/{id}").route(web::get().to(student::get_student)))
            .service(
                web::resource("/attendance_log").route(web::get().to(attendance::attendance_log)),
            )
            .service(web::resource("/stats").route(web::get().to(attendance::stats)))
            // Admin only
            .service(
                web::scope("/admin")
                    .wrap(from_fn(auth_middleware))
                    .service(
                        web::resource("/students/{id}")
                            .route(web::put().to(student::update_student))
                            .route(web::delete().to(student::delete_student)),
                    ),
            ),
    );
}
