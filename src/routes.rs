use actix_web::web;

use crate::errors::json_error_handler;
use crate::handlers;

pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(json_error_handler)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/employees")
            .route(web::post().to(handlers::employee::create_employee))
            .route(web::get().to(handlers::employee::get_employees)),
    )
    .service(
        web::resource("/api/employees/{id_number}")
            .route(web::get().to(handlers::employee::get_employee))
            .route(web::put().to(handlers::employee::update_employee))
            .route(web::delete().to(handlers::employee::delete_employee)),
    )
    .service(
        web::resource("/upload-photo")
            .route(web::post().to(handlers::file::upload_file)),
    )
    .service(
        web::resource("/api/csrf-token")
            .route(web::get().to(handlers::csrf::csrf_token)),
    )
    .service(
        web::resource("/api/register")
            .route(web::post().to(handlers::auth::register)),
    )
    .service(
        web::resource("/api/identity/sign-in")
            .route(web::post().to(handlers::auth::sign_in)),
    )
    .service(
        web::resource("/api/login")
            .route(web::post().to(handlers::auth::login)),
    )
    .service(
        web::resource("/api/logout")
            .route(web::post().to(handlers::auth::logout)),
    )
    .service(
        web::resource("/api/session")
            .route(web::get().to(handlers::auth::current_session)),
    );
}
