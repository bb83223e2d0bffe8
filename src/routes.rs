use actix_web::{error, web, HttpResponse, ResponseError};
use log::debug;
use crate::blogs::{create_blog, delete_blog, list_blogs, update_blog};
use crate::errors::ApiError;
use crate::users::{create_user, delete_user, get_user, update_user};

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg
        .app_data(json_config())
        .route("/", web::get().to(index))
        .service(
        web::scope("/users")
            .route("", web::post().to(create_user))
            .route("/{identifier}", web::get().to(get_user))
            .route("/{identifier}", web::put().to(update_user))
            .route("/{identifier}", web::delete().to(delete_user))
    )
        .service(
        web::scope("/blogs")
            .route("", web::post().to(create_blog))
            .route("", web::get().to(list_blogs))
            .route("/{id}", web::put().to(update_blog))
            .route("/{id}", web::delete().to(delete_blog))
    );
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Welcome to the Blog Website!")
}

/// Malformed bodies answer with the same `{error}` shape as validation.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!("rejected request body: {}", err);
        let message = format!("Invalid JSON body: {}", err);
        error::InternalError::from_response(err, ApiError::BadRequest(message).error_response()).into()
    })
}
