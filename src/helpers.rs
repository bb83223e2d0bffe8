use actix_web::HttpResponse;
use actix_web::web::Json;
use serde::Serialize;
use validator::ValidationErrors;
use crate::errors::ApiError;

pub fn respond_json<T: Serialize>(data: T) -> Result<Json<T>, ApiError> {
    Ok(Json(data))
}

pub fn respond_created<T: Serialize>(data: T) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Created().json(data))
}

/// Picks the message of the first failing field in `fields`, so a request
/// with several problems always reports the same one. Each entry pairs a
/// field with the message used when its error carries none, as `required`
/// errors do.
pub fn first_validation_error(errors: &ValidationErrors, fields: &[(&str, &str)]) -> ApiError {
    let field_errors = errors.field_errors();

    let ordered = fields.iter().find_map(|(field, fallback)| {
        field_errors
            .get(*field)
            .and_then(|errors| errors.first())
            .map(|error| match &error.message {
                Some(message) => message.to_string(),
                None => fallback.to_string(),
            })
    });

    let message = ordered
        .or_else(|| {
            field_errors
                .values()
                .flat_map(|errors| errors.iter())
                .map(|error| match &error.message {
                    Some(message) => message.to_string(),
                    None => error.code.to_string(),
                })
                .next()
        })
        .unwrap_or_else(|| errors.to_string());

    ApiError::BadRequest(message)
}
