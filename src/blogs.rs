use actix_web::HttpResponse;
use actix_web::web::{Data, Json, Path};
use log::{debug, info};
use validator::Validate;
use crate::errors::ApiError;
use crate::helpers::{first_validation_error, respond_created, respond_json};
use crate::models::{Blog, BlogResponse, CreateBlogRequest, MessageResponse, UpdateBlogRequest};
use crate::server::AppState;

fn blog_not_found() -> ApiError {
    ApiError::NotFound("Blog not found.".to_string())
}

/// Reads the leading integer of a path id, so `1abc` and `1.0` both address
/// blog 1. Ids without leading digits never match a stored blog.
fn parse_id(id: &str) -> Result<u64, ApiError> {
    let trimmed = id.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .map_or(unsigned, |end| &unsigned[..end]);

    digits.parse::<u64>().map_err(|_| {
        debug!("parse_id - not a blog id: {}", id);
        blog_not_found()
    })
}

pub async fn create_blog(
    state: Data<AppState>,
    body: Json<CreateBlogRequest>,
) -> Result<HttpResponse, ApiError> {
    body
        .validate()
        .map_err(|e| first_validation_error(&e, CreateBlogRequest::FIELDS))?;

    let request = body.into_inner();
    let blog = state.blogs.modify(|blogs| -> Result<Blog, ApiError> {
        let blog = request.into_blog(blogs.allocate_id());
        blogs.push(blog.clone());
        Ok(blog)
    })?;

    info!("created blog {}", blog.id);
    respond_created(BlogResponse {
        message: "Blog created successfully.".to_string(),
        blog,
    })
}

pub async fn list_blogs(state: Data<AppState>) -> Result<Json<Vec<Blog>>, ApiError> {
    respond_json(state.blogs.read_all()?)
}

pub async fn update_blog(
    state: Data<AppState>,
    id: Path<String>,
    body: Json<UpdateBlogRequest>,
) -> Result<Json<BlogResponse>, ApiError> {
    let id = parse_id(&id)?;
    let request = body.into_inner();
    let blog = state.blogs.modify(|blogs| -> Result<Blog, ApiError> {
        let records = blogs.records_mut();
        let stored = records
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(blog_not_found)?;
        *stored = request.merge_into(stored);
        Ok(stored.clone())
    })?;

    info!("updated blog {}", blog.id);
    respond_json(BlogResponse {
        message: "Blog updated successfully.".to_string(),
        blog,
    })
}

pub async fn delete_blog(
    state: Data<AppState>,
    id: Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id)?;
    state.blogs.modify(|blogs| -> Result<(), ApiError> {
        let records = blogs.records_mut();
        let before = records.len();
        records.retain(|b| b.id != id);
        if records.len() == before {
            return Err(blog_not_found());
        }
        Ok(())
    })?;

    info!("deleted blog {}", id);
    respond_json(MessageResponse {
        message: "Blog deleted successfully.".to_string(),
    })
}
