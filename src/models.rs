use serde_json::{Map, Value};
use validator::{Validate, ValidationError};
use crate::storage::Record;

/// A stored user account. Every named field but `id` may be dropped by an
/// update; fields this service does not know about are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "fullName", default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn is_identified_by(&self, identifier: &str) -> bool {
        self.username.as_deref() == Some(identifier) || self.email.as_deref() == Some(identifier)
    }
}

impl Record for User {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(required, length(min = 3, message = "Username must be at least 3 characters long."))]
    pub username: Option<String>,

    #[validate(required, length(min = 5, message = "Password must be at least 5 characters long."))]
    pub password: Option<String>,

    #[serde(rename = "fullName")]
    #[validate(length(min = 10, message = "FullName must be at least 10 characters long."))]
    pub full_name: Option<String>,

    #[validate(custom = "validate_age")]
    pub age: Option<Value>,

    #[validate(required)]
    pub email: Option<String>,

    #[validate(custom = "validate_gender")]
    pub gender: Option<String>,
}

impl CreateUserRequest {
    /// Fields in the order their failures are reported, with the message
    /// used when the field is missing. `fullName` is listed under both its
    /// JSON and Rust names since either may key the error.
    pub const FIELDS: &'static [(&'static str, &'static str)] = &[
        ("username", "Username must be at least 3 characters long."),
        ("password", "Password must be at least 5 characters long."),
        ("fullName", "FullName must be at least 10 characters long."),
        ("full_name", "FullName must be at least 10 characters long."),
        ("age", "Age must be at least 10."),
        ("email", "Email is required."),
        ("gender", "Gender must be either \"male\" or \"female\"."),
    ];

    pub fn into_user(self, id: u64) -> User {
        User {
            id,
            username: self.username,
            password: self.password,
            full_name: Some(self.full_name.unwrap_or_default()),
            age: self.age,
            email: self.email,
            gender: Some(self.gender.unwrap_or_default()),
            extra: Map::new(),
        }
    }
}

/// Numbers and numeric strings below 10 are rejected. Zero, empty strings
/// and other non-numeric values count as "no age given".
fn validate_age(age: &Value) -> Result<(), ValidationError> {
    let years = match age {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match years {
        Some(years) if years != 0.0 && years < 10.0 => {
            let mut error = ValidationError::new("age");
            error.message = Some("Age must be at least 10.".into());
            Err(error)
        }
        _ => Ok(()),
    }
}

fn validate_gender(gender: &str) -> Result<(), ValidationError> {
    match gender {
        "male" | "female" => Ok(()),
        _ => {
            let mut error = ValidationError::new("gender");
            error.message = Some("Gender must be either \"male\" or \"female\".".into());
            Err(error)
        }
    }
}

/// Body of `PUT /users/{identifier}`. The six user fields left out of the
/// body are removed from the stored record.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    pub age: Option<Value>,
    pub email: Option<String>,
    pub gender: Option<String>,
}

impl UpdateUserRequest {
    pub fn merge_into(self, existing: &User) -> User {
        User {
            id: existing.id,
            username: self.username,
            password: self.password,
            full_name: self.full_name,
            age: self.age,
            email: self.email,
            gender: self.gender,
            extra: existing.extra.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: String,
    pub user: User,
}

/// A stored blog post.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Blog {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Blog {
    fn id(&self) -> u64 {
        self.id
    }
}

const BLOG_REQUIRED: &str = "Title, content and author are required.";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBlogRequest {
    #[validate(required, length(min = 1, message = "Title, content and author are required."))]
    pub title: Option<String>,

    #[validate(required, length(min = 1, message = "Title, content and author are required."))]
    pub content: Option<String>,

    #[validate(required, length(min = 1, message = "Title, content and author are required."))]
    pub author: Option<String>,

    pub tags: Option<Vec<String>>,
}

impl CreateBlogRequest {
    pub const FIELDS: &'static [(&'static str, &'static str)] = &[
        ("title", BLOG_REQUIRED),
        ("content", BLOG_REQUIRED),
        ("author", BLOG_REQUIRED),
    ];

    pub fn into_blog(self, id: u64) -> Blog {
        Blog {
            id,
            title: self.title,
            content: self.content,
            author: self.author,
            tags: Some(self.tags.unwrap_or_default()),
            extra: Map::new(),
        }
    }
}

/// Body of `PUT /blogs/{id}`, merged the same way as user updates.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl UpdateBlogRequest {
    pub fn merge_into(self, existing: &Blog) -> Blog {
        Blog {
            id: existing.id,
            title: self.title,
            content: self.content,
            author: self.author,
            tags: self.tags,
            extra: existing.extra.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlogResponse {
    pub message: String,
    pub blog: Blog,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
