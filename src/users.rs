use actix_web::HttpResponse;
use actix_web::web::{Data, Json, Path};
use log::{debug, info};
use validator::Validate;
use crate::errors::ApiError;
use crate::helpers::{first_validation_error, respond_created, respond_json};
use crate::models::{CreateUserRequest, MessageResponse, UpdateUserRequest, User, UserResponse};
use crate::server::AppState;

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found.".to_string())
}

pub async fn create_user(
    state: Data<AppState>,
    body: Json<CreateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    body
        .validate()
        .map_err(|e| first_validation_error(&e, CreateUserRequest::FIELDS))?;

    let request = body.into_inner();
    let user = state.users.modify(|users| {
        let taken = users.records().iter().any(|u| {
            (request.username.is_some() && u.username == request.username)
                || (request.email.is_some() && u.email == request.email)
        });
        if taken {
            debug!("create_user - username or email already exists. username: {:?}, email: {:?}", &request.username, &request.email);
            return Err(ApiError::AlreadyExist("Username or email already exists.".to_string()));
        }

        let id = users.allocate_id();
        let user = request.into_user(id);
        users.push(user.clone());
        Ok(user)
    })?;

    info!("created user {}", user.id);
    respond_created(UserResponse {
        message: "User created successfully.".to_string(),
        user,
    })
}

pub async fn get_user(
    state: Data<AppState>,
    identifier: Path<String>,
) -> Result<Json<User>, ApiError> {
    let users = state.users.read_all()?;
    match users.into_iter().find(|u| u.is_identified_by(&identifier)) {
        Some(user) => respond_json(user),
        None => {
            debug!("get_user - no user matches {}", identifier.as_str());
            Err(user_not_found())
        }
    }
}

pub async fn update_user(
    state: Data<AppState>,
    identifier: Path<String>,
    body: Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let request = body.into_inner();
    let user = state.users.modify(|users| -> Result<User, ApiError> {
        let index = users
            .records()
            .iter()
            .position(|u| u.is_identified_by(&identifier))
            .ok_or_else(user_not_found)?;

        let records = users.records_mut();
        let updated = request.merge_into(&records[index]);
        records[index] = updated.clone();
        Ok(updated)
    })?;

    info!("updated user {}", user.id);
    respond_json(UserResponse {
        message: "User updated successfully.".to_string(),
        user,
    })
}

pub async fn delete_user(
    state: Data<AppState>,
    identifier: Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.users.modify(|users| -> Result<(), ApiError> {
        let before = users.records().len();
        if !users.records().iter().any(|u| u.is_identified_by(&identifier)) {
            return Err(user_not_found());
        }
        users.records_mut().retain(|u| !u.is_identified_by(&identifier));
        info!("deleted {} user(s) matching {}", before - users.records().len(), identifier.as_str());
        Ok(())
    })?;

    respond_json(MessageResponse {
        message: "User deleted successfully.".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use tempfile::tempdir;
    use crate::routes::init;
    use crate::server::test_support::state_in;
    use crate::storage::read_collection;

    fn post_user(body: Value) -> test::TestRequest {
        test::TestRequest::post().uri("/users").set_json(body)
    }

    #[actix_rt::test]
    async fn create_reports_first_failing_field() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state_in(dir.path())).configure(init)).await;

        let resp = test::call_service(&app, post_user(json!({ "username": "ab", "password": "1", "email": "a@b.com" })).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Username must be at least 3 characters long.");

        let resp = test::call_service(&app, post_user(json!({ "username": "alice", "password": "12345" })).to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Email is required.");

        let req = post_user(json!({
            "username": "alice",
            "password": "12345",
            "email": "a@b.com",
            "gender": "robot"
        }));
        let resp = test::call_service(&app, req.to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Gender must be either \"male\" or \"female\".");

        assert!(!dir.path().join("users.json").exists());
    }

    #[actix_rt::test]
    async fn create_assigns_id_and_rejects_duplicates() {
        let dir = tempdir().unwrap();
        let state = state_in(dir.path());
        let app = test::init_service(App::new().app_data(state.clone()).configure(init)).await;
        let alice = json!({ "username": "alice", "password": "12345", "email": "a@b.com" });

        let resp = test::call_service(&app, post_user(alice.clone()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["id"], 1);
        assert_eq!(body["user"]["fullName"], "");
        assert_eq!(body["user"]["gender"], "");
        assert!(body["message"].is_string());

        let resp = test::call_service(&app, post_user(alice).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(&app, post_user(json!({ "username": "bob", "password": "12345", "email": "a@b.com" })).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(&app, post_user(json!({ "username": "bob", "password": "12345", "email": "bob@b.com", "age": 30 })).to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["id"], 2);
        assert_eq!(body["user"]["age"], 30);

        assert_eq!(state.users.read_all().unwrap().len(), 2);
    }

    #[actix_rt::test]
    async fn get_matches_username_or_email() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state_in(dir.path())).configure(init)).await;
        test::call_service(&app, post_user(json!({ "username": "alice", "password": "12345", "email": "a@b.com" })).to_request()).await;

        for identifier in ["alice", "a@b.com"] {
            let req = test::TestRequest::get().uri(&format!("/users/{}", identifier)).to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["username"], "alice");
        }

        let req = test::TestRequest::get().uri("/users/nobody").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "User not found.");
    }

    #[actix_rt::test]
    async fn update_overwrites_with_request_fields() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state_in(dir.path())).configure(init)).await;
        test::call_service(&app, post_user(json!({ "username": "alice", "password": "12345", "email": "a@b.com", "age": 20 })).to_request()).await;

        let req = test::TestRequest::put()
            .uri("/users/a@b.com")
            .set_json(json!({ "username": "al", "email": "new@b.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let stored: Vec<Value> = read_collection(&dir.path().join("users.json")).unwrap();
        assert_eq!(stored, vec![json!({ "id": 1, "username": "al", "email": "new@b.com" })]);
    }

    #[actix_rt::test]
    async fn unknown_identifier_leaves_store_untouched() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state_in(dir.path())).configure(init)).await;
        test::call_service(&app, post_user(json!({ "username": "alice", "password": "12345", "email": "a@b.com" })).to_request()).await;
        let path = dir.path().join("users.json");
        let before = std::fs::read_to_string(&path).unwrap();

        let req = test::TestRequest::put()
            .uri("/users/ghost")
            .set_json(json!({ "username": "ghost" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete().uri("/users/ghost").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[actix_rt::test]
    async fn delete_removes_user_and_keeps_ids_unique() {
        let dir = tempdir().unwrap();
        let state = state_in(dir.path());
        let app = test::init_service(App::new().app_data(state.clone()).configure(init)).await;
        test::call_service(&app, post_user(json!({ "username": "alice", "password": "12345", "email": "a@b.com" })).to_request()).await;
        test::call_service(&app, post_user(json!({ "username": "bob", "password": "12345", "email": "b@b.com" })).to_request()).await;

        let req = test::TestRequest::delete().uri("/users/alice").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "message": "User deleted successfully." }));

        let resp = test::call_service(&app, post_user(json!({ "username": "carol", "password": "12345", "email": "c@b.com" })).to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["id"], 3);

        let ids: Vec<u64> = state.users.read_all().unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[actix_rt::test]
    async fn corrupt_store_is_an_internal_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("users.json"), "not json").unwrap();
        let app = test::init_service(App::new().app_data(state_in(dir.path())).configure(init)).await;

        let req = test::TestRequest::get().uri("/users/alice").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Internal Server Error");
    }

    #[actix_rt::test]
    async fn create_follows_the_documented_scenario() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state_in(dir.path())).configure(init)).await;

        let resp = test::call_service(&app, post_user(json!({ "username": "ab", "password": "12345", "email": "a@b.com" })).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Username must be at least 3 characters long." }));

        let alice = json!({ "username": "alice", "password": "12345", "email": "a@b.com" });
        let resp = test::call_service(&app, post_user(alice.clone()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["id"], 1);

        let resp = test::call_service(&app, post_user(alice).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Username or email already exists.");
    }

    #[actix_rt::test]
    async fn create_rejects_each_invalid_field_with_its_message() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state_in(dir.path())).configure(init)).await;

        let cases = [
            (
                json!({ "username": "alice", "password": "1234", "email": "a@b.com" }),
                "Password must be at least 5 characters long.",
            ),
            (
                json!({ "username": "alice", "password": "12345", "email": "a@b.com", "fullName": "Alice" }),
                "FullName must be at least 10 characters long.",
            ),
            (
                json!({ "username": "alice", "password": "12345", "email": "a@b.com", "age": 9 }),
                "Age must be at least 10.",
            ),
            (
                json!({ "password": "12345", "email": "a@b.com" }),
                "Username must be at least 3 characters long.",
            ),
            (
                json!({ "username": "alice", "password": "123", "email": "a@b.com", "age": 5, "gender": "x" }),
                "Password must be at least 5 characters long.",
            ),
            (
                json!({ "username": "alice", "password": "12345", "fullName": "Al" }),
                "FullName must be at least 10 characters long.",
            ),
        ];

        for (request, message) in cases {
            let resp = test::call_service(&app, post_user(request).to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], message);
        }
        assert!(!dir.path().join("users.json").exists());
    }

    #[actix_rt::test]
    async fn create_accepts_fractional_age() {
        let dir = tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state_in(dir.path())).configure(init)).await;

        let body = json!({ "username": "alice", "password": "12345", "email": "a@b.com", "age": 12.5 });
        let resp = test::call_service(&app, post_user(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["age"], 12.5);
    }

    #[actix_rt::test]
    async fn records_from_older_stores_stay_readable_and_intact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        let legacy = json!([{
            "id": 1,
            "username": "alice",
            "password": "12345",
            "fullName": "",
            "age": "20",
            "email": "a@b.com",
            "gender": "",
            "createdAt": "2024-01-01"
        }]);
        std::fs::write(&path, legacy.to_string()).unwrap();
        let app = test::init_service(App::new().app_data(state_in(dir.path())).configure(init)).await;

        let req = test::TestRequest::get().uri("/users/alice").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["age"], "20");

        let resp = test::call_service(&app, post_user(json!({ "username": "bob", "password": "12345", "email": "b@b.com" })).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::put()
            .uri("/users/alice")
            .set_json(json!({ "username": "alice", "email": "a@b.com" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let stored: Vec<Value> = read_collection(&path).unwrap();
        assert_eq!(
            stored[0],
            json!({ "id": 1, "username": "alice", "email": "a@b.com", "createdAt": "2024-01-01" })
        );
        assert_eq!(stored[1]["username"], "bob");
    }
}
