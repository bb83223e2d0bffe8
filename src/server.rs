use std::path::PathBuf;
use actix_web::{web, App, HttpServer, middleware};
use dotenv::dotenv;
use env_logger::Builder;
use log::info;
use crate::config::CONFIG;
use crate::models::{Blog, User};
use crate::routes::init;
use crate::storage::Collection;
use std::io::Write;

pub struct AppState {
    pub users: Collection<User>,
    pub blogs: Collection<Blog>,
}

impl AppState {
    pub fn new(users_file: impl Into<PathBuf>, blogs_file: impl Into<PathBuf>) -> Self {
        AppState {
            users: Collection::new(users_file),
            blogs: Collection::new(blogs_file),
        }
    }
}

pub async fn server() -> std::io::Result<()> {
    dotenv().ok();

    // Build the log format
    Builder::from_env(env_logger::Env::default().default_filter_or(&CONFIG.log_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                chrono::Local::now().format("%Y-%m-%d - %H:%M:%S").to_string(),
                record.args()
            )
        })
        .init();

    // Shared by every worker so each collection has a single lock.
    let state = web::Data::new(AppState::new(&CONFIG.users_file, &CONFIG.blogs_file));
    info!(
        "users stored in {}, blogs stored in {}",
        state.users.path().display(),
        state.blogs.path().display()
    );

    info!("🚀 Blog Service Started Successfully at http://{}", &CONFIG.server);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(init)
    });
    server.bind(&CONFIG.server)?.run().await
}
