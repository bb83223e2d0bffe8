use std::path::PathBuf;
use dotenv::dotenv;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_users_file")]
    pub users_file: PathBuf,
    #[serde(default = "default_blogs_file")]
    pub blogs_file: PathBuf,
}

fn default_server() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_users_file() -> PathBuf {
    PathBuf::from("./database/users.json")
}

fn default_blogs_file() -> PathBuf {
    PathBuf::from("./database/blok.json")
}

lazy_static! {
    pub static ref CONFIG: Config = get_config();
}

fn get_config() -> Config {
    dotenv().ok();

    match envy::from_env::<Config>() {
        Ok(config) => config,
        Err(error) => panic!("Configuration Error: {:#?}", error),
    }
}
