use config::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub mail: MailSettings,
    pub notify: NotifySettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
}

/// Where "someone commented" mail goes, and the public base URL used to build
/// links inside notification mail.
#[derive(Deserialize, Clone)]
pub struct NotifySettings {
    pub operator_email: String,
    pub public_host: String,
}

#[derive(Deserialize, Clone)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum MailSettings {
    /// 开发模式：邮件只打日志，不真正投递
    Console,
    Smtp {
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
    },
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let env_map = collect_env_vars();

        let s = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.cors_origins", "*")?
            .set_default("database.url", "sqlite://data/voila.db")?
            .set_default("mail.mode", "console")?
            .set_default("notify.operator_email", "operator@voila.local")?
            .set_default("notify.public_host", "http://localhost:8000")?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name(&format!("config.{}", run_mode)).required(false))
            .add_source(config::File::from_str(
                &serde_json::to_string(&env_map)
                    .expect("Environment variables should serialize to JSON"),
                config::FileFormat::Json,
            ))
            .build()?;

        s.try_deserialize()
    }
}

fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("VOILA_"))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches("VOILA_")
                .replace("__", ".")
                .to_lowercase();
            (new_key, v)
        })
        .collect()
}
