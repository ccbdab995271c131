use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Sqlite,
};
use std::{fs, path::Path, str::FromStr};

mod models;
mod repo;

#[derive(Clone)]
pub struct Db {
    pub(crate) pool: Pool<Sqlite>,
}

impl Db {
    pub async fn new(db_url: &str) -> anyhow::Result<Self> {
        if db_url.starts_with("sqlite://") && !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite://");
            let path = Path::new(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
        }
        // 外键必须逐连接开启，否则级联删除不生效
        let connect_options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);
        let mut pool_options = SqlitePoolOptions::new();
        if db_url.contains(":memory:") {
            // 内存库随连接存亡，必须固定在单个连接上
            pool_options = pool_options.max_connections(1).min_connections(1);
        }
        let pool = pool_options.connect_with(connect_options).await?;
        tracing::debug!("Applying database migrations");
        sqlx::migrate!("../../migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}
