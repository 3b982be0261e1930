use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    InMem,
    Postgres,
}

/// Runtime configuration derived from env.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Snapshot directory for the in-memory store.
    pub data_dir: PathBuf,
    pub seed_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let store = match std::env::var("FORUM_STORE").ok().as_deref() {
            None | Some("inmem") => StoreBackend::InMem,
            Some("postgres") => StoreBackend::Postgres,
            Some(other) => return Err(ConfigError::Invalid { name: "FORUM_STORE", value: other.to_string() }),
        };
        let database_url = std::env::var("DATABASE_URL").ok();
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        let db_max_connections = match std::env::var("FORUM_DB_MAX_CONNECTIONS") {
            Ok(v) => v
                .parse()
                .ok()
                .filter(|n: &u32| *n > 0)
                .ok_or(ConfigError::Invalid { name: "FORUM_DB_MAX_CONNECTIONS", value: v })?,
            Err(_) => 5,
        };
        let data_dir = std::env::var("FORUM_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        let seed_file = std::env::var("FORUM_SEED_FILE").ok().map(PathBuf::from);
        Ok(Self { store, database_url, db_max_connections, data_dir, seed_file })
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }
}
