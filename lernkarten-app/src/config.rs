use crate::cli::opts::{Cli, StoreKind};
use lernkarten_core::UserId;
use lernkarten_json::paths::data_root;
use std::path::PathBuf;

/// Settings resolved from flags, environment and platform defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub user: UserId,
    pub store: StoreKind,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let data_dir = cli.data_dir.clone().unwrap_or_else(data_root);
        let db_path = cli
            .db_path
            .clone()
            .unwrap_or_else(|| data_dir.join("lernkarten.sqlite3"));
        Self {
            user: UserId::new(cli.user.trim()),
            store: cli.store,
            data_dir,
            db_path,
            log_level: cli.log_level.clone(),
        }
    }
}
