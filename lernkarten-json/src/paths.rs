use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub fn data_root() -> PathBuf {
    if let Some(pd) = ProjectDirs::from("de", "lernkarten", "Lernkarten") {
        pd.data_dir().to_path_buf()
    } else {
        // no home directory: fall back to the working directory
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

/// Store file and backup directory inside `root`.
pub fn store_files(root: &Path) -> (PathBuf, PathBuf) {
    (root.join("lernkarten.json"), root.join("backups"))
}
