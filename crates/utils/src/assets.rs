use std::path::PathBuf;

const DATA_DIR_ENV: &str = "TASKBOARD_DATA_DIR";

/// Directory holding the sqlite database and any other local state.
/// Overridable via TASKBOARD_DATA_DIR; defaults to ./data.
pub fn asset_dir() -> std::io::Result<PathBuf> {
    let path = match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim().to_string()),
        _ => PathBuf::from("data"),
    };
    if !path.exists() {
        std::fs::create_dir_all(&path)?;
    }
    Ok(path)
}

pub fn db_path() -> std::io::Result<PathBuf> {
    Ok(asset_dir()?.join("taskboard.sqlite"))
}
