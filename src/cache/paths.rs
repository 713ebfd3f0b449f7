// Filesystem locations.
// Resolves where the persisted token and exported logs live.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;

/// Get the base data directory (~/.cache/tourdesk on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tourdesk").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Path to the persisted key/value storage holding the bearer token.
pub fn storage_path() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join("storage.json"))
}

/// Directory for exported log snapshots.
pub fn logs_dir() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join("logs"))
}

/// File name of a log export, e.g. `staging-20260304T050607Z.json`.
pub fn log_export_name(environment: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}-{}.json",
        sanitize_name(environment),
        at.format("%Y%m%dT%H%M%SZ")
    )
}

/// Sanitize a name for use in filesystem paths.
/// Replaces problematic characters with underscores.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '_',
            _ => c,
        })
        .collect()
}
