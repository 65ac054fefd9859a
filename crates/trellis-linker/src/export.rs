//! Merged-output export

use std::path::{Path, PathBuf};

use crate::merge::MergedMachine;

/// Export directory: .trellis/
pub const EXPORT_DIR: &str = ".trellis";

/// Merged machine file
pub const MERGED_FILE: &str = "merged.json";

/// Get export directory path
pub fn export_dir(root: &Path) -> PathBuf {
    root.join(EXPORT_DIR)
}

/// Get merged machine file path
pub fn merged_path(root: &Path) -> PathBuf {
    root.join(EXPORT_DIR).join(MERGED_FILE)
}

/// Ensure export directory exists
pub fn ensure_export_dir(root: &Path) -> std::io::Result<()> {
    let dir = export_dir(root);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(())
}

/// Write the merged machine as pretty JSON with a version/timestamp header,
/// for downstream validation and execution tooling.
pub fn save_merged(merged: &MergedMachine, root: &Path) -> anyhow::Result<PathBuf> {
    ensure_export_dir(root)?;
    let path = merged_path(root);

    let payload = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "machine": merged,
    });

    let json_str = serde_json::to_string_pretty(&payload)?;
    std::fs::write(&path, json_str)?;

    tracing::debug!("merged machine saved: {}", path.display());
    Ok(path)
}

/// Clear export directory
pub fn clear_export(root: &Path) -> std::io::Result<()> {
    let dir = export_dir(root);
    if dir.exists() {
        std::fs::remove_dir_all(&dir)?;
    }
    Ok(())
}
