//! Workspace document discovery

use std::path::{Path, PathBuf};

/// Walk a directory tree and collect every DSL document, honoring ignore
/// files the way the surrounding repository does.
pub fn discover_documents(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut documents = Vec::new();
    for entry in ignore::WalkBuilder::new(root).build().flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
            documents.push(path.to_path_buf());
        }
    }
    documents.sort();
    documents
}
