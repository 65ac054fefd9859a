//! In-memory virtual filesystem resolution

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use trellis_core::{normalize_path, Diagnostics, ModuleId, ResolvedModule, Severity, VIRTUAL_SCHEME};

use crate::{has_extension, ModuleResolver, DEFAULT_EXTENSIONS};

/// Resolves relative imports against an injected path→content map.
/// Never caches; lookups always see the current map contents.
pub struct VirtualResolver {
    files: DashMap<String, String>,
    extensions: Vec<String>,
    diagnostics: Arc<Diagnostics>,
}

impl VirtualResolver {
    pub fn new(diagnostics: Arc<Diagnostics>) -> Self {
        Self::with_extensions(
            diagnostics,
            DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        )
    }

    pub fn with_extensions(diagnostics: Arc<Diagnostics>, extensions: Vec<String>) -> Self {
        VirtualResolver {
            files: DashMap::new(),
            extensions,
            diagnostics,
        }
    }

    /// Insert or replace an in-memory file.
    pub fn insert(&self, path: &str, content: &str) {
        self.files
            .insert(Self::key(path), content.to_string());
    }

    /// Remove an in-memory file.
    pub fn remove(&self, path: &str) {
        self.files.remove(&Self::key(path));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn key(path: &str) -> String {
        let stripped = path.strip_prefix(VIRTUAL_SCHEME).unwrap_or(path);
        normalize_path(stripped)
    }

    fn candidates(&self, import_path: &str, from: &ModuleId) -> Vec<String> {
        let raw = import_path
            .strip_prefix(VIRTUAL_SCHEME)
            .unwrap_or(import_path);
        let joined = if raw.starts_with('/') || import_path.starts_with(VIRTUAL_SCHEME) {
            raw.trim_start_matches('/').to_string()
        } else {
            let base = from
                .as_str()
                .strip_prefix(VIRTUAL_SCHEME)
                .map(|rest| match rest.rfind('/') {
                    Some(idx) => &rest[..idx],
                    None => "",
                })
                .unwrap_or("");
            if base.is_empty() {
                raw.to_string()
            } else {
                format!("{}/{}", base, raw)
            }
        };
        let joined = normalize_path(&joined);
        if has_extension(&joined) {
            vec![joined]
        } else {
            self.extensions
                .iter()
                .map(|ext| format!("{}{}", joined, ext))
                .collect()
        }
    }
}

#[async_trait]
impl ModuleResolver for VirtualResolver {
    fn can_resolve(&self, import_path: &str) -> bool {
        import_path.starts_with("./")
            || import_path.starts_with("../")
            || import_path.starts_with('/')
            || import_path.starts_with(VIRTUAL_SCHEME)
    }

    async fn resolve(&self, import_path: &str, from: &ModuleId) -> Option<ResolvedModule> {
        for candidate in self.candidates(import_path, from) {
            if let Some(content) = self.files.get(&candidate) {
                return Some(ResolvedModule {
                    id: ModuleId::from_virtual(&candidate),
                    import_path: import_path.to_string(),
                    resolved_location: format!("{}{}", VIRTUAL_SCHEME, candidate),
                    content: Some(content.value().clone()),
                });
            }
        }

        self.diagnostics.accept(
            Severity::Error,
            format!("module not found: {import_path} (imported from {from})"),
            None,
            Some("path"),
        );
        None
    }
}
