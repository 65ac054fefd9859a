//! Local filesystem resolution

use std::sync::Arc;

use async_trait::async_trait;
use trellis_core::{normalize_path, Diagnostics, ModuleId, ResolvedModule, Severity};

use crate::{has_extension, ModuleResolver, DEFAULT_EXTENSIONS};

/// Resolves `./x` and `../x` imports relative to the importing module's
/// directory, plus bare `/absolute` paths (flagged as a portability warning).
/// Extensionless paths are tried against the configured extension list in
/// order; the first existing file wins. Reads are never cached, so re-reads
/// always reflect the latest edits.
pub struct FileSystemResolver {
    extensions: Vec<String>,
    diagnostics: Arc<Diagnostics>,
}

impl FileSystemResolver {
    pub fn new(diagnostics: Arc<Diagnostics>) -> Self {
        Self::with_extensions(
            diagnostics,
            DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        )
    }

    pub fn with_extensions(diagnostics: Arc<Diagnostics>, extensions: Vec<String>) -> Self {
        FileSystemResolver {
            extensions,
            diagnostics,
        }
    }

    /// Candidate paths to try against disk, in order.
    fn candidates(&self, import_path: &str, from: &ModuleId) -> Vec<String> {
        let joined = if import_path.starts_with('/') {
            import_path.to_string()
        } else {
            let base = from.parent_dir();
            if base.is_empty() {
                import_path.to_string()
            } else {
                format!("{}/{}", base, import_path)
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
impl ModuleResolver for FileSystemResolver {
    fn can_resolve(&self, import_path: &str) -> bool {
        import_path.starts_with("./")
            || import_path.starts_with("../")
            || (import_path.starts_with('/') && !import_path.starts_with("//"))
    }

    async fn resolve(&self, import_path: &str, from: &ModuleId) -> Option<ResolvedModule> {
        if import_path.starts_with('/') {
            self.diagnostics.accept(
                Severity::Warning,
                format!("absolute import path `{import_path}` is not portable"),
                None,
                Some("path"),
            );
        }

        for candidate in self.candidates(import_path, from) {
            match tokio::fs::read_to_string(&candidate).await {
                Ok(content) => {
                    tracing::debug!("resolved `{import_path}` to {candidate}");
                    return Some(ResolvedModule {
                        id: ModuleId::from_path_str(&candidate),
                        import_path: import_path.to_string(),
                        resolved_location: candidate,
                        content: Some(content),
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => {
                    self.diagnostics.accept(
                        Severity::Warning,
                        format!("cannot read {candidate}: {err}"),
                        None,
                        Some("path"),
                    );
                }
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
