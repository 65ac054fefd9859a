//! Remote URL resolution

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use trellis_core::{Diagnostics, ModuleId, ResolvedModule, Severity};

use crate::ModuleResolver;

/// Explicit, injectable memo for URL fetches, keyed by literal import path.
///
/// `Some` entries are successful fetches; `None` entries remember failures so
/// they are never auto-retried. There is no automatic invalidation — `clear`
/// (or `evict` for one entry) is the explicit refresh.
#[derive(Debug, Default)]
pub struct UrlCache {
    entries: DashMap<String, Option<ResolvedModule>>,
}

impl UrlCache {
    pub fn new() -> Self {
        UrlCache {
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, url: &str) -> Option<Option<ResolvedModule>> {
        self.entries.get(url).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, url: String, result: Option<ResolvedModule>) {
        self.entries.insert(url, result);
    }

    pub fn evict(&self, url: &str) {
        self.entries.remove(url);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves `http://` / `https://` imports over the network. Plain `http://`
/// is flagged as a security warning. No internal timeout is imposed;
/// interactive callers wrap `resolve` in their own.
pub struct UrlResolver {
    client: reqwest::Client,
    cache: Arc<UrlCache>,
    diagnostics: Arc<Diagnostics>,
}

impl UrlResolver {
    pub fn new(diagnostics: Arc<Diagnostics>) -> Self {
        Self::with_cache(diagnostics, Arc::new(UrlCache::new()))
    }

    pub fn with_cache(diagnostics: Arc<Diagnostics>, cache: Arc<UrlCache>) -> Self {
        UrlResolver {
            client: reqwest::Client::new(),
            cache,
            diagnostics,
        }
    }

    pub fn cache(&self) -> &Arc<UrlCache> {
        &self.cache
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    async fn fetch(&self, url: &str) -> Option<ResolvedModule> {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(content) => Some(ResolvedModule {
                    id: ModuleId::from_url(url),
                    import_path: url.to_string(),
                    resolved_location: url.to_string(),
                    content: Some(content),
                }),
                Err(err) => {
                    self.diagnostics.accept(
                        Severity::Error,
                        format!("URL import failed for {url}: {err}"),
                        None,
                        Some("path"),
                    );
                    None
                }
            },
            Ok(response) => {
                let status = response.status().as_u16();
                self.diagnostics.accept(
                    Severity::Error,
                    format!("URL import failed for {url}: HTTP {status}"),
                    None,
                    Some("path"),
                );
                None
            }
            Err(err) => {
                self.diagnostics.accept(
                    Severity::Error,
                    format!("URL import failed for {url}: {err}"),
                    None,
                    Some("path"),
                );
                None
            }
        }
    }
}

#[async_trait]
impl ModuleResolver for UrlResolver {
    fn can_resolve(&self, import_path: &str) -> bool {
        import_path.starts_with("http://") || import_path.starts_with("https://")
    }

    async fn resolve(&self, import_path: &str, _from: &ModuleId) -> Option<ResolvedModule> {
        if let Some(memoized) = self.cache.get(import_path) {
            tracing::debug!("URL cache hit for {import_path}");
            return memoized;
        }

        if import_path.starts_with("http://") {
            self.diagnostics.accept(
                Severity::Warning,
                format!("insecure import over plain http: {import_path}"),
                None,
                Some("path"),
            );
        }

        let result = self.fetch(import_path).await;
        self.cache.insert(import_path.to_string(), result.clone());
        result
    }
}
