//! CLI command implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use trellis_core::{Diagnostics, ModuleId, Severity};
use trellis_linker::{export, merge_machines};
use trellis_resolver::{CompositeResolver, FileSystemResolver, ModuleResolver, UrlResolver};
use trellis_workspace::{
    discover_documents, OutlineParser, WorkspaceConfig, WorkspaceManager,
};

pub async fn check(root: PathBuf, entry: Option<String>) -> anyhow::Result<()> {
    let (mut workspace, diagnostics, config) = build_workspace(&root)?;
    let parser = OutlineParser::new();
    let anchor = ModuleId::anchor(&root);

    match entry {
        Some(entry) => {
            workspace
                .load_document_with_dependencies(&entry_import_path(&entry), &anchor, &parser)
                .await?;
        }
        None => {
            for document in discover_documents(&root, &config.extensions) {
                let import_path = root_relative_import(&root, &document);
                if let Err(e) = workspace
                    .load_document_with_dependencies(&import_path, &anchor, &parser)
                    .await
                {
                    diagnostics.error(e.to_string(), None);
                }
            }
        }
    }

    tracing::info!(
        "Loaded {} documents, {} dependency edges",
        workspace.len(),
        workspace
            .modules()
            .map(|info| info.dependencies.len())
            .sum::<usize>()
    );

    // a cyclic workspace is unlinkable; surface the chains alongside the rest
    workspace.documents_in_order();
    report(&diagnostics)
}

pub async fn order(root: PathBuf, entry: String) -> anyhow::Result<()> {
    let (mut workspace, diagnostics, _) = build_workspace(&root)?;
    let parser = OutlineParser::new();
    let anchor = ModuleId::anchor(&root);

    workspace
        .load_document_with_dependencies(&entry_import_path(&entry), &anchor, &parser)
        .await?;

    match workspace.documents_in_order() {
        Some(order) => {
            for id in order {
                println!("{id}");
            }
            report(&diagnostics)
        }
        None => {
            print_diagnostics(&diagnostics);
            anyhow::bail!("workspace has circular dependencies");
        }
    }
}

pub async fn merge(root: PathBuf, entry: String) -> anyhow::Result<()> {
    let (mut workspace, diagnostics, _) = build_workspace(&root)?;
    let parser = OutlineParser::new();
    let anchor = ModuleId::anchor(&root);

    let entry_id = workspace
        .load_document_with_dependencies(&entry_import_path(&entry), &anchor, &parser)
        .await?;

    let merged = match merge_machines(&workspace, &entry_id) {
        Ok(merged) => merged,
        Err(e) => {
            print_diagnostics(&diagnostics);
            return Err(e.into());
        }
    };

    let path = export::save_merged(&merged, &root)?;
    println!(
        "Merged {} symbols from {} files into {}",
        merged.definitions.len(),
        merged.source_files.len(),
        path.display()
    );
    report(&diagnostics)
}

/// Assemble the resolver stack and workspace from the root's configuration.
fn build_workspace(
    root: &Path,
) -> anyhow::Result<(WorkspaceManager, Arc<Diagnostics>, WorkspaceConfig)> {
    let config = WorkspaceConfig::load(root)?;
    let diagnostics = Arc::new(Diagnostics::new());

    let mut composite = CompositeResolver::new(diagnostics.clone());
    for backend in &config.resolvers {
        match backend.as_str() {
            "filesystem" => {
                composite = composite.push(Arc::new(FileSystemResolver::with_extensions(
                    diagnostics.clone(),
                    config.extensions.clone(),
                )));
            }
            "url" => {
                composite = composite.push(Arc::new(UrlResolver::new(diagnostics.clone())));
            }
            other => {
                tracing::warn!("unknown resolver backend `{other}` in config, skipping");
            }
        }
    }
    let resolver: Arc<dyn ModuleResolver> = Arc::new(composite);

    Ok((
        WorkspaceManager::new(resolver, diagnostics.clone()),
        diagnostics,
        config,
    ))
}

/// Normalize a user-supplied entry into a recognized import path.
fn entry_import_path(entry: &str) -> String {
    if entry.starts_with("./")
        || entry.starts_with("../")
        || entry.starts_with('/')
        || entry.starts_with("http://")
        || entry.starts_with("https://")
    {
        entry.to_string()
    } else {
        format!("./{entry}")
    }
}

/// Import path for a discovered document, relative to the workspace root.
fn root_relative_import(root: &Path, document: &Path) -> String {
    let relative = document.strip_prefix(root).unwrap_or(document);
    format!("./{}", relative.to_string_lossy().replace('\\', "/"))
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.entries() {
        println!("{}: {}", diagnostic.severity, diagnostic.message);
    }
}

/// Print everything collected and fail the command when errors remain.
fn report(diagnostics: &Diagnostics) -> anyhow::Result<()> {
    print_diagnostics(diagnostics);
    let errors = diagnostics
        .entries()
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("{errors} error(s) reported");
    }
    Ok(())
}
