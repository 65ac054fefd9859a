//! Integration tests for Trellis
//!
//! These tests verify that resolution, loading, ordering, and merging work
//! together over a real workspace directory.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;
use trellis_core::{Diagnostics, LinkError, ModuleId};
use trellis_linker::{export, merge_machines};
use trellis_resolver::{CompositeResolver, FileSystemResolver, ModuleResolver, UrlResolver};
use trellis_workspace::{discover_documents, OutlineParser, WorkspaceConfig, WorkspaceManager};

fn file_workspace(root: &Path) -> (WorkspaceManager, Arc<Diagnostics>) {
    let diagnostics = Arc::new(Diagnostics::new());
    let composite = CompositeResolver::new(diagnostics.clone())
        .push(Arc::new(FileSystemResolver::new(diagnostics.clone())))
        .push(Arc::new(UrlResolver::new(diagnostics.clone())));
    let resolver: Arc<dyn ModuleResolver> = Arc::new(composite);
    (
        WorkspaceManager::new(resolver, diagnostics.clone()),
        diagnostics,
    )
}

/// Test that the CLI can be invoked
#[tokio::test]
async fn test_cli_invocation() {
    let output = Command::new("cargo")
        .args(["run", "--", "--help"])
        .current_dir(".")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("trellis"));
    assert!(stdout.contains("Module resolution and cross-file linking"));
}

/// Test loading, ordering, and merging a real on-disk workspace
#[tokio::test]
async fn test_end_to_end_link_and_merge() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("lib.fsm"),
        "machine Library\nstate Start {\n  task ping\n}\nstate Stop\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("app.fsm"),
        "machine App\nimport { Start, Stop as Halt } from \"./lib.fsm\"\nstate Main\n",
    )
    .unwrap();

    let (mut workspace, diagnostics) = file_workspace(dir.path());
    let parser = OutlineParser::new();
    let anchor = ModuleId::anchor(dir.path());

    let entry = workspace
        .load_document_with_dependencies("./app.fsm", &anchor, &parser)
        .await
        .unwrap();

    assert_eq!(workspace.len(), 2);
    let order = workspace.documents_in_order().unwrap();
    assert_eq!(order.len(), 2);
    assert_eq!(order[1], entry);

    let merged = merge_machines(&workspace, &entry).unwrap();
    assert_eq!(merged.definitions.len(), 3);
    assert_eq!(merged.source_map["Halt"].original_name.as_deref(), Some("Stop"));
    assert!(!diagnostics.has_errors());

    let exported = export::save_merged(&merged, dir.path()).unwrap();
    assert!(exported.exists());
    assert_eq!(exported, export::merged_path(dir.path()));
}

/// Test that a cyclic workspace loads fully but refuses to merge
#[tokio::test]
async fn test_cyclic_workspace_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("a.fsm"),
        "machine A\nimport { B } from \"./b.fsm\"\nstate A\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("b.fsm"),
        "machine B\nimport { A } from \"./a.fsm\"\nstate B\n",
    )
    .unwrap();

    let (mut workspace, diagnostics) = file_workspace(dir.path());
    let parser = OutlineParser::new();
    let anchor = ModuleId::anchor(dir.path());

    let entry = workspace
        .load_document_with_dependencies("./a.fsm", &anchor, &parser)
        .await
        .unwrap();
    assert_eq!(workspace.len(), 2);

    assert!(workspace.documents_in_order().is_none());
    assert!(matches!(
        merge_machines(&workspace, &entry),
        Err(LinkError::CircularDependency { .. })
    ));
    assert!(diagnostics
        .entries()
        .iter()
        .any(|d| d.message.contains("circular dependency")));
}

/// Test that editing a file on disk is picked up by a reload
#[tokio::test]
async fn test_filesystem_reads_are_never_cached() {
    let dir = TempDir::new().unwrap();
    let lib = dir.path().join("lib.fsm");
    fs::write(&lib, "machine Library\nstate Start\n").unwrap();

    let (mut workspace, _) = file_workspace(dir.path());
    let parser = OutlineParser::new();
    let anchor = ModuleId::anchor(dir.path());

    let id = workspace
        .load_document_with_dependencies("./lib.fsm", &anchor, &parser)
        .await
        .unwrap();
    assert_eq!(
        workspace.module(&id).unwrap().module.ast.definitions.len(),
        1
    );

    fs::write(&lib, "machine Library\nstate Start\nstate Stop\n").unwrap();
    workspace.remove_document(&id);
    let id = workspace
        .load_document_with_dependencies("./lib.fsm", &anchor, &parser)
        .await
        .unwrap();
    assert_eq!(
        workspace.module(&id).unwrap().module.ast.definitions.len(),
        2
    );
}

/// Test workspace discovery and configuration loading together
#[tokio::test]
async fn test_discovery_respects_configured_extensions() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".trellis.toml"), "extensions = [\".machine\"]\n").unwrap();
    fs::write(dir.path().join("a.machine"), "machine A\n").unwrap();
    fs::write(dir.path().join("b.fsm"), "machine B\n").unwrap();

    let config = WorkspaceConfig::load(dir.path()).unwrap();
    let found = discover_documents(dir.path(), &config.extensions);
    assert_eq!(found.len(), 1);
    assert!(found[0].ends_with("a.machine"));
}

/// Test that the file watcher service can be constructed over a workspace
#[tokio::test]
async fn test_watcher_service_creation() {
    use tokio::sync::RwLock;
    use trellis_watcher::WatcherService;
    use trellis_workspace::DocumentParser;

    let dir = TempDir::new().unwrap();
    let (workspace, _) = file_workspace(dir.path());
    let workspace = Arc::new(RwLock::new(workspace));
    let parser: Arc<dyn DocumentParser> = Arc::new(OutlineParser::new());

    let service = WatcherService::new(
        dir.path(),
        &["**/*.fsm".to_string()],
        workspace,
        parser,
    );
    assert!(service.is_ok());
}
