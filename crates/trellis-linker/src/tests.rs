//! Unit tests for scope merging, linking, and machine flattening

use std::sync::Arc;

use tempfile::TempDir;
use trellis_core::{Diagnostics, LinkError, ModuleId, Severity};
use trellis_resolver::{ModuleResolver, VirtualResolver};
use trellis_workspace::{OutlineParser, WorkspaceManager};

use crate::export;
use crate::linker::Linker;
use crate::merge::merge_machines;
use crate::scope::visible_symbols;

fn vid(path: &str) -> ModuleId {
    ModuleId::from_virtual(path)
}

async fn load_workspace(
    files: &[(&str, &str)],
    entry: &str,
) -> (WorkspaceManager, Arc<Diagnostics>, ModuleId) {
    let diagnostics = Arc::new(Diagnostics::new());
    let resolver = VirtualResolver::new(diagnostics.clone());
    for (path, content) in files {
        resolver.insert(path, content);
    }
    let resolver: Arc<dyn ModuleResolver> = Arc::new(resolver);
    let mut workspace = WorkspaceManager::new(resolver, diagnostics.clone());
    let parser = OutlineParser::new();
    let entry_id = workspace
        .load_document_with_dependencies(entry, &ModuleId::from_virtual("__root__"), &parser)
        .await
        .unwrap();
    (workspace, diagnostics, entry_id)
}

const LIB: &str = "\
machine Library
state Start {
  task ping
}
state Stop
state Flow {
  state ops.Retry
}
";

// ── Scope merging ───────────────────────────────────────

#[tokio::test]
async fn test_scope_locals_plus_imports() {
    let (ws, diagnostics, entry) = load_workspace(
        &[
            ("lib.fsm", LIB),
            (
                "app.fsm",
                "machine App\nimport { Start, Stop as Halt } from \"./lib.fsm\"\nstate Main\n",
            ),
        ],
        "./app.fsm",
    )
    .await;

    let scope = visible_symbols(&ws, &entry, &diagnostics).unwrap();
    assert_eq!(scope.names(), vec!["Halt", "Main", "Start"]);

    let halt = scope.lookup("Halt").unwrap();
    assert_eq!(halt.origin, vid("lib.fsm"));
    assert_eq!(halt.original_name.as_deref(), Some("Stop"));

    let main = scope.lookup("Main").unwrap();
    assert_eq!(main.origin, entry);
    assert!(main.original_name.is_none());
    assert!(!diagnostics.has_errors());
}

#[tokio::test]
async fn test_scope_local_wins_over_import() {
    let (ws, diagnostics, entry) = load_workspace(
        &[
            ("lib.fsm", LIB),
            (
                "app.fsm",
                "machine App\nimport { Start as StartA } from \"./lib.fsm\"\nstate StartA\n",
            ),
        ],
        "./app.fsm",
    )
    .await;

    let scope = visible_symbols(&ws, &entry, &diagnostics).unwrap();
    let winner = scope.lookup("StartA").unwrap();
    assert_eq!(winner.origin, entry, "the local definition must win");

    assert!(diagnostics
        .entries()
        .iter()
        .any(|d| d.severity == Severity::Error
            && d.message.contains("collides with the local definition")));
}

#[tokio::test]
async fn test_scope_reports_every_collision() {
    let (ws, diagnostics, entry) = load_workspace(
        &[
            ("a.fsm", "machine A\nstate One\nstate Two\n"),
            ("b.fsm", "machine B\nstate One\nstate Two\n"),
            (
                "app.fsm",
                "machine App\n\
                 import { One, Two } from \"./a.fsm\"\n\
                 import { One, Two } from \"./b.fsm\"\n",
            ),
        ],
        "./app.fsm",
    )
    .await;

    let scope = visible_symbols(&ws, &entry, &diagnostics).unwrap();
    // first registrations win; both collisions surface, not just the first
    assert_eq!(scope.lookup("One").unwrap().origin, vid("a.fsm"));
    assert_eq!(scope.lookup("Two").unwrap().origin, vid("a.fsm"));
    let collisions = diagnostics
        .entries()
        .into_iter()
        .filter(|d| d.message.contains("already bound"))
        .count();
    assert_eq!(collisions, 2);
}

#[tokio::test]
async fn test_scope_missing_symbol_is_diagnosed() {
    let (ws, diagnostics, entry) = load_workspace(
        &[
            ("lib.fsm", LIB),
            (
                "app.fsm",
                "machine App\nimport { Missing } from \"./lib.fsm\"\nstate Main\n",
            ),
        ],
        "./app.fsm",
    )
    .await;

    let scope = visible_symbols(&ws, &entry, &diagnostics).unwrap();
    assert!(scope.lookup("Missing").is_none());
    assert!(diagnostics
        .entries()
        .iter()
        .any(|d| d.message.contains("symbol `Missing` not found")));
}

// ── Cross-file linking ──────────────────────────────────

#[tokio::test]
async fn test_linker_local_first_then_imports() {
    let (ws, _, entry) = load_workspace(
        &[
            ("lib.fsm", LIB),
            (
                "app.fsm",
                "machine App\nimport { Start, Stop as Halt } from \"./lib.fsm\"\nstate Main\n",
            ),
        ],
        "./app.fsm",
    )
    .await;

    let linker = Linker::new(&ws);

    let local = linker.resolve_reference(&entry, "Main").unwrap();
    assert_eq!(local.module, entry);

    let imported = linker.resolve_reference(&entry, "Halt").unwrap();
    assert_eq!(imported.module, vid("lib.fsm"));
    assert_eq!(
        ws.module(&vid("lib.fsm"))
            .unwrap()
            .module
            .ast
            .definition(&imported.path)
            .unwrap()
            .name,
        "Stop"
    );
}

#[tokio::test]
async fn test_linker_dotted_name_falls_back_to_short_match() {
    let (ws, _, entry) = load_workspace(
        &[
            ("lib.fsm", LIB),
            (
                "app.fsm",
                "machine App\nimport { Flow.Retry } from \"./lib.fsm\"\nstate Main\n",
            ),
        ],
        "./app.fsm",
    )
    .await;

    let linker = Linker::new(&ws);
    let resolved = linker.resolve_reference(&entry, "Retry").unwrap();
    assert_eq!(resolved.module, vid("lib.fsm"));
    assert_eq!(resolved.path, vec![2, 0]);
}

#[tokio::test]
async fn test_linker_ambiguous_short_match_warns_first_declared_wins() {
    let (ws, diagnostics, entry) = load_workspace(
        &[
            (
                "lib.fsm",
                "machine Lib\n\
                 state A {\n  state ops.Retry\n}\n\
                 state B {\n  state net.Retry\n}\n",
            ),
            (
                "app.fsm",
                "machine App\nimport { x.Retry } from \"./lib.fsm\"\nstate Main\n",
            ),
        ],
        "./app.fsm",
    )
    .await;

    let linker = Linker::new(&ws);
    let resolved = linker.resolve_reference(&entry, "Retry").unwrap();
    assert_eq!(resolved.path, vec![0, 0], "first declared match wins");
    assert!(diagnostics
        .entries()
        .iter()
        .any(|d| d.severity == Severity::Warning && d.message.contains("using the first declared")));
}

#[tokio::test]
async fn test_linker_unclaimed_name_passes_failure_through() {
    let (ws, _, entry) = load_workspace(
        &[
            ("lib.fsm", LIB),
            (
                "app.fsm",
                "machine App\nimport { Start } from \"./lib.fsm\"\nstate Main\n",
            ),
        ],
        "./app.fsm",
    )
    .await;

    let linker = Linker::new(&ws);
    let err = linker.resolve_reference(&entry, "Nowhere").unwrap_err();
    assert_eq!(
        err,
        LinkError::SymbolNotFound {
            symbol: "Nowhere".to_string(),
            module: entry,
        }
    );
}

// ── Merging / flattening ────────────────────────────────

#[tokio::test]
async fn test_merge_renames_and_records_provenance() {
    let (ws, _, entry) = load_workspace(
        &[
            ("lib.fsm", LIB),
            (
                "app.fsm",
                "machine App\nimport { Start, Stop as Halt } from \"./lib.fsm\"\nstate Main\n",
            ),
        ],
        "./app.fsm",
    )
    .await;

    let merged = merge_machines(&ws, &entry).unwrap();
    assert_eq!(merged.title.as_deref(), Some("App"));

    let names: Vec<&str> = merged.definitions.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Main", "Start", "Halt"]);

    // the imported Start keeps its nested children — a deep clone, not a stub
    let start = &merged.definitions[1];
    assert_eq!(start.children.len(), 1);
    assert_eq!(start.children[0].name, "ping");

    let halt = &merged.source_map["Halt"];
    assert_eq!(halt.source_file, vid("lib.fsm"));
    assert_eq!(halt.original_name.as_deref(), Some("Stop"));
    let main = &merged.source_map["Main"];
    assert_eq!(main.source_file, entry);
    assert!(main.original_name.is_none());

    assert_eq!(merged.source_files, vec![vid("lib.fsm"), vid("app.fsm")]);
}

#[tokio::test]
async fn test_merge_fails_on_cycles() {
    let (ws, _, entry) = load_workspace(
        &[
            (
                "a.fsm",
                "machine A\nimport { B } from \"./b.fsm\"\nstate A\n",
            ),
            (
                "b.fsm",
                "machine B\nimport { A } from \"./a.fsm\"\nstate B\n",
            ),
        ],
        "./a.fsm",
    )
    .await;

    let err = merge_machines(&ws, &entry).unwrap_err();
    match err {
        LinkError::CircularDependency { cycle } => {
            assert!(cycle.contains(&vid("a.fsm")));
            assert!(cycle.contains(&vid("b.fsm")));
        }
        other => panic!("expected CircularDependency, got {other:?}"),
    }
}

#[tokio::test]
async fn test_merge_missing_symbol_is_fatal() {
    let (ws, _, entry) = load_workspace(
        &[
            ("lib.fsm", LIB),
            (
                "app.fsm",
                "machine App\nimport { Missing } from \"./lib.fsm\"\nstate Main\n",
            ),
        ],
        "./app.fsm",
    )
    .await;

    let err = merge_machines(&ws, &entry).unwrap_err();
    assert_eq!(
        err,
        LinkError::SymbolNotFound {
            symbol: "Missing".to_string(),
            module: vid("lib.fsm"),
        }
    );
}

#[tokio::test]
async fn test_merge_not_loaded_entry_is_rejected() {
    let (ws, _, _) = load_workspace(&[("lib.fsm", LIB)], "./lib.fsm").await;
    let err = merge_machines(&ws, &vid("ghost.fsm")).unwrap_err();
    assert!(matches!(err, LinkError::ModuleNotFound { .. }));
}

#[tokio::test]
async fn test_merge_local_wins_with_collision_diagnostic() {
    let (ws, diagnostics, entry) = load_workspace(
        &[
            ("lib.fsm", LIB),
            (
                "app.fsm",
                "machine App\nimport { Start as StartA } from \"./lib.fsm\"\nstate StartA\n",
            ),
        ],
        "./app.fsm",
    )
    .await;

    let merged = merge_machines(&ws, &entry).unwrap();
    assert_eq!(merged.definitions.len(), 1);
    assert!(merged.source_map["StartA"].original_name.is_none());
    assert!(diagnostics
        .entries()
        .iter()
        .any(|d| d.message.contains("the local definition wins")));
}

#[tokio::test]
async fn test_merge_diamond_contributes_each_symbol_once() {
    let (ws, diagnostics, entry) = load_workspace(
        &[
            ("a.fsm", "machine A\nstate Shared {\n  task beat\n}\n"),
            (
                "b.fsm",
                "machine B\nimport { Shared } from \"./a.fsm\"\nstate FromB\n",
            ),
            (
                "c.fsm",
                "machine C\nimport { Shared } from \"./a.fsm\"\nstate FromC\n",
            ),
            (
                "d.fsm",
                "machine D\n\
                 import { FromB } from \"./b.fsm\"\n\
                 import { FromC } from \"./c.fsm\"\nstate Top\n",
            ),
        ],
        "./d.fsm",
    )
    .await;

    let merged = merge_machines(&ws, &entry).unwrap();
    let shared_count = merged
        .definitions
        .iter()
        .filter(|d| d.name == "Shared")
        .count();
    assert_eq!(shared_count, 1);
    assert_eq!(merged.source_map["Shared"].source_file, vid("a.fsm"));

    // every file contributes exactly once, dependencies first, entry last
    assert_eq!(merged.source_files.len(), 4);
    assert_eq!(merged.source_files[0], vid("a.fsm"));
    assert_eq!(merged.source_files[3], vid("d.fsm"));
    assert!(!diagnostics.has_errors());
}

#[tokio::test]
async fn test_merged_output_export() {
    let (ws, _, entry) = load_workspace(
        &[
            ("lib.fsm", LIB),
            (
                "app.fsm",
                "machine App\nimport { Start } from \"./lib.fsm\"\nstate Main\n",
            ),
        ],
        "./app.fsm",
    )
    .await;
    let merged = merge_machines(&ws, &entry).unwrap();

    let dir = TempDir::new().unwrap();
    let path = export::save_merged(&merged, dir.path()).unwrap();
    assert!(path.exists());

    let raw = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["machine"]["title"], "App");
    assert!(value["generated_at"].is_string());
}
