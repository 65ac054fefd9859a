//! Validation diagnostics shared by resolvers, the workspace, and the linker

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::model::{DefinitionPath, ModuleId};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
            Severity::Info => f.write_str("info"),
        }
    }
}

/// Where a diagnostic is anchored in the loaded documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagnosticNode {
    Module(ModuleId),
    Import { module: ModuleId, index: usize },
    Definition { module: ModuleId, path: DefinitionPath },
}

/// One reported issue. Validation problems are collected, never thrown, so a
/// single pass surfaces every issue instead of stopping at the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub node: Option<DiagnosticNode>,
    pub property: Option<String>,
}

/// Thread-safe diagnostic collector. One instance is shared across the
/// resolver stack, the workspace, and the linker so callers read a single
/// stream of issues.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Record a diagnostic.
    pub fn accept(
        &self,
        severity: Severity,
        message: impl Into<String>,
        node: Option<DiagnosticNode>,
        property: Option<&str>,
    ) {
        let diagnostic = Diagnostic {
            severity,
            message: message.into(),
            node,
            property: property.map(str::to_string),
        };
        tracing::debug!(severity = %diagnostic.severity, "{}", diagnostic.message);
        self.entries.lock().unwrap().push(diagnostic);
    }

    pub fn error(&self, message: impl Into<String>, node: Option<DiagnosticNode>) {
        self.accept(Severity::Error, message, node, None);
    }

    pub fn warning(&self, message: impl Into<String>, node: Option<DiagnosticNode>) {
        self.accept(Severity::Warning, message, node, None);
    }

    /// Snapshot of all recorded diagnostics.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().unwrap().clone()
    }

    /// Drain all recorded diagnostics.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.lock().unwrap())
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
