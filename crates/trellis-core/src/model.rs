//! Core data structures for modules, imports, and machine definitions

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Scheme prefix for in-memory (virtual filesystem) modules.
pub const VIRTUAL_SCHEME: &str = "virtual://";

/// Canonical, comparable module identifier.
///
/// Filesystem paths, URLs, and virtual paths share one namespace; equality,
/// ordering, and hashing are string-canonical-form equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(String);

impl ModuleId {
    /// Build a ModuleId from a filesystem path, normalizing separators and
    /// resolving `.`/`..` segments lexically.
    pub fn from_path(path: &Path) -> Self {
        Self::from_path_str(&path.to_string_lossy())
    }

    /// Build a ModuleId from a filesystem path string.
    pub fn from_path_str(path: &str) -> Self {
        ModuleId(normalize_path(path))
    }

    /// Build a ModuleId from a URL. URLs keep their literal form.
    pub fn from_url(url: &str) -> Self {
        ModuleId(url.trim().to_string())
    }

    /// Build a ModuleId for an in-memory module, rooted at `virtual://`.
    pub fn from_virtual(path: &str) -> Self {
        let stripped = path.strip_prefix(VIRTUAL_SCHEME).unwrap_or(path);
        ModuleId(format!("{}{}", VIRTUAL_SCHEME, normalize_path(stripped)))
    }

    /// Synthetic identifier anchoring relative resolution at a directory.
    /// The trailing slash marks it as a location rather than a document.
    pub fn anchor(dir: &Path) -> Self {
        let normalized = normalize_path(&dir.to_string_lossy());
        if normalized.is_empty() {
            ModuleId("./".to_string())
        } else {
            ModuleId(format!("{}/", normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_url(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }

    pub fn is_virtual(&self) -> bool {
        self.0.starts_with(VIRTUAL_SCHEME)
    }

    /// The directory portion of this identifier, used as the base for
    /// resolving relative imports.
    pub fn parent_dir(&self) -> &str {
        let s = self.0.as_str();
        if let Some(stripped) = s.strip_suffix('/') {
            return stripped;
        }
        match s.rfind('/') {
            Some(idx) => &s[..idx],
            None => "",
        }
    }

    /// The last path segment, used when reporting cycles as file chains.
    pub fn file_name(&self) -> &str {
        let s = self.0.trim_end_matches('/');
        match s.rfind('/') {
            Some(idx) => &s[idx + 1..],
            None => s,
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a path string: forward slashes only, `.` segments dropped,
/// `..` segments resolved lexically. A leading slash is preserved.
pub fn normalize_path(raw: &str) -> String {
    let raw = raw.replace('\\', "/");
    let absolute = raw.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(&"..")) {
                    segments.push("..");
                } else if segments.pop().is_none() && !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// What kind of machine entity a definition represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefinitionKind {
    State,
    Task,
    Context,
}

/// A named definition in a machine document. Definitions nest; the core
/// tracks only names and containment, never definition bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub name: String,
    pub kind: DefinitionKind,
    pub children: Vec<Definition>,
}

impl Definition {
    pub fn new(name: impl Into<String>, kind: DefinitionKind) -> Self {
        Definition {
            name: name.into(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Definition>) -> Self {
        self.children = children;
        self
    }
}

/// Index path addressing a definition inside a document. Container links are
/// kept non-owning this way, so cloning a definition subtree never drags in
/// the enclosing document.
pub type DefinitionPath = Vec<usize>;

/// One imported symbol, with an optional alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedSymbol {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedSymbol {
    pub fn new(name: impl Into<String>) -> Self {
        ImportedSymbol {
            name: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        ImportedSymbol {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// The local name this symbol is known by: the alias if present,
    /// otherwise the last `.`-separated segment of the imported name.
    pub fn effective_name(&self) -> &str {
        match self.alias.as_deref() {
            Some(alias) if !alias.is_empty() => alias,
            _ => last_segment(&self.name),
        }
    }
}

/// The last `.`-separated segment of a dotted name.
pub fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// One `import { ... } from "..."` statement. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatement {
    pub path: String,
    pub symbols: Vec<ImportedSymbol>,
}

impl ImportStatement {
    pub fn new(path: impl Into<String>, symbols: Vec<ImportedSymbol>) -> Self {
        ImportStatement {
            path: path.into(),
            symbols,
        }
    }
}

/// Parsed shape of one machine document: title, import statements, and the
/// ordered definition tree. Produced by the external grammar (or the
/// structural outline front-end); the core consumes only names and
/// containment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAst {
    pub title: Option<String>,
    pub imports: Vec<ImportStatement>,
    pub definitions: Vec<Definition>,
}

impl DocumentAst {
    pub fn new(
        title: Option<String>,
        imports: Vec<ImportStatement>,
        definitions: Vec<Definition>,
    ) -> Self {
        DocumentAst {
            title,
            imports,
            definitions,
        }
    }

    /// First definition whose full name matches exactly, in declaration
    /// (pre-order) order.
    pub fn find_exact(&self, name: &str) -> Option<DefinitionPath> {
        self.walk(|def| def.name == name).into_iter().next()
    }

    /// All definitions whose last name segment matches, in declaration
    /// (pre-order) order.
    pub fn find_short(&self, short: &str) -> Vec<DefinitionPath> {
        self.walk(|def| last_segment(&def.name) == short)
    }

    /// Look up a definition by its index path.
    pub fn definition(&self, path: &[usize]) -> Option<&Definition> {
        let (&first, rest) = path.split_first()?;
        let mut current = self.definitions.get(first)?;
        for &idx in rest {
            current = current.children.get(idx)?;
        }
        Some(current)
    }

    fn walk(&self, matches: impl Fn(&Definition) -> bool) -> Vec<DefinitionPath> {
        let mut found = Vec::new();
        let mut stack: Vec<(DefinitionPath, &Definition)> = self
            .definitions
            .iter()
            .enumerate()
            .rev()
            .map(|(i, d)| (vec![i], d))
            .collect();
        // depth-first, declaration order
        while let Some((path, def)) = stack.pop() {
            if matches(def) {
                found.push(path.clone());
            }
            for (i, child) in def.children.iter().enumerate().rev() {
                let mut child_path = path.clone();
                child_path.push(i);
                stack.push((child_path, child));
            }
        }
        found
    }
}

/// One source file's parsed definitions plus its import statements.
///
/// Created on first load, replaced wholesale on update, destroyed on
/// explicit removal — never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub ast: DocumentAst,
    pub imports: Vec<ImportStatement>,
    pub raw_content: String,
}

impl Module {
    pub fn new(id: ModuleId, ast: DocumentAst, raw_content: impl Into<String>) -> Self {
        let imports = ast.imports.clone();
        Module {
            id,
            ast,
            imports,
            raw_content: raw_content.into(),
        }
    }
}

/// Ephemeral resolver output, folded into a Module and not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedModule {
    pub id: ModuleId,
    pub import_path: String,
    pub resolved_location: String,
    pub content: Option<String>,
}
