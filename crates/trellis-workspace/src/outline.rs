//! Structural outline front-end
//!
//! The full DSL grammar lives outside this repository; tooling and tests
//! still need documents. This scanner parses exactly what the linking core
//! consumes — the `machine` title, `import { A, b.C as D } from "…"`
//! headers, and the nested state/task/context name tree — and skips every
//! other line. Block braces are only tracked on definitions.

use regex::Regex;

use trellis_core::{
    Definition, DefinitionKind, DocumentAst, ImportStatement, ImportedSymbol, LinkError,
    LinkResult, ModuleId,
};

use crate::workspace::DocumentParser;

pub struct OutlineParser {
    title_re: Regex,
    import_re: Regex,
    symbol_re: Regex,
    definition_re: Regex,
}

impl OutlineParser {
    pub fn new() -> Self {
        OutlineParser {
            title_re: Regex::new(r"^\s*machine\s+([A-Za-z_][\w.]*)\s*$").unwrap(),
            import_re: Regex::new(r#"^\s*import\s*\{([^}]*)\}\s*from\s*"([^"]*)"\s*;?\s*$"#)
                .unwrap(),
            symbol_re: Regex::new(r"^([A-Za-z_][\w.]*)(?:\s+as\s+([A-Za-z_]\w*))?$").unwrap(),
            definition_re: Regex::new(r"^\s*(state|task|context)\s+([A-Za-z_][\w.]*)\s*(\{)?\s*$")
                .unwrap(),
        }
    }

    fn parse_symbols(&self, raw: &str, id: &ModuleId, line_no: usize) -> LinkResult<Vec<ImportedSymbol>> {
        let mut symbols = Vec::new();
        for spec in raw.split(',') {
            let spec = spec.trim();
            if spec.is_empty() {
                continue;
            }
            let captures = self.symbol_re.captures(spec).ok_or_else(|| {
                LinkError::ModuleParse {
                    module: id.clone(),
                    message: format!("invalid import symbol `{spec}` on line {line_no}"),
                }
            })?;
            let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            match captures.get(2) {
                Some(alias) => symbols.push(ImportedSymbol::aliased(name, alias.as_str())),
                None => symbols.push(ImportedSymbol::new(name)),
            }
        }
        Ok(symbols)
    }
}

impl Default for OutlineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for OutlineParser {
    fn parse(&self, id: &ModuleId, content: &str) -> LinkResult<DocumentAst> {
        let mut title: Option<String> = None;
        let mut imports: Vec<ImportStatement> = Vec::new();
        let mut roots: Vec<Definition> = Vec::new();
        // index path into `roots` for each open definition block
        let mut open_blocks: Vec<usize> = Vec::new();

        for (line_idx, line) in content.lines().enumerate() {
            let line_no = line_idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                continue;
            }

            if let Some(captures) = self.title_re.captures(line) {
                if title.is_some() {
                    return Err(LinkError::ModuleParse {
                        module: id.clone(),
                        message: format!("duplicate machine declaration on line {line_no}"),
                    });
                }
                title = Some(captures[1].to_string());
                continue;
            }

            if let Some(captures) = self.import_re.captures(line) {
                let symbols = self.parse_symbols(&captures[1], id, line_no)?;
                imports.push(ImportStatement::new(captures[2].to_string(), symbols));
                continue;
            }

            if let Some(captures) = self.definition_re.captures(line) {
                let kind = match &captures[1] {
                    "state" => DefinitionKind::State,
                    "task" => DefinitionKind::Task,
                    _ => DefinitionKind::Context,
                };
                let definition = Definition::new(captures[2].to_string(), kind);
                let siblings = current_children(&mut roots, &open_blocks);
                siblings.push(definition);
                if captures.get(3).is_some() {
                    let index = siblings.len() - 1;
                    open_blocks.push(index);
                }
                continue;
            }

            if trimmed == "}" {
                if open_blocks.pop().is_none() {
                    return Err(LinkError::ModuleParse {
                        module: id.clone(),
                        message: format!("unbalanced `}}` on line {line_no}"),
                    });
                }
                continue;
            }

            // body content (transitions, attributes) is outside the outline
        }

        if !open_blocks.is_empty() {
            return Err(LinkError::ModuleParse {
                module: id.clone(),
                message: "unclosed definition block".to_string(),
            });
        }

        Ok(DocumentAst::new(title, imports, roots))
    }
}

/// The child list of the innermost open definition block.
fn current_children<'a>(
    roots: &'a mut Vec<Definition>,
    open_blocks: &[usize],
) -> &'a mut Vec<Definition> {
    let mut children = roots;
    for &index in open_blocks {
        children = &mut children[index].children;
    }
    children
}
