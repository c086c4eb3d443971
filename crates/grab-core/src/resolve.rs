use crate::config::Heuristics;
use crate::error::{GrabError, Result};
use crate::types::{RawBlock, ResolvedFile, UNRESOLVED_NAME};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// Lines at the top of a block where a bare `<label>: <path>` marker is
/// trusted. Deeper in the block the marker must be comment-wrapped, so data
/// lines of YAML-like content are not eaten.
const MARKER_HEAD_LINES: usize = 15;

fn inline_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`\s]+)`").unwrap())
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*([^*\s]+)\*\*").unwrap())
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#{1,6}\s*(\S+)\s*$").unwrap())
}

// ---------------------------------------------------------------------------
// PathEvidence
// ---------------------------------------------------------------------------

/// Where an explicit path for a block was found. Markers inside the block
/// are stripped from the emitted content; context evidence leaves the block
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathEvidence {
    InBlock { path: String, line: usize },
    InContext { path: String },
}

impl PathEvidence {
    pub fn path(&self) -> &str {
        match self {
            PathEvidence::InBlock { path, .. } => path,
            PathEvidence::InContext { path } => path,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

struct CompiledSignature {
    emit: String,
    all: Vec<Regex>,
    any: Vec<Regex>,
}

/// Assigns exactly one name to every block, by cascading evidence:
///
/// 1. explicit `<label>: <path>` marker inside the block,
/// 2. path evidence in the text immediately above the block,
/// 3. content-shape signatures,
/// 4. language-hint fallback (`file_<index>.<ext>`),
/// 5. the unresolved sentinel.
///
/// Compiled once per [`Heuristics`] load; table errors surface here rather
/// than at match time.
pub struct Resolver {
    marker_re: Option<Regex>,
    lead_ins: Vec<Regex>,
    signatures: Vec<CompiledSignature>,
    hint_extensions: BTreeMap<String, String>,
    path_extensions: Vec<String>,
    context_lines: usize,
}

impl Resolver {
    pub fn new(tables: &Heuristics) -> Result<Self> {
        for label in &tables.marker_labels {
            if label.trim().is_empty() || label.contains(':') {
                return Err(GrabError::InvalidMarkerLabel(label.clone()));
            }
        }
        let marker_re = if tables.marker_labels.is_empty() {
            None
        } else {
            let labels: Vec<String> = tables.marker_labels.iter().map(|l| regex::escape(l)).collect();
            let pattern = format!(
                r"^\s*((?://|#|--|;|\*|/\*|<!--)\s*)?(?i:{})\s*:\s*(\S+)\s*(?:\*/|-->)?\s*$",
                labels.join("|")
            );
            Some(Regex::new(&pattern).map_err(GrabError::MarkerTable)?)
        };

        let mut lead_ins = Vec::with_capacity(tables.lead_ins.len());
        for pattern in &tables.lead_ins {
            let re = Regex::new(pattern).map_err(|e| GrabError::InvalidLeadIn {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            if re.captures_len() < 2 {
                return Err(GrabError::InvalidLeadIn {
                    pattern: pattern.clone(),
                    reason: "missing capture group for the path".to_string(),
                });
            }
            lead_ins.push(re);
        }

        let mut signatures = Vec::with_capacity(tables.signatures.len());
        for rule in &tables.signatures {
            let compile = |patterns: &[String]| -> Result<Vec<Regex>> {
                patterns
                    .iter()
                    .map(|p| {
                        Regex::new(p).map_err(|e| GrabError::InvalidSignatureRule {
                            name: rule.emit.clone(),
                            source: e,
                        })
                    })
                    .collect()
            };
            signatures.push(CompiledSignature {
                emit: rule.emit.clone(),
                all: compile(&rule.all)?,
                any: compile(&rule.any)?,
            });
        }

        Ok(Self {
            marker_re,
            lead_ins,
            signatures,
            hint_extensions: tables
                .hint_extensions
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
                .collect(),
            path_extensions: tables
                .path_extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
            context_lines: tables.context_lines,
        })
    }

    /// Explicit path evidence only (cascade cases 1 and 2). The filter also
    /// consults this to exempt marked documentation blocks.
    pub fn path_evidence(&self, block: &RawBlock) -> Option<PathEvidence> {
        if let Some(found) = self.marker_in_block(&block.content) {
            return Some(found);
        }
        if let Some(context) = block.preceding_context.as_deref() {
            if let Some(path) = self.path_in_context(context) {
                return Some(PathEvidence::InContext { path });
            }
        }
        None
    }

    /// Full cascade. `index` keys the `file_<index>.<ext>` fallback.
    pub fn resolve(&self, block: &RawBlock, index: usize) -> ResolvedFile {
        let evidence = self.path_evidence(block);
        self.assign(block, evidence.as_ref(), index)
    }

    /// Names a block given already-computed evidence, so callers that needed
    /// the evidence for filtering do not scan twice.
    pub fn assign(
        &self,
        block: &RawBlock,
        evidence: Option<&PathEvidence>,
        index: usize,
    ) -> ResolvedFile {
        match evidence {
            Some(PathEvidence::InBlock { path, line }) => {
                ResolvedFile::new(path.clone(), strip_marker_line(&block.content, *line))
            }
            Some(PathEvidence::InContext { path }) => {
                ResolvedFile::new(path.clone(), trim_blank_edges(&block.content))
            }
            None => {
                let content = trim_blank_edges(&block.content);
                if let Some(name) = self.infer_name(&content) {
                    return ResolvedFile::new(name, content);
                }
                if let Some(hint) = block.language_hint.as_deref() {
                    if let Some(ext) = self.hint_extensions.get(&hint.to_ascii_lowercase()) {
                        return ResolvedFile::new(format!("file_{index}.{ext}"), content);
                    }
                }
                ResolvedFile::new(UNRESOLVED_NAME, content)
            }
        }
    }

    /// Content-shape inference alone (cascade case 3). The normalizer re-runs
    /// this when a payload arrives with a placeholder name.
    pub fn infer_name(&self, content: &str) -> Option<String> {
        self.signatures
            .iter()
            .find(|sig| {
                sig.all.iter().all(|re| re.is_match(content))
                    && (sig.any.is_empty() || sig.any.iter().any(|re| re.is_match(content)))
            })
            .map(|sig| sig.emit.clone())
    }

    pub fn has_known_extension(&self, path: &str) -> bool {
        extension_of(path)
            .map(|ext| self.path_extensions.iter().any(|e| *e == ext))
            .unwrap_or(false)
    }

    fn marker_in_block(&self, content: &str) -> Option<PathEvidence> {
        let re = self.marker_re.as_ref()?;
        for (i, line) in content.lines().enumerate() {
            let Some(caps) = re.captures(line) else {
                continue;
            };
            let commented = caps.get(1).is_some();
            if i >= MARKER_HEAD_LINES && !commented {
                continue;
            }
            let Some(raw) = caps.get(2) else { continue };
            if let Some(path) = clean_candidate(raw.as_str()) {
                // Bare tokens like YAML scalars are not paths.
                if path.contains('.') || path.contains('/') {
                    return Some(PathEvidence::InBlock { path, line: i });
                }
            }
        }
        None
    }

    /// Scans the nearest `context_lines` non-empty lines above the block,
    /// nearest first. Context candidates must carry a whitelisted extension;
    /// prose produces too many accidental token matches otherwise.
    fn path_in_context(&self, context: &str) -> Option<String> {
        let recent: Vec<&str> = context
            .lines()
            .rev()
            .filter(|l| !l.trim().is_empty())
            .take(self.context_lines)
            .collect();
        for line in recent {
            if let Some(path) = self.context_candidates(line) {
                return Some(path);
            }
        }
        None
    }

    fn context_candidates(&self, line: &str) -> Option<String> {
        if let Some(re) = self.marker_re.as_ref() {
            if let Some(caps) = re.captures(line) {
                if let Some(path) = caps.get(2).and_then(|m| self.accept_context(m.as_str())) {
                    return Some(path);
                }
            }
        }
        for caps in inline_code_re().captures_iter(line) {
            if let Some(path) = caps.get(1).and_then(|m| self.accept_context(m.as_str())) {
                return Some(path);
            }
        }
        for caps in bold_re().captures_iter(line) {
            if let Some(path) = caps.get(1).and_then(|m| self.accept_context(m.as_str())) {
                return Some(path);
            }
        }
        if let Some(caps) = heading_re().captures(line) {
            if let Some(path) = caps.get(1).and_then(|m| self.accept_context(m.as_str())) {
                return Some(path);
            }
        }
        for re in &self.lead_ins {
            if let Some(caps) = re.captures(line) {
                if let Some(path) = caps.get(1).and_then(|m| self.accept_context(m.as_str())) {
                    return Some(path);
                }
            }
        }
        None
    }

    fn accept_context(&self, raw: &str) -> Option<String> {
        let path = clean_candidate(raw)?;
        if self.has_known_extension(&path) {
            Some(path)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Candidate and content helpers
// ---------------------------------------------------------------------------

pub(crate) fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn clean_candidate(raw: &str) -> Option<String> {
    let s = raw
        .trim()
        .trim_matches(|c| matches!(c, '`' | '"' | '\'' | '*' | '(' | ')'))
        .trim_end_matches(|c| matches!(c, '.' | ',' | ':' | ';'));
    if s.is_empty() || s.contains("://") {
        return None;
    }
    if !s.chars().any(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(s.to_string())
}

fn trim_blank_edges(s: &str) -> String {
    let lines: Vec<&str> = s.lines().collect();
    let Some(start) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return String::new();
    };
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map(|i| i + 1)
        .unwrap_or(lines.len());
    lines[start..end].join("\n")
}

fn strip_marker_line(content: &str, idx: usize) -> String {
    let kept: Vec<&str> = content
        .lines()
        .enumerate()
        .filter(|(i, _)| *i != idx)
        .map(|(_, l)| l)
        .collect();
    trim_blank_edges(&kept.join("\n"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> Resolver {
        Resolver::new(&Heuristics::default()).unwrap()
    }

    #[test]
    fn marker_in_block_names_and_strips() {
        let block = RawBlock::new(
            "FILE: src/App.tsx\nexport default function App() {\n  return <div>hi</div>;\n}",
        );
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "src/App.tsx");
        assert!(!file.content.contains("FILE:"));
        assert!(file.content.starts_with("export default"));
    }

    #[test]
    fn comment_wrapped_markers_accepted() {
        let r = resolver();
        let cases = [
            ("# arquivo: main.py\nprint('ok')\nprint('ok')", "main.py"),
            ("<!-- file: index.html -->\n<p>x</p>\n<p>y</p>", "index.html"),
            ("/* filename: style.css */\nbody { margin: 0; }", "style.css"),
            ("-- path: db/schema.sql\nCREATE TABLE t (id INT);", "db/schema.sql"),
        ];
        for (content, expected) in cases {
            let file = r.resolve(&RawBlock::new(content), 0);
            assert_eq!(file.name, expected, "content: {content}");
        }
    }

    #[test]
    fn deep_marker_needs_comment_wrapping() {
        let filler = "x = 1\n".repeat(19);
        let bare = format!("{filler}path: deep/file.ts\nmore = 2");
        let r = resolver();
        let file = r.resolve(&RawBlock::new(bare), 0);
        assert_ne!(file.name, "deep/file.ts");

        let commented = format!("{filler}// path: deep/file.ts\nmore = 2");
        let file = r.resolve(&RawBlock::new(commented), 0);
        assert_eq!(file.name, "deep/file.ts");
        assert!(!file.content.contains("deep/file.ts"));
    }

    #[test]
    fn block_marker_beats_context() {
        let block = RawBlock::new("// file: from/block.ts\nlet a = 1;\nlet b = 2;")
            .with_context("**from/context.ts**");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "from/block.ts");
    }

    #[test]
    fn bare_scalar_after_label_is_not_a_path() {
        let block = RawBlock::new("path: yes\nport: 8080\nhost: localhost\nuser: admin");
        let file = resolver().resolve(&block, 0);
        assert_ne!(file.name, "yes");
        // Falls through to the key-colon-value signature.
        assert_eq!(file.name, "config.yaml");
    }

    #[test]
    fn context_bold_path() {
        let block =
            RawBlock::new("let x = compute();\nlet y = render(x);").with_context("**src/util.js**");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "src/util.js");
        assert!(file.content.starts_with("let x"));
    }

    #[test]
    fn context_inline_code_path() {
        let block = RawBlock::new("a: 1\nb: 2\nc: 3")
            .with_context("Update `config/settings.yaml` with these values:");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "config/settings.yaml");
    }

    #[test]
    fn context_heading_path() {
        let block = RawBlock::new("def run():\n    pass").with_context("### scripts/deploy.py");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "scripts/deploy.py");
    }

    #[test]
    fn context_lead_in_english() {
        let block = RawBlock::new("export const api = {};\nexport const ws = {};")
            .with_context("Here is the file src/api.ts with the changes you asked for:");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "src/api.ts");
    }

    #[test]
    fn context_lead_in_portuguese() {
        let block = RawBlock::new("database:\n  host: localhost\n  port: 5432")
            .with_context("Aqui está o arquivo config/app.yaml atualizado:");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "config/app.yaml");
    }

    #[test]
    fn context_candidate_requires_known_extension() {
        let block = RawBlock::new("SELECT id FROM users;").with_context("**not-a-path**");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "query.sql");
    }

    #[test]
    fn context_scan_window_is_bounded() {
        let mut context = String::from("**far/away.ts**\n");
        for i in 0..6 {
            context.push_str(&format!("filler prose line {i}\n"));
        }
        let block = RawBlock::new("let a = 1;\nlet b = 2;").with_context(context);
        let file = resolver().resolve(&block, 0);
        assert_ne!(file.name, "far/away.ts");
    }

    #[test]
    fn nearest_context_evidence_wins() {
        let block = RawBlock::new("let a = 1;\nlet b = 2;")
            .with_context("**first/one.js**\nsome prose\n**second/two.js**");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "second/two.js");
    }

    #[test]
    fn doctype_infers_index_html() {
        let block = RawBlock::new("<!DOCTYPE html>\n<html>\n<body>hi</body>\n</html>");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "index.html");
    }

    #[test]
    fn typed_component_infers_app_tsx() {
        let block = RawBlock::new(
            "interface Props { title: string }\nexport default function App({ title }: Props) {\n  return <Header title={title} />;\n}",
        );
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "App.tsx");
    }

    #[test]
    fn typed_without_markup_infers_index_ts() {
        let block = RawBlock::new("export type Id = string;\nexport interface User { id: Id }");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "index.ts");
    }

    #[test]
    fn stylesheet_signatures() {
        let r = resolver();
        let css = r.resolve(&RawBlock::new("body {\n  margin: 0;\n  color: #222;\n}"), 0);
        assert_eq!(css.name, "style.css");
        let scss = r.resolve(
            &RawBlock::new("$primary: #333;\nbody {\n  color: $primary;\n}"),
            0,
        );
        assert_eq!(scss.name, "style.scss");
    }

    #[test]
    fn python_signature() {
        let block = RawBlock::new("import os\n\ndef main():\n    print(os.getcwd())");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "script.py");
    }

    #[test]
    fn json_signature() {
        let block = RawBlock::new("{\n  \"name\": \"demo\",\n  \"version\": \"1.0.0\"\n}");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "data.json");
    }

    #[test]
    fn checklist_signature() {
        let block = RawBlock::new("- [ ] set up database\n- [x] create schema\n- [ ] seed data");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, "checklist.md");
    }

    #[test]
    fn hint_fallback_uses_index() {
        let block = RawBlock::new("fn main() { println!(\"hi\"); }").with_hint("rust");
        let file = resolver().resolve(&block, 3);
        assert_eq!(file.name, "file_3.rs");
    }

    #[test]
    fn no_evidence_yields_sentinel() {
        let block = RawBlock::new("completely unrecognizable content here\nwith two lines");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, UNRESOLVED_NAME);
        assert!(file.needs_name());
    }

    #[test]
    fn unknown_hint_yields_sentinel() {
        let block = RawBlock::new("???\n???").with_hint("klingon");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, UNRESOLVED_NAME);
    }

    #[test]
    fn url_after_label_rejected() {
        let block = RawBlock::new("// path: https://example.com/a.ts\nzz qq ww\nzz qq ww");
        let file = resolver().resolve(&block, 0);
        assert_eq!(file.name, UNRESOLVED_NAME);
    }

    #[test]
    fn marker_table_failures_surface_at_build() {
        let mut tables = Heuristics::default();
        tables.marker_labels.push("bad:label".to_string());
        assert!(Resolver::new(&tables).is_err());

        let mut tables = Heuristics::default();
        tables.lead_ins.push("(broken".to_string());
        assert!(Resolver::new(&tables).is_err());

        let mut tables = Heuristics::default();
        tables.signatures[0].any.push("*bad".to_string());
        assert!(Resolver::new(&tables).is_err());
    }
}
