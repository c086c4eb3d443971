use crate::config::Heuristics;
use crate::resolve::{extension_of, PathEvidence};

/// Rejects blocks that are very likely not files: empty or very short
/// content, and short single-line shell commands. Blocks explicitly marked
/// as a documentation path are always kept, however terse.
pub struct SnippetFilter {
    min_block_chars: usize,
    max_command_chars: usize,
    shell_prefixes: Vec<String>,
    doc_exempt_extensions: Vec<String>,
}

impl SnippetFilter {
    pub fn new(tables: &Heuristics) -> Self {
        Self {
            min_block_chars: tables.min_block_chars,
            max_command_chars: tables.max_command_chars,
            shell_prefixes: tables
                .shell_prefixes
                .iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
            doc_exempt_extensions: tables
                .doc_exempt_extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn is_noise(&self, content: &str, evidence: Option<&PathEvidence>) -> bool {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return true;
        }
        if let Some(evidence) = evidence {
            if self.is_doc_path(evidence.path()) {
                return false;
            }
        }
        if trimmed.chars().count() < self.min_block_chars {
            return true;
        }
        self.is_shell_one_liner(trimmed)
    }

    fn is_doc_path(&self, path: &str) -> bool {
        extension_of(path)
            .map(|ext| self.doc_exempt_extensions.contains(&ext))
            .unwrap_or(false)
    }

    fn is_shell_one_liner(&self, trimmed: &str) -> bool {
        let mut non_empty = trimmed.lines().filter(|l| !l.trim().is_empty());
        let (Some(line), None) = (non_empty.next(), non_empty.next()) else {
            return false;
        };
        let line = line.trim();
        if line.chars().count() > self.max_command_chars {
            return false;
        }
        let Some(first) = line.split_whitespace().next() else {
            return false;
        };
        self.shell_prefixes.contains(&first.to_ascii_lowercase())
    }
}
