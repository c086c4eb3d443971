use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SignatureRule
// ---------------------------------------------------------------------------

/// One content-shape check. A rule matches when every pattern in `all`
/// matches and, when `any` is non-empty, at least one pattern in `any`
/// matches. Rules are evaluated in table order; the first match names the
/// block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRule {
    /// File name emitted on match, e.g. "index.html".
    pub emit: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any: Vec<String>,
}

impl SignatureRule {
    fn of(emit: &str, all: &[&str], any: &[&str]) -> Self {
        Self {
            emit: emit.to_string(),
            all: all.iter().map(|s| s.to_string()).collect(),
            any: any.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Heuristics (top-level)
// ---------------------------------------------------------------------------

/// Every tunable table the capture pipeline consults. Ships with built-in
/// defaults covering English and Portuguese producers; editable as a YAML
/// document so deployments can extend labels, extensions and signatures
/// without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heuristics {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Label synonyms accepted in explicit `<label>: <path>` markers.
    #[serde(default = "default_marker_labels")]
    pub marker_labels: Vec<String>,
    /// Natural-language lead-in patterns ("here is the file X:"). Each entry
    /// is a regex with exactly one capture group for the candidate path.
    #[serde(default = "default_lead_ins")]
    pub lead_ins: Vec<String>,
    /// Extensions a context-derived path candidate must end in to be
    /// accepted. Lowercase, no leading dot.
    #[serde(default = "default_path_extensions")]
    pub path_extensions: Vec<String>,
    /// Extensions whose explicitly-marked blocks bypass the minimum-length
    /// filter. Terse checklists and readmes are legitimate files.
    #[serde(default = "default_doc_exempt_extensions")]
    pub doc_exempt_extensions: Vec<String>,
    /// First tokens that mark a short single-line block as a shell command.
    #[serde(default = "default_shell_prefixes")]
    pub shell_prefixes: Vec<String>,
    /// Blocks with less trimmed content than this are noise unless
    /// doc-exempt.
    #[serde(default = "default_min_block_chars")]
    pub min_block_chars: usize,
    /// Single-line blocks longer than this are never treated as shell
    /// commands.
    #[serde(default = "default_max_command_chars")]
    pub max_command_chars: usize,
    /// How many non-empty lines above a block are scanned for path evidence.
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
    /// Ordered content-shape checks, most specific first.
    #[serde(default = "default_signatures")]
    pub signatures: Vec<SignatureRule>,
    /// Language hint → extension for the `file_<n>.<ext>` fallback.
    #[serde(default = "default_hint_extensions")]
    pub hint_extensions: BTreeMap<String, String>,
}

fn default_version() -> u32 {
    1
}

fn default_marker_labels() -> Vec<String> {
    [
        "file",
        "filename",
        "path",
        "arquivo",
        "caminho",
        "ficheiro",
        "nome do arquivo",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_lead_ins() -> Vec<String> {
    [
        r"(?i)\bhere(?:'s| is)\s+(?:the\s+|your\s+)?(?:file|code\s+for)\s+`?([\w./-]+)`?",
        r"(?i)\bsave\s+(?:this\s+|it\s+)?(?:as|to|in)\s+`?([\w./-]+)`?",
        r"(?i)\bcreate\s+(?:a\s+|the\s+)?(?:new\s+)?file\s+(?:named\s+|called\s+)?`?([\w./-]+)`?",
        r"(?i)\baqui\s+está\s+o\s+(?:arquivo|ficheiro)\s+`?([\w./-]+)`?",
        r"(?i)\bsegue\s+o\s+(?:arquivo|ficheiro|código\s+d[eo])\s+`?([\w./-]+)`?",
        r"(?i)\bsalve\s+(?:como|em)\s+`?([\w./-]+)`?",
        r"(?i)\bcrie\s+o\s+(?:arquivo|ficheiro)\s+`?([\w./-]+)`?",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_path_extensions() -> Vec<String> {
    [
        "html", "htm", "css", "scss", "sass", "less", "js", "jsx", "mjs", "cjs", "ts", "tsx",
        "vue", "svelte", "json", "yaml", "yml", "toml", "xml", "md", "markdown", "txt", "csv",
        "py", "rb", "go", "rs", "java", "kt", "c", "h", "cpp", "hpp", "cs", "php", "swift", "sql",
        "sh", "bash", "env", "ini", "conf", "graphql", "prisma",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_doc_exempt_extensions() -> Vec<String> {
    vec!["md".to_string(), "markdown".to_string()]
}

fn default_shell_prefixes() -> Vec<String> {
    [
        "npm", "npx", "yarn", "pnpm", "pip", "pip3", "cargo", "cd", "ls", "mkdir", "rm", "cp",
        "mv", "git", "node", "python", "python3", "ruby", "go", "make", "docker",
        "docker-compose", "kubectl", "curl", "wget", "touch", "chmod", "brew", "apt", "apt-get",
        "sudo", "composer", "bundle", "dotnet", "mvn", "gradle",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_min_block_chars() -> usize {
    30
}

fn default_max_command_chars() -> usize {
    80
}

fn default_context_lines() -> usize {
    5
}

fn default_signatures() -> Vec<SignatureRule> {
    vec![
        SignatureRule::of(
            "index.html",
            &[],
            &[r"(?i)<!doctype\s+html", r"(?i)<html[\s>]"],
        ),
        SignatureRule::of(
            "App.tsx",
            &[
                r"<[A-Z][A-Za-z0-9]*[\s/>]",
                r"\binterface\s+[A-Z]|:\s*(?:string|number|boolean)\b|React\.FC|\bexport\s+type\b",
            ],
            &[],
        ),
        SignatureRule::of(
            "index.ts",
            &[],
            &[
                r"\binterface\s+\w+\s*\{",
                r"\bexport\s+type\s+\w+",
                r"\benum\s+\w+\s*\{",
                r":\s*(?:string|number|boolean|void)\b",
            ],
        ),
        SignatureRule::of(
            "style.scss",
            &[],
            &[r"\$[A-Za-z][\w-]*\s*:", r"@mixin\s", r"@include\s"],
        ),
        SignatureRule::of("style.css", &[r"(?s)\{[^{}]*:[^{}]*;[^{}]*\}"], &[]),
        SignatureRule::of(
            "script.js",
            &[],
            &[
                r"\bfunction\s+\w*\s*\(",
                r"=>\s*[{(]",
                r"\bconst\s+\w+\s*=",
                r"\blet\s+\w+\s*=",
                r"\bexport\s+(?:default|const|function)\b",
                r"console\.log\(",
            ],
        ),
        SignatureRule::of(
            "script.py",
            &[],
            &[
                r"(?m)^#!.*\bpython",
                r"(?m)^def\s+\w+\s*\(.*\)\s*:",
                r"(?m)^from\s+[\w.]+\s+import\s",
                r"(?m)^import\s+[\w.]+\s*$",
            ],
        ),
        SignatureRule::of(
            "data.json",
            &[],
            &[r"(?s)^\s*\{.*\}\s*$", r"(?s)^\s*\[.*\]\s*$"],
        ),
        SignatureRule::of("config.yaml", &[r"(?m)^[A-Za-z][\w.-]*:\s+\S"], &[]),
        SignatureRule::of(
            "query.sql",
            &[],
            &[
                r"(?is)\bselect\b.+\bfrom\b",
                r"(?i)\bcreate\s+table\b",
                r"(?i)\binsert\s+into\b",
                r"(?i)\bupdate\s+\w+\s+set\b",
            ],
        ),
        SignatureRule::of("checklist.md", &[r"(?m)^\s*[-*]\s+\[[ xX]\]\s"], &[]),
        SignatureRule::of("README.md", &[r"(?m)^#{1,6}\s+\S"], &[]),
    ]
}

fn default_hint_extensions() -> BTreeMap<String, String> {
    [
        ("python", "py"),
        ("py", "py"),
        ("javascript", "js"),
        ("js", "js"),
        ("typescript", "ts"),
        ("ts", "ts"),
        ("tsx", "tsx"),
        ("jsx", "jsx"),
        ("html", "html"),
        ("css", "css"),
        ("scss", "scss"),
        ("sass", "sass"),
        ("json", "json"),
        ("yaml", "yaml"),
        ("yml", "yaml"),
        ("toml", "toml"),
        ("xml", "xml"),
        ("markdown", "md"),
        ("md", "md"),
        ("bash", "sh"),
        ("sh", "sh"),
        ("shell", "sh"),
        ("zsh", "sh"),
        ("rust", "rs"),
        ("ruby", "rb"),
        ("go", "go"),
        ("golang", "go"),
        ("java", "java"),
        ("kotlin", "kt"),
        ("swift", "swift"),
        ("c", "c"),
        ("cpp", "cpp"),
        ("c++", "cpp"),
        ("csharp", "cs"),
        ("cs", "cs"),
        ("php", "php"),
        ("sql", "sql"),
        ("graphql", "graphql"),
        ("vue", "vue"),
        ("svelte", "svelte"),
        ("plaintext", "txt"),
        ("text", "txt"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            version: default_version(),
            marker_labels: default_marker_labels(),
            lead_ins: default_lead_ins(),
            path_extensions: default_path_extensions(),
            doc_exempt_extensions: default_doc_exempt_extensions(),
            shell_prefixes: default_shell_prefixes(),
            min_block_chars: default_min_block_chars(),
            max_command_chars: default_max_command_chars(),
            context_lines: default_context_lines(),
            signatures: default_signatures(),
            hint_extensions: default_hint_extensions(),
        }
    }
}

impl Heuristics {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let tables: Heuristics = serde_yaml::from_str(&data)?;
        Ok(tables)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    pub fn is_path_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.path_extensions.iter().any(|e| *e == ext)
    }

    pub fn is_doc_exempt_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.doc_exempt_extensions.iter().any(|e| *e == ext)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.marker_labels.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "marker_labels is empty: explicit path markers are disabled".to_string(),
            });
        }
        for label in &self.marker_labels {
            if label.trim().is_empty() || label.contains(':') {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("invalid marker label '{label}': must be non-empty and contain no ':'"),
                });
            }
        }

        for pattern in &self.lead_ins {
            match regex::Regex::new(pattern) {
                Ok(re) => {
                    if re.captures_len() < 2 {
                        warnings.push(ConfigWarning {
                            level: WarnLevel::Error,
                            message: format!(
                                "lead-in pattern '{pattern}' has no capture group for the path"
                            ),
                        });
                    }
                }
                Err(e) => warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("lead-in pattern '{pattern}' does not compile: {e}"),
                }),
            }
        }

        for ext in self.path_extensions.iter().chain(&self.doc_exempt_extensions) {
            if ext.starts_with('.') || ext.chars().any(|c| c.is_ascii_uppercase()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("extension '{ext}' should be lowercase without a leading dot"),
                });
            }
        }
        for ext in &self.doc_exempt_extensions {
            if !self.is_path_extension(ext) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "doc-exempt extension '{ext}' is not in path_extensions and will never match"
                    ),
                });
            }
        }

        for prefix in &self.shell_prefixes {
            if prefix.chars().any(char::is_whitespace) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "shell prefix '{prefix}' contains whitespace and will never match a first token"
                    ),
                });
            }
        }

        if self.min_block_chars == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "min_block_chars is 0: the short-block filter is disabled".to_string(),
            });
        }

        for rule in &self.signatures {
            if rule.emit.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: "signature rule with empty 'emit' name".to_string(),
                });
            }
            if rule.all.is_empty() && rule.any.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "signature rule '{}' has no patterns and matches everything",
                        rule.emit
                    ),
                });
            }
            for pattern in rule.all.iter().chain(&rule.any) {
                if let Err(e) = regex::Regex::new(pattern) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!(
                            "signature rule '{}' pattern '{pattern}' does not compile: {e}",
                            rule.emit
                        ),
                    });
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
