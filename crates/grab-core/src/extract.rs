use crate::types::RawBlock;
use regex::Regex;
use std::sync::OnceLock;

/// Non-blank lines kept above a block for later path inference.
const CONTEXT_WINDOW: usize = 8;
/// Bound on raw lines walked while filling the window, so blank-heavy
/// prose cannot turn the scan into a whole-document walk.
const CONTEXT_SCAN_LINES: usize = 32;

fn inline_fence_re() -> &'static Regex {
    static INLINE_FENCE: OnceLock<Regex> = OnceLock::new();
    INLINE_FENCE.get_or_init(|| {
        Regex::new(r"(?s)```([A-Za-z0-9+#._-]*)[ \t]*\n?(.*?)```").unwrap()
    })
}

/// Scans one snapshot of the producer's output and returns every code region
/// found, in order of appearance.
///
/// Three tiers, each only consulted when the previous found nothing:
/// 1. line-anchored fenced blocks (``` or ~~~), the well-formed container
///    rendering; an unterminated final fence runs to end of snapshot since
///    snapshots of a growing output routinely end mid-block;
/// 2. runs of two or more indented lines, the container-less rendering;
/// 3. fence notation embedded mid-line in flowing text.
///
/// Pure function of the snapshot: identical input yields identical output.
pub fn extract_blocks(snapshot: &str) -> Vec<RawBlock> {
    let lines: Vec<&str> = snapshot.lines().map(|l| l.trim_end_matches('\r')).collect();

    let blocks = fenced_blocks(&lines);
    if !blocks.is_empty() {
        return blocks;
    }
    let blocks = indented_blocks(&lines);
    if !blocks.is_empty() {
        return blocks;
    }
    inline_blocks(snapshot)
}

// ---------------------------------------------------------------------------
// Tier 1: fenced containers
// ---------------------------------------------------------------------------

struct FenceOpen {
    marker: char,
    len: usize,
    hint: Option<String>,
}

fn fence_open(line: &str) -> Option<FenceOpen> {
    let trimmed = line.trim_start();
    let marker = match trimmed.chars().next() {
        Some(c @ ('`' | '~')) => c,
        _ => return None,
    };
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    let info = &trimmed[len..];
    // A backtick info string containing backticks is inline code, not a fence.
    if marker == '`' && info.contains('`') {
        return None;
    }
    let hint = info
        .split_whitespace()
        .next()
        .map(|t| t.to_ascii_lowercase())
        .filter(|t| !t.is_empty());
    Some(FenceOpen { marker, len, hint })
}

fn fence_close(line: &str, open: &FenceOpen) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.chars().all(|c| c == open.marker)
        && trimmed.chars().count() >= open.len
}

fn fenced_blocks(lines: &[&str]) -> Vec<RawBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<(FenceOpen, Vec<String>, Option<String>)> = None;

    for (i, line) in lines.iter().enumerate() {
        let closing = match open.as_ref() {
            Some((fence, _, _)) => fence_close(line, fence),
            None => false,
        };
        if closing {
            if let Some((fence, body, context)) = open.take() {
                blocks.push(make_block(&body, fence.hint, context));
            }
        } else if let Some((_, body, _)) = open.as_mut() {
            body.push((*line).to_string());
        } else if let Some(fence) = fence_open(line) {
            let context = context_above(lines, i);
            open = Some((fence, Vec::new(), context));
        }
    }
    // Unterminated final fence: the snapshot ends mid-block.
    if let Some((fence, body, context)) = open {
        blocks.push(make_block(&body, fence.hint, context));
    }
    blocks
}

fn make_block(body: &[String], hint: Option<String>, context: Option<String>) -> RawBlock {
    RawBlock {
        content: body.join("\n"),
        language_hint: hint,
        preceding_context: context,
    }
}

/// Lines immediately above line `i`, newest window only, cut at any earlier
/// fence line so one block's tail never leaks into the next block's context.
/// The window counts non-blank lines; blank separators between prose lines
/// must not push a path mention out of reach of the resolver's scan.
fn context_above(lines: &[&str], i: usize) -> Option<String> {
    let mut collected: Vec<&str> = Vec::new();
    let mut non_blank = 0usize;
    for line in lines[..i].iter().rev().take(CONTEXT_SCAN_LINES) {
        if fence_open(line).is_some() {
            break;
        }
        if !line.trim().is_empty() {
            non_blank += 1;
        }
        collected.push(line);
        if non_blank == CONTEXT_WINDOW {
            break;
        }
    }
    collected.reverse();
    let context = collected.join("\n");
    if context.trim().is_empty() {
        None
    } else {
        Some(context)
    }
}

// ---------------------------------------------------------------------------
// Tier 2: indented runs
// ---------------------------------------------------------------------------

fn is_indented(line: &str) -> bool {
    (line.starts_with("    ") || line.starts_with('\t')) && !line.trim().is_empty()
}

fn strip_indent(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix('\t') {
        rest
    } else if let Some(rest) = line.strip_prefix("    ") {
        rest
    } else {
        line
    }
}

fn indented_blocks(lines: &[&str]) -> Vec<RawBlock> {
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if !is_indented(lines[i]) {
            i += 1;
            continue;
        }
        let start = i;
        let mut end = i;
        while end < lines.len() && (is_indented(lines[end]) || lines[end].trim().is_empty()) {
            end += 1;
        }
        // Drop trailing blank lines from the run.
        let mut last = end;
        while last > start && lines[last - 1].trim().is_empty() {
            last -= 1;
        }
        let non_blank = lines[start..last].iter().filter(|l| !l.trim().is_empty()).count();
        if non_blank >= 2 {
            let body: Vec<String> = lines[start..last]
                .iter()
                .map(|l| strip_indent(l).to_string())
                .collect();
            let context = context_above(lines, start);
            blocks.push(RawBlock {
                content: body.join("\n"),
                language_hint: None,
                preceding_context: context,
            });
        }
        i = end;
    }
    blocks
}

// ---------------------------------------------------------------------------
// Tier 3: inline fence notation
// ---------------------------------------------------------------------------

fn inline_blocks(snapshot: &str) -> Vec<RawBlock> {
    inline_fence_re()
        .captures_iter(snapshot)
        .filter_map(|caps| {
            let content = caps.get(2)?.as_str();
            if content.trim().is_empty() {
                return None;
            }
            let hint = caps
                .get(1)
                .map(|m| m.as_str().to_ascii_lowercase())
                .filter(|h| !h.is_empty());
            let before = &snapshot[..caps.get(0).map(|m| m.start()).unwrap_or(0)];
            let mut collected: Vec<&str> = Vec::new();
            let mut non_blank = 0usize;
            for line in before.lines().rev().take(CONTEXT_SCAN_LINES) {
                if !line.trim().is_empty() {
                    non_blank += 1;
                }
                collected.push(line);
                if non_blank == CONTEXT_WINDOW {
                    break;
                }
            }
            collected.reverse();
            let context = collected.join("\n");
            Some(RawBlock {
                content: content.to_string(),
                language_hint: hint,
                preceding_context: if context.trim().is_empty() {
                    None
                } else {
                    Some(context)
                },
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_blocks_in_order_with_hints() {
        let snapshot = "\
Intro text.

```python
print('a')
print('b')
```

Some prose in between.

```tsx
export default function App() {}
```
";
        let blocks = extract_blocks(snapshot);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language_hint.as_deref(), Some("python"));
        assert!(blocks[0].content.contains("print('a')"));
        assert_eq!(blocks[1].language_hint.as_deref(), Some("tsx"));
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        let snapshot = "```js\nconst a = 1;\nconst b = 2;";
        let blocks = extract_blocks(snapshot);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "const a = 1;\nconst b = 2;");
    }

    #[test]
    fn tilde_fences_supported() {
        let snapshot = "~~~css\nbody { margin: 0; }\n~~~\n";
        let blocks = extract_blocks(snapshot);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language_hint.as_deref(), Some("css"));
    }

    #[test]
    fn context_captured_and_cut_at_previous_fence() {
        let snapshot = "\
```js
old();
```
Here is the next part:
**src/util.ts**
```ts
new_code();
```
";
        let blocks = extract_blocks(snapshot);
        assert_eq!(blocks.len(), 2);
        let context = blocks[1].preceding_context.as_deref().unwrap();
        assert!(context.contains("src/util.ts"));
        assert!(!context.contains("old()"));
    }

    #[test]
    fn blank_separated_prose_does_not_shrink_the_context() {
        // A path mention five prose lines up, each separated by a blank line,
        // must still land inside the captured window.
        let mut snapshot = String::from("**src/App.tsx**\n");
        for _ in 0..4 {
            snapshot.push_str("\nSome explanatory prose.\n");
        }
        snapshot.push_str("\n```tsx\nexport default function App() {}\n```\n");

        let blocks = extract_blocks(&snapshot);
        assert_eq!(blocks.len(), 1);
        let context = blocks[0].preceding_context.as_deref().unwrap();
        assert!(context.contains("src/App.tsx"));
    }

    #[test]
    fn indented_fallback_only_when_no_fences() {
        let snapshot = "\
Some explanation:

    def main():
        print('hi')

Done.
";
        let blocks = extract_blocks(snapshot);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "def main():\n    print('hi')");
        assert!(blocks[0].language_hint.is_none());

        let with_fence = format!("{snapshot}\n```js\nx();\ny();\n```\n");
        let blocks = extract_blocks(&with_fence);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].content.contains("x();"));
    }

    #[test]
    fn single_indented_line_ignored() {
        let snapshot = "Prose.\n\n    lonely line\n\nMore prose.\n";
        assert!(extract_blocks(snapshot).is_empty());
    }

    #[test]
    fn inline_fence_last_resort() {
        let snapshot = "All on one line: ```js\nconsole.log(1);\nconsole.log(2);``` and more.";
        let blocks = extract_blocks(snapshot);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language_hint.as_deref(), Some("js"));
        assert!(blocks[0].content.contains("console.log(1);"));
    }

    #[test]
    fn extraction_is_idempotent() {
        let snapshot = "x\n```py\nprint(1)\n```\n\n    a\n    b\n";
        let first = extract_blocks(snapshot);
        let second = extract_blocks(snapshot);
        assert_eq!(first, second);
    }

    #[test]
    fn crlf_snapshot_handled() {
        let snapshot = "```js\r\nconst a = 1;\r\nconst b = 2;\r\n```\r\n";
        let blocks = extract_blocks(snapshot);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "const a = 1;\nconst b = 2;");
    }

    #[test]
    fn empty_snapshot_yields_nothing() {
        assert!(extract_blocks("").is_empty());
        assert!(extract_blocks("just prose, no code at all").is_empty());
    }
}
