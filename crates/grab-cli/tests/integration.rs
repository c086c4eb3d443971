use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn codegrab(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("codegrab").unwrap();
    cmd.current_dir(dir.path());
    cmd
}

const SNAPSHOT: &str = r#"Here is the updated component.

**src/App.tsx**

```tsx
export default function App() { return <div>Hello</div>; }
```

Run this once to pull the router in:

```bash
npm install react-router-dom --save-exact
```
"#;

// ---------------------------------------------------------------------------
// codegrab extract
// ---------------------------------------------------------------------------

#[test]
fn extract_reports_named_files_and_drops_commands() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("snapshot.md"), SNAPSHOT).unwrap();

    codegrab(&dir)
        .args(["extract", "snapshot.md", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("src/App.tsx"))
        .stdout(predicate::str::contains("npm install").not());
}

#[test]
fn extract_reads_stdin_when_no_file_given() {
    let dir = TempDir::new().unwrap();
    codegrab(&dir)
        .args(["extract", "--json"])
        .write_stdin(SNAPSHOT)
        .assert()
        .success()
        .stdout(predicate::str::contains("src/App.tsx"));
}

#[test]
fn extract_write_materializes_the_files() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("snapshot.md"), SNAPSHOT).unwrap();

    codegrab(&dir)
        .args(["extract", "snapshot.md", "--write", "out"])
        .assert()
        .success();

    let written = dir.path().join("out/src/App.tsx");
    assert!(written.exists());
    let content = std::fs::read_to_string(written).unwrap();
    assert!(content.contains("export default function App"));
}

#[test]
fn extract_table_output_lists_names() {
    let dir = TempDir::new().unwrap();
    codegrab(&dir)
        .arg("extract")
        .write_stdin(SNAPSHOT)
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME"))
        .stdout(predicate::str::contains("src/App.tsx"));
}

// ---------------------------------------------------------------------------
// codegrab normalize
// ---------------------------------------------------------------------------

#[test]
fn normalize_legacy_inline_payload() {
    let dir = TempDir::new().unwrap();
    let payload = r#"{"code": "fn main() { println!(\"hello, world\"); }", "filename": "src/main.rs", "language": "rust"}"#;
    std::fs::write(dir.path().join("payload.json"), payload).unwrap();

    codegrab(&dir)
        .args(["normalize", "payload.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("src/main.rs"))
        .stdout(predicate::str::contains("hello, world"));
}

#[test]
fn normalize_block_list_resolves_names() {
    let dir = TempDir::new().unwrap();
    let payload = r#"[{"code": "def main():\n    print('hello world')", "language": "python"}]"#;

    codegrab(&dir)
        .arg("normalize")
        .write_stdin(payload)
        .assert()
        .success()
        .stdout(predicate::str::contains("script.py"));
}

#[test]
fn normalize_rejects_unrecognized_shapes() {
    let dir = TempDir::new().unwrap();
    codegrab(&dir)
        .arg("normalize")
        .write_stdin(r#"{"unexpected": true}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// ---------------------------------------------------------------------------
// codegrab tables
// ---------------------------------------------------------------------------

#[test]
fn tables_init_then_validate() {
    let dir = TempDir::new().unwrap();
    codegrab(&dir)
        .args(["tables", "init"])
        .assert()
        .success();
    assert!(dir.path().join("codegrab-tables.yaml").exists());

    codegrab(&dir)
        .args(["tables", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn tables_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    codegrab(&dir).args(["tables", "init"]).assert().success();
    codegrab(&dir)
        .args(["tables", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    codegrab(&dir)
        .args(["tables", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn tables_validate_flags_bad_lead_ins() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("bad.yaml"),
        "lead_ins:\n  - \"save it somewhere\"\n",
    )
    .unwrap();

    codegrab(&dir)
        .args(["--tables", "bad.yaml", "tables", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("capture group"))
        .stderr(predicate::str::contains("validation found errors"));
}

#[test]
fn tables_show_prints_yaml() {
    let dir = TempDir::new().unwrap();
    codegrab(&dir)
        .args(["tables", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("marker_labels"))
        .stdout(predicate::str::contains("min_block_chars"));
}

// ---------------------------------------------------------------------------
// codegrab run
// ---------------------------------------------------------------------------

const PRODUCER: &str = "cat >/dev/null; \
                        printf '%s\\n' '```rust' '// file: src/lib.rs' \
                        'pub fn add(a: i32, b: i32) -> i32 { a + b }' '```'";

#[test]
fn run_captures_files_from_a_process() {
    let dir = TempDir::new().unwrap();
    codegrab(&dir)
        .args([
            "run", "--json", "--prompt", "go", "--settle", "60", "--poll", "20", "--", "sh", "-c",
            PRODUCER,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("src/lib.rs"))
        .stdout(predicate::str::contains("settled"));
}

#[test]
fn run_writes_captured_files() {
    let dir = TempDir::new().unwrap();
    codegrab(&dir)
        .args([
            "run", "--prompt", "go", "--settle", "60", "--poll", "20", "--write", "out", "--",
            "sh", "-c", PRODUCER,
        ])
        .assert()
        .success();
    assert!(dir.path().join("out/src/lib.rs").exists());
}

#[test]
fn run_with_silent_producer_completes_empty() {
    let dir = TempDir::new().unwrap();
    codegrab(&dir)
        .args([
            "run",
            "--json",
            "--prompt",
            "go",
            "--start-timeout",
            "1",
            "--settle",
            "50",
            "--poll",
            "20",
            "--",
            "sh",
            "-c",
            "cat >/dev/null",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"files\": []"));
}

#[test]
fn run_hard_timeout_reports_partial_files_and_fails() {
    let dir = TempDir::new().unwrap();
    let script = format!("{PRODUCER}; sleep 30");
    codegrab(&dir)
        .args([
            "run",
            "--json",
            "--prompt",
            "go",
            "--hard-timeout",
            "1",
            "--settle",
            "2000",
            "--poll",
            "20",
            "--",
            "sh",
            "-c",
            &script,
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("src/lib.rs"))
        .stderr(predicate::str::contains("timeout"));
}

#[test]
fn run_requires_a_producer_command() {
    let dir = TempDir::new().unwrap();
    codegrab(&dir)
        .args(["run", "--prompt", "go"])
        .assert()
        .failure();
}
