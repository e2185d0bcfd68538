use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use thconfig::{Dialect, Document, Renderer};

const FIXTURE_SUFFIX: &str = ".test.th";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Parsing must fail and the error's Display string must contain this.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// If set with `expect_error`, the 1-based line (within the config
    /// source, after the frontmatter) the error must point at.
    #[serde(default)]
    pub expect_line: Option<usize>,

    /// Expected JSON form, compared structurally.
    #[serde(default)]
    pub expect_json: Option<String>,

    /// Expected normalized source (trailing whitespace ignored).
    #[serde(default)]
    pub expect_render: Option<String>,

    /// Key path (`survey/centerline/data`) to expected value.
    #[serde(default)]
    pub expect_lookup: BTreeMap<String, String>,

    /// Dialect for this fixture; overrides the one given on the command line.
    #[serde(default)]
    pub dialect: Option<Dialect>,
}

/// Split a `.test.th` file into its TOML config and config source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let (toml_str, rest) = match after_open.strip_prefix("---") {
        // Empty frontmatter.
        Some(rest) => ("", rest),
        None => {
            let close_pos = after_open
                .find("\n---")
                .ok_or("missing closing --- frontmatter delimiter")?;
            (
                after_open[..close_pos].trim_end_matches('\r'),
                &after_open[close_pos + 4..], // skip \n---
            )
        }
    };
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;
    if let Some(dialect) = &config.dialect {
        dialect.validate().map_err(|e| e.to_string())?;
    }

    Ok((config, source))
}

#[derive(Debug, PartialEq, Eq)]
pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path, default_dialect: &Dialect) -> TestResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("cannot read file: {}", e)),
            };
        }
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("frontmatter error: {}", e)),
            };
        }
    };

    let outcome = match check_fixture(&config, source, default_dialect) {
        None => TestOutcome::Pass,
        Some(reason) => TestOutcome::Fail(reason),
    };
    log::debug!("{}: {:?}", path.display(), outcome);

    TestResult {
        path: path.to_path_buf(),
        description: config.description,
        outcome,
    }
}

/// Run every expectation in `config` against `source`. Returns `Some(reason)`
/// on the first mismatch.
fn check_fixture(config: &TestConfig, source: &str, default_dialect: &Dialect) -> Option<String> {
    let dialect = config.dialect.as_ref().unwrap_or(default_dialect);
    let parse_result = thconfig::Parser::new(source.to_string(), 0)
        .with_dialect(dialect.clone())
        .parse();

    if let Some(expected_err) = &config.expect_error {
        return match parse_result {
            Ok(_) => Some(format!(
                "expected parse error containing \"{}\", but parsing succeeded",
                expected_err
            )),
            Err(err) if !err.to_string().contains(expected_err.as_str()) => Some(format!(
                "expected parse error containing \"{}\", got: {}",
                expected_err, err
            )),
            Err(err) => match config.expect_line {
                Some(line) if line != err.line => Some(format!(
                    "expected error on line {}, but it is on line {}",
                    line, err.line
                )),
                _ => None,
            },
        };
    }

    let doc = match parse_result {
        Ok(doc) => doc,
        Err(err) => return Some(format!("unexpected parse error: {}", err)),
    };

    if let Some(expected_json) = &config.expect_json {
        if let Some(reason) = check_json(&doc, expected_json) {
            return Some(reason);
        }
    }

    if let Some(expected_render) = &config.expect_render {
        let actual = Renderer::new(dialect).render(&doc);
        let actual_trimmed = actual.trim_end();
        let expected_trimmed = expected_render.trim_end();
        if actual_trimmed != expected_trimmed {
            return Some(format!(
                "render mismatch\n  expected:\n{}\n  actual:\n{}",
                indent_block(expected_trimmed),
                indent_block(actual_trimmed)
            ));
        }
    }

    for (path, expected) in &config.expect_lookup {
        match doc.lookup(path) {
            None => return Some(format!("lookup `{}`: no such node", path)),
            Some(node) if node.value != *expected => {
                return Some(format!(
                    "lookup `{}`: expected {:?}, got {:?}",
                    path, expected, node.value
                ));
            }
            Some(_) => {}
        }
    }

    crate::round_trip(&doc, dialect).err()
}

fn check_json(doc: &Document, expected: &str) -> Option<String> {
    let expected: serde_json::Value = match serde_json::from_str(expected) {
        Ok(v) => v,
        Err(e) => return Some(format!("expect_json is not valid JSON: {}", e)),
    };
    let actual = doc.to_json();
    if actual == expected {
        None
    } else {
        Some(format!(
            "JSON mismatch\n  expected: {}\n  actual:   {}",
            expected, actual
        ))
    }
}

fn indent_block(text: &str) -> String {
    text.lines()
        .map(|l| format!("    | {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Discover fixture files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(FIXTURE_SUFFIX) {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn paint(s: &str, code: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, s)
    }
}

fn label_for(result: &TestResult) -> String {
    result.description.clone().unwrap_or_else(|| {
        let name = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("?");
        name.strip_suffix(FIXTURE_SUFFIX).unwrap_or(name).to_string()
    })
}

/// Filter discovered categories down to the requested ones (and their
/// subfolders). Unknown names are reported and skipped.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }
    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let mut found = false;
        for (cat, files) in all {
            if cat == req || cat.starts_with(&format!("{}/", req)) {
                filtered.insert(cat.as_str(), files);
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

/// Run all fixture files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, dialect: &Dialect, no_color: bool, categories: &[String]) -> i32 {
    let run_categories: BTreeMap<String, Vec<PathBuf>>;
    if path.is_file() {
        // Single file mode ignores categories.
        run_categories = BTreeMap::from([(String::new(), vec![path.to_path_buf()])]);
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
            return 1;
        }
        run_categories = select_categories(&all, categories)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        if run_categories.is_empty() {
            eprintln!("no matching categories found");
            return 1;
        }
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();
    let show_headers = !path.is_file();

    for (cat, files) in &run_categories {
        if show_headers {
            let header = if cat.is_empty() { "(root)" } else { cat.as_str() };
            eprintln!();
            eprintln!("{}", paint(header, "1", no_color));
        }

        for file in files {
            let result = run_single_test(file, dialect);
            let label = label_for(&result);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), label);
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        eprintln!("test result: {}. {} passed, 0 failed", paint("ok", "32", no_color), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failed,
            passed + failed
        );
        1
    }
}
