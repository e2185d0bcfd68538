mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use thconfig::{Dialect, Document, Renderer};
use thconfig_schema::Schema;

const SUBCOMMANDS: &[&str] = &["show", "check", "test", "help"];

/// Options whose value is a separate argument, so it is not mistaken for
/// the config file when injecting the default subcommand.
const VALUE_OPTIONS: &[&str] = &["--dialect", "--schema", "-c", "--category"];

#[derive(Parser)]
#[command(name = "thconfig", version, about = "Survey/layout config parser and formatter")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// TOML file overriding the dialect's reserved words
    #[arg(long, global = true)]
    dialect: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a config file as JSON and as normalized source
    Show(ShowArgs),

    /// Parse config files and verify they survive a render/parse round trip
    Check(CheckArgs),

    /// Run .test.th fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct ShowArgs {
    /// Config file to read
    file: String,

    /// Print only the JSON form
    #[arg(long, conflicts_with = "render")]
    json: bool,

    /// Print only the normalized source
    #[arg(long)]
    render: bool,

    /// JSON Schema to validate the JSON form against (advisory)
    #[arg(long)]
    schema: Option<PathBuf>,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Config files to check
    #[arg(required = true)]
    files: Vec<String>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.th file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let args = inject_default_subcommand(std::env::args().collect());
    let cli = Cli::parse_from(&args);

    init_logging(cli.verbose);

    let dialect = match &cli.dialect {
        Some(path) => match Dialect::from_file(path) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("error: dialect '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => Dialect::default(),
    };

    match cli.command {
        Command::Show(show_args) => do_show(show_args, &dialect, cli.no_color),
        Command::Check(check_args) => {
            let exit_code = do_check(&check_args.files, &dialect, cli.no_color);
            process::exit(exit_code);
        }
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code =
                test_runner::run_tests(path, &dialect, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// Backwards compatibility: if the first positional arg is not a known
/// subcommand, insert "show" so `thconfig file.thconfig` works.
fn inject_default_subcommand(mut args: Vec<String>) -> Vec<String> {
    let mut skip_value = false;
    let mut first_pos = None;
    for (i, arg) in args.iter().enumerate().skip(1) {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg.starts_with('-') {
            skip_value = VALUE_OPTIONS.contains(&arg.as_str());
            continue;
        }
        first_pos = Some(i);
        break;
    }
    if let Some(pos) = first_pos {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "show".to_string());
        }
    }
    args
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn color_choice(no_color: bool) -> ColorChoice {
    if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

fn emit(files: &SimpleFiles<String, String>, diagnostic: &Diagnostic<usize>, no_color: bool) {
    let writer = StandardStream::stderr(color_choice(no_color));
    let config = term::Config::default();
    let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, diagnostic);
}

fn read_source(file: &str) -> Result<String, String> {
    std::fs::read_to_string(file).map_err(|e| format!("cannot read '{}': {}", file, e))
}

/// Parse `file`, printing any parse error as a diagnostic.
fn load(file: &str, dialect: &Dialect, no_color: bool) -> Option<Document> {
    let source = match read_source(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            return None;
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(file.to_string(), source.clone());

    let parser = thconfig::Parser::new(source, file_id).with_dialect(dialect.clone());
    match parser.parse() {
        Ok(doc) => Some(doc),
        Err(error) => {
            log::debug!("{}", error);
            emit(&files, &error.to_diagnostic(), no_color);
            None
        }
    }
}

fn do_show(args: ShowArgs, dialect: &Dialect, no_color: bool) {
    let Some(doc) = load(&args.file, dialect, no_color) else {
        process::exit(1);
    };

    if let Some(schema_path) = &args.schema {
        let schema = match Schema::from_file(schema_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: schema '{}': {}", schema_path.display(), e);
                process::exit(1);
            }
        };
        let validation = schema.validate(&doc.to_json());
        match validation.diagnostic {
            None => eprintln!("ok: {} matches {}", args.file, schema_path.display()),
            Some(diagnostic) => eprintln!("warning: schema validation failed {}", diagnostic),
        }
    }

    let print_json = !args.render;
    let print_text = !args.json;
    if print_json {
        println!("{}", doc.to_json_string_pretty());
    }
    if print_json && print_text {
        println!();
    }
    if print_text {
        print!("{}", Renderer::new(dialect).render(&doc));
    }
}

/// Returns exit code: 0 = every file parsed and round-tripped, 1 otherwise.
fn do_check(files: &[String], dialect: &Dialect, no_color: bool) -> i32 {
    let mut failed = 0usize;
    for file in files {
        let Some(doc) = load(file, dialect, no_color) else {
            failed += 1;
            continue;
        };
        match round_trip(&doc, dialect) {
            Ok(()) => eprintln!("ok: {} parsed successfully", file),
            Err(reason) => {
                eprintln!("error: {}: {}", file, reason);
                failed += 1;
            }
        }
    }
    if failed == 0 { 0 } else { 1 }
}

/// Verify that rendering `doc` and parsing the result gives `doc` back.
pub(crate) fn round_trip(doc: &Document, dialect: &Dialect) -> Result<(), String> {
    let rendered = Renderer::new(dialect).render(doc);
    let reparsed = thconfig::Parser::new(rendered, 0)
        .with_dialect(dialect.clone())
        .parse()
        .map_err(|e| format!("rendered text does not parse: {}", e))?;
    if &reparsed == doc {
        Ok(())
    } else {
        Err("rendered text parses to a different document".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn injects_show_before_bare_file() {
        assert_eq!(
            inject_default_subcommand(args(&["thconfig", "cave.thconfig"])),
            args(&["thconfig", "show", "cave.thconfig"])
        );
    }

    #[test]
    fn skips_option_values() {
        assert_eq!(
            inject_default_subcommand(args(&["thconfig", "--dialect", "d.toml", "cave.thconfig"])),
            args(&["thconfig", "--dialect", "d.toml", "show", "cave.thconfig"])
        );
    }

    #[test]
    fn leaves_subcommands_alone() {
        let input = args(&["thconfig", "--no-color", "check", "a", "b"]);
        assert_eq!(inject_default_subcommand(input.clone()), input);
        let version = args(&["thconfig", "--version"]);
        assert_eq!(inject_default_subcommand(version.clone()), version);
    }

    #[test]
    fn round_trip_accepts_parsed_documents() {
        let dialect = Dialect::default();
        let doc = thconfig::parse("layout l\n  def x\n    y\n  enddef;\n  scale 1 200\n").unwrap();
        assert_eq!(round_trip(&doc, &dialect), Ok(()));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
