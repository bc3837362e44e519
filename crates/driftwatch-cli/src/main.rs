use driftwatch::{Comparison, Side, TracingSink};
use driftwatch_config::{Config, ExitPolicy};
use facet::Facet;
use jiff::Timestamp;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod console;
mod markdown;
mod outputs;

use console::ConsoleSink;
use outputs::{GITHUB_OUTPUT, GITHUB_STEP_SUMMARY, Outputs};

const USAGE: &str = "\
Detect schema drift between a reference and a target MySQL database.

Usage: driftwatch <COMMAND> [OPTIONS]

Commands:
  compare        Compare the target database against the reference
  check-config   Validate configuration and show the connection targets

Options:
  --env-file <PATH>       Load environment variables from this file first
  --fail-on-drift         Exit 1 when drift is found
  --normalize-types       Ignore cosmetic type differences such as integer display widths
  --json                  Print the result as JSON on stdout
  --sql-file <PATH>       Write the corrective SQL script to this file
  --summary-file <PATH>   Write the markdown summary to this file
  --comment-file <PATH>   Write a pull-request comment body to this file
  -V, --version           Show version information
  -h, --help              Show this help
";

/// Command-line arguments. Empty strings stand for options not given.
#[derive(Facet, Debug)]
struct Cli {
    /// `compare` or `check-config`
    #[facet(positional, default)]
    command: String,

    #[facet(named, short = 'V')]
    version: bool,

    #[facet(named, short = 'h')]
    help: bool,

    #[facet(named, default)]
    env_file: String,

    #[facet(named)]
    fail_on_drift: bool,

    #[facet(named)]
    normalize_types: bool,

    #[facet(named)]
    json: bool,

    #[facet(named, default)]
    sql_file: String,

    #[facet(named, default)]
    summary_file: String,

    #[facet(named, default)]
    comment_file: String,
}

impl Cli {
    fn env_file(&self) -> Option<&str> {
        Some(self.env_file.as_str()).filter(|path| !path.is_empty())
    }

    fn compare_args(&self) -> CompareArgs {
        let path = |value: &str| Some(PathBuf::from(value)).filter(|_| !value.is_empty());
        CompareArgs {
            fail_on_drift: self.fail_on_drift,
            normalize_types: self.normalize_types,
            json: self.json,
            sql_file: path(&self.sql_file),
            summary_file: path(&self.summary_file),
            comment_file: path(&self.comment_file),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Compare,
    CheckConfig,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compare" => Ok(Command::Compare),
            "check-config" => Ok(Command::CheckConfig),
            other => Err(format!("unknown command `{other}`")),
        }
    }
}

/// Where a compare run writes its documents, and how it reports.
#[derive(Debug, Default)]
struct CompareArgs {
    fail_on_drift: bool,
    normalize_types: bool,
    json: bool,
    sql_file: Option<PathBuf>,
    summary_file: Option<PathBuf>,
    comment_file: Option<PathBuf>,
}

/// Files the CI platform hands us to append to.
#[derive(Debug, Default, Clone)]
struct CiPaths {
    /// Step outputs (`GITHUB_OUTPUT`)
    output: Option<PathBuf>,
    /// Job summary markdown (`GITHUB_STEP_SUMMARY`)
    step_summary: Option<PathBuf>,
}

impl CiPaths {
    fn from_env() -> Self {
        Self {
            output: std::env::var_os(GITHUB_OUTPUT).map(PathBuf::from),
            step_summary: std::env::var_os(GITHUB_STEP_SUMMARY).map(PathBuf::from),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("could not load env file {path}: {source}")]
    EnvFile {
        path: String,
        #[source]
        source: dotenvy::Error,
    },

    #[error(transparent)]
    Comparison(#[from] driftwatch::Error),

    #[error("could not write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    /// Which database the failure concerns, when it concerns one.
    fn side(&self) -> Option<Side> {
        match self {
            CliError::Comparison(e) => e.side(),
            CliError::EnvFile { .. } | CliError::Write { .. } => None,
        }
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args_ref: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    let code = match facet_args::from_slice::<Cli>(&args_ref) {
        Ok(cli) => run(cli).await,
        Err(err) => {
            eprintln!("{err}");
            eprintln!();
            eprint!("{USAGE}");
            1
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    if cli.version {
        println!("driftwatch {}", env!("CARGO_PKG_VERSION"));
        return 0;
    }
    if cli.help || cli.command.is_empty() {
        print!("{USAGE}");
        return 0;
    }

    let command = match cli.command.parse::<Command>() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}");
            eprintln!();
            eprint!("{USAGE}");
            return 1;
        }
    };

    init_logging();

    match command {
        Command::Compare => {
            let ci = CiPaths::from_env();
            compare(cli.env_file(), &cli.compare_args(), &ci).await
        }
        Command::CheckConfig => check_config(cli.env_file()),
    }
}

/// Logs go to stderr so stdout carries only the report.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("driftwatch=info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

/// Load `.env` (or the given file) into the process environment.
fn load_env_file(path: Option<&str>) -> Result<(), CliError> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|source| CliError::EnvFile {
                path: path.to_string(),
                source,
            })?;
            info!(path, "Loaded env file");
        }
        None => {
            if let Ok(path) = dotenvy::dotenv() {
                info!(path = %path.display(), "Loaded env file");
            }
        }
    }
    Ok(())
}

fn check_config(env_file: Option<&str>) -> i32 {
    if let Err(e) = load_env_file(env_file) {
        error!("{e}");
        return 1;
    }

    match Config::from_env() {
        Ok(config) => {
            println!("reference:       {}", config.reference);
            println!("target:          {}", config.target);
            println!("exit policy:     {}", config.exit_policy);
            println!("normalize types: {}", config.normalize_types);
            0
        }
        Err(e) => {
            error!("Invalid configuration: {e}");
            1
        }
    }
}

async fn compare(env_file: Option<&str>, options: &CompareArgs, ci: &CiPaths) -> i32 {
    let generated_at = Timestamp::now();

    if let Err(e) = load_env_file(env_file) {
        report_failure(None, &e, generated_at, options, ci);
        return 1;
    }

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            let e = CliError::from(driftwatch::Error::from(e));
            report_failure(None, &e, generated_at, options, ci);
            return 1;
        }
    };
    if options.fail_on_drift {
        config.exit_policy = ExitPolicy::FailOnDrift;
    }
    config.normalize_types |= options.normalize_types;

    info!(
        reference = %config.reference,
        target = %config.target,
        normalize_types = config.normalize_types,
        "Comparing schemas"
    );

    // With --json, stdout is reserved for the JSON document and progress goes to the log.
    let outcome = if options.json {
        driftwatch::compare_databases(&config, &mut TracingSink).await
    } else {
        let color = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        let mut sink = ConsoleSink::new(std::io::stdout(), color);
        driftwatch::compare_databases(&config, &mut sink).await
    };

    match outcome {
        Ok(comparison) => {
            match report_success(&config, &comparison, generated_at, options, ci) {
                Ok(()) => exit_code(config.exit_policy, &comparison),
                Err(e) => {
                    error!("{e}");
                    1
                }
            }
        }
        Err(e) => {
            report_failure(Some(&config), &CliError::from(e), generated_at, options, ci);
            1
        }
    }
}

/// Exit status for a completed comparison.
fn exit_code(policy: ExitPolicy, comparison: &Comparison) -> i32 {
    match policy {
        ExitPolicy::FailOnDrift if !comparison.result.is_in_sync => 1,
        _ => 0,
    }
}

/// Print the report and hand the result to CI.
///
/// Step outputs are written first, so a failing document write still leaves
/// the drift status visible to later steps.
fn report_success(
    config: &Config,
    comparison: &Comparison,
    generated_at: Timestamp,
    options: &CompareArgs,
    ci: &CiPaths,
) -> Result<(), CliError> {
    write_outputs(&Outputs::from_result(&comparison.result), ci);

    if options.json {
        println!("{}", facet_json::to_string(&comparison.result));
    } else if !comparison.corrective_sql.is_empty() {
        println!();
        println!("Corrective SQL (advisory, not executed):");
        println!();
        print!("{}", comparison.corrective_sql);
    }

    if let Some(path) = &options.sql_file {
        write_file(path, &sql_script(comparison, generated_at))?;
        info!(path = %path.display(), "Wrote corrective SQL");
    }

    let summary = markdown::summary(config, comparison, generated_at);
    write_documents(&summary, options, ci)
}

fn report_failure(
    config: Option<&Config>,
    error: &CliError,
    generated_at: Timestamp,
    options: &CompareArgs,
    ci: &CiPaths,
) {
    error!(side = ?error.side(), "Comparison failed: {error}");

    write_outputs(&Outputs::failed(), ci);
    let document = markdown::failure(config, error, generated_at);
    if let Err(e) = write_documents(&document, options, ci) {
        warn!("{e}");
    }
}

/// The corrective script as written to `--sql-file`.
fn sql_script(comparison: &Comparison, generated_at: Timestamp) -> String {
    if comparison.corrective_sql.is_empty() {
        return format!("-- driftwatch {generated_at}: schemas are in sync, nothing to apply.\n");
    }
    format!(
        "-- driftwatch {generated_at}: corrective SQL for the target database.\n\
         -- Review before applying. Nothing here has been executed.\n\n{}",
        comparison.corrective_sql
    )
}

/// Summary file, comment file and the CI job summary.
fn write_documents(document: &str, options: &CompareArgs, ci: &CiPaths) -> Result<(), CliError> {
    if let Some(path) = &options.summary_file {
        write_file(path, document)?;
    }
    if let Some(path) = &options.comment_file {
        write_file(path, &markdown::comment(document))?;
    }
    if let Some(path) = &ci.step_summary {
        outputs::append(path, document).map_err(|source| CliError::Write {
            path: path.display().to_string(),
            source,
        })?;
    }
    Ok(())
}

/// Step outputs are best-effort: a failure here is logged, not fatal.
fn write_outputs(values: &Outputs, ci: &CiPaths) {
    let Some(path) = &ci.output else {
        return;
    };
    if let Err(e) = outputs::append(path, &values.to_string()) {
        warn!(path = %path.display(), "Could not write step outputs: {e}");
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|source| CliError::Write {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch::{ComparisonResult, CorrectiveSql, Statement};

    fn comparison(in_sync: bool) -> Comparison {
        let mut result = ComparisonResult {
            is_in_sync: in_sync,
            ..Default::default()
        };
        let mut corrective_sql = CorrectiveSql::default();
        if !in_sync {
            result.missing_tables.push("orders".to_string());
            corrective_sql.statements.push(Statement {
                finding: "missing table orders".to_string(),
                sql: "CREATE TABLE `orders` (`id` int);".to_string(),
            });
        }
        Comparison {
            result,
            corrective_sql,
        }
    }

    #[test]
    fn test_exit_code_policy() {
        assert_eq!(exit_code(ExitPolicy::Always, &comparison(true)), 0);
        assert_eq!(exit_code(ExitPolicy::Always, &comparison(false)), 0);
        assert_eq!(exit_code(ExitPolicy::FailOnDrift, &comparison(true)), 0);
        assert_eq!(exit_code(ExitPolicy::FailOnDrift, &comparison(false)), 1);
    }

    #[test]
    fn test_sql_script() {
        let at = Timestamp::UNIX_EPOCH;
        insta::assert_snapshot!(sql_script(&comparison(false), at), @r"
        -- driftwatch 1970-01-01T00:00:00Z: corrective SQL for the target database.
        -- Review before applying. Nothing here has been executed.

        -- missing table orders
        CREATE TABLE `orders` (`id` int);
        ");
        assert_eq!(
            sql_script(&comparison(true), at),
            "-- driftwatch 1970-01-01T00:00:00Z: schemas are in sync, nothing to apply.\n"
        );
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "driftwatch-cli-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_compare_args() {
        let cli: Cli = facet_args::from_slice(&[
            "compare",
            "--fail-on-drift",
            "--sql-file",
            "drift.sql",
            "--summary-file=summary.md",
        ])
        .unwrap();

        assert_eq!(cli.command.parse::<Command>(), Ok(Command::Compare));
        assert_eq!(cli.env_file(), None);

        let args = cli.compare_args();
        assert!(args.fail_on_drift);
        assert!(!args.normalize_types);
        assert!(!args.json);
        assert_eq!(args.sql_file, Some(PathBuf::from("drift.sql")));
        assert_eq!(args.summary_file, Some(PathBuf::from("summary.md")));
        assert_eq!(args.comment_file, None);
    }

    #[test]
    fn test_parse_without_command() {
        let cli: Cli = facet_args::from_slice(&["-V"]).unwrap();
        assert!(cli.version);
        assert!(cli.command.is_empty());

        let cli: Cli = facet_args::from_slice(&["check-config", "--env-file", "ci.env"]).unwrap();
        assert_eq!(cli.command.parse::<Command>(), Ok(Command::CheckConfig));
        assert_eq!(cli.env_file(), Some("ci.env"));

        assert!("deploy".parse::<Command>().is_err());
        assert!(facet_args::from_slice::<Cli>(&["compare", "--no-such-flag"]).is_err());
    }

    #[test]
    fn test_write_documents_to_files() {
        let dir = scratch_dir("documents");
        let options = CompareArgs {
            summary_file: Some(dir.join("summary.md")),
            comment_file: Some(dir.join("comment.md")),
            ..Default::default()
        };
        let ci = CiPaths {
            output: None,
            step_summary: Some(dir.join("step-summary.md")),
        };

        write_documents("## Schema drift check\n", &options, &ci).unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.join("summary.md")).unwrap(),
            "## Schema drift check\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.join("comment.md")).unwrap(),
            "<!-- driftwatch -->\n## Schema drift check\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.join("step-summary.md")).unwrap(),
            "## Schema drift check\n"
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_outputs_survive_failed_document_write() {
        let dir = scratch_dir("unwritable-summary");
        let ci = CiPaths {
            output: Some(dir.join("output")),
            // A directory cannot be appended to.
            step_summary: Some(dir.clone()),
        };
        let config = Config::from_lookup(|key| match key {
            "DEV_DB_HOST" | "MAIN_DB_HOST" => Some("127.0.0.1".to_string()),
            "DEV_DB_USER" | "MAIN_DB_USER" => Some("ci".to_string()),
            "DEV_DB_PASSWORD" | "MAIN_DB_PASSWORD" => Some(String::new()),
            "DEV_DB_NAME" | "MAIN_DB_NAME" => Some("app".to_string()),
            _ => None,
        })
        .unwrap();

        let err = report_success(
            &config,
            &comparison(false),
            Timestamp::UNIX_EPOCH,
            &CompareArgs::default(),
            &ci,
        )
        .unwrap_err();

        assert!(matches!(err, CliError::Write { .. }), "{err}");
        let outputs = std::fs::read_to_string(dir.join("output")).unwrap();
        assert!(outputs.contains("missing_tables=1\n"), "{outputs}");
        assert!(outputs.ends_with("status=drift\n"), "{outputs}");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_env_file_failure_is_reported() {
        let dir = scratch_dir("missing-env-file");
        let options = CompareArgs {
            summary_file: Some(dir.join("summary.md")),
            ..Default::default()
        };
        let ci = CiPaths {
            output: Some(dir.join("output")),
            step_summary: None,
        };
        let env_file = dir.join("does-not-exist.env");

        let code = compare(env_file.to_str(), &options, &ci).await;

        assert_eq!(code, 1);
        let summary = std::fs::read_to_string(dir.join("summary.md")).unwrap();
        assert!(summary.contains("**Status:** comparison failed"), "{summary}");
        assert!(summary.contains("could not load env file"), "{summary}");
        let outputs = std::fs::read_to_string(dir.join("output")).unwrap();
        assert_eq!(outputs, "in_sync=false\nstatus=failed\n");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
