use std::io::{Read as _, Write as _};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use moztest_suite::{
    get_suite, MozillaTestSuite, ProcessOutput, Provisioned, RunContext, SuiteError, TestId,
    TestSuite,
};
use serde::Serialize;

const SUITE_NAME: &str = "mozilla";

#[derive(Debug, Parser)]
#[command(name = "moztest")]
#[command(about = "Mozilla JavaScript test corpus adapter.", long_about = None)]
struct Cli {
    /// Suite root holding `data/`, the version marker and snapshots.
    #[arg(long, global = true, env = "MOZTEST_ROOT")]
    root: Option<PathBuf>,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Make sure the corpus on disk matches the configured version.
    Fetch,
    Status,
    List,
    Flags(FlagsArgs),
    Source { test: String },
    Classify(ClassifyArgs),
}

#[derive(Debug, Args)]
struct FlagsArgs {
    test: String,

    #[arg(long = "mode-flag", allow_hyphen_values = true)]
    mode_flags: Vec<String>,

    #[arg(long = "test-flag", allow_hyphen_values = true)]
    test_flags: Vec<String>,
}

#[derive(Debug, Args)]
struct ClassifyArgs {
    test: String,

    #[arg(long, allow_negative_numbers = true)]
    exit_code: i32,

    /// File holding the captured stdout; standard input when omitted.
    #[arg(long)]
    stdout: Option<PathBuf>,
}

fn main() -> std::process::ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<std::process::ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("current_dir")?,
    };
    let suite = get_suite(SUITE_NAME, &root)
        .with_context(|| format!("load suite at {}", root.display()))?;

    match cli.cmd {
        Command::Fetch => cmd_fetch(&suite, cli.json),
        Command::Status => cmd_status(&suite, cli.json),
        Command::List => cmd_list(&suite, cli.json),
        Command::Flags(args) => cmd_flags(&suite, args, cli.json),
        Command::Source { test } => cmd_source(&suite, &test),
        Command::Classify(args) => cmd_classify(&suite, args, cli.json),
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .try_init();
}

#[derive(Debug, Serialize)]
struct FetchReport<'a> {
    version: &'a str,
    result: Provisioned,
}

fn cmd_fetch(suite: &MozillaTestSuite, json: bool) -> Result<std::process::ExitCode> {
    let result = suite.download_data()?;
    let version = suite.config().version.as_str();
    if json {
        write_json_stdout(&FetchReport { version, result })?;
    } else {
        let what = match result {
            Provisioned::UpToDate => "already up to date",
            Provisioned::Restored => "restored from local snapshot",
            Provisioned::CheckedOut => "checked out and snapshotted",
        };
        println!("corpus r{version}: {what}");
    }
    Ok(std::process::ExitCode::SUCCESS)
}

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    root: String,
    version: &'a str,
    checked_out_version: Option<String>,
    up_to_date: bool,
}

fn cmd_status(suite: &MozillaTestSuite, json: bool) -> Result<std::process::ExitCode> {
    let version = suite.config().version.as_str();
    let checked_out_version = suite.checked_out_version()?;
    let up_to_date = checked_out_version.as_deref() == Some(version);
    if json {
        write_json_stdout(&StatusReport {
            root: suite.root().display().to_string(),
            version,
            checked_out_version,
            up_to_date,
        })?;
    } else {
        println!("target version: {version}");
        println!(
            "checked out:    {}",
            checked_out_version.as_deref().unwrap_or("(none)")
        );
        println!("up to date:     {}", if up_to_date { "yes" } else { "no" });
    }
    Ok(std::process::ExitCode::SUCCESS)
}

fn cmd_list(suite: &MozillaTestSuite, json: bool) -> Result<std::process::ExitCode> {
    let tests = suite.list_tests()?;
    if json {
        let ids: Vec<&TestId> = tests.iter().map(|t| t.path()).collect();
        write_json_stdout(&ids)?;
    } else {
        let mut out = std::io::stdout().lock();
        for t in &tests {
            writeln!(out, "{}", t.path()).context("write stdout")?;
        }
    }
    Ok(std::process::ExitCode::SUCCESS)
}

fn cmd_flags(
    suite: &MozillaTestSuite,
    args: FlagsArgs,
    json: bool,
) -> Result<std::process::ExitCode> {
    let case = suite
        .test_case(TestId::parse(&args.test)?)
        .with_flags(args.test_flags);
    let flags = suite.flags_for_test_case(&case, &RunContext::new(args.mode_flags));
    if json {
        write_json_stdout(&flags)?;
    } else {
        let mut out = std::io::stdout().lock();
        for flag in &flags {
            writeln!(out, "{flag}").context("write stdout")?;
        }
    }
    Ok(std::process::ExitCode::SUCCESS)
}

fn cmd_source(suite: &MozillaTestSuite, test: &str) -> Result<std::process::ExitCode> {
    let case = suite.test_case(TestId::parse(test)?);
    let text = match suite.source_for_test(&case) {
        Ok(text) => text,
        Err(err @ SuiteError::NotFound { .. }) => {
            return Err(err).context("hint: run `moztest fetch` to provision the corpus");
        }
        Err(err) => return Err(err.into()),
    };
    std::io::stdout()
        .write_all(text.as_bytes())
        .context("write stdout")?;
    Ok(std::process::ExitCode::SUCCESS)
}

#[derive(Debug, Serialize)]
struct ClassifyReport<'a> {
    test: &'a TestId,
    failure: bool,
    negative: bool,
}

fn cmd_classify(
    suite: &MozillaTestSuite,
    args: ClassifyArgs,
    json: bool,
) -> Result<std::process::ExitCode> {
    let stdout = match &args.stdout {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read stdin")?;
            buf
        }
    };
    let case = suite.test_case(TestId::parse(&args.test)?);
    let output = ProcessOutput::new(args.exit_code, stdout);
    let failure = suite.is_failure_output(&output, &case);
    let negative = suite.is_negative_test(&case);
    if json {
        write_json_stdout(&ClassifyReport {
            test: case.path(),
            failure,
            negative,
        })?;
    } else {
        let verdict = if failure { "FAIL" } else { "PASS" };
        let note = if negative { " (negative test)" } else { "" };
        println!("{}: {verdict}{note}", case.path());
    }
    Ok(std::process::ExitCode::SUCCESS)
}

fn write_json_stdout<T: Serialize>(v: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec(v)?;
    bytes.push(b'\n');
    std::io::stdout()
        .write_all(&bytes)
        .context("write stdout")?;
    Ok(())
}
