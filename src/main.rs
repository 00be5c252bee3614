use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use dtsyntax::check::{check_files, check_text, collect_files, FileReport, DEFAULT_GLOB};
use dtsyntax::output;
use dtsyntax::query::{apply_all_fixes, format_flow_report, tokenize, Severity};
use dtsyntax::session::AnalysisSession;
use dtsyntax::utils::AnalyzerConfig;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use termcolor::{ColorChoice, StandardStream};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dtsyntax")]
#[command(version, about = "Analyze, validate and fix boolean/proximity search queries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (defaults to config.json in the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// When to use colours
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl From<ColorMode> for ColorChoice {
    fn from(mode: ColorMode) -> Self {
        match mode {
            ColorMode::Auto => ColorChoice::Auto,
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate query files; exits with status 1 when any error is found
    Check {
        /// Files or directories to check (`-` or nothing reads stdin)
        paths: Vec<PathBuf>,

        /// File name pattern used when walking directories
        #[arg(long, default_value = DEFAULT_GLOB)]
        glob: String,

        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the tokens of a query
    Tokens {
        /// Query text (`-` reads stdin)
        query: String,
    },
    /// Show the query tree, one root per line
    Tree {
        /// Query text (`-` reads stdin)
        query: String,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the conceptual evaluation order
    Flow {
        /// Query text (`-` reads stdin)
        query: String,
    },
    /// Suggest fixes, or apply all of them
    Fix {
        /// Query text (`-` reads stdin)
        query: String,

        /// Print the query with every fix applied
        #[arg(long)]
        apply: bool,
    },
    /// Expand OR groups into separate queries
    Split {
        /// Query text (`-` reads stdin)
        query: String,
    },
    /// Normalize operator and word case
    Cleanup {
        /// Query text (`-` reads stdin)
        query: String,
    },
    /// Print the query with syntax colours
    Highlight {
        /// Query text (`-` reads stdin)
        query: String,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dtsyntax={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<AnalyzerConfig> {
    match path {
        Some(path) => AnalyzerConfig::load_from(path),
        None => AnalyzerConfig::load(),
    }
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read stdin")?;
    Ok(text)
}

/// `-` stands for stdin
fn read_query(query: String) -> Result<String> {
    if query == "-" {
        read_stdin()
    } else {
        Ok(query)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!("dtsyntax v{} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_ref())?;
    let session = AnalysisSession::new(config);
    let mut stdout = StandardStream::stdout(cli.color.into());

    match cli.command {
        Commands::Check { paths, glob, json } => {
            return run_check(&session, &mut stdout, paths, &glob, json);
        }
        Commands::Tokens { query } => {
            let query = read_query(query)?;
            output::print_tokens(&mut stdout, &tokenize(&query, 0))?;
        }
        Commands::Tree { query, json } => {
            let query = read_query(query)?;
            let trees = session.analyze(&query).trees;
            if json {
                let rendered = serde_json::to_string_pretty(&trees)
                    .context("Failed to serialize query tree")?;
                writeln!(stdout, "{}", rendered)?;
            } else {
                output::print_tree(&mut stdout, &trees)?;
            }
        }
        Commands::Flow { query } => {
            let query = read_query(query)?;
            write!(stdout, "{}", format_flow_report(&session.flow(&query)))?;
        }
        Commands::Fix { query, apply } => {
            let query = read_query(query)?;
            let fixes = session.analyze(&query).fixes;
            if apply {
                writeln!(stdout, "{}", apply_all_fixes(&query, &fixes))?;
            } else if fixes.is_empty() {
                writeln!(stdout, "No fixes suggested")?;
            } else {
                output::print_fixes(&mut stdout, &query, &fixes)?;
            }
        }
        Commands::Split { query } => {
            let query = read_query(query)?;
            for expanded in session.split(&query) {
                writeln!(stdout, "{}", expanded)?;
            }
        }
        Commands::Cleanup { query } => {
            let query = read_query(query)?;
            let report = session.cleanup(&query);
            writeln!(stdout, "{}", report.text)?;
            eprintln!("{}", report.message());
        }
        Commands::Highlight { query } => {
            let query = read_query(query)?;
            output::print_highlighted(&mut stdout, &query, &session.highlight(&query))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_check(
    session: &AnalysisSession,
    stdout: &mut StandardStream,
    paths: Vec<PathBuf>,
    glob: &str,
    json: bool,
) -> Result<ExitCode> {
    let reads_stdin = paths.is_empty() || paths.iter().any(|p| p.as_os_str() == "-");
    let files: Vec<PathBuf> = paths.into_iter().filter(|p| p.as_os_str() != "-").collect();

    let mut reports: Vec<FileReport> = Vec::new();
    if reads_stdin {
        reports.push(check_text(session, "<stdin>", read_stdin()?));
    }
    reports.extend(check_files(session, &collect_files(&files, glob)?)?);

    let errors: usize = reports.iter().map(|r| r.count(Severity::Error)).sum();
    if json {
        let rendered = serde_json::to_string_pretty(&reports)
            .context("Failed to serialize diagnostics")?;
        writeln!(stdout, "{}", rendered)?;
    } else {
        for report in &reports {
            output::print_diagnostics(stdout, Some(&report.path), &report.text, &report.diagnostics)?;
        }
        let warnings = reports.iter().map(|r| r.count(Severity::Warning)).sum();
        let infos = reports.iter().map(|r| r.count(Severity::Info)).sum();
        output::print_summary(stdout, reports.len(), errors, warnings, infos)?;
    }

    Ok(if errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
