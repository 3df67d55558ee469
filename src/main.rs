use clap::{Parser, ValueEnum};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, Level};
use tracing_subscriber::EnvFilter;

use course_mark::{
    build::{render::JsonRenderer, BuildOutput, CourseBuilder},
    config::Config,
    error::Result,
};

/// Validate a tree of Markdown courses and assemble its course graph.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Root directory of the content tree
    #[arg(value_hint = clap::ValueHint::DirPath)]
    root: PathBuf,

    /// Treat warnings as errors
    #[arg(long)]
    strict: bool,

    /// Config file to use instead of <ROOT>/course.toml
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// How the report is printed
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Also write the course graph as JSON to this file
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Human readable report on stderr
    Text,
    /// Report and course graph as JSON on stdout
    Json,
}

const EXIT_ERRORS: u8 = 1;
const EXIT_USAGE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if !cli.root.is_dir() {
        error!("{} is not a directory", cli.root.display());
        return ExitCode::from(EXIT_USAGE);
    }

    let builder = match load(&cli) {
        Ok(builder) => builder,
        Err(error) => {
            error!("{error:#}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    match builder.build().and_then(|output| print(&output, cli.format).map(|_| output)) {
        Ok(output) if output.report.has_errors() => ExitCode::from(EXIT_ERRORS),
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error:#}");
            ExitCode::from(EXIT_ERRORS)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(cli: &Cli) -> Result<CourseBuilder> {
    let mut builder = match &cli.config {
        Some(path) => CourseBuilder::load_with_config(&cli.root, Config::load(path)?),
        None => CourseBuilder::load(&cli.root)?,
    };

    builder.strict(cli.strict);

    if let Some(output) = &cli.output {
        builder.with_renderer(JsonRenderer::new(output));
    }

    Ok(builder)
}

fn print(output: &BuildOutput, format: Format) -> Result<()> {
    match format {
        Format::Text => eprintln!("{}", output.report),
        Format::Json => println!("{}", serde_json::to_string_pretty(output)?),
    }

    Ok(())
}
