//! reshape CLI - run YAML record pipelines over NDJSON input
//!
//! Reads one JSON object per line, applies a pipeline built from a YAML
//! definition, and writes the transformed records.

use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use reshape::pipeline::TestResult;
use reshape::{run_records, ConverterRegistry, PipelineDef, RecordWriter};

#[derive(Parser)]
#[command(name = "reshape")]
#[command(version, about = "Composable record transforms driven by YAML pipelines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a pipeline to NDJSON records
    Apply {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,

        /// NDJSON input file (defaults to stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Ndjson)]
        format: OutputFormat,

        /// Log and skip records that fail instead of stopping
        #[arg(short, long)]
        keep_going: bool,
    },

    /// Build a pipeline and run its embedded tests
    Validate {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,
    },

    /// List the builtin converters
    Converters,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Ndjson,
    Json,
}

fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apply {
            pipeline,
            input,
            output,
            format,
            keep_going,
        } => apply(&pipeline, input.as_deref(), output.as_deref(), format, keep_going),
        Commands::Validate { pipeline } => validate(&pipeline),
        Commands::Converters => {
            for name in ConverterRegistry::with_builtins().converter_names() {
                println!("{}", name);
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn apply(
    pipeline_path: &Path,
    input: Option<&Path>,
    output: Option<&Path>,
    format: OutputFormat,
    keep_going: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = PipelineDef::load_from_file(pipeline_path)?;
    let transform = pipeline.build(&ConverterRegistry::with_builtins())?;

    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    let format = match format {
        OutputFormat::Ndjson => reshape::OutputFormat::Ndjson,
        OutputFormat::Json => reshape::OutputFormat::JsonArray,
    };

    let summary = run_records(reader, &transform, RecordWriter::new(sink, format), keep_going)?;

    tracing::info!(
        "Pipeline '{}': wrote {} records, skipped {}",
        pipeline.name,
        summary.written,
        summary.skipped
    );
    Ok(())
}

fn validate(pipeline_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = PipelineDef::load_from_file(pipeline_path)?;
    let transform = pipeline.build(&ConverterRegistry::with_builtins())?;

    println!("✓ Pipeline '{}' builds ({} steps)", pipeline.name, transform.step_count());

    let outcomes = pipeline.run_tests(&transform);
    let mut failures = 0;
    for outcome in &outcomes {
        match &outcome.result {
            TestResult::Passed => println!("  ✓ {}", outcome.name),
            TestResult::Mismatch { actual } => {
                failures += 1;
                println!("  ✗ {}: unexpected output {}", outcome.name, actual);
            }
            TestResult::Failed(msg) => {
                failures += 1;
                println!("  ✗ {}: {}", outcome.name, msg);
            }
        }
    }

    if failures > 0 {
        return Err(format!("{} of {} tests failed", failures, outcomes.len()).into());
    }
    tracing::info!("{} tests passed", outcomes.len());
    Ok(())
}
