use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use isa_study_designer::app::{App, DesignSource, GenerateOptions};
use isa_study_designer::config::ConfigLoader;
use isa_study_designer::error::IsaError;
use isa_study_designer::fs_util::read_text;
use isa_study_designer::output::JsonOutput;

#[derive(Parser)]
#[command(name = "isa-design")]
#[command(about = "Materialize declarative study designs into ISA-JSON investigations")]
#[command(version, author)]
struct Cli {
    /// Study-creator configuration (YAML); defaults to the user config, then the embedded one.
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Generate an ISA-JSON investigation from a design document")]
    Generate(GenerateArgs),
    #[command(about = "Generate an ISA-JSON investigation from an external study configuration")]
    FromConfig(FromConfigArgs),
    #[command(about = "Print entity counts of a materialized design")]
    Summary(SummaryArgs),
    #[command(about = "Check that an ISA-JSON investigation round-trips unchanged")]
    Check(CheckArgs),
}

#[derive(Args)]
struct MaterializeArgs {
    #[arg(long)]
    uuids: bool,
    /// Ignore the quality-control policies declared on assay workflows.
    #[arg(long = "skip-qc")]
    skip_qc: bool,
    /// Date stamped on every process (YYYY-MM-DD); today when omitted.
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    out: Option<Utf8PathBuf>,
}

impl MaterializeArgs {
    fn options(&self) -> GenerateOptions {
        GenerateOptions {
            use_uuids: self.uuids,
            skip_quality_control: self.skip_qc,
            date: self.date.clone(),
        }
    }
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long)]
    design: Utf8PathBuf,
    #[command(flatten)]
    materialize: MaterializeArgs,
}

#[derive(Args)]
struct FromConfigArgs {
    #[arg(long = "config-json")]
    config_json: Utf8PathBuf,
    #[command(flatten)]
    materialize: MaterializeArgs,
}

#[derive(Args)]
struct SummaryArgs {
    #[arg(long)]
    design: Utf8PathBuf,
    #[arg(long = "skip-qc")]
    skip_qc: bool,
}

#[derive(Args)]
struct CheckArgs {
    #[arg(long)]
    investigation: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<IsaError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &IsaError) -> u8 {
    match error {
        IsaError::ConfigRead(_) | IsaError::Filesystem(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = App::new(ConfigLoader::resolve(cli.config.as_deref())?);

    match cli.command {
        Commands::Generate(args) => {
            run_generate(&app, DesignSource::Codec(args.design), &args.materialize)
        }
        Commands::FromConfig(args) => run_generate(
            &app,
            DesignSource::External(args.config_json),
            &args.materialize,
        ),
        Commands::Summary(args) => {
            let design = app.load_design(&DesignSource::Codec(args.design))?;
            let options = GenerateOptions {
                skip_quality_control: args.skip_qc,
                ..GenerateOptions::default()
            };
            let summary = app.summary(&design, &options)?;
            JsonOutput::print_summary(&summary).into_diagnostic()
        }
        Commands::Check(args) => {
            let result = app.check(&read_text(&args.investigation)?)?;
            JsonOutput::print_check(&result).into_diagnostic()
        }
    }
}

fn run_generate(app: &App, source: DesignSource, args: &MaterializeArgs) -> miette::Result<()> {
    let design = app.load_design(&source)?;
    let options = args.options();
    match &args.out {
        Some(out) => {
            let result = app.generate(&design, &options, out)?;
            JsonOutput::print_generate(&result).into_diagnostic()
        }
        None => {
            let investigation = app.materialize(&design, &options)?;
            JsonOutput::print_document(&investigation.to_json_string(None)?).into_diagnostic()
        }
    }
}
