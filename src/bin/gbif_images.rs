use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use gbif_image_harvester::app::{App, LogSink};
use gbif_image_harvester::config::{ConfigLoader, HarvestConfig};
use gbif_image_harvester::domain::{RecordType, ResultLimit, SpeciesName};
use gbif_image_harvester::error::HarvestError;
use gbif_image_harvester::gbif::GbifHttpClient;
use gbif_image_harvester::images::ImageHttpClient;
use gbif_image_harvester::output::JsonOutput;

#[derive(Parser)]
#[command(name = "gbif-images")]
#[command(about = "Collect licensed occurrence images for species from GBIF")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Extract image metadata without downloading images")]
    Info(HarvestArgs),
    #[command(about = "Extract image metadata and download the images")]
    Download(HarvestArgs),
}

#[derive(Args)]
struct HarvestArgs {
    /// Species names; overrides the config file.
    species: Vec<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    limit: Option<u32>,

    /// Include occurrences without images in the search.
    #[arg(long)]
    all_media: bool,

    #[arg(long)]
    record_type: Option<RecordType>,

    #[arg(long)]
    save_dir: Option<Utf8PathBuf>,

    #[arg(long)]
    img_num_per_record: Option<usize>,

    /// Write the JSON result here instead of stdout.
    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<HarvestError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &HarvestError) -> u8 {
    match error {
        HarvestError::TaxonNotFound(_)
        | HarvestError::NoImageRecords { .. }
        | HarvestError::MissingConfig
        | HarvestError::ConfigRead(_)
        | HarvestError::ConfigParse(_)
        | HarvestError::InvalidConfig(_) => 2,
        HarvestError::GbifHttp(_)
        | HarvestError::GbifStatus { .. }
        | HarvestError::GbifPayload(_)
        | HarvestError::ImageHttp(_)
        | HarvestError::ImageStatus { .. } => 3,
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
    match cli.command {
        Commands::Info(args) => {
            let output = args.output.clone();
            let mut app = build_app(resolve_config(args)?)?;
            let table = app.get_occurrence_info(&LogSink)?;
            match output {
                Some(path) => Ok(JsonOutput::write_to_file(&table, &path)?),
                None => JsonOutput::print_table(&table).into_diagnostic(),
            }
        }
        Commands::Download(args) => {
            let output = args.output.clone();
            let mut app = build_app(resolve_config(args)?)?;
            let report = app.download_images(&LogSink)?;
            match output {
                Some(path) => Ok(JsonOutput::write_to_file(&report, &path)?),
                None => JsonOutput::print_report(&report).into_diagnostic(),
            }
        }
    }
}

fn build_app(config: HarvestConfig) -> miette::Result<App<GbifHttpClient, ImageHttpClient>> {
    let gbif = GbifHttpClient::new(&config.api_base)?;
    let images = ImageHttpClient::new()?;
    Ok(App::new(config, gbif, images)?)
}

fn resolve_config(args: HarvestArgs) -> miette::Result<HarvestConfig> {
    let mut config = if args.species.is_empty() {
        ConfigLoader::resolve(args.config.as_deref())?
    } else {
        let species = args
            .species
            .iter()
            .map(|value| value.parse::<SpeciesName>())
            .collect::<Result<Vec<_>, HarvestError>>()?;
        match args.config.as_deref() {
            Some(path) => HarvestConfig {
                species,
                ..ConfigLoader::resolve(Some(path))?
            },
            None => HarvestConfig::new(species),
        }
    };

    if args.limit.is_some() {
        config.limit = ResultLimit::from_option(args.limit);
    }
    if args.all_media {
        config.get_image_info = false;
    }
    if args.record_type.is_some() {
        config.record_type = args.record_type;
    }
    if args.save_dir.is_some() {
        config.save_dir = args.save_dir;
    }
    if let Some(count) = args.img_num_per_record {
        config.img_num_per_record = count;
    }
    config.validate()?;
    Ok(config)
}
