//! CLI tool for generating and validating STAC-like GeoParquet tables.

mod config;
mod error;
mod logging;

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use snafu::ResultExt;
use stac_table_core::{
    DateExtractor, FileRecord, build_items, read_table_at,
    records::{records_from_csv, records_from_json, records_from_paths},
    storage::{StorageLocation, read_all_bytes},
    validate, write_items,
};

use crate::{
    config::{GenerateArgs, GenerateConfig, InputSource},
    error::{
        CliResult, ParseInputSnafu, ReadInputSnafu, ReadTableSnafu, WriteOutputSnafu,
    },
    logging::{LogConfig, init_logging},
};

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a GeoParquet item table from asset files
    Generate(GenerateArgs),

    /// Check a GeoParquet item table against the item schema
    Validate {
        /// Parquet file to check
        file: PathBuf,
    },
}

#[derive(Debug, Parser)]
#[command(name = "stactable", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

async fn read_input(path: &Path) -> CliResult<Vec<u8>> {
    let (location, rel) = StorageLocation::for_file(path);
    read_all_bytes(&location, &rel)
        .await
        .context(ReadInputSnafu {
            path: path.display().to_string(),
        })
}

async fn load_records(input: &InputSource) -> CliResult<Vec<FileRecord>> {
    match input {
        InputSource::Paths(paths) => Ok(records_from_paths(paths.iter().cloned())),
        InputSource::Csv(path) => {
            let bytes = read_input(path).await?;
            records_from_csv(&bytes).context(ParseInputSnafu {
                path: path.display().to_string(),
            })
        }
        InputSource::Json(path) => {
            let bytes = read_input(path).await?;
            records_from_json(&bytes).context(ParseInputSnafu {
                path: path.display().to_string(),
            })
        }
    }
}

async fn cmd_generate(args: GenerateArgs) -> CliResult<()> {
    // Reject bad invocations before touching the filesystem.
    let config = GenerateConfig::resolve(args)?;

    let records = load_records(&config.input).await?;
    if records.is_empty() {
        tracing::warn!("input has no records; writing an empty table");
    }

    let items = build_items(&records, &config.build_options(), &DateExtractor::system());

    let (location, rel) = StorageLocation::for_file(&config.output);
    write_items(&location, &rel, &items)
        .await
        .context(WriteOutputSnafu {
            path: config.output.display().to_string(),
        })?;

    println!("GeoParquet written to {}", config.output.display());
    Ok(())
}

async fn cmd_validate(file: &Path) -> CliResult<()> {
    let (location, rel) = StorageLocation::for_file(file);
    let table = read_table_at(&location, &rel)
        .await
        .context(ReadTableSnafu {
            path: file.display().to_string(),
        })?;

    let report = validate(&table);
    println!("{report}");
    Ok(())
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args).await,
        Command::Validate { file } => cmd_validate(&file).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose));

    if let Err(e) = run(cli).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
