//! Command-line front end.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use excelflow_io_table::{derive_default_choices, parse_column_choices};
use excelflow_io_xlsx::{EnumOutputMode, read_sheet_names};

use crate::config::{SpecExcelflowConfig, load_config};
use crate::error::SaveError;
use crate::save::{SpecSaveRequest, load_table, save_selected_columns};

#[derive(Debug, Parser)]
#[command(name = "excelflow")]
#[command(version)]
#[command(about = "Save selected, reordered columns of a table as a new Excel sheet", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML config file (default: ./excelflow.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level, overriding the config file.
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the columns of an input file and preview its first rows.
    Columns(ColumnsArgs),
    /// List the sheets of a workbook.
    Sheets(SheetsArgs),
    /// Save selected columns of an input file as a new sheet.
    Save(SaveArgs),
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    pub input: PathBuf,

    /// Number of rows to preview.
    #[arg(long, default_value_t = 5)]
    pub preview: usize,
}

#[derive(Debug, Args)]
pub struct SheetsArgs {
    pub workbook: PathBuf,
}

#[derive(Debug, Args)]
pub struct SaveArgs {
    pub input: PathBuf,

    /// `C=1,A=2` or `C,A`; all columns in input order when omitted.
    #[arg(long)]
    pub columns: Option<String>,

    /// Destination workbook (default from config).
    #[arg(long)]
    pub workbook: Option<PathBuf>,

    /// `new` or `append` (default from config).
    #[arg(long, value_parser = parse_output_mode)]
    pub mode: Option<EnumOutputMode>,

    /// Requested sheet name; blank for auto-generated.
    #[arg(long)]
    pub sheet: Option<String>,
}

fn parse_output_mode(text: &str) -> Result<EnumOutputMode, String> {
    text.parse()
}

/// Run one parsed command against a loaded configuration.
pub fn run(command: Command, cfg: &SpecExcelflowConfig) -> anyhow::Result<()> {
    match command {
        Command::Columns(args) => run_columns(args),
        Command::Sheets(args) => run_sheets(args),
        Command::Save(args) => run_save(args, cfg),
    }
}

fn run_columns(args: ColumnsArgs) -> anyhow::Result<()> {
    let df = load_table(&args.input)?;
    for (n_idx, name) in df.get_column_names_str().into_iter().enumerate() {
        println!("{}\t{name}", n_idx + 1);
    }
    if args.preview > 0 {
        println!("{}", df.head(Some(args.preview)));
    }
    Ok(())
}

fn run_sheets(args: SheetsArgs) -> anyhow::Result<()> {
    let l_names = read_sheet_names(&args.workbook)
        .with_context(|| format!("listing sheets of {}", args.workbook.display()))?;
    for name in l_names {
        println!("{name}");
    }
    Ok(())
}

fn run_save(args: SaveArgs, cfg: &SpecExcelflowConfig) -> anyhow::Result<()> {
    let df = load_table(&args.input)?;
    let choices = match &args.columns {
        Some(text) => parse_column_choices(text).map_err(SaveError::from)?,
        None => {
            let l_names: Vec<String> = df
                .get_column_names_str()
                .into_iter()
                .map(ToString::to_string)
                .collect();
            derive_default_choices(&l_names)
        }
    };

    let request = SpecSaveRequest {
        workbook_path: args
            .workbook
            .unwrap_or_else(|| cfg.default_workbook.clone()),
        mode: match args.mode {
            Some(mode) => mode,
            None => cfg.output_mode()?,
        },
        sheet_name_requested: args.sheet,
    };

    let report = save_selected_columns(&df, &choices, &request)?;
    println!("Data saved to sheet '{}'", report.sheet_name);
    Ok(())
}

/// Load the config named on the command line.
pub fn load_cli_config(cli: &Cli) -> anyhow::Result<SpecExcelflowConfig> {
    Ok(load_config(cli.config.as_deref())?)
}
