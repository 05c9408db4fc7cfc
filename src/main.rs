use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use civic_i18n::pipeline::{init_default_config, Pipeline, PipelineConfig, ScanOptions};
use civic_i18n::progress::ConsoleProgress;

#[derive(Parser, Debug)]
#[command(name = "civic-i18n")]
#[command(about = "Keeps a static site's en/fil/ilo translation table in step with its HTML", long_about = None)]
struct Args {
    /// Config file path (default: $CIVIC_I18N_CONFIG, then civic-i18n.toml upwards)
    #[arg(long, global = true, value_name = "TOML")]
    config: Option<PathBuf>,

    /// Site root (overrides `paths.root` from the config)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// No progress lines on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mark untagged text elements, add rows for new keys and translate them
    Scan {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Add new rows with the English text in every column
        #[arg(long)]
        no_translate: bool,
    },
    /// Fill fil/ilo cells that still hold the English text
    Translate,
    /// Re-translate cells that still read mostly as English
    Repair,
    /// Add rows for marker keys found in pages but missing from the table
    SyncMissing {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Check key parity and report translation coverage
    Verify,
    /// Write a default civic-i18n.toml and lexicon.toml, then exit
    InitConfig {
        /// Target directory (default: current directory)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet);

    if let Command::InitConfig { dir, force } = &args.command {
        let dir = dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, *force).context("init default config")?;
        println!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let cfg = PipelineConfig::from_args(args.config.clone(), args.root.clone())?;
    let pipeline = Pipeline::new(cfg, progress)?;

    match args.command {
        Command::Scan {
            dry_run,
            no_translate,
        } => {
            let report = pipeline.scan(ScanOptions {
                dry_run,
                translate: !no_translate,
            })?;
            println!("{report}");
        }
        Command::Translate => println!("{}", pipeline.translate()?),
        Command::Repair => println!("{}", pipeline.repair()?),
        Command::SyncMissing { dry_run } => println!("{}", pipeline.sync_missing(dry_run)?),
        Command::Verify => {
            let report = pipeline.verify()?;
            println!("{report}");
            report.check()?;
        }
        Command::InitConfig { .. } => {}
    }
    Ok(())
}
