//! chive binary: run built-in workflows or list stored checkpoints.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use chive_cli::{list_records, run_with_options, workflow_names, RunConfig, RunOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chive")]
#[command(about = "Run checkpointed pipelines, resuming from stored results")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run workflows; every output instance is reported
    Run {
        /// Built-in workflow to run (repeatable)
        #[arg(short, long = "workflow", value_name = "NAME")]
        workflows: Vec<String>,

        /// YAML config file (repeatable, applied in order)
        #[arg(short, long = "config", value_name = "FILE")]
        configs: Vec<PathBuf>,

        /// Recompute every checkpoint, ignoring stored records
        #[arg(long)]
        recompute: bool,

        /// Checkpoint root directory
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },
    /// List stored checkpoint records
    List {
        /// Checkpoint root directory
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },
    /// List built-in workflows
    Workflows,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("chive=warn,chive_cli=warn"),
        1 => EnvFilter::new("chive=info,chive_cli=info"),
        _ => EnvFilter::new("chive=debug,chive_cli=debug"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run {
            workflows,
            configs,
            recompute,
            root,
        } => {
            let options = RunOptions {
                root,
                recompute,
                config_files: configs,
                workflows,
                verbose: cli.verbose > 0,
            };
            match run_with_options(&options) {
                Ok(summary) => {
                    print!("{}", summary.render(options.verbose));
                    if summary.is_success() {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::FAILURE
                    }
                }
                Err(e) => {
                    eprintln!("error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Command::List { root } => {
            dotenv::dotenv().ok();
            let root = match root {
                Some(root) => root,
                None => match RunConfig::from_env() {
                    Ok(config) => config.root,
                    Err(e) => {
                        eprintln!("error: {}", e);
                        return ExitCode::FAILURE;
                    }
                },
            };
            match list_records(&root) {
                Ok(records) => {
                    for record in records {
                        println!("{}", record);
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Workflows => {
            for name in workflow_names() {
                println!("{}", name);
            }
            ExitCode::SUCCESS
        }
    }
}
