use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use endpoint_replay::cli::{self, Cli, Command, OutputFormat, RunArgs};
use endpoint_replay::corpus::Corpus;
use endpoint_replay::import_export::import_postman_file;
use endpoint_replay::runner::{RunOptions, replay};
use endpoint_replay::storage::{list_runs, open_db, record_run, write_json};
use endpoint_replay::{ReplayError, Result};

const EXIT_FAILED_CASES: u8 = 1;
const EXIT_INVALID_INPUT: u8 = 2;
const EXIT_IO: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    cli::init_tracing(cli.log_format);

    match dispatch(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn exit_code(err: &ReplayError) -> u8 {
    match err {
        ReplayError::Io { .. } | ReplayError::Sqlite(_) => EXIT_IO,
        ReplayError::Json(_)
        | ReplayError::Toml(_)
        | ReplayError::InvalidCorpus(_)
        | ReplayError::InvalidConfig(_)
        | ReplayError::Http(_) => EXIT_INVALID_INPUT,
    }
}

async fn dispatch(command: Command) -> Result<ExitCode> {
    match command {
        Command::Run(args) => run(args).await,
        Command::Summary { corpus } => {
            let corpus = Corpus::load(&corpus)?;
            let counts = corpus.category_counts();
            let total: usize = counts.values().sum();
            for (category, count) in &counts {
                println!("{category:<16} {count:>5}");
            }
            println!("{:<16} {total:>5}", "total");
            Ok(ExitCode::SUCCESS)
        }
        Command::Import { postman, out } => {
            let corpus = import_postman_file(&postman)?;
            write_json(&out, &corpus)?;
            println!(
                "Imported {} endpoints in {} categories into {}",
                corpus.summary.total_endpoints,
                corpus.categories.len(),
                out.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::History { db, limit } => {
            let conn = open_db(&db)?;
            print!("{}", cli::render_history(&list_runs(&conn, limit)?));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let config = args.resolve_config()?;
    let corpus = Corpus::load(&args.corpus)?;
    let options = RunOptions {
        categories: args.categories.clone(),
    };

    let report = replay(&corpus, config, &options).await?;

    if let Some(path) = &args.report {
        write_json(path, &report)?;
    }
    if let Some(path) = &args.history_db {
        let conn = open_db(path)?;
        record_run(&conn, &args.corpus.display().to_string(), &report)?;
    }

    match args.output {
        OutputFormat::Text => print!("{}", cli::render_report(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if report.passed_overall() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_FAILED_CASES))
    }
}
