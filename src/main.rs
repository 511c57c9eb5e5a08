use chrono::Local;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use fare_watcher::cli::Cli;
use fare_watcher::config::{AppConfig, ProcessEnv};
use fare_watcher::plugins::NotifierPlugin;
use fare_watcher::plugins::notifiers::{EmailNotifier, LogNotifier};
use fare_watcher::plugins::trackers::FareParser;
use fare_watcher::scraper::ChromeLauncher;
use fare_watcher::{AppError, Pipeline, RunReport};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Held until exit so buffered file output is flushed
    let _log_guard = match init_tracing(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialise logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting Fare Watcher...");

    match run(&cli).await {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("Failed to serialise run report: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            }
            info!("Flight price check complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(cli: &Cli) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("fare_watcher={}", level).parse()?);

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match &cli.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "fare-watcher.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

async fn run(cli: &Cli) -> Result<RunReport, AppError> {
    let env_source = ProcessEnv::from_dotenv(&cli.env_file);
    let mut config = AppConfig::load(&cli.config, &env_source, Local::now().date_naive())?;
    if cli.headed {
        config.browser.headless = false;
    }

    let parser = FareParser::new(&config.currency_symbol);
    let notifier: Box<dyn NotifierPlugin> = if cli.dry_run {
        Box::new(LogNotifier)
    } else {
        Box::new(EmailNotifier::new(config.target.clone(), config.smtp.clone()))
    };

    let pipeline = Pipeline::new(
        &config,
        &ChromeLauncher,
        &parser,
        notifier.as_ref(),
        cli.run_options(),
    );
    pipeline.run().await
}
