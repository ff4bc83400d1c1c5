use clap::Parser;
use std::process::ExitCode;
use ticket_processor::args::{Args, Command};
use ticket_processor::{commands, Config, Mode, Result};
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e.notice());
            debug!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().tickets_home().path();

    // This allows for running the program without the classification service. When
    // TICKETS_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Http.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.url()).await?.print(),

        Command::Upload(upload_args) => {
            let config = load_config(&args).await?;
            commands::upload(config, mode, upload_args).await?.print()
        }

        Command::Show => commands::show(load_config(&args).await?).await?.print(),

        Command::Export(export_args) => {
            let config = load_config(&args).await?;
            commands::export(config, export_args).await?.print()
        }

        Command::Categories(categories_args) => {
            let config = load_config(&args).await?;
            commands::categories(config, mode, categories_args.action())
                .await?
                .print()
        }
    };
    Ok(())
}

/// Loads the config from the tickets home and applies `--api-base-url` if it was given.
async fn load_config(args: &Args) -> Result<Config> {
    let config = Config::load(args.common().tickets_home().path()).await?;
    match args.common().api_base_url() {
        Some(url) => {
            debug!("Overriding the API base URL with {url}");
            config.with_api_base_url(url)
        }
        None => Ok(config),
    }
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
