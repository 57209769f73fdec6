use std::process::ExitCode;

use reflect::{
    GitHub, OutputDir, ReflectError, StdinConfirm, debug_from_env, display::write_run_summary,
    parse_args, prepare_llm, run,
};
use tracing::debug;

fn handle_clap_help_version(clap_err: &clap::Error) -> ! {
    use clap::error::ErrorKind;
    match clap_err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{clap_err}");
            std::process::exit(0);
        }
        _ => {
            eprint!("{clap_err}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn try_main() -> anyhow::Result<()> {
    // Loaded before argument parsing so DEBUG=1 in .env takes effect.
    let dotenv = dotenvy::dotenv();

    let mut config = match parse_args(std::env::args()) {
        Ok(config) => config,
        Err(err) => {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                handle_clap_help_version(clap_err);
            }
            return Err(err);
        }
    };
    config.debug |= debug_from_env();

    init_tracing(config.debug);
    match dotenv {
        Ok(path) => debug!("loaded environment from {}", path.display()),
        Err(err) => debug!("no .env file loaded: {err}"),
    }

    let llm_client = prepare_llm(&config)?;
    let github = GitHub::from_env()?;

    let outcome = run(
        &config,
        &github,
        llm_client.as_deref(),
        &OutputDir::default(),
        &StdinConfirm,
    )
    .await?;

    write_run_summary(
        &config.username,
        &outcome.contributions,
        &config.date_range,
        &outcome.written,
        &mut std::io::stdout(),
    )?;

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if err
                .downcast_ref::<ReflectError>()
                .is_some_and(ReflectError::is_configuration)
            {
                eprintln!("Run 'reflect --help' for usage.");
            }
            ExitCode::FAILURE
        }
    }
}
