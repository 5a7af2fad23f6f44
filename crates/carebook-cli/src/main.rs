//! carebook CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use carebook_api::SchedulingApi;
use carebook_cli::cli::{Cli, Command, ConfigAction};
use carebook_cli::commands;
use carebook_cli::config::{ClientConfig, Overrides};
use carebook_cli::error::{ClientError, ClientResult};
use carebook_core::{LogConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = if cli.config.is_some() {
        ClientConfig::load_from(&config_path).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().map_err(ClientError::Config)?
    };

    let log_format = config.log_format().map_err(ClientError::Config)?;
    init_tracing(LogConfig::from_debug_flag(cli.debug || config.debug).with_format(log_format))?;

    let overrides = Overrides {
        api_url: cli.api_url.clone(),
        token: cli.token.clone(),
    };

    let command = match cli.command {
        Command::Config { action } => {
            return match action {
                ConfigAction::Dump => commands::config::dump(&config, &config_path),
                ConfigAction::Validate => commands::config::validate(&config, &overrides),
                ConfigAction::Path => commands::config::path(&config_path),
            };
        }
        command => command,
    };

    let api = commands::connect(&config, &overrides)?;
    let session_config = config.to_session_config();

    match command {
        Command::Doctors {
            search,
            location,
            all,
        } => commands::doctors::run(api.as_ref(), search, location, all, cli.json).await,
        Command::Calendar { target, month } => {
            let user = signed_in(api.as_ref()).await?;
            commands::calendar::run(api, user, &target, month, &session_config, cli.json).await
        }
        Command::Times { target, date } => {
            let user = signed_in(api.as_ref()).await?;
            commands::times::run(api, user, &target, date, &session_config, cli.json).await
        }
        Command::Book {
            target,
            slot,
            phone,
        } => {
            let user = signed_in(api.as_ref()).await?;
            let phone = phone.or_else(|| config.booking.phone.clone());
            commands::book::run_book(
                api,
                user,
                &target,
                &slot,
                phone.as_deref(),
                &session_config,
                cli.json,
            )
            .await
        }
        Command::Reschedule {
            appointment,
            target,
            current_date,
            slot,
        } => {
            let user = signed_in(api.as_ref()).await?;
            commands::book::run_reschedule(
                api,
                user,
                &appointment,
                &target,
                current_date,
                &slot,
                &session_config,
                cli.json,
            )
            .await
        }
        Command::Config { .. } => Ok(()),
    }
}

/// The patient the token belongs to.
async fn signed_in(api: &dyn SchedulingApi) -> ClientResult<carebook_core::CurrentUser> {
    Ok(api.current_user().await?)
}
