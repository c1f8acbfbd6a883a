use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::AppConfig;

pub mod purge;
pub mod seed;
pub mod sync;
pub mod watch;

#[derive(Subcommand)]
enum Command {
    /// Process every configured mailbox once
    Sync {},
    /// Process every configured mailbox on an interval until ctrl-c
    Watch {
        /// Seconds between cycles, overrides MAILCAL_SYNC_INTERVAL_SECS
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: Option<u64>,
    },
    /// Send demo create commands to a mailbox
    SeedDemo {
        /// Mailbox the commands are sent from
        #[arg(long)]
        sender: String,
        /// Target mailbox, defaults to the first configured one
        #[arg(long)]
        mailbox: Option<String>,
        #[arg(long, default_value = "3")]
        count: usize,
    },
    /// Permanently delete calendar items of a mailbox
    PurgeCalendar {
        #[arg(long)]
        mailbox: String,
        #[arg(long, default_value = "100")]
        limit: usize,
        /// Required, purging can't be undone
        #[arg(long, action, default_value = "false")]
        yes: bool,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    init_tracing();

    let Some(command) = args.command else {
        return Ok(());
    };
    let config = AppConfig::from_env()?;

    match command {
        Command::Sync {} => {
            sync::run(&config).await?;
        }
        Command::Watch { interval_secs } => {
            watch::run(&config, interval_secs).await?;
        }
        Command::SeedDemo {
            sender,
            mailbox,
            count,
        } => {
            seed::run(&config, &sender, mailbox, count).await?;
        }
        Command::PurgeCalendar {
            mailbox,
            limit,
            yes,
        } => {
            purge::run(&config, &mailbox, limit, yes).await?;
        }
    }

    Ok(())
}
