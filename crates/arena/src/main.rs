use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use snafu::ResultExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use vibe_arena::error::{ReadInputSnafu, SettingsSnafu};
use vibe_arena::{ArenaApp, ArenaError, ArenaResult, SettingsStore, render_snapshot, telemetry};

#[derive(Debug, Parser)]
#[command(
    name = "vibecheck",
    about = "Post anonymous messages and watch the collective vibe shift"
)]
struct Cli {
    /// Settings file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database path, overriding the settings file.
    #[arg(long, global = true)]
    database: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read messages from stdin, one per line, and print every vibe change.
    Arena,
    /// Print the current vibe and exit.
    Status,
    /// Write the effective settings to the settings file.
    InitConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "vibecheck failed");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ArenaResult<()> {
    let config_path = cli.config.unwrap_or_else(SettingsStore::default_config_path);
    let mut settings = SettingsStore::load_from(&config_path);
    if let Some(database) = cli.database {
        settings.database_path = database;
        settings = settings.normalized();
    }

    match cli.command.unwrap_or(Command::Arena) {
        Command::Arena => run_arena(ArenaApp::open(settings).await?).await,
        Command::Status => {
            let app = ArenaApp::open(settings).await?;
            let (mut viewer, snapshot) = app.connect_viewer().await?;
            println!("{}", render_snapshot(&snapshot));
            viewer.disconnect();
            Ok(())
        }
        Command::InitConfig => {
            SettingsStore::persist(&config_path, &settings).context(SettingsSnafu {
                stage: "init-config-persist",
            })?;
            println!("settings written to {}", config_path.display());
            Ok(())
        }
    }
}

async fn run_arena(app: ArenaApp) -> ArenaResult<()> {
    let (mut viewer, snapshot) = app.connect_viewer().await?;
    println!("{}", render_snapshot(&snapshot));

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let viewer_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                next = viewer.next_snapshot() => match next {
                    Some(snapshot) => println!("{}", render_snapshot(&snapshot)),
                    None => break,
                },
            }
        }

        if let Some(snapshot) = viewer.drain_pending() {
            println!("{}", render_snapshot(&snapshot));
        }
        viewer.disconnect();
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context(ReadInputSnafu {
        stage: "arena-read-line",
    })? {
        match app.ingestion().submit(&line).await {
            Ok(_) => {}
            Err(ArenaError::InvalidInput { reason, .. }) => eprintln!("skipped: {reason}"),
            Err(error) => eprintln!("message not sent: {error}"),
        }
    }

    let _ = shutdown_tx.send(());
    if let Err(error) = viewer_task.await {
        tracing::warn!(error = %error, "viewer task ended abnormally");
    }
    Ok(())
}
