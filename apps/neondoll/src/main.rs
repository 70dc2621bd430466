use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use generator::{build_generator, BackendKind};
use studio_core::{StudioController, StudioEvent};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod repl;

use config::load_settings;
use repl::{parse_command, Command};

#[derive(Parser, Debug)]
#[command(name = "neondoll", about = "Cybernetic fashion simulator")]
struct Args {
    #[arg(long, default_value = "neondoll.toml")]
    config: PathBuf,
    /// Overrides the configured backend (pollinations or gemini).
    #[arg(long)]
    backend: Option<BackendKind>,
    /// Skip generating the base character on startup.
    #[arg(long)]
    no_auto_base: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config)?;
    if let Some(backend) = args.backend {
        settings.backend = backend;
    }
    settings.validate().context("invalid configuration")?;

    let generator = build_generator(settings.backend, settings.generator_settings())
        .with_context(|| format!("failed to build {} backend", settings.backend))?;
    let controller = Arc::new(StudioController::new(generator, settings.studio_options()));
    info!(backend = %settings.backend, "neondoll session started");

    println!("NEONDOLL // CYBERNETIC FASHION SIMULATOR");
    println!("{}", repl::render_presets(controller.snapshot().await.selected));
    println!("{}", repl::HELP);

    if !args.no_auto_base {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller.initialize().await;
        });
    }

    run_repl(controller).await
}

async fn run_repl(controller: Arc<StudioController>) -> Result<()> {
    let mut events = controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut awaiting_ack = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if matches!(event, StudioEvent::GenerationFailed { .. }) {
                        awaiting_ack = true;
                    }
                    println!("{}", repl::describe_event(&event));
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event listener lagged"),
                Err(RecvError::Closed) => return Ok(()),
            },
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    return Ok(());
                };
                if awaiting_ack {
                    awaiting_ack = false;
                    println!("acknowledged.");
                    continue;
                }
                match parse_command(&line) {
                    Ok(Some(Command::Quit)) => return Ok(()),
                    Ok(Some(command)) => {
                        if let Err(err) = execute(&controller, command).await {
                            println!("error: {err:#}");
                        }
                    }
                    Ok(None) => {}
                    Err(err) => println!("{err}"),
                }
            }
        }
    }
}

async fn execute(controller: &Arc<StudioController>, command: Command) -> Result<()> {
    match command {
        Command::Presets => {
            let snapshot = controller.snapshot().await;
            println!("{}", repl::render_presets(snapshot.selected));
        }
        Command::Wear(kind) => {
            // Runs in the background so the prompt stays responsive; extra
            // requests while it runs are ignored by the controller.
            let controller = controller.clone();
            tokio::spawn(async move {
                let outcome = controller.request_generation(kind).await;
                if let Some(text) = repl::describe_outcome(&outcome) {
                    println!("{text}");
                }
            });
        }
        Command::History => {
            let snapshot = controller.snapshot().await;
            println!("{}", repl::render_history(&snapshot));
        }
        Command::Restore(position) => {
            let snapshot = controller.snapshot().await;
            let entry = snapshot
                .history
                .get(position - 1)
                .ok_or_else(|| anyhow!("no cached result at position {position}"))?;
            if !controller.select_from_history(entry).await {
                println!("generation in progress; restore ignored");
            }
        }
        Command::Show => {
            let snapshot = controller.snapshot().await;
            println!("{}", repl::render_snapshot(&snapshot));
        }
        Command::Save(path) => {
            let snapshot = controller.snapshot().await;
            let (mime_type, bytes) = snapshot
                .display
                .decode_data_uri()
                .with_context(|| format!("display image is not inline: {}", snapshot.display))?;
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            println!("saved {} bytes ({mime_type}) to {}", bytes.len(), path.display());
        }
        Command::Help => println!("{}", repl::HELP),
        Command::Quit => {}
    }
    Ok(())
}
