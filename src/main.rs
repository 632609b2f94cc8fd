use anyhow::{Context, Result};
use clap::Parser;
use naviplay::app::cli::Args;
use naviplay::app::config::LOG_FILE;
use naviplay::app::input::{parse_line, HELP};
use naviplay::app::lock::try_acquire_audio_lock;
use naviplay::app::render::{render_json, render_text};
use naviplay::app::{
    AppConfig, Command, Orchestrator, OrchestratorHandle, QueueContext, StateUpdate, UserConfig,
};
use naviplay::audio::RodioEngine;
use naviplay::catalog::{Catalog, LocalCatalog, SubsonicCatalog};
use naviplay::error::CatalogError;
use naviplay::model::Track;
use naviplay::player::{AudioEngine, EngineEventSender, NullEngine};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logs go to a file so the status output stays readable.
fn init_logging(dir: &Path, level: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("naviplay={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    guard
}

fn open_engine(owns_audio: bool, events: EngineEventSender) -> Box<dyn AudioEngine> {
    if !owns_audio {
        return Box::new(NullEngine::new(Some(events)));
    }
    match RodioEngine::spawn(events.clone()) {
        Ok(engine) => Box::new(engine),
        Err(e) => {
            tracing::error!(error = %e, "no audio output");
            eprintln!("Audio output unavailable ({}), running silent", e);
            Box::new(NullEngine::new(Some(events)))
        }
    }
}

/// The configured server (local files without one), plus the tracks named
/// on the command line.
async fn open_catalog(
    config: &UserConfig,
    names: Vec<String>,
) -> Result<(Arc<dyn Catalog>, Vec<Track>)> {
    let Some(server) = config.server.clone() else {
        let tracks = names.iter().map(|name| LocalCatalog::track_for(name)).collect();
        return Ok((Arc::new(LocalCatalog), tracks));
    };

    let (catalog, tracks) = tokio::task::spawn_blocking(move || {
        let catalog = SubsonicCatalog::new(&server.url, &server.username, &server.password)?;
        match catalog.ping() {
            Ok(()) => tracing::info!(url = %server.url, "server reachable"),
            Err(e) => {
                tracing::warn!(url = %server.url, error = %e, "server ping failed");
                eprintln!("⚠️  {}: {}", server.url, e);
            }
        }
        let tracks: Vec<Track> = names
            .iter()
            .map(|id| {
                catalog.song(id).unwrap_or_else(|e| {
                    tracing::warn!(song = %id, error = %e, "no metadata");
                    Track::new(id, id, 0)
                })
            })
            .collect();
        Ok::<_, CatalogError>((catalog, tracks))
    })
    .await?
    .context("server settings in config.toml")?;
    Ok((Arc::new(catalog), tracks))
}

#[tokio::main]
async fn main() -> Result<()> {
    human_panic::setup_panic!();
    let args = Args::parse();

    if args.generate_config {
        print!("{}", UserConfig::default().to_toml()?);
        return Ok(());
    }

    let config_dir = AppConfig::get_config_dir();
    let (config, mut settings) = AppConfig::load_from(&config_dir);
    let _log_guard = init_logging(&config_dir, args.log_level(&config.log_level));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting");

    // Command-line overrides
    if args.shuffle {
        settings.shuffle = true;
    }
    if let Some(repeat) = args.repeat {
        settings.repeat = repeat;
    }
    if let Some(volume) = args.volume {
        settings.volume = volume;
    }

    let (update_tx, mut update_rx) = mpsc::unbounded_channel::<StateUpdate>();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (handle, command_rx) = OrchestratorHandle::channel();

    // SINGLETON CHECK: only one instance drives the audio device
    let audio_lock = if args.no_audio {
        None
    } else {
        let lock = try_acquire_audio_lock();
        if lock.is_none() {
            eprintln!("🔇 Another naviplay owns the audio device, running silent");
        }
        lock
    };
    let (catalog, tracks) = open_catalog(&config, args.tracks.clone()).await?;
    let engine = open_engine(audio_lock.is_some(), event_tx);
    let mut orchestrator = Orchestrator::new(
        engine,
        catalog,
        settings,
        config.clone(),
        update_tx,
    );

    if let Some(preset) = &args.eq_preset {
        orchestrator.load_preset(preset);
    }

    if let Some(first) = tracks.first().cloned() {
        handle.send(Command::Play {
            track: first,
            url: None,
            context: Some(QueueContext {
                tracks,
                start_index: 0,
            }),
        });
    }

    // Printer
    let json = args.json;
    let upcoming = config.upcoming_count;
    let printer = tokio::spawn(async move {
        while let Some(update) = update_rx.recv().await {
            if json {
                match render_json(&update) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!(error = %e, "cannot encode update"),
                }
            } else {
                println!("{}", render_text(&update, upcoming));
            }
        }
    });

    // Line commands from stdin. A plain thread, so a pending read never
    // holds up runtime shutdown.
    let input = handle.clone();
    let seek_step = config.seek_step_secs;
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            };
            match parse_line(&line, seek_step) {
                Ok(Some(command)) => {
                    if !input.send(command) {
                        return;
                    }
                }
                Ok(None) => println!("{}", HELP),
                Err(e) => eprintln!("{}", e),
            }
        }
        input.send(Command::Quit);
    });

    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.send(Command::Quit);
        }
    });
    drop(handle);

    let settings = orchestrator.run(command_rx, event_rx).await;
    settings
        .save_to(&AppConfig::get_state_path())
        .context("saving session state")?;

    let _ = printer.await;
    drop(audio_lock);
    tracing::info!("bye");
    Ok(())
}
