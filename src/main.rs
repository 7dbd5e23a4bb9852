use color_eyre::{eyre::eyre, Result};
use playerbind::config::AppConfig;
use playerbind::input::{keyboard, CollectorHandle};
use playerbind::session::{Session, SessionOutcome};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;
    let apply_log_level = setup_logging_env();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load_or_create(&config_path)
        .await
        .map_err(|e| eyre!("Failed to load config {}: {}", config_path.display(), e))?;

    apply_log_level(&config.logging.level)?;
    info!("Using config {}", config_path.display());

    let shutdown = CancellationToken::new();
    let (event_tx, event_rx) = mpsc::channel(config.input.event_buffer.max(1));

    info!("Starting gamepad collector");
    let (collector, gamepads) = CollectorHandle::spawn(
        Some(config.input.collector_settings()),
        event_tx.clone(),
        shutdown.clone(),
    )
    .await
    .map_err(|e| eyre!("Failed to spawn gamepad collector: {}", e))?;

    let _keyboard_reader = keyboard::spawn_stdin_reader(event_tx, shutdown.clone())
        .map_err(|e| eyre!("Failed to start keyboard reader: {}", e))?;

    let ctrl_c_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, shutting down");
            ctrl_c_token.cancel();
        }
    });

    println!("Main menu: w/s to move, Enter to select (Start, Co-op, Exit)");
    let session = Session::new(gamepads, config.assignment.clone(), config.game.clone());
    let outcome = session
        .run(event_rx, config.input.tick_interval(), shutdown.clone())
        .await;

    shutdown.cancel();
    collector.stop();

    match outcome {
        Ok(SessionOutcome::Ready {
            mode, assignments, ..
        }) => {
            info!("Players ready in {:?} mode", mode);
            for assignment in assignments {
                println!("Player {}: {}", assignment.player_index + 1, assignment.device);
            }
        }
        Ok(SessionOutcome::Exited) => info!("Exited from main menu"),
        Ok(SessionOutcome::Cancelled) => info!("Session cancelled"),
        Err(e) => {
            error!("Session failed: {}", e);
            return Err(e.into());
        }
    }
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    Ok(())
}

/// Installs the subscriber at `RUST_LOG` or info level. The returned closure swaps in
/// the configured level unless `RUST_LOG` is set.
fn setup_logging_env() -> impl FnOnce(&str) -> Result<()> {
    let from_env = std::env::var("RUST_LOG").is_ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .with_filter_reloading();
    let handle = builder.reload_handle();
    builder.init();

    move |level: &str| {
        if from_env {
            return Ok(());
        }
        handle
            .reload(EnvFilter::new(level))
            .map_err(|e| eyre!("Failed to apply log level {}: {}", level, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn subscriber_is_live_before_config_and_takes_configured_level() {
        let apply_log_level = setup_logging_env();
        let from_env = std::env::var("RUST_LOG").is_ok();
        if !from_env {
            assert!(tracing::enabled!(Level::INFO));
            assert!(!tracing::enabled!(Level::DEBUG));
        }

        apply_log_level("debug").unwrap();
        if !from_env {
            assert!(tracing::enabled!(Level::DEBUG));
        }
    }
}
