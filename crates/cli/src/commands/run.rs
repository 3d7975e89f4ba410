//! `giftbot run` — restore games and serve the configured channel.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use giftbot_config::AppConfig;
use giftbot_core::error::{Error, Result, StorageError};
use giftbot_core::event::{DomainEvent, EventBus};
use giftbot_core::game::GameSettings;
use giftbot_engine::{CommandHandler, GameRegistry, InboundRouter, RoundController, RoundScheduler};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub async fn run(config: AppConfig) -> Result<()> {
    let defaults = config.defaults.settings().map_err(|e| Error::Config {
        message: e.to_string(),
    })?;
    let registry = Arc::new(open_registry(&config.data_file, defaults)?);

    let channel = giftbot_channels::from_config(&config)?;
    let events = Arc::new(EventBus::default());
    spawn_event_log(&events);

    let controller = Arc::new(RoundController::new(
        registry.clone(),
        channel.clone(),
        events.clone(),
    ));
    let mut router = InboundRouter::new(Arc::new(CommandHandler::new(controller.clone())));
    let (stop_tx, stop_rx) = watch::channel(false);
    let scheduler = RoundScheduler::new(
        controller.clone(),
        Duration::from_secs(config.scheduler.tick_seconds),
    )
    .start(stop_rx);

    let mut inbound = channel.start().await?;

    println!("🎲 giftbot — serving {} channel", channel.name());
    println!("   Snapshot: {}", config.data_file.display());
    println!("   Games restored: {}", registry.len().await);
    if channel.name() == "cli" {
        println!("   Type `/game start` after adding keys; anything else is a guess.\n");
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = inbound.recv() => match event {
                Some(Ok(event)) => router.route(event),
                Some(Err(e)) => warn!(error = %e, "Inbound event error"),
                None => {
                    info!("Channel closed");
                    break;
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    router.shutdown().await;
    let _ = stop_tx.send(true);
    if let Err(e) = scheduler.await {
        error!(error = %e, "Round scheduler task failed");
    }
    if let Err(e) = channel.stop().await {
        warn!(error = %e, "Channel did not stop cleanly");
    }
    if let Err(e) = registry.persist() {
        error!(error = %e, "Final save failed");
    }
    info!("giftbot stopped");
    Ok(())
}

/// Restore the registry. A snapshot that is not a channel map is moved
/// aside so the first write does not destroy it.
fn open_registry(
    path: &Path,
    defaults: GameSettings,
) -> std::result::Result<GameRegistry, StorageError> {
    match GameRegistry::restore(path, defaults) {
        Err(StorageError::Corrupt { reason, .. }) => {
            let aside = quarantine(path)?;
            error!(
                path = %path.display(),
                moved_to = %aside.display(),
                %reason,
                "Snapshot unreadable, starting fresh"
            );
            Ok(GameRegistry::new(path, defaults))
        }
        other => other,
    }
}

fn quarantine(path: &Path) -> std::result::Result<PathBuf, StorageError> {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    let aside = path.with_file_name(name);
    std::fs::rename(path, &aside).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(aside)
}

fn spawn_event_log(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.as_ref() {
                    DomainEvent::GameCompleted {
                        channel,
                        rounds_played,
                        ..
                    } => info!(channel = %channel, rounds_played, "Game completed"),
                    other => debug!(event = ?other, "Domain event"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event log lagging");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_snapshot_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game_state.json");
        std::fs::write(&path, "[]").unwrap();

        let registry = open_registry(&path, GameSettings::default()).unwrap();
        assert!(registry.is_durable());
        assert!(!path.exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("game_state.json.corrupt")).unwrap(),
            "[]"
        );
    }

    #[test]
    fn missing_snapshot_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game_state.json");
        assert!(open_registry(&path, GameSettings::default()).is_ok());
        assert!(!dir.path().join("game_state.json.corrupt").exists());
    }
}
