use onair_core::Clock;
use onair_relay::{ConfigError, MemorySignalStore, RelayConfig};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

/// Purge signals of every hosted session once they are older than
/// `config.purge_cutoff`, every `config.sweep_interval`.
///
/// Clients sweep their own sessions; this catches sessions nobody is left
/// to sweep. The cutoff has to outlast the clients' poll window, so the
/// config is validated first.
pub fn spawn_retention_sweep(
    store: Arc<MemorySignalStore>,
    clock: Arc<dyn Clock>,
    config: &RelayConfig,
) -> Result<JoinHandle<()>, ConfigError> {
    config.validate()?;

    let cutoff = u64::try_from(config.purge_cutoff.as_millis()).unwrap_or(u64::MAX);
    let mut sweep = interval(config.sweep_interval);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

    Ok(tokio::spawn(async move {
        loop {
            sweep.tick().await;
            let deleted = store.purge_all_older_than(clock.now_millis().saturating_sub(cutoff));
            if deleted > 0 {
                info!("Purged {} old signals", deleted);
            }
        }
    }))
}
