use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use stockroom_core::ShopId;
use stockroom_events::{Event, EventBus, ShopScoped, Subscription};
use stockroom_inventory::{CatalogChange, ChangeHandler};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Drives the inventory engine from catalog change notifications.
///
/// - Subscribes to an event bus
/// - Hands each change to a [`ChangeHandler`]
/// - Logs failures and moves on (no retries)
/// - Supports graceful shutdown
/// - Optional shop pinning
#[derive(Debug)]
pub struct ChangeWorker;

impl ChangeWorker {
    /// Spawn a worker thread that processes changes from the bus subscription.
    ///
    /// - `shop_id`: when provided, changes for other shops are ignored
    /// - `handler`: delivery is at-least-once, so reservations may be replayed;
    ///   the engine counts existing holds per order, which makes replays harmless
    pub fn spawn<B, H>(
        name: &'static str,
        bus: B,
        shop_id: Option<ShopId>,
        handler: H,
    ) -> Result<WorkerHandle, WorkerError>
    where
        B: EventBus<CatalogChange> + Send + Sync + 'static,
        H: ChangeHandler + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<CatalogChange> = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, shop_id, &handler))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<H>(
    name: &'static str,
    sub: Subscription<CatalogChange>,
    shutdown_rx: mpsc::Receiver<()>,
    shop_id: Option<ShopId>,
    handler: &H,
) where
    H: ChangeHandler,
{
    let tick = Duration::from_millis(250);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(change) => {
                if shop_id.is_some_and(|s| change.shop_id() != s) {
                    continue;
                }

                match handler.handle(&change) {
                    Ok(outcome) => debug!(
                        worker = name,
                        event_type = change.event_type(),
                        registered = outcome.registered,
                        reserved = outcome.reserved,
                        removed = outcome.removed,
                        "change handled"
                    ),
                    Err(err) => warn!(
                        worker = name,
                        event_type = change.event_type(),
                        shop_id = %change.shop_id(),
                        error = %err,
                        "change handler failed"
                    ),
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}
