//! Bounded engine event queue plus the loop that rebroadcasts it.
//!
//! Producers never block: when the queue is full (typically because the loop
//! was never started) the event is dropped and counted.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::state::EngineEvent;

struct LoopHandle {
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<mpsc::Receiver<EngineEvent>>,
}

pub(crate) struct EventBus {
    tx: mpsc::Sender<EngineEvent>,
    /// Parked receiver while the loop is stopped.
    rx: Mutex<Option<mpsc::Receiver<EngineEvent>>>,
    broadcast_tx: broadcast::Sender<EngineEvent>,
    running: AtomicBool,
    dropped: AtomicU64,
    handle: Mutex<Option<LoopHandle>>,
}

impl EventBus {
    pub(crate) fn new(queue_capacity: usize, broadcast_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let (broadcast_tx, _) = broadcast::channel(broadcast_capacity.max(1));

        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            broadcast_tx,
            running: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            handle: Mutex::new(None),
        }
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        if self.tx.try_send(event).is_err() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(dropped, "engine event queue full; event dropped");
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.broadcast_tx.subscribe()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Spawn the event loop. No-op when it is already running.
    pub(crate) async fn start(&self) {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return;
        }

        let Some(mut rx) = self.rx.lock().await.take() else {
            return;
        };

        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();
        let broadcast_tx = self.broadcast_tx.clone();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    event = rx.recv() => match event {
                        Some(event) => process_event(&broadcast_tx, event),
                        None => break,
                    },
                }
            }
            rx
        });

        *handle = Some(LoopHandle { shutdown, join });
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("engine event loop started");
    }

    /// Stop the event loop and park its receiver so it can be restarted.
    /// Events still queued stay queued.
    pub(crate) async fn stop(&self) {
        let Some(LoopHandle { shutdown, join }) = self.handle.lock().await.take() else {
            return;
        };

        let _ = shutdown.send(());
        match join.await {
            Ok(rx) => *self.rx.lock().await = Some(rx),
            Err(e) => tracing::error!("engine event loop ended abnormally: {}", e),
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("engine event loop stopped");
    }
}

fn process_event(broadcast_tx: &broadcast::Sender<EngineEvent>, event: EngineEvent) {
    tracing::debug!(task_id = %event.task_id(), "engine event: {:?}", event);
    // No subscribers is fine.
    let _ = broadcast_tx.send(event);
}
