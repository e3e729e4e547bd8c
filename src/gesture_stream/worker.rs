use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, trace, warn};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use super::controller::{GestureStreamController, OutcomeEffect};
use super::host::GestureHost;
use super::{DispatchOutcome, GestureSegment, StreamSettings, StreamState, StreamStatus};
use crate::{Error, Result};

enum WorkerMsg {
    Pump,
    Outcome { id: u64, outcome: DispatchOutcome },
    Preempt { id: u64 },
    Shutdown,
}

struct Inner {
    controller: GestureStreamController,
    preempt: Option<AbortHandle>,
}

impl Inner {
    fn abort_preempt(&mut self) {
        if let Some(handle) = self.preempt.take() {
            handle.abort();
        }
    }
}

/// Handle to a gesture stream running on a background tokio task.
///
/// Public calls lock the shared controller briefly and post a pump to the
/// worker; segment assembly, dispatch and preempt scheduling happen only on
/// the worker. Cloning the handle shares the same stream.
#[derive(Clone)]
pub struct GestureStream {
    inner: Arc<Mutex<Inner>>,
    host: Arc<dyn GestureHost>,
    tx: mpsc::UnboundedSender<WorkerMsg>,
}

impl GestureStream {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(host: Arc<dyn GestureHost>, settings: StreamSettings) -> Self {
        let inner = Arc::new(Mutex::new(Inner {
            controller: GestureStreamController::new(settings),
            preempt: None,
        }));
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(run(Arc::clone(&inner), Arc::clone(&host), tx.clone(), rx));

        Self { inner, host, tx }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pump(&self) {
        if self.tx.send(WorkerMsg::Pump).is_err() {
            warn!("Gesture worker is gone, dropping pump");
        }
    }

    pub fn start(&self, x: f32, y: f32) -> bool {
        let started = self.lock().controller.start(x, y, Instant::now());
        if started {
            self.pump();
        }
        started
    }

    pub fn update(&self, x: f32, y: f32) -> bool {
        let accepted = self.lock().controller.update(x, y, Instant::now());
        self.pump();
        accepted
    }

    pub fn end(&self) {
        self.lock().controller.end();
        self.pump();
    }

    /// Synchronous hard reset; late host outcomes are ignored.
    ///
    /// The host is told to abandon the stroke when one was under way.
    pub fn cancel(&self) {
        let abandoned = {
            let mut inner = self.lock();
            inner.abort_preempt();
            let abandoned = inner.controller.is_active() || inner.controller.in_flight_id().is_some();
            inner.controller.cancel();
            abandoned
        };
        if abandoned {
            self.host.cancel();
        }
    }

    /// Swap in new tuning without interrupting the current stroke
    pub fn apply_settings(&self, settings: StreamSettings) {
        self.lock().controller.apply_settings(settings);
    }

    pub fn settings(&self) -> StreamSettings {
        self.lock().controller.settings().clone()
    }

    pub fn restart(&self, x: f32, y: f32) -> bool {
        let restarted = {
            let mut inner = self.lock();
            inner.abort_preempt();
            inner.controller.restart(x, y, Instant::now())
        };
        if restarted {
            self.pump();
        }
        restarted
    }

    pub fn status(&self) -> StreamStatus {
        self.lock().controller.status(Instant::now())
    }

    pub fn state(&self) -> StreamState {
        self.lock().controller.state()
    }

    pub fn is_active(&self) -> bool {
        self.lock().controller.is_active()
    }

    /// Cancel the stream and stop the worker
    pub fn shutdown(&self) -> Result<()> {
        self.cancel();
        self.tx.send(WorkerMsg::Shutdown).map_err(|_| Error::StreamClosed)
    }
}

async fn run(
    inner: Arc<Mutex<Inner>>,
    host: Arc<dyn GestureHost>,
    tx: mpsc::UnboundedSender<WorkerMsg>,
    mut rx: mpsc::UnboundedReceiver<WorkerMsg>,
) {
    debug!("Gesture worker started");
    while let Some(msg) = rx.recv().await {
        let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        match msg {
            WorkerMsg::Pump => {
                if let Some(segment) = guard.controller.next_segment(now) {
                    dispatch(&mut guard, &host, &tx, segment);
                }
            }
            WorkerMsg::Outcome { id, outcome } => {
                if guard.controller.in_flight_id() == Some(id) {
                    guard.abort_preempt();
                }
                match guard.controller.on_outcome(id, outcome, now) {
                    OutcomeEffect::Pump => {
                        if let Some(segment) = guard.controller.next_segment(now) {
                            dispatch(&mut guard, &host, &tx, segment);
                        }
                    }
                    OutcomeEffect::Reset => {
                        guard.abort_preempt();
                        host.cancel();
                    }
                    OutcomeEffect::Finished => debug!("Gesture stroke complete"),
                    OutcomeEffect::Ignored => trace!("Outcome for segment {id} ignored"),
                }
            }
            WorkerMsg::Preempt { id } => {
                if let Some(segment) = guard.controller.preempt(id, now) {
                    dispatch(&mut guard, &host, &tx, segment);
                }
            }
            WorkerMsg::Shutdown => {
                guard.abort_preempt();
                guard.controller.cancel();
                break;
            }
        }
    }
    debug!("Gesture worker stopped");
}

fn dispatch(
    inner: &mut Inner,
    host: &Arc<dyn GestureHost>,
    tx: &mpsc::UnboundedSender<WorkerMsg>,
    segment: GestureSegment,
) {
    let id = segment.id;
    inner.abort_preempt();

    if segment.continues {
        let delay = inner.controller.settings().preempt_delay(segment.duration);
        let tx = tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(WorkerMsg::Preempt { id });
        });
        inner.preempt = Some(handle.abort_handle());
    }

    let host = Arc::clone(host);
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = host.dispatch(segment).await;
        let _ = tx.send(WorkerMsg::Outcome { id, outcome });
    });
}
