//! Per-viewer subscriber sessions
//!
//! Wraps one live-bus subscription as an SSE stream. The session guarantees
//! unsubscription on every exit path (graceful close, client drop, stream
//! error) via a drop guard, and emits a keep-alive comment when no snapshot
//! arrives within the idle window instead of closing the connection.

use crate::live::LiveBus;
use axum::response::sse::Event;
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Idle window after which a keep-alive is sent instead of a snapshot
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Unsubscribes when the session stream is dropped, whatever the exit path
struct SessionGuard {
    bus: Arc<LiveBus>,
    id: Uuid,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

/// Create the SSE stream for one viewer connection.
///
/// The first event is the current latest snapshot when one exists (delivered
/// by the bus at subscribe time), followed by every subsequent broadcast the
/// session's queue can hold.
pub fn snapshot_stream(bus: Arc<LiveBus>) -> impl Stream<Item = Result<Event, Infallible>> {
    let subscriber = bus.subscribe();
    let guard = SessionGuard {
        bus,
        id: subscriber.id,
    };
    let mut rx = subscriber.rx;

    async_stream::stream! {
        let _guard = guard;
        debug!("live session {} stream started", _guard.id);

        loop {
            match tokio::time::timeout(IDLE_TIMEOUT, rx.recv()).await {
                Ok(Some(snapshot)) => {
                    match Event::default().event("snapshot").json_data(&snapshot) {
                        Ok(event) => yield Ok(event),
                        Err(e) => warn!("failed to serialize live snapshot: {}", e),
                    }
                }
                Ok(None) => {
                    // Sender side gone (bus pruned us); end the stream
                    debug!("live session {} channel closed", _guard.id);
                    break;
                }
                Err(_) => {
                    // Idle: keep the connection open
                    yield Ok(Event::default().comment("keep-alive"));
                }
            }
        }
    }
}
