//! Live event stream endpoint

use crate::live::session;
use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use tracing::info;

/// GET /api/v1/live/events - persistent snapshot stream
///
/// One JSON-encoded snapshot per message; a keep-alive comment after 30 s of
/// silence. Subscription and guaranteed unsubscription are handled by the
/// session stream itself.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        "new live stream viewer connecting ({} already connected)",
        state.bus.subscriber_count()
    );
    Sse::new(session::snapshot_stream(state.bus.clone()))
}
