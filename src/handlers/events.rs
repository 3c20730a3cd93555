use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::instrument;

use crate::state::AppState;

/// Server-sent event feed of settlement and configuration changes. Slow
/// consumers that fall behind the broadcast buffer simply miss events.
#[instrument(skip(state))]
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_hub.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|item| {
        let event = item.ok()?;
        let data = serde_json::to_string(&event.payload).ok()?;
        Some(Ok(Event::default().event(event.event_type).data(data)))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
