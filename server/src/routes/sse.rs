use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use bytes::Bytes;
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

use crate::config::SSE_KEEPALIVE_SECS;
use crate::state::{AppState, PreSerializedEvent};

pub async fn board_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        // Subscribe before reading the snapshot so no update falls in between.
        let rx = state.event_tx.subscribe();
        let (seq, data) = latest_snapshot(&state).await;
        let mut last_seq = seq;
        if !data.is_empty() {
            if let Some(payload) = event_payload(data.as_ref()) {
                yield Ok(
                    Event::default()
                        .id(seq.to_string())
                        .event("snapshot")
                        .data(payload),
                );
            } else {
                warn!("snapshot payload is not valid utf-8; skipping SSE snapshot event");
            }
        }

        let mut stream = BroadcastStream::new(rx);

        while let Some(result) = stream.next().await {
            match result {
                Ok(event) => {
                    let (event_type, seq, data) = match event {
                        PreSerializedEvent::Snapshot { seq, json } => ("snapshot", seq, json),
                        PreSerializedEvent::Update { seq, json } => ("update", seq, json),
                    };
                    if seq <= last_seq {
                        continue;
                    }
                    last_seq = seq;
                    let Some(payload) = event_payload(data.as_ref()) else {
                        warn!(
                            seq,
                            event = event_type,
                            "event payload is not valid utf-8; dropping SSE event"
                        );
                        continue;
                    };
                    yield Ok(
                        Event::default()
                            .id(seq.to_string())
                            .event(event_type)
                            .data(payload),
                    );
                }
                Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(
                        skipped_events = skipped,
                        "SSE client lagged behind broadcast buffer; replaying snapshot"
                    );
                    let (seq, data) = latest_snapshot(&state).await;
                    last_seq = seq;
                    if !data.is_empty() {
                        let Some(payload) = event_payload(data.as_ref()) else {
                            warn!("snapshot payload is not valid utf-8; skipping SSE snapshot replay");
                            continue;
                        };
                        yield Ok(
                            Event::default()
                                .id(seq.to_string())
                                .event("snapshot")
                                .data(payload),
                        );
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEPALIVE_SECS))
            .text("keep-alive"),
    )
}

async fn latest_snapshot(state: &AppState) -> (u64, Arc<Bytes>) {
    let live = state.live.read().await;
    (live.seq, Arc::clone(&live.snapshot_json))
}

fn event_payload(bytes: &Bytes) -> Option<&str> {
    std::str::from_utf8(bytes.as_ref()).ok()
}
