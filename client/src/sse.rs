use std::cell::RefCell;

use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{EventSource, MessageEvent};

use hexdom_shared::{BoardEvent, BoardView};

use crate::api;
use crate::app::{NeedsResync, ResyncInFlight};

const RESYNC_RETRY_BASE_MS: u32 = 500;
const RESYNC_RETRY_MAX_MS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Live,
    Reconnecting,
}

impl ConnectionStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Live => "live",
            Self::Reconnecting => "reconnecting",
        }
    }
}

struct SseConnection {
    es: EventSource,
    on_open: Closure<dyn Fn()>,
    on_error: Closure<dyn Fn()>,
    snapshot_handler: Closure<dyn Fn(MessageEvent)>,
    update_handler: Closure<dyn Fn(MessageEvent)>,
}

impl SseConnection {
    fn close(self) {
        let _ = self.on_open.as_ref();
        let _ = self.on_error.as_ref();
        self.es.set_onopen(None);
        self.es.set_onerror(None);
        self.es
            .remove_event_listener_with_callback(
                "snapshot",
                self.snapshot_handler.as_ref().unchecked_ref(),
            )
            .ok();
        self.es
            .remove_event_listener_with_callback(
                "update",
                self.update_handler.as_ref().unchecked_ref(),
            )
            .ok();
        self.es.close();
    }
}

thread_local! {
    static SSE_CONNECTION: RefCell<Option<SseConnection>> = const { RefCell::new(None) };
    static RESYNC_FAILURES: RefCell<u32> = const { RefCell::new(0) };
}

pub fn disconnect() {
    SSE_CONNECTION.with(|slot| {
        if let Some(connection) = slot.borrow_mut().take() {
            connection.close();
        }
    });
    RESYNC_FAILURES.with(|failures| *failures.borrow_mut() = 0);
}

/// True when `incoming` skips at least one update after `last`.
pub fn has_seq_gap(last: u64, incoming: u64) -> bool {
    incoming > last.saturating_add(1)
}

fn resync_backoff_ms(consecutive_failures: u32) -> u32 {
    let exponent = consecutive_failures.saturating_sub(1).min(6);
    (RESYNC_RETRY_BASE_MS << exponent).min(RESYNC_RETRY_MAX_MS)
}

/// Replace the local view with `GET /api/board`, retrying with backoff until it lands.
fn trigger_resync(
    board: RwSignal<Option<BoardView>>,
    needs_resync: RwSignal<bool>,
    in_flight: RwSignal<bool>,
) {
    if in_flight.get_untracked() {
        return;
    }
    in_flight.set(true);

    spawn_local(async move {
        loop {
            match api::fetch_board().await {
                Ok(view) => {
                    let newer = board.with_untracked(|current| {
                        current.as_ref().is_none_or(|c| view.seq >= c.seq)
                    });
                    if newer || needs_resync.get_untracked() {
                        board.set(Some(view));
                    }
                    needs_resync.set(false);
                    RESYNC_FAILURES.with(|failures| *failures.borrow_mut() = 0);
                    break;
                }
                Err(e) => {
                    let attempt = RESYNC_FAILURES.with(|failures| {
                        let mut failures = failures.borrow_mut();
                        *failures = failures.saturating_add(1);
                        *failures
                    });
                    let backoff_ms = resync_backoff_ms(attempt);
                    web_sys::console::warn_1(
                        &format!(
                            "Board resync failed (attempt {attempt}): {e}; retrying in {backoff_ms}ms"
                        )
                        .into(),
                    );
                    TimeoutFuture::new(backoff_ms).await;
                }
            }
        }
        in_flight.set(false);
    });
}

/// Connect to `/api/events` and keep `board` in step with the server.
pub fn connect(board: RwSignal<Option<BoardView>>, connection: RwSignal<ConnectionStatus>) {
    connection.set(ConnectionStatus::Connecting);

    let es = match EventSource::new("/api/events") {
        Ok(es) => es,
        Err(_) => {
            connection.set(ConnectionStatus::Reconnecting);
            return;
        }
    };

    let NeedsResync(needs_resync) = expect_context::<NeedsResync>();
    let ResyncInFlight(in_flight) = expect_context::<ResyncInFlight>();

    let on_open = Closure::<dyn Fn()>::new(move || {
        connection.set(ConnectionStatus::Live);
        if needs_resync.get_untracked() {
            trigger_resync(board, needs_resync, in_flight);
        }
    });
    es.set_onopen(Some(on_open.as_ref().unchecked_ref()));

    let snapshot_handler = Closure::<dyn Fn(MessageEvent)>::new(move |e: MessageEvent| {
        let Some(data) = e.data().as_string() else {
            return;
        };
        let Ok(BoardEvent::Snapshot { board: view, .. }) =
            serde_json::from_str::<BoardEvent>(&data)
        else {
            return;
        };

        board.set(Some(view));
        needs_resync.set(false);
    });
    es.add_event_listener_with_callback("snapshot", snapshot_handler.as_ref().unchecked_ref())
        .ok();

    let update_handler = Closure::<dyn Fn(MessageEvent)>::new(move |e: MessageEvent| {
        let Some(data) = e.data().as_string() else {
            return;
        };
        let Ok(event) = serde_json::from_str::<BoardEvent>(&data) else {
            return;
        };
        if !matches!(event, BoardEvent::Update { .. }) {
            return;
        }

        let last_seq = board.with_untracked(|view| view.as_ref().map(|v| v.seq));
        let Some(last_seq) = last_seq else {
            trigger_resync(board, needs_resync, in_flight);
            return;
        };
        if needs_resync.get_untracked() {
            trigger_resync(board, needs_resync, in_flight);
            return;
        }
        if event.seq() <= last_seq {
            return;
        }
        if has_seq_gap(last_seq, event.seq()) {
            web_sys::console::warn_1(
                &format!(
                    "sse_seq_gap_detected (last_seq={last_seq}, incoming_seq={})",
                    event.seq()
                )
                .into(),
            );
            needs_resync.set(true);
            trigger_resync(board, needs_resync, in_flight);
            return;
        }

        board.update(|view| {
            if let Some(view) = view {
                view.apply(event);
            }
        });
    });
    es.add_event_listener_with_callback("update", update_handler.as_ref().unchecked_ref())
        .ok();

    let on_error = Closure::<dyn Fn()>::new(move || {
        connection.set(ConnectionStatus::Reconnecting);
        needs_resync.set(true);
    });
    es.set_onerror(Some(on_error.as_ref().unchecked_ref()));

    SSE_CONNECTION.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(old) = slot.take() {
            old.close();
        }
        *slot = Some(SseConnection {
            es,
            on_open,
            on_error,
            snapshot_handler,
            update_handler,
        });
    });
}
