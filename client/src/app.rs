use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use hexdom_shared::{BoardView, CellPos, PlayerId, hex_css, player_color};

use crate::api;
use crate::canvas::{BoardCanvas, fit_board};
use crate::sse::{self, ConnectionStatus};
use crate::viewport::Viewport;

const NOTICE_TIMEOUT_MS: u32 = 4_000;

pub(crate) fn canvas_dimensions() -> (f64, f64) {
    let Some(window) = web_sys::window() else {
        return (1200.0, 800.0);
    };
    let w = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(1200.0);
    let h = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(800.0);
    (w, h)
}

/// `HH:MM:SS UTC` for an RFC 3339 board timestamp.
fn format_update_time(timestamp: &str) -> Option<String> {
    let parsed = chrono::DateTime::parse_from_rfc3339(timestamp).ok()?;
    Some(
        parsed
            .with_timezone(&chrono::Utc)
            .format("%H:%M:%S UTC")
            .to_string(),
    )
}

/// Players are numbered from one on screen.
fn player_label(player: PlayerId) -> String {
    format!("Player {}", player.0 as u16 + 1)
}

struct KeydownBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
}

/// Cell under the pointer.
#[derive(Clone, Copy)]
pub(crate) struct Hovered(pub RwSignal<Option<CellPos>>);
/// Transient message shown under the status bar.
#[derive(Clone, Copy)]
pub(crate) struct Notice(pub RwSignal<Option<String>>);
#[derive(Clone, Copy)]
pub(crate) struct NeedsResync(pub RwSignal<bool>);
#[derive(Clone, Copy)]
pub(crate) struct ResyncInFlight(pub RwSignal<bool>);

#[component]
pub fn App() -> impl IntoView {
    let board: RwSignal<Option<BoardView>> = RwSignal::new(None);
    let connection = RwSignal::new(ConnectionStatus::Connecting);
    let viewport = RwSignal::new(Viewport::default());
    let hovered: RwSignal<Option<CellPos>> = RwSignal::new(None);
    let notice: RwSignal<Option<String>> = RwSignal::new(None);
    let needs_resync = RwSignal::new(false);
    let resync_in_flight = RwSignal::new(false);

    provide_context(board);
    provide_context(connection);
    provide_context(viewport);
    provide_context(Hovered(hovered));
    provide_context(Notice(notice));
    provide_context(NeedsResync(needs_resync));
    provide_context(ResyncInFlight(resync_in_flight));

    // Initial board; the SSE snapshot usually lands first and wins on seq.
    spawn_local(async move {
        match api::fetch_board().await {
            Ok(view) => {
                let newer =
                    board.with_untracked(|current| current.as_ref().is_none_or(|c| view.seq > c.seq));
                if newer {
                    board.set(Some(view));
                }
            }
            Err(e) => {
                web_sys::console::warn_1(&format!("Initial board fetch failed: {e}").into());
                needs_resync.set(true);
            }
        }
    });

    Effect::new(move || {
        sse::connect(board, connection);
        on_cleanup(|| {
            sse::disconnect();
        });
    });

    // Clear each notice after a while; a newer notice restarts the timer.
    let notice_timeout = Rc::new(RefCell::new(None::<Timeout>));
    Effect::new(move || {
        let shown = notice.get().is_some();
        if let Some(timeout) = notice_timeout.borrow_mut().take() {
            timeout.cancel();
        }
        if shown {
            let timeout = Timeout::new(NOTICE_TIMEOUT_MS, move || notice.set(None));
            *notice_timeout.borrow_mut() = Some(timeout);
        }
    });

    Effect::new(move || {
        use wasm_bindgen::prelude::*;

        let Some(window) = web_sys::window() else {
            return;
        };

        KEYDOWN_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "keydown",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler =
            Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
                match e.key().as_str() {
                    "r" | "0" => {
                        let Some(layout) =
                            board.with_untracked(|view| view.as_ref().map(|v| v.layout))
                        else {
                            return;
                        };
                        let (w, h) = canvas_dimensions();
                        viewport.update(|vp| fit_board(vp, layout, w, h));
                    }
                    "Escape" => {
                        notice.set(None);
                    }
                    _ => {}
                }
            });
        if window
            .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            KEYDOWN_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(KeydownBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    view! {
        <div style="position: fixed; inset: 0; background: #0f1117; color: #e2e0d8; font-family: 'Inter', system-ui, sans-serif;">
            <BoardCanvas />
            <StatusBar />
        </div>
    }
}

/// Connection state, selection and hover details, plus the reset control.
#[component]
fn StatusBar() -> impl IntoView {
    let board: RwSignal<Option<BoardView>> = expect_context();
    let connection: RwSignal<ConnectionStatus> = expect_context();
    let Hovered(hovered) = expect_context();
    let Notice(notice) = expect_context();

    let connection_color = move || match connection.get() {
        ConnectionStatus::Live => "#A0D468",
        ConnectionStatus::Connecting => "#FFCE54",
        ConnectionStatus::Reconnecting => "#ED5565",
    };

    let selection = Memo::new(move |_| {
        board.with(|view| {
            let selected = view.as_ref()?.selected?;
            Some((selected.owner, selected.size))
        })
    });

    let hover_info = Memo::new(move |_| {
        let pos = hovered.get()?;
        board.with(|view| {
            let cell = view.as_ref()?.cell(pos)?;
            Some((pos, cell.owner, cell.kingdom.is_some()))
        })
    });

    let updated_at = Memo::new(move |_| {
        board.with(|view| {
            let view = view.as_ref()?;
            Some((view.seq, format_update_time(&view.timestamp)))
        })
    });

    let on_reset = move |_| {
        spawn_local(async move {
            if let Err(e) = api::post_reset().await {
                notice.set(Some(e));
            }
        });
    };

    view! {
        <div style="position: absolute; top: 12px; left: 12px; display: flex; flex-direction: column; gap: 6px; pointer-events: none;">
            <div style="display: flex; align-items: center; gap: 10px; padding: 6px 10px; background: rgba(22,25,33,0.92); border: 1px solid #282c3e; border-radius: 6px; font-size: 0.78rem; pointer-events: auto;">
                <span style=move || format!("width: 8px; height: 8px; border-radius: 50%; background: {};", connection_color()) />
                <span style="color: #9a9590;">{move || connection.get().label()}</span>
                {move || updated_at.get().map(|(seq, time)| view! {
                    <span style="color: #5a5860; font-family: 'JetBrains Mono', monospace;">
                        {format!("#{seq}")}
                        {time.map(|t| format!(" \u{00B7} {t}"))}
                    </span>
                })}
                <button
                    style="margin-left: 6px; padding: 2px 8px; background: #13161f; color: #e2e0d8; border: 1px solid #282c3e; border-radius: 4px; cursor: pointer; font-size: 0.72rem;"
                    on:click=on_reset
                >
                    "New board"
                </button>
            </div>
            {move || selection.get().map(|(owner, size)| {
                let swatch = hex_css(player_color(owner).fill);
                view! {
                    <div style="display: flex; align-items: center; gap: 8px; padding: 5px 10px; background: rgba(22,25,33,0.92); border: 1px solid #282c3e; border-radius: 6px; font-size: 0.75rem;">
                        <span style=format!("width: 10px; height: 10px; border-radius: 2px; background: {swatch};") />
                        <span>{player_label(owner)}</span>
                        <span style="color: #9a9590;">{format!("{size} cells")}</span>
                        <span style="color: #5a5860;">"click a lone cell to annex it"</span>
                    </div>
                }
            })}
            {move || hover_info.get().map(|(pos, owner, in_kingdom)| view! {
                <div style="padding: 4px 10px; background: rgba(22,25,33,0.85); border-radius: 6px; font-size: 0.7rem; color: #9a9590; font-family: 'JetBrains Mono', monospace;">
                    {format!("{pos} {}", player_label(owner))}
                    {in_kingdom.then_some(" \u{00B7} kingdom")}
                </div>
            })}
            {move || notice.get().map(|message| view! {
                <div style="padding: 5px 10px; background: rgba(237,85,101,0.15); border: 1px solid rgba(237,85,101,0.5); border-radius: 6px; font-size: 0.72rem;">
                    {message}
                </div>
            })}
        </div>
    }
}
