use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::Utc;
use hexdom_shared::{
    Board, BoardError, BoardEvent, BoardView, CellPos, ClickResponse, Controller,
    OutlineRegistry, RectGrid, diff_cells,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{info, warn};

use crate::config::{BoardConfig, sse_broadcast_buffer};

/// Pre-serialized SSE event, serialized once and shared by all clients via Arc.
#[derive(Debug, Clone)]
pub enum PreSerializedEvent {
    Snapshot { seq: u64, json: Arc<Bytes> },
    Update { seq: u64, json: Arc<Bytes> },
}

/// Last published board, kept serialized for cheap reads.
#[derive(Debug, Clone)]
pub struct LiveBoard {
    pub seq: u64,
    pub view: BoardView,
    /// Body of `GET /api/board`.
    pub board_json: Arc<Bytes>,
    /// `BoardEvent::Snapshot` payload replayed to new or lagging SSE clients.
    pub snapshot_json: Arc<Bytes>,
}

/// Mutable game state. Every click runs to completion under the game lock.
#[derive(Debug)]
pub struct Game {
    pub board: Board,
    pub controller: Controller,
    pub surface: OutlineRegistry,
    players: u8,
    rng: ChaCha8Rng,
}

impl Game {
    pub fn new(config: &BoardConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let board = Board::random(RectGrid::new(config.layout), config.players, &mut rng);
        Self {
            board,
            controller: Controller::new(),
            surface: OutlineRegistry::new(),
            players: config.players,
            rng,
        }
    }

    pub fn players(&self) -> u8 {
        self.players
    }

    /// Re-rolls every owner and forgets all kingdoms.
    pub fn reset(&mut self) {
        let grid = self.board.grid().clone();
        self.board = Board::random(grid, self.players, &mut self.rng);
        self.controller = Controller::new();
        self.surface.clear();
    }

    pub fn view(&self, seq: u64, timestamp: String) -> BoardView {
        BoardView::capture(
            &self.board,
            &self.controller,
            &self.surface,
            self.players,
            seq,
            timestamp,
        )
    }
}

#[derive(Clone)]
pub struct AppState {
    pub game: Arc<Mutex<Game>>,
    pub live: Arc<RwLock<LiveBoard>>,
    pub next_seq: Arc<AtomicU64>,
    pub event_tx: broadcast::Sender<PreSerializedEvent>,
}

impl AppState {
    pub fn new(config: BoardConfig) -> Self {
        let (event_tx, _) = broadcast::channel(sse_broadcast_buffer());
        let game = Game::new(&config);
        let view = game.view(0, Utc::now().to_rfc3339());
        let live = live_board(view).unwrap_or_else(|e| {
            warn!(error = %e, "failed to serialize initial board");
            LiveBoard {
                seq: 0,
                view: game.view(0, String::new()),
                board_json: Arc::new(Bytes::from_static(b"{}")),
                snapshot_json: Arc::new(Bytes::new()),
            }
        });
        info!(
            width = config.layout.width,
            height = config.layout.height,
            players = config.players,
            seeded = config.seed.is_some(),
            "board generated"
        );

        Self {
            game: Arc::new(Mutex::new(game)),
            live: Arc::new(RwLock::new(live)),
            next_seq: Arc::new(AtomicU64::new(0)),
            event_tx,
        }
    }

    /// Runs one click and publishes the resulting changes.
    pub async fn click(&self, pos: CellPos) -> Result<ClickResponse, BoardError> {
        let mut game = self.game.lock().await;
        let outcome = {
            let Game {
                board,
                controller,
                surface,
                ..
            } = &mut *game;
            controller.click(board, pos, surface)?
        };
        info!(%pos, ?outcome, "click handled");
        let seq = self.publish_update(&game).await;
        Ok(ClickResponse { seq, outcome })
    }

    /// Generates a fresh board and broadcasts it as a snapshot.
    pub async fn reset(&self) -> u64 {
        let mut game = self.game.lock().await;
        game.reset();
        info!("board reset");
        self.publish_snapshot(&game).await
    }

    async fn publish_update(&self, game: &Game) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let timestamp = Utc::now().to_rfc3339();
        let view = game.view(seq, timestamp.clone());

        let mut live = self.live.write().await;
        let event = BoardEvent::Update {
            seq,
            changes: diff_cells(&live.view.cells, &view.cells),
            outlines: view.outlines.clone(),
            selected: view.selected,
            timestamp,
        };
        let json = match serde_json::to_vec(&event) {
            Ok(json) => Arc::new(Bytes::from(json)),
            Err(e) => {
                warn!(seq, error = %e, "failed to serialize update event");
                return seq;
            }
        };
        match live_board(view) {
            Ok(next) => *live = next,
            Err(e) => warn!(seq, error = %e, "failed to serialize board"),
        }
        drop(live);

        // No subscribers is not an error.
        let _ = self
            .event_tx
            .send(PreSerializedEvent::Update { seq, json });
        seq
    }

    async fn publish_snapshot(&self, game: &Game) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let view = game.view(seq, Utc::now().to_rfc3339());

        let next = match live_board(view) {
            Ok(next) => next,
            Err(e) => {
                warn!(seq, error = %e, "failed to serialize snapshot");
                return seq;
            }
        };
        let json = Arc::clone(&next.snapshot_json);
        *self.live.write().await = next;
        let _ = self
            .event_tx
            .send(PreSerializedEvent::Snapshot { seq, json });
        seq
    }
}

fn live_board(view: BoardView) -> Result<LiveBoard, serde_json::Error> {
    let board_json = serde_json::to_vec(&view)?;
    let snapshot_json = serde_json::to_vec(&BoardEvent::Snapshot {
        seq: view.seq,
        timestamp: view.timestamp.clone(),
        board: view.clone(),
    })?;
    Ok(LiveBoard {
        seq: view.seq,
        view,
        board_json: Arc::new(Bytes::from(board_json)),
        snapshot_json: Arc::new(Bytes::from(snapshot_json)),
    })
}
