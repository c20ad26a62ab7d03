use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::cell::PlayerId;
use crate::controller::{ClickOutcome, Controller};
use crate::grid::{CellPos, GridLayout, RectGrid};
use crate::kingdom::KingdomId;
use crate::render::{Outline, OutlineRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    pub pos: CellPos,
    pub owner: PlayerId,
    #[serde(default)]
    pub kingdom: Option<KingdomId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionView {
    pub kingdom: KingdomId,
    pub owner: PlayerId,
    pub size: usize,
}

/// Everything a client needs to draw the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardView {
    pub seq: u64,
    pub timestamp: String,
    pub layout: GridLayout,
    pub players: u8,
    pub cells: Vec<CellView>,
    #[serde(default)]
    pub outlines: Vec<Outline>,
    #[serde(default)]
    pub selected: Option<SelectionView>,
}

impl BoardView {
    pub fn capture(
        board: &Board<RectGrid>,
        controller: &Controller,
        surface: &OutlineRegistry,
        players: u8,
        seq: u64,
        timestamp: String,
    ) -> Self {
        let cells = board
            .cells()
            .into_iter()
            .map(|cell| CellView {
                pos: cell.pos,
                owner: cell.owner,
                kingdom: board.slot(cell.pos).and_then(|slot| slot.kingdom()),
            })
            .collect();
        let selected = controller
            .selected()
            .and_then(|id| board.kingdom(id))
            .map(|kingdom| SelectionView {
                kingdom: kingdom.id(),
                owner: kingdom.owner(),
                size: kingdom.len(),
            });

        Self {
            seq,
            timestamp,
            layout: board.grid().layout(),
            players,
            cells,
            outlines: surface.outlines(),
            selected,
        }
    }

    pub fn cell(&self, pos: CellPos) -> Option<&CellView> {
        self.cells.iter().find(|cell| cell.pos == pos)
    }

    /// Applies a live event. Returns `false` for stale updates.
    pub fn apply(&mut self, event: BoardEvent) -> bool {
        match event {
            BoardEvent::Snapshot { board, .. } => {
                *self = board;
                true
            }
            BoardEvent::Update {
                seq,
                changes,
                outlines,
                selected,
                timestamp,
            } => {
                if seq <= self.seq {
                    return false;
                }
                let index: HashMap<CellPos, usize> = self
                    .cells
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| (cell.pos, i))
                    .collect();
                for change in changes {
                    match index.get(&change.pos) {
                        Some(&i) => self.cells[i] = change,
                        None => self.cells.push(change),
                    }
                }
                self.seq = seq;
                self.timestamp = timestamp;
                self.outlines = outlines;
                self.selected = selected;
                true
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BoardEvent {
    Snapshot {
        #[serde(default)]
        seq: u64,
        board: BoardView,
        timestamp: String,
    },
    Update {
        #[serde(default)]
        seq: u64,
        changes: Vec<CellView>,
        #[serde(default)]
        outlines: Vec<Outline>,
        #[serde(default)]
        selected: Option<SelectionView>,
        timestamp: String,
    },
}

impl BoardEvent {
    pub fn seq(&self) -> u64 {
        match self {
            Self::Snapshot { seq, .. } | Self::Update { seq, .. } => *seq,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickRequest {
    pub col: i32,
    pub row: i32,
}

impl ClickRequest {
    pub fn pos(&self) -> CellPos {
        CellPos::new(self.col, self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickResponse {
    pub seq: u64,
    pub outcome: ClickOutcome,
}

/// Cells of `after` that differ from `before` at the same position.
pub fn diff_cells(before: &[CellView], after: &[CellView]) -> Vec<CellView> {
    let previous: HashMap<CellPos, &CellView> = before.iter().map(|c| (c.pos, c)).collect();
    after
        .iter()
        .filter(|cell| previous.get(&cell.pos).is_none_or(|old| *old != *cell))
        .copied()
        .collect()
}
