use serde::{Deserialize, Serialize};

use crate::grid::CellPos;
use crate::kingdom::KingdomId;

/// Index of a player; doubles as an index into the colour palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player {}", self.0)
    }
}

/// Game state of one grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub pos: CellPos,
    pub owner: PlayerId,
}

/// Cached kingdom membership of a cell, kept in the board's side table.
///
/// A missing entry means "not computed yet"; `Isolated` means the cell was
/// examined and has no same-owner neighbour to form a kingdom with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum KingdomSlot {
    Member(KingdomId),
    Isolated,
}

impl KingdomSlot {
    pub fn kingdom(self) -> Option<KingdomId> {
        match self {
            Self::Member(id) => Some(id),
            Self::Isolated => None,
        }
    }
}
