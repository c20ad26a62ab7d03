use thiserror::Error;

use crate::boundary::BoundaryError;
use crate::cell::PlayerId;
use crate::grid::CellPos;
use crate::kingdom::KingdomId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("cell {0} is outside the grid")]
    OutOfBounds(CellPos),
    #[error("unknown {0}")]
    UnknownKingdom(KingdomId),
    #[error("cell {cell} belongs to {found}, {kingdom} belongs to {expected}")]
    OwnerMismatch {
        kingdom: KingdomId,
        cell: CellPos,
        expected: PlayerId,
        found: PlayerId,
    },
    #[error("cell {cell} is not part of {kingdom}")]
    NotMember { kingdom: KingdomId, cell: CellPos },
    #[error("cell {cell} is the last cell of {kingdom}")]
    LastCell { kingdom: KingdomId, cell: CellPos },
    #[error("a kingdom needs at least two cells, got {0}")]
    KingdomTooSmall(usize),
    #[error(transparent)]
    Boundary(#[from] BoundaryError),
}
