use serde::{Deserialize, Serialize};

use crate::boundary::{Boundary, resolve_boundary};
use crate::cell::PlayerId;
use crate::error::BoardError;
use crate::geometry::Vertex;
use crate::grid::{CellPos, HexGrid};
use crate::render::DrawHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KingdomId(pub u32);

impl std::fmt::Display for KingdomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "kingdom #{}", self.0)
    }
}

/// Active drawing registration of a kingdom outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    pub handle: DrawHandle,
    /// Cell whose render position the outline was placed against.
    pub anchor: CellPos,
}

/// A connected region of same-owner cells and its outline.
///
/// Mutation goes through [`crate::board::Board`], which also keeps every
/// member cell's cached back-reference in sync.
#[derive(Debug, Clone)]
pub struct Kingdom {
    id: KingdomId,
    owner: PlayerId,
    cells: Vec<CellPos>,
    boundary: Boundary,
    pub(crate) rendering: Option<RenderState>,
}

impl Kingdom {
    pub(crate) fn new<G: HexGrid + ?Sized>(
        id: KingdomId,
        owner: PlayerId,
        cells: Vec<CellPos>,
        grid: &G,
    ) -> Result<Self, BoardError> {
        if cells.len() < 2 {
            return Err(BoardError::KingdomTooSmall(cells.len()));
        }
        let boundary = outline_cells(grid, &cells)?;
        Ok(Self {
            id,
            owner,
            cells,
            boundary,
            rendering: None,
        })
    }

    pub fn id(&self) -> KingdomId {
        self.id
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn cells(&self) -> &[CellPos] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        self.cells.contains(&pos)
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering.is_some()
    }

    pub fn anchor(&self) -> Option<CellPos> {
        self.rendering.map(|r| r.anchor)
    }

    /// Appends `pos` and recomputes the outline. No-op for existing members.
    pub(crate) fn push_cell<G: HexGrid + ?Sized>(
        &mut self,
        pos: CellPos,
        grid: &G,
    ) -> Result<(), BoardError> {
        if self.contains(pos) {
            return Ok(());
        }
        let mut cells = self.cells.clone();
        cells.push(pos);
        self.boundary = outline_cells(grid, &cells)?;
        self.cells = cells;
        Ok(())
    }

    /// Drops `pos` and recomputes the outline. The last cell cannot be removed.
    pub(crate) fn drop_cell<G: HexGrid + ?Sized>(
        &mut self,
        pos: CellPos,
        grid: &G,
    ) -> Result<(), BoardError> {
        if !self.contains(pos) {
            return Err(BoardError::NotMember {
                kingdom: self.id,
                cell: pos,
            });
        }
        if self.cells.len() == 1 {
            return Err(BoardError::LastCell {
                kingdom: self.id,
                cell: pos,
            });
        }
        let cells: Vec<CellPos> = self.cells.iter().copied().filter(|c| *c != pos).collect();
        self.boundary = outline_cells(grid, &cells)?;
        self.cells = cells;
        Ok(())
    }

    /// Every corner of every member cell, in member order.
    pub fn member_corners<G: HexGrid + ?Sized>(&self, grid: &G) -> Vec<Vertex> {
        self.cells
            .iter()
            .flat_map(|pos| grid.corners_of(*pos))
            .collect()
    }
}

fn outline_cells<G: HexGrid + ?Sized>(grid: &G, cells: &[CellPos]) -> Result<Boundary, BoardError> {
    let hexagons: Vec<_> = cells.iter().map(|pos| grid.corners_of(*pos)).collect();
    Ok(resolve_boundary(&hexagons)?)
}
