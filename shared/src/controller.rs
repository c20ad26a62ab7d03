//! Click handling and kingdom selection.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::board::Board;
use crate::cell::PlayerId;
use crate::error::BoardError;
use crate::grid::{CellPos, HexGrid};
use crate::kingdom::KingdomId;
use crate::render::Surface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// The clicked cell's kingdom is now selected and drawn.
    Selected { kingdom: KingdomId },
    /// A lone cell was handed to the selected kingdom.
    Annexed {
        kingdom: KingdomId,
        cell: CellPos,
        previous_owner: PlayerId,
    },
    /// Lone cell clicked with nothing selected.
    Ignored,
}

/// Owns the current selection; at most one kingdom is drawn at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controller {
    selected: Option<KingdomId>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<KingdomId> {
        self.selected
    }

    pub fn click<G, S>(
        &mut self,
        board: &mut Board<G>,
        pos: CellPos,
        surface: &mut S,
    ) -> Result<ClickOutcome, BoardError>
    where
        G: HexGrid,
        S: Surface + ?Sized,
    {
        let target = board.kingdom_of(pos)?;
        // Rediscovery may have dissolved the selected kingdom.
        if let Some(selected) = self.selected
            && board.kingdom(selected).is_none()
        {
            self.selected = None;
        }

        let outcome = match (target, self.selected) {
            (Some(kingdom), previous) => {
                if let Some(previous) = previous {
                    board.destroy(previous, surface)?;
                }
                board.render(kingdom, pos, surface)?;
                self.selected = Some(kingdom);
                ClickOutcome::Selected { kingdom }
            }
            (None, Some(selected)) => {
                let owner = board
                    .kingdom(selected)
                    .ok_or(BoardError::UnknownKingdom(selected))?
                    .owner();
                let previous_owner = board.set_owner(pos, owner, surface)?;
                board.add_cell(selected, pos, surface)?;
                info!(kingdom = %selected, cell = %pos, from = %previous_owner, "cell annexed");
                ClickOutcome::Annexed {
                    kingdom: selected,
                    cell: pos,
                    previous_owner,
                }
            }
            (None, None) => ClickOutcome::Ignored,
        };

        board.sync_drawings(surface)?;
        Ok(outcome)
    }

    /// Drops the selection and its drawing.
    pub fn clear<G, S>(&mut self, board: &mut Board<G>, surface: &mut S) -> Result<(), BoardError>
    where
        G: HexGrid,
        S: Surface + ?Sized,
    {
        if let Some(selected) = self.selected.take()
            && board.kingdom(selected).is_some()
        {
            board.destroy(selected, surface)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::KingdomSlot;
    use crate::grid::{GridLayout, RectGrid};
    use crate::render::OutlineRegistry;

    fn board(rows: &[&str]) -> Board {
        let grid = RectGrid::new(GridLayout {
            width: rows[0].len() as u32,
            height: rows.len() as u32,
            ..GridLayout::default()
        });
        Board::new(grid, |pos| {
            PlayerId(rows[pos.row as usize].as_bytes()[pos.col as usize] - b'0')
        })
    }

    fn p(col: i32, row: i32) -> CellPos {
        CellPos::new(col, row)
    }

    #[test]
    fn lone_cell_without_selection_is_ignored() {
        let mut board = board(&["010"]);
        let mut surface = OutlineRegistry::new();
        let mut controller = Controller::new();
        let outcome = controller.click(&mut board, p(1, 0), &mut surface).unwrap();
        assert_eq!(outcome, ClickOutcome::Ignored);
        assert_eq!(controller.selected(), None);
        assert_eq!(board.owner(p(1, 0)), Some(PlayerId(1)));
        assert!(surface.is_empty());
    }

    #[test]
    fn clicking_kingdoms_moves_the_selection() {
        let mut board = board(&["00011"]);
        let mut surface = OutlineRegistry::new();
        let mut controller = Controller::new();

        let ClickOutcome::Selected { kingdom: first } =
            controller.click(&mut board, p(1, 0), &mut surface).unwrap()
        else {
            panic!("expected selection");
        };
        assert_eq!(surface.len(), 1);

        let ClickOutcome::Selected { kingdom: second } =
            controller.click(&mut board, p(4, 0), &mut surface).unwrap()
        else {
            panic!("expected selection");
        };
        assert_ne!(first, second);
        assert_eq!(controller.selected(), Some(second));
        assert!(!board.kingdom(first).unwrap().is_rendering());
        assert_eq!(surface.len(), 1);
        assert_eq!(surface.outlines()[0].kingdom, second);
    }

    #[test]
    fn reclicking_the_selected_kingdom_redraws_once() {
        let mut board = board(&["001"]);
        let mut surface = OutlineRegistry::new();
        let mut controller = Controller::new();
        controller.click(&mut board, p(0, 0), &mut surface).unwrap();
        controller.click(&mut board, p(1, 0), &mut surface).unwrap();
        assert_eq!(surface.len(), 1);
        let id = controller.selected().unwrap();
        assert_eq!(board.kingdom(id).unwrap().anchor(), Some(p(1, 0)));
    }

    #[test]
    fn lone_cell_is_annexed_by_the_selection() {
        // (4, 0) is a lone player-2 cell, not adjacent to the kingdom.
        let mut board = board(&["00012"]);
        let mut surface = OutlineRegistry::new();
        let mut controller = Controller::new();
        controller.click(&mut board, p(0, 0), &mut surface).unwrap();
        let id = controller.selected().unwrap();
        let corners_before = board.kingdom(id).unwrap().boundary().vertex_count();

        let outcome = controller.click(&mut board, p(4, 0), &mut surface).unwrap();
        assert_eq!(
            outcome,
            ClickOutcome::Annexed {
                kingdom: id,
                cell: p(4, 0),
                previous_owner: PlayerId(2),
            }
        );
        let kingdom = board.kingdom(id).unwrap();
        assert_eq!(board.owner(p(4, 0)), Some(PlayerId(0)));
        assert_eq!(kingdom.len(), 4);
        assert_eq!(board.slot(p(4, 0)), Some(KingdomSlot::Member(id)));
        assert!(kingdom.boundary().vertex_count() > corners_before);
        for corner in board.grid().corners_of(p(4, 0)) {
            assert!(kingdom.boundary().contains(corner));
        }

        // Outline was redrawn with the new boundary.
        assert_eq!(surface.len(), 1);
        assert_eq!(surface.outlines()[0].contours.len(), 2);
    }

    #[test]
    fn annexing_an_adjacent_lone_cell_keeps_one_contour() {
        let mut board = board(&["0001"]);
        let mut surface = OutlineRegistry::new();
        let mut controller = Controller::new();
        controller.click(&mut board, p(2, 0), &mut surface).unwrap();
        controller.click(&mut board, p(3, 0), &mut surface).unwrap();

        let id = controller.selected().unwrap();
        let kingdom = board.kingdom(id).unwrap();
        assert_eq!(kingdom.len(), 4);
        assert!(kingdom.boundary().is_simple());
        assert_eq!(kingdom.boundary().outline().unwrap().len(), 18);
    }

    #[test]
    fn dissolved_selection_is_forgotten() {
        let mut board = board(&["00100"]);
        let mut surface = OutlineRegistry::new();
        let mut controller = Controller::new();
        controller.click(&mut board, p(0, 0), &mut surface).unwrap();
        let left = controller.selected().unwrap();

        // Bridge both halves; clicking the bridge rediscovers the whole row.
        board.set_owner(p(2, 0), PlayerId(0), &mut surface).unwrap();
        let outcome = controller.click(&mut board, p(2, 0), &mut surface).unwrap();
        let ClickOutcome::Selected { kingdom } = outcome else {
            panic!("expected selection");
        };
        assert_ne!(kingdom, left);
        assert!(board.kingdom(left).is_none());
        assert_eq!(board.kingdom(kingdom).unwrap().len(), 5);
        assert_eq!(surface.len(), 1);
        assert_eq!(surface.outlines()[0].kingdom, kingdom);
    }

    #[test]
    fn clear_releases_the_drawing() {
        let mut board = board(&["00"]);
        let mut surface = OutlineRegistry::new();
        let mut controller = Controller::new();
        controller.click(&mut board, p(0, 0), &mut surface).unwrap();
        controller.clear(&mut board, &mut surface).unwrap();
        assert_eq!(controller.selected(), None);
        assert!(surface.is_empty());
    }

    #[test]
    fn outcome_wire_format() {
        let json = serde_json::to_value(ClickOutcome::Selected {
            kingdom: KingdomId(3),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"kind": "selected", "kingdom": 3}));
        let json = serde_json::to_value(ClickOutcome::Ignored).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "ignored"}));
    }
}
