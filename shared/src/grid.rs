//! Hexagonal grid adapter.
//!
//! The kingdom core only talks to the grid through [`HexGrid`]: containment,
//! neighbour lookup and world-space corner/center positions. [`RectGrid`] is
//! the rectangular board the game is played on.

use serde::{Deserialize, Serialize};

use crate::geometry::Vertex;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Offset coordinate of a cell on a rectangular board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    pub col: i32,
    pub row: i32,
}

impl CellPos {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

impl std::fmt::Display for CellPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Narrow interface the kingdom core consumes from the grid.
pub trait HexGrid {
    fn contains(&self, pos: CellPos) -> bool;

    /// Every in-bounds position, row-major.
    fn positions(&self) -> Vec<CellPos>;

    /// The six neighbours of `pos`; slots outside the grid are `None`.
    fn neighbors_of(&self, pos: CellPos) -> [Option<CellPos>; 6];

    /// World-space corners, always in the same grid-dependent order.
    fn corners_of(&self, pos: CellPos) -> [Vertex; 6];

    fn center_of(&self, pos: CellPos) -> Vertex;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Flat,
    Pointy,
}

impl Orientation {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "flat" => Some(Self::Flat),
            "pointy" => Some(Self::Pointy),
            _ => None,
        }
    }
}

/// Board shape: `width` columns by `height` rows of hexagons with circumradius `size`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    pub width: u32,
    pub height: u32,
    pub size: f64,
    #[serde(default)]
    pub orientation: Orientation,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            width: 10,
            height: 5,
            size: 50.0,
            orientation: Orientation::Flat,
        }
    }
}

/// Axial neighbour offsets, clockwise on screen.
const AXIAL_DIRECTIONS: [(i32, i32); 6] = [(1, 0), (0, 1), (-1, 1), (-1, 0), (0, -1), (1, -1)];

/// Rectangular hex board. Flat boards use odd-q offset rows, pointy boards odd-r.
#[derive(Debug, Clone, PartialEq)]
pub struct RectGrid {
    layout: GridLayout,
}

impl RectGrid {
    pub fn new(layout: GridLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.layout.width as usize * self.layout.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn axial_of(&self, pos: CellPos) -> (i32, i32) {
        match self.layout.orientation {
            Orientation::Flat => (pos.col, pos.row - (pos.col - (pos.col & 1)) / 2),
            Orientation::Pointy => (pos.col - (pos.row - (pos.row & 1)) / 2, pos.row),
        }
    }

    fn offset_of(&self, q: i32, r: i32) -> CellPos {
        match self.layout.orientation {
            Orientation::Flat => CellPos::new(q, r + (q - (q & 1)) / 2),
            Orientation::Pointy => CellPos::new(q + (r - (r & 1)) / 2, r),
        }
    }

    /// Center of the cell at axial `(0, 0)`, i.e. offset `(0, 0)`.
    fn axial_origin(&self) -> Vertex {
        let s = self.layout.size;
        match self.layout.orientation {
            Orientation::Flat => Vertex::new(s, SQRT_3 * s / 2.0),
            Orientation::Pointy => Vertex::new(SQRT_3 * s / 2.0, s),
        }
    }

    /// Resolves a world-space point to the cell under it, if any.
    pub fn cell_at(&self, point: Vertex) -> Option<CellPos> {
        let s = self.layout.size;
        if s <= 0.0 {
            return None;
        }
        let local = point - self.axial_origin();
        let (q, r) = match self.layout.orientation {
            Orientation::Flat => (
                (2.0 / 3.0 * local.x) / s,
                (-1.0 / 3.0 * local.x + SQRT_3 / 3.0 * local.y) / s,
            ),
            Orientation::Pointy => (
                (SQRT_3 / 3.0 * local.x - 1.0 / 3.0 * local.y) / s,
                (2.0 / 3.0 * local.y) / s,
            ),
        };
        let (q, r) = cube_round(q, r);
        let pos = self.offset_of(q, r);
        self.contains(pos).then_some(pos)
    }

    /// `(min_x, min_y, max_x, max_y)` over every cell's corners.
    pub fn world_bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        let mut any = false;
        for pos in self.positions() {
            for corner in self.corners_of(pos) {
                any = true;
                min_x = min_x.min(corner.x);
                min_y = min_y.min(corner.y);
                max_x = max_x.max(corner.x);
                max_y = max_y.max(corner.y);
            }
        }
        any.then_some((min_x, min_y, max_x, max_y))
    }
}

impl HexGrid for RectGrid {
    fn contains(&self, pos: CellPos) -> bool {
        pos.col >= 0
            && pos.row >= 0
            && (pos.col as u32) < self.layout.width
            && (pos.row as u32) < self.layout.height
    }

    fn positions(&self) -> Vec<CellPos> {
        let mut out = Vec::with_capacity(self.len());
        for row in 0..self.layout.height as i32 {
            for col in 0..self.layout.width as i32 {
                out.push(CellPos::new(col, row));
            }
        }
        out
    }

    fn neighbors_of(&self, pos: CellPos) -> [Option<CellPos>; 6] {
        let (q, r) = self.axial_of(pos);
        AXIAL_DIRECTIONS.map(|(dq, dr)| {
            let neighbor = self.offset_of(q + dq, r + dr);
            self.contains(neighbor).then_some(neighbor)
        })
    }

    fn corners_of(&self, pos: CellPos) -> [Vertex; 6] {
        let center = self.center_of(pos);
        let s = self.layout.size;
        let start = match self.layout.orientation {
            Orientation::Flat => 0.0,
            Orientation::Pointy => 30.0,
        };
        std::array::from_fn(|i| {
            let angle = (start + 60.0 * i as f64).to_radians();
            Vertex::new(center.x + s * angle.cos(), center.y + s * angle.sin())
        })
    }

    fn center_of(&self, pos: CellPos) -> Vertex {
        let s = self.layout.size;
        let origin = self.axial_origin();
        match self.layout.orientation {
            Orientation::Flat => {
                let h = SQRT_3 * s;
                let shove = if pos.col & 1 == 1 { h / 2.0 } else { 0.0 };
                Vertex::new(
                    origin.x + 1.5 * s * pos.col as f64,
                    origin.y + h * pos.row as f64 + shove,
                )
            }
            Orientation::Pointy => {
                let w = SQRT_3 * s;
                let shove = if pos.row & 1 == 1 { w / 2.0 } else { 0.0 };
                Vertex::new(
                    origin.x + w * pos.col as f64 + shove,
                    origin.y + 1.5 * s * pos.row as f64,
                )
            }
        }
    }
}

fn cube_round(q: f64, r: f64) -> (i32, i32) {
    let s = -q - r;
    let mut rq = q.round();
    let mut rr = r.round();
    let rs = s.round();

    let dq = (rq - q).abs();
    let dr = (rr - r).abs();
    let ds = (rs - s).abs();

    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    (rq as i32, rr as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> RectGrid {
        RectGrid::new(GridLayout::default())
    }

    fn pointy() -> RectGrid {
        RectGrid::new(GridLayout {
            orientation: Orientation::Pointy,
            ..GridLayout::default()
        })
    }

    fn present(neighbors: [Option<CellPos>; 6]) -> Vec<CellPos> {
        let mut out: Vec<CellPos> = neighbors.into_iter().flatten().collect();
        out.sort();
        out
    }

    #[test]
    fn flat_even_column_neighbors() {
        let grid = flat();
        assert_eq!(
            present(grid.neighbors_of(CellPos::new(2, 2))),
            vec![
                CellPos::new(1, 1),
                CellPos::new(1, 2),
                CellPos::new(2, 1),
                CellPos::new(2, 3),
                CellPos::new(3, 1),
                CellPos::new(3, 2),
            ]
        );
    }

    #[test]
    fn flat_odd_column_neighbors() {
        let grid = flat();
        assert_eq!(
            present(grid.neighbors_of(CellPos::new(1, 1))),
            vec![
                CellPos::new(0, 1),
                CellPos::new(0, 2),
                CellPos::new(1, 0),
                CellPos::new(1, 2),
                CellPos::new(2, 1),
                CellPos::new(2, 2),
            ]
        );
    }

    #[test]
    fn corner_cell_has_absent_neighbors() {
        let grid = flat();
        let neighbors = grid.neighbors_of(CellPos::new(0, 0));
        assert_eq!(neighbors.iter().filter(|n| n.is_none()).count(), 4);
        assert_eq!(
            present(neighbors),
            vec![CellPos::new(0, 1), CellPos::new(1, 0)]
        );
    }

    #[test]
    fn neighbors_are_symmetric_and_share_two_corners() {
        for grid in [flat(), pointy()] {
            for pos in grid.positions() {
                for neighbor in grid.neighbors_of(pos).into_iter().flatten() {
                    assert!(
                        grid.neighbors_of(neighbor).contains(&Some(pos)),
                        "{neighbor} should list {pos}"
                    );
                    let shared = grid
                        .corners_of(pos)
                        .iter()
                        .filter(|a| {
                            grid.corners_of(neighbor)
                                .iter()
                                .any(|b| a.approx_eq(*b, 1e-9))
                        })
                        .count();
                    assert_eq!(shared, 2, "{pos} and {neighbor} should share an edge");
                }
            }
        }
    }

    #[test]
    fn flat_corners_start_east_and_run_clockwise() {
        let grid = flat();
        let center = grid.center_of(CellPos::new(0, 0));
        let corners = grid.corners_of(CellPos::new(0, 0));
        assert!(corners[0].approx_eq(Vertex::new(center.x + 50.0, center.y), 1e-9));
        assert!(corners[1].y > center.y);
        assert!(crate::geometry::signed_area(&corners) > 0.0);
    }

    #[test]
    fn grid_bounds_start_at_origin() {
        let (min_x, min_y, _, _) = flat().world_bounds().unwrap();
        assert!(min_x.abs() < 1e-9);
        assert!(min_y.abs() < 1e-9);
        let (min_x, min_y, _, _) = pointy().world_bounds().unwrap();
        assert!(min_x.abs() < 1e-9);
        assert!(min_y.abs() < 1e-9);
    }

    #[test]
    fn cell_at_resolves_every_center() {
        for grid in [flat(), pointy()] {
            for pos in grid.positions() {
                assert_eq!(grid.cell_at(grid.center_of(pos)), Some(pos));
            }
        }
    }

    #[test]
    fn cell_at_outside_grid_is_none() {
        assert_eq!(flat().cell_at(Vertex::new(-200.0, -200.0)), None);
        assert_eq!(flat().cell_at(Vertex::new(5_000.0, 100.0)), None);
    }

    #[test]
    fn orientation_parse() {
        assert_eq!(Orientation::parse(" Pointy "), Some(Orientation::Pointy));
        assert_eq!(Orientation::parse("flat"), Some(Orientation::Flat));
        assert_eq!(Orientation::parse("diagonal"), None);
    }
}
