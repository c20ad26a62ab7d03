//! Outer outline of a set of hexagons.
//!
//! Member hexagons are unioned pairwise with [`PolygonUnion`], an edge
//! cancellation union for polygons that live on a common lattice (grid cells
//! share corners exactly, up to float noise). Two polygons touching along an
//! edge lose that edge and merge into a single contour.
//!
//! The union keeps the winding of the first polygon it is given, so outer
//! contours come back in the same screen-clockwise order as grid corners and no
//! orientation fix-up is needed afterwards. Contours of opposite winding are
//! holes; they are dropped, which means a ring of cells is outlined as if it
//! were solid.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::geometry::{Vertex, bounds_center, contains_point, signed_area};

/// Vertices closer than this fraction of the shortest polygon edge are the same vertex.
const SNAP_STEPS_PER_EDGE: f64 = 10_000.0;

type VertexKey = (i64, i64);

fn vertex_key(v: Vertex, scale: f64) -> VertexKey {
    ((v.x * scale).round() as i64, (v.y * scale).round() as i64)
}

/// Snap scale for a polygon: `SNAP_STEPS_PER_EDGE` steps along its shortest edge.
fn snap_scale(polygon: &[Vertex]) -> Option<f64> {
    let shortest = polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(a, b)| a.distance_to(*b))
        .filter(|len| len.is_finite() && *len > 0.0)
        .min_by(f64::total_cmp)?;
    let scale = SNAP_STEPS_PER_EDGE / shortest;
    scale.is_finite().then_some(scale)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoundaryError {
    #[error("cannot outline an empty region")]
    EmptyRegion,
    #[error("union produced no outer contour")]
    Degenerate,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    from_key: VertexKey,
    to_key: VertexKey,
}

/// Accumulating union of lattice-aligned simple polygons.
///
/// Vertex comparison is relative to the first polygon's size, so the union
/// behaves the same for any uniform scaling of its input.
#[derive(Debug, Clone, Default)]
pub struct PolygonUnion {
    edges: Vec<Option<Edge>>,
    index: HashMap<(VertexKey, VertexKey), usize>,
    clockwise: Option<bool>,
    scale: Option<f64>,
    merged: usize,
}

impl PolygonUnion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of polygons merged so far.
    pub fn len(&self) -> usize {
        self.merged
    }

    pub fn is_empty(&self) -> bool {
        self.merged == 0
    }

    /// Merges `polygon` (open or closed ring) into the union.
    pub fn merge(&mut self, polygon: &[Vertex]) {
        let Some(scale) = self.scale.or_else(|| snap_scale(polygon)) else {
            return;
        };
        let ring = open_ring(polygon, scale);
        if ring.len() < 3 {
            return;
        }
        self.scale = Some(scale);

        let clockwise = signed_area(ring) >= 0.0;
        let union_clockwise = *self.clockwise.get_or_insert(clockwise);
        let mut ring = ring.to_vec();
        if clockwise != union_clockwise {
            ring.reverse();
        }

        for (i, &from) in ring.iter().enumerate() {
            let to = ring[(i + 1) % ring.len()];
            let (from_key, to_key) = (vertex_key(from, scale), vertex_key(to, scale));
            if from_key == to_key {
                continue;
            }
            // A shared edge shows up reversed in the neighbour: both sides vanish.
            if let Some(twin) = self.index.remove(&(to_key, from_key)) {
                self.edges[twin] = None;
                continue;
            }
            if self.index.contains_key(&(from_key, to_key)) {
                continue;
            }
            self.index.insert((from_key, to_key), self.edges.len());
            self.edges.push(Some(Edge {
                from,
                from_key,
                to_key,
            }));
        }
        self.merged += 1;
    }

    /// Closed contours of the union, in edge insertion order.
    ///
    /// The first vertex is never repeated at the end.
    pub fn contours(&self) -> Vec<Vec<Vertex>> {
        let mut outgoing: HashMap<VertexKey, Vec<usize>> = HashMap::new();
        for (i, edge) in self.edges.iter().enumerate() {
            if let Some(edge) = edge {
                outgoing.entry(edge.from_key).or_default().push(i);
            }
        }

        let mut used = vec![false; self.edges.len()];
        let mut contours = Vec::new();
        for start in 0..self.edges.len() {
            let Some(first) = self.edges[start] else {
                continue;
            };
            if used[start] {
                continue;
            }

            let mut contour = Vec::new();
            let mut current = first;
            used[start] = true;
            loop {
                contour.push(current.from);
                if current.to_key == first.from_key {
                    break;
                }
                let next = outgoing
                    .get(&current.to_key)
                    .and_then(|candidates| candidates.iter().copied().find(|&i| !used[i]));
                let Some(next) = next else {
                    warn!(vertices = contour.len(), "union contour left open");
                    break;
                };
                used[next] = true;
                let Some(edge) = self.edges[next] else {
                    break;
                };
                current = edge;
            }

            let contour = match self.scale {
                Some(scale) => open_ring(&contour, scale).to_vec(),
                None => contour,
            };
            if contour.len() >= 3 {
                contours.push(contour);
            }
        }
        contours
    }

    /// Contours wound like the input polygons, i.e. everything but holes.
    pub fn outer_contours(&self) -> (Vec<Vec<Vertex>>, usize) {
        let clockwise = self.clockwise.unwrap_or(true);
        let (outer, holes): (Vec<_>, Vec<_>) = self
            .contours()
            .into_iter()
            .partition(|c| (signed_area(c) >= 0.0) == clockwise);
        (outer, holes.len())
    }
}

/// Drops a trailing vertex that repeats the first one.
fn open_ring(ring: &[Vertex], scale: f64) -> &[Vertex] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last))
            if ring.len() > 1 && vertex_key(*first, scale) == vertex_key(*last, scale) =>
        {
            &ring[..ring.len() - 1]
        }
        _ => ring,
    }
}

/// Resolved outline of a region.
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    /// One closed contour enclosing every member.
    Simple(Vec<Vertex>),
    /// Members do not form one connected shape; one contour per piece.
    Fragmented(Vec<Vec<Vertex>>),
}

impl Boundary {
    pub fn is_simple(&self) -> bool {
        matches!(self, Self::Simple(_))
    }

    /// The single outline, if the region resolved to one.
    pub fn outline(&self) -> Option<&[Vertex]> {
        match self {
            Self::Simple(outline) => Some(outline),
            Self::Fragmented(_) => None,
        }
    }

    pub fn contours(&self) -> &[Vec<Vertex>] {
        match self {
            Self::Simple(outline) => std::slice::from_ref(outline),
            Self::Fragmented(contours) => contours,
        }
    }

    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.contours().iter().flatten().copied()
    }

    pub fn vertex_count(&self) -> usize {
        self.contours().iter().map(Vec::len).sum()
    }

    /// Whether `point` lies on or inside any contour.
    pub fn contains(&self, point: Vertex) -> bool {
        self.contours().iter().any(|c| contains_point(c, point))
    }
}

/// Outline of the union of `hexagons` (one corner array per member cell).
pub fn resolve_boundary(hexagons: &[[Vertex; 6]]) -> Result<Boundary, BoundaryError> {
    match hexagons {
        [] => Err(BoundaryError::EmptyRegion),
        [single] => Ok(Boundary::Simple(single.to_vec())),
        _ => {
            let union = hexagons.iter().fold(PolygonUnion::new(), |mut union, hex| {
                union.merge(hex);
                union
            });
            let (mut outer, holes) = union.outer_contours();
            if holes > 0 {
                debug!(holes, "ignoring enclosed holes in region outline");
            }
            match outer.len() {
                0 => Err(BoundaryError::Degenerate),
                1 => Ok(Boundary::Simple(outer.remove(0))),
                pieces => {
                    warn!(
                        pieces,
                        cells = hexagons.len(),
                        "region outline is not a single contour"
                    );
                    Ok(Boundary::Fragmented(outer))
                }
            }
        }
    }
}

/// Where to draw a boundary relative to the anchor cell's render position.
///
/// The outline's points are drawn at `anchor_center + offset() + point`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Region bounds center minus outline bounds center.
    pub bounds_shift: Vertex,
    /// Moves the outline's own bounds center onto the origin.
    pub recenter_shift: Vertex,
    /// Region bounds center minus the anchor cell's center.
    pub anchor_shift: Vertex,
}

impl Placement {
    /// `member_corners` are all corners of all member cells.
    pub fn compute(
        member_corners: &[Vertex],
        boundary: &Boundary,
        anchor_center: Vertex,
    ) -> Result<Self, BoundaryError> {
        let region = bounds_center(member_corners.iter().copied()).ok_or(BoundaryError::EmptyRegion)?;
        let outline = bounds_center(boundary.vertices()).ok_or(BoundaryError::EmptyRegion)?;
        // Outline points are drawn untransformed, so their local frame is world space.
        let local = bounds_center(boundary.vertices()).ok_or(BoundaryError::EmptyRegion)?;

        Ok(Self {
            bounds_shift: region - outline,
            recenter_shift: Vertex::ORIGIN - local,
            anchor_shift: region - anchor_center,
        })
    }

    pub fn offset(&self) -> Vertex {
        self.bounds_shift + self.recenter_shift + self.anchor_shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellPos, GridLayout, HexGrid, Orientation, RectGrid};

    fn grid() -> RectGrid {
        RectGrid::new(GridLayout::default())
    }

    fn hexes(grid: &RectGrid, cells: &[(i32, i32)]) -> Vec<[Vertex; 6]> {
        cells
            .iter()
            .map(|&(c, r)| grid.corners_of(CellPos::new(c, r)))
            .collect()
    }

    fn assert_encloses(grid: &RectGrid, boundary: &Boundary, members: &[(i32, i32)]) {
        for &(c, r) in members {
            for corner in grid.corners_of(CellPos::new(c, r)) {
                assert!(boundary.contains(corner), "corner {corner:?} of ({c}, {r}) outside");
            }
        }
        for &(c, r) in members {
            for neighbor in grid.neighbors_of(CellPos::new(c, r)).into_iter().flatten() {
                if members.contains(&(neighbor.col, neighbor.row)) {
                    continue;
                }
                assert!(
                    !boundary.contains(grid.center_of(neighbor)),
                    "non-member {neighbor} inside outline"
                );
            }
        }
    }

    #[test]
    fn single_hex_fast_path_matches_general_union() {
        let grid = grid();
        let corners = grid.corners_of(CellPos::new(3, 2));
        let mut union = PolygonUnion::new();
        union.merge(&corners);
        assert_eq!(union.contours(), vec![corners.to_vec()]);
        assert_eq!(
            resolve_boundary(&[corners]).unwrap(),
            Boundary::Simple(corners.to_vec())
        );
    }

    #[test]
    fn closed_input_ring_is_accepted() {
        let corners = grid().corners_of(CellPos::new(0, 0));
        let mut closed = corners.to_vec();
        closed.push(corners[0]);
        let mut union = PolygonUnion::new();
        union.merge(&closed);
        assert_eq!(union.contours(), vec![corners.to_vec()]);
    }

    #[test]
    fn two_neighbors_merge_into_one_contour() {
        let grid = grid();
        let boundary = resolve_boundary(&hexes(&grid, &[(0, 0), (1, 0)])).unwrap();
        let outline = boundary.outline().unwrap();
        assert_eq!(outline.len(), 10);
        assert_encloses(&grid, &boundary, &[(0, 0), (1, 0)]);
    }

    #[test]
    fn row_of_three_is_a_stadium_not_eighteen_corners() {
        let grid = grid();
        let members = [(0, 0), (1, 0), (2, 0)];
        let boundary = resolve_boundary(&hexes(&grid, &members)).unwrap();
        let outline = boundary.outline().unwrap();
        assert!(outline.len() >= 6);
        assert!(outline.len() < 18);
        assert_eq!(outline.len(), 14);
        assert_encloses(&grid, &boundary, &members);
    }

    #[test]
    fn pointy_row_of_three_outlines_correctly() {
        let grid = RectGrid::new(GridLayout {
            orientation: Orientation::Pointy,
            ..GridLayout::default()
        });
        let members = [(0, 0), (1, 0), (2, 0)];
        let boundary = resolve_boundary(&hexes(&grid, &members)).unwrap();
        assert_eq!(boundary.outline().unwrap().len(), 14);
        assert_encloses(&grid, &boundary, &members);
    }

    #[test]
    fn union_keeps_corner_winding() {
        let grid = grid();
        let boundary = resolve_boundary(&hexes(&grid, &[(0, 0), (1, 0), (1, 1), (2, 1)])).unwrap();
        assert!(signed_area(boundary.outline().unwrap()) > 0.0);

        // Counter-clockwise input flips to the first polygon's winding.
        let mut union = PolygonUnion::new();
        let first = grid.corners_of(CellPos::new(0, 0));
        let mut second = grid.corners_of(CellPos::new(1, 0));
        second.reverse();
        union.merge(&first);
        union.merge(&second);
        let (outer, holes) = union.outer_contours();
        assert_eq!(outer.len(), 1);
        assert_eq!(holes, 0);
        assert!(signed_area(&outer[0]) > 0.0);
    }

    #[test]
    fn union_area_equals_sum_of_cells() {
        let grid = grid();
        let members = [(0, 0), (1, 0), (2, 0), (2, 1), (3, 1)];
        let boundary = resolve_boundary(&hexes(&grid, &members)).unwrap();
        let single = signed_area(&grid.corners_of(CellPos::new(0, 0)));
        let total = signed_area(boundary.outline().unwrap());
        assert!((total - single * members.len() as f64).abs() < 1e-6);
    }

    #[test]
    fn concave_bite_stays_outside() {
        let grid = grid();
        // Five of the six neighbours of (2, 2); (2, 2) itself and (3, 2) are left out.
        let members = [(1, 1), (2, 1), (3, 1), (1, 2), (2, 3)];
        let boundary = resolve_boundary(&hexes(&grid, &members)).unwrap();
        assert!(boundary.is_simple());
        assert!(!boundary.contains(grid.center_of(CellPos::new(2, 2))));
        assert_encloses(&grid, &boundary, &members);
    }

    #[test]
    fn enclosed_hole_is_not_outlined() {
        let grid = grid();
        let ring = [(1, 1), (2, 1), (3, 1), (1, 2), (3, 2), (2, 3)];
        let mut union = PolygonUnion::new();
        for hex in hexes(&grid, &ring) {
            union.merge(&hex);
        }
        let (outer, holes) = union.outer_contours();
        assert_eq!(outer.len(), 1);
        assert_eq!(holes, 1);

        let boundary = resolve_boundary(&hexes(&grid, &ring)).unwrap();
        assert!(boundary.is_simple());
        // Known limitation: the hole cell ends up inside the outline.
        assert!(boundary.contains(grid.center_of(CellPos::new(2, 2))));
    }

    #[test]
    fn disjoint_cells_are_reported_as_fragmented() {
        let grid = grid();
        let boundary = resolve_boundary(&hexes(&grid, &[(0, 0), (1, 0), (5, 3)])).unwrap();
        assert!(!boundary.is_simple());
        assert_eq!(boundary.outline(), None);
        assert_eq!(boundary.contours().len(), 2);
        assert_eq!(boundary.vertex_count(), 16);
    }

    #[test]
    fn tiny_cells_still_merge() {
        let grid = RectGrid::new(GridLayout {
            size: 1e-5,
            ..GridLayout::default()
        });
        let boundary = resolve_boundary(&hexes(&grid, &[(0, 0), (1, 0)])).unwrap();
        assert_eq!(boundary.outline().unwrap().len(), 10);
        assert_encloses(&grid, &boundary, &[(0, 0), (1, 0)]);
    }

    #[test]
    fn huge_cells_still_merge() {
        let grid = RectGrid::new(GridLayout {
            size: 1e9,
            ..GridLayout::default()
        });
        let members = [(0, 0), (1, 0), (2, 0)];
        let boundary = resolve_boundary(&hexes(&grid, &members)).unwrap();
        let outline = boundary.outline().unwrap();
        assert_eq!(outline.len(), 14);
        let single = signed_area(&grid.corners_of(CellPos::new(0, 0)));
        assert!((signed_area(outline) / single - 3.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_polygons_are_skipped() {
        let point = Vertex::new(1.0, 1.0);
        let mut union = PolygonUnion::new();
        union.merge(&[point, point, point]);
        assert!(union.is_empty());
        assert!(union.contours().is_empty());
    }

    #[test]
    fn empty_region_is_rejected() {
        assert_eq!(resolve_boundary(&[]), Err(BoundaryError::EmptyRegion));
    }

    #[test]
    fn merging_the_same_hex_twice_is_harmless() {
        let corners = grid().corners_of(CellPos::new(4, 4));
        let mut union = PolygonUnion::new();
        union.merge(&corners);
        union.merge(&corners);
        assert_eq!(union.len(), 2);
        assert_eq!(union.contours(), vec![corners.to_vec()]);
    }

    #[test]
    fn placement_sums_shifts_in_order() {
        let grid = grid();
        let members = [(0, 0), (1, 0), (2, 0)];
        let corners: Vec<Vertex> = hexes(&grid, &members).into_iter().flatten().collect();
        let boundary = resolve_boundary(&hexes(&grid, &members)).unwrap();
        let anchor = grid.center_of(CellPos::new(1, 0));

        let placement = Placement::compute(&corners, &boundary, anchor).unwrap();
        let region = bounds_center(corners.iter().copied()).unwrap();
        assert!(placement.bounds_shift.approx_eq(Vertex::ORIGIN, 1e-9));
        assert!(placement.recenter_shift.approx_eq(-region, 1e-9));
        assert!(placement.anchor_shift.approx_eq(region - anchor, 1e-9));
        assert!(placement.offset().approx_eq(-anchor, 1e-9));
    }

    #[test]
    fn placed_outline_lands_on_member_corners() {
        let grid = grid();
        let members = [(3, 1), (3, 2), (4, 2)];
        let corners: Vec<Vertex> = hexes(&grid, &members).into_iter().flatten().collect();
        let boundary = resolve_boundary(&hexes(&grid, &members)).unwrap();
        for anchor in members {
            let anchor_center = grid.center_of(CellPos::new(anchor.0, anchor.1));
            let offset = Placement::compute(&corners, &boundary, anchor_center)
                .unwrap()
                .offset();
            for point in boundary.vertices() {
                let drawn = anchor_center + offset + point;
                assert!(corners.iter().any(|c| c.approx_eq(drawn, 1e-6)));
            }
        }
    }
}
