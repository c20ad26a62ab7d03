use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Tolerance used when deciding whether a point sits on a polygon edge.
const EDGE_EPSILON: f64 = 1e-6;

/// A point in world space (screen orientation: x grows right, y grows down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub const ORIGIN: Vertex = Vertex { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Vertex) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn approx_eq(self, other: Vertex, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

impl Add for Vertex {
    type Output = Vertex;

    fn add(self, rhs: Vertex) -> Vertex {
        Vertex::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vertex {
    type Output = Vertex;

    fn sub(self, rhs: Vertex) -> Vertex {
        Vertex::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vertex {
    type Output = Vertex;

    fn neg(self) -> Vertex {
        Vertex::new(-self.x, -self.y)
    }
}

/// Midpoint of the axis-aligned bounding box of `vertices`.
///
/// This is deliberately not an area centroid: kingdom placement is defined in
/// terms of bounding boxes. Returns `None` for an empty input.
pub fn bounds_center<I>(vertices: I) -> Option<Vertex>
where
    I: IntoIterator<Item = Vertex>,
{
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    let mut any = false;
    for v in vertices {
        any = true;
        min_x = min_x.min(v.x);
        min_y = min_y.min(v.y);
        max_x = max_x.max(v.x);
        max_y = max_y.max(v.y);
    }
    if !any {
        return None;
    }
    Some(Vertex::new(
        (max_x - min_x) / 2.0 + min_x,
        (max_y - min_y) / 2.0 + min_y,
    ))
}

/// Shoelace area. Positive for contours listed clockwise on screen (y down),
/// which is the order grid corners are produced in.
pub fn signed_area(contour: &[Vertex]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for (i, a) in contour.iter().enumerate() {
        let b = contour[(i + 1) % contour.len()];
        twice += a.x * b.y - b.x * a.y;
    }
    twice / 2.0
}

/// Even-odd point-in-polygon test. Points lying on an edge count as inside.
pub fn contains_point(contour: &[Vertex], point: Vertex) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = contour.len() - 1;
    for i in 0..contour.len() {
        let a = contour[i];
        let b = contour[j];
        if on_segment(a, b, point) {
            return true;
        }
        if (a.y > point.y) != (b.y > point.y) {
            let cross_x = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn on_segment(a: Vertex, b: Vertex, p: Vertex) -> bool {
    let len = a.distance_to(b);
    if len <= EDGE_EPSILON {
        return p.distance_to(a) <= EDGE_EPSILON;
    }
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if (cross / len).abs() > EDGE_EPSILON {
        return false;
    }
    let dot = (p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y);
    dot >= -EDGE_EPSILON && dot <= len * len + EDGE_EPSILON
}
