//! Seam to whatever draws kingdom outlines.
//!
//! The board registers one [`Outline`] per rendered kingdom and keeps the
//! returned [`DrawHandle`] until the kingdom is destroyed. [`OutlineRegistry`]
//! is the in-memory surface: it holds the active drawables a frame strokes.

use serde::{Deserialize, Serialize};

use crate::cell::PlayerId;
use crate::geometry::Vertex;
use crate::kingdom::KingdomId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineStyle {
    pub stroke: String,
    pub line_width: f64,
}

impl Default for OutlineStyle {
    fn default() -> Self {
        Self {
            stroke: "white".to_string(),
            line_width: 3.0,
        }
    }
}

/// A kingdom outline ready to stroke: each point is drawn at `position + point`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub kingdom: KingdomId,
    pub owner: PlayerId,
    pub contours: Vec<Vec<Vertex>>,
    pub position: Vertex,
    #[serde(default)]
    pub style: OutlineStyle,
}

impl Outline {
    /// Contours translated to where they are drawn.
    pub fn placed_contours(&self) -> impl Iterator<Item = Vec<Vertex>> + '_ {
        self.contours
            .iter()
            .map(|contour| contour.iter().map(|p| self.position + *p).collect())
    }
}

pub trait Surface {
    fn register_drawable(&mut self, outline: Outline) -> DrawHandle;

    /// Removes a registration. Returns `false` if the handle was not active.
    fn release(&mut self, handle: DrawHandle) -> bool;
}

/// Active outlines in registration order.
#[derive(Debug, Clone, Default)]
pub struct OutlineRegistry {
    next_handle: u64,
    active: Vec<(DrawHandle, Outline)>,
}

impl OutlineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drawables(&self) -> impl Iterator<Item = (DrawHandle, &Outline)> {
        self.active.iter().map(|(handle, outline)| (*handle, outline))
    }

    pub fn get(&self, handle: DrawHandle) -> Option<&Outline> {
        self.active
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, outline)| outline)
    }

    pub fn outlines(&self) -> Vec<Outline> {
        self.active.iter().map(|(_, outline)| outline.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}

impl Surface for OutlineRegistry {
    fn register_drawable(&mut self, outline: Outline) -> DrawHandle {
        self.next_handle += 1;
        let handle = DrawHandle(self.next_handle);
        self.active.push((handle, outline));
        handle
    }

    fn release(&mut self, handle: DrawHandle) -> bool {
        let before = self.active.len();
        self.active.retain(|(h, _)| *h != handle);
        self.active.len() != before
    }
}
