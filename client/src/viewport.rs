use hexdom_shared::Vertex;

const MIN_SCALE: f64 = 0.1;
const MAX_SCALE: f64 = 6.0;
const ZOOM_SENSITIVITY: f64 = 0.001;
/// Fraction of the board extent left empty around a fitted board.
const FIT_PADDING: f64 = 0.05;

/// Pan/zoom transform from world space to canvas CSS pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn to_screen(&self, point: Vertex) -> (f64, f64) {
        (
            point.x * self.scale + self.offset_x,
            point.y * self.scale + self.offset_y,
        )
    }

    pub fn to_world(&self, sx: f64, sy: f64) -> Vertex {
        Vertex::new(
            (sx - self.offset_x) / self.scale,
            (sy - self.offset_y) / self.scale,
        )
    }

    /// Zoom so the world point under `(sx, sy)` stays put.
    pub fn zoom_at(&mut self, delta: f64, sx: f64, sy: f64) {
        let factor = (-delta * ZOOM_SENSITIVITY).exp();
        let new_scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        let ratio = new_scale / self.scale;

        self.offset_x = sx - (sx - self.offset_x) * ratio;
        self.offset_y = sy - (sy - self.offset_y) * ratio;
        self.scale = new_scale;
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Center `(min_x, min_y, max_x, max_y)` in a `width` x `height` canvas.
    /// Degenerate bounds or canvases leave the viewport unchanged.
    pub fn fit_bounds(&mut self, bounds: (f64, f64, f64, f64), width: f64, height: f64) {
        let (min_x, min_y, max_x, max_y) = bounds;
        let world_w = max_x - min_x;
        let world_h = max_y - min_y;
        if world_w <= 0.0 || world_h <= 0.0 || width <= 0.0 || height <= 0.0 {
            return;
        }

        let pad = 1.0 + FIT_PADDING * 2.0;
        self.scale = (width / (world_w * pad))
            .min(height / (world_h * pad))
            .clamp(MIN_SCALE, MAX_SCALE);
        self.offset_x = width / 2.0 - (min_x + max_x) / 2.0 * self.scale;
        self.offset_y = height / 2.0 - (min_y + max_y) / 2.0 * self.scale;
    }
}
