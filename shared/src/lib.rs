pub mod board;
pub mod boundary;
pub mod cell;
pub mod colors;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod events;
pub mod geometry;
pub mod grid;
pub mod kingdom;
pub mod render;

pub use board::Board;
pub use boundary::{Boundary, BoundaryError, Placement, resolve_boundary};
pub use cell::{Cell, KingdomSlot, PlayerId};
pub use colors::{MAX_PLAYERS, PlayerColor, brighten, hex_css, player_color, rgba_css};
pub use controller::{ClickOutcome, Controller};
pub use discovery::discover;
pub use error::BoardError;
pub use events::*;
pub use geometry::Vertex;
pub use grid::{CellPos, GridLayout, HexGrid, Orientation, RectGrid};
pub use kingdom::{Kingdom, KingdomId};
pub use render::{DrawHandle, Outline, OutlineRegistry, OutlineStyle, Surface};
