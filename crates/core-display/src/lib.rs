//! Display staging structures: faces, atoms, lines and the display buffer.
//!
//! A redraw builds a [`DisplayBuffer`] covering the visible lines, runs the
//! highlighter pipeline over it, and hands the result to the drawing backend.
//! Everything here is renderer-agnostic: atoms carry byte coordinate ranges
//! plus a final [`Face`]; how a face maps onto a device is the backend's
//! problem.

mod atom;
mod face;
mod line;

pub use atom::{AtomKind, DisplayAtom};
pub use face::{Attribute, Color, Face, FaceRegistry};
pub use line::{CoordRange, DisplayBuffer, DisplayLine, EMPTY_RANGE};
