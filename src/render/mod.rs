//! 2D skeleton drawing.
//!
//! Components draw into a [`Surface`].  The production surface is a
//! [`DisplayList`]: a retained list of draw operations that behaves like a
//! canvas (it keeps its content until cleared) and is replayed onto the egui
//! painter every frame by [`paint_display_list`].

pub mod painter;
pub mod skeleton;
pub mod surface;

pub use painter::paint_display_list;
pub use skeleton::{DrawStats, SkeletonRenderer, SkeletonStyle, VISIBILITY_THRESHOLD};
pub use surface::{DisplayList, DrawOp, Point, Rgba, Surface};
