//! Drawing-surface trait and the retained display list implementing it.

/// A position in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Straight (non-premultiplied) RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }
}

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Line {
        from: Point,
        to: Point,
        width: f32,
        color: Rgba,
    },
    Point {
        at: Point,
        radius: f32,
        color: Rgba,
    },
    /// Full-surface dimming with a centred caption (e.g. "Paused").
    Overlay { text: String },
}

/// Something a skeleton can be drawn onto.
pub trait Surface {
    /// `(width, height)` in pixels.
    fn size(&self) -> (f32, f32);

    /// Erase everything drawn so far.
    fn clear(&mut self);

    fn draw_line(&mut self, from: Point, to: Point, width: f32, color: Rgba);

    fn fill_point(&mut self, at: Point, radius: f32, color: Rgba);

    fn draw_overlay(&mut self, text: &str);
}

// ---------------------------------------------------------------------------
// DisplayList
// ---------------------------------------------------------------------------

/// Retained canvas: operations stay until the next [`Surface::clear`].
///
/// `revision` increases on every mutation, which lets callers (and tests)
/// observe whether anything was drawn.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    width: f32,
    height: f32,
    ops: Vec<DrawOp>,
    revision: u64,
}

impl DisplayList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
            revision: 0,
        }
    }

    /// Track the on-screen size; takes effect on the next draw.
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn line_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Line { .. }))
            .count()
    }

    pub fn point_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Point { .. }))
            .count()
    }

    pub fn has_overlay(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, DrawOp::Overlay { .. }))
    }

    fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
        self.revision += 1;
    }
}

impl Surface for DisplayList {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.revision += 1;
    }

    fn draw_line(&mut self, from: Point, to: Point, width: f32, color: Rgba) {
        self.push(DrawOp::Line {
            from,
            to,
            width,
            color,
        });
    }

    fn fill_point(&mut self, at: Point, radius: f32, color: Rgba) {
        self.push(DrawOp::Point { at, radius, color });
    }

    fn draw_overlay(&mut self, text: &str) {
        self.push(DrawOp::Overlay { text: text.into() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_are_retained_until_clear() {
        let mut list = DisplayList::new(100.0, 50.0);
        list.fill_point(Point::new(1.0, 2.0), 3.0, Rgba::rgb(1, 2, 3));
        list.draw_line(Point::new(0.0, 0.0), Point::new(1.0, 1.0), 2.0, Rgba::rgb(0, 0, 0));
        assert_eq!(list.point_count(), 1);
        assert_eq!(list.line_count(), 1);

        list.clear();
        assert!(list.ops().is_empty());
    }

    #[test]
    fn revision_tracks_every_mutation() {
        let mut list = DisplayList::new(10.0, 10.0);
        assert_eq!(list.revision(), 0);
        list.clear();
        list.draw_overlay("Paused");
        assert_eq!(list.revision(), 2);
        assert!(list.has_overlay());
    }

    #[test]
    fn set_size_updates_reported_size() {
        let mut list = DisplayList::default();
        list.set_size(640.0, 480.0);
        assert_eq!(list.size(), (640.0, 480.0));
    }
}
