//! Skeleton rendering: bones and joints of one pose onto a surface.
//!
//! Landmarks arrive in normalised coordinates and are scaled by the surface
//! size.  A bone is drawn only when both of its joints are visible, a joint
//! only when it is visible itself.  The surface is cleared first so the
//! previous pose never shows through.

use crate::pose::{Connection, Landmark, POSE_CONNECTIONS};

use super::surface::{Point, Rgba, Surface};

/// Joints at or below this visibility are not drawn.
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

/// Colours and sizes for one kind of skeleton.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonStyle {
    pub line_color: Rgba,
    pub line_width: f32,
    pub point_color: Rgba,
    pub point_radius: f32,
}

impl SkeletonStyle {
    /// Live user skeleton: green bones, red joints.
    pub const LIVE: Self = Self {
        line_color: Rgba::rgb(0, 255, 0),
        line_width: 4.0,
        point_color: Rgba::rgb(255, 0, 0),
        point_radius: 4.0,
    };

    /// Reference animation: cyan bones, white joints.
    pub const REFERENCE: Self = Self {
        line_color: Rgba::rgb(56, 189, 248),
        line_width: 3.0,
        point_color: Rgba::rgb(240, 240, 240),
        point_radius: 3.0,
    };
}

impl Default for SkeletonStyle {
    fn default() -> Self {
        Self::LIVE
    }
}

/// What one [`SkeletonRenderer::draw`] call put on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawStats {
    pub edges: usize,
    pub points: usize,
}

/// Draws landmark sets with a fixed connection set, threshold and style.
#[derive(Debug, Clone)]
pub struct SkeletonRenderer {
    connections: &'static [Connection],
    threshold: f32,
    style: SkeletonStyle,
}

impl SkeletonRenderer {
    pub fn new(threshold: f32, style: SkeletonStyle) -> Self {
        Self {
            connections: POSE_CONNECTIONS,
            threshold,
            style,
        }
    }

    /// Replace the edge set (the body topology by default).
    pub fn with_connections(mut self, connections: &'static [Connection]) -> Self {
        self.connections = connections;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Clear `surface` and draw `landmarks` scaled to its size.
    pub fn draw(&self, surface: &mut dyn Surface, landmarks: &[Landmark]) -> DrawStats {
        surface.clear();

        let (width, height) = surface.size();
        let to_px = |lm: &Landmark| Point::new(lm.x * width, lm.y * height);
        let mut stats = DrawStats::default();

        for &(a, b) in self.connections {
            let (Some(start), Some(end)) = (landmarks.get(a), landmarks.get(b)) else {
                continue;
            };
            if start.is_visible(self.threshold) && end.is_visible(self.threshold) {
                surface.draw_line(
                    to_px(start),
                    to_px(end),
                    self.style.line_width,
                    self.style.line_color,
                );
                stats.edges += 1;
            }
        }

        for lm in landmarks.iter().filter(|lm| lm.is_visible(self.threshold)) {
            surface.fill_point(to_px(lm), self.style.point_radius, self.style.point_color);
            stats.points += 1;
        }

        stats
    }
}

impl Default for SkeletonRenderer {
    fn default() -> Self {
        Self::new(VISIBILITY_THRESHOLD, SkeletonStyle::LIVE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
