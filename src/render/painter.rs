//! Replays a [`DisplayList`] onto an egui painter.

use eframe::egui;

use super::surface::{DisplayList, DrawOp, Point, Rgba, Surface};

fn color32(c: Rgba) -> egui::Color32 {
    let [r, g, b, a] = c.0;
    egui::Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// Paint `list` into `rect`, scaling from the list's own size when the two
/// differ (e.g. during a window resize).
pub fn paint_display_list(painter: &egui::Painter, rect: egui::Rect, list: &DisplayList) {
    painter.rect_filled(rect, 4.0, egui::Color32::from_rgb(26, 26, 46));

    let (w, h) = list.size();
    let sx = if w > 0.0 { rect.width() / w } else { 1.0 };
    let sy = if h > 0.0 { rect.height() / h } else { 1.0 };
    let to_screen = |p: Point| egui::pos2(rect.left() + p.x * sx, rect.top() + p.y * sy);

    for op in list.ops() {
        match op {
            DrawOp::Line {
                from,
                to,
                width,
                color,
            } => {
                painter.line_segment(
                    [to_screen(*from), to_screen(*to)],
                    egui::Stroke::new(*width, color32(*color)),
                );
            }
            DrawOp::Point { at, radius, color } => {
                painter.circle_filled(to_screen(*at), *radius, color32(*color));
            }
            DrawOp::Overlay { text } => {
                painter.rect_filled(rect, 4.0, egui::Color32::from_black_alpha(140));
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    text,
                    egui::FontId::proportional(28.0),
                    egui::Color32::WHITE,
                );
            }
        }
    }
}
