//! Laid-out diagram geometry, painted by the view.

use super::grammar::{ArrowHead, LineKind, NodeShape};
use eframe::egui::{Color32, Pos2, Rect, Vec2};

pub const NODE_FILL: Color32 = Color32::from_rgb(0x63, 0x66, 0xF1);
pub const NODE_STROKE: Color32 = Color32::from_rgb(0x47, 0x55, 0x69);
pub const NODE_TEXT: Color32 = Color32::from_rgb(0xF8, 0xFA, 0xFC);
pub const LINE_COLOR: Color32 = Color32::from_rgb(0x94, 0xA3, 0xB8);
pub const CLUSTER_FILL: Color32 = Color32::from_rgb(0x1E, 0x29, 0x3B);
pub const CLUSTER_STROKE: Color32 = Color32::from_rgb(0x47, 0x55, 0x69);
pub const NOTE_FILL: Color32 = Color32::from_rgb(0x33, 0x41, 0x55);
pub const LABEL_FILL: Color32 = Color32::from_rgb(0x0F, 0x17, 0x2A);

pub const FONT_SIZE: f32 = 13.0;
pub const LINE_HEIGHT: f32 = 17.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedStyle {
    pub fill: Color32,
    pub stroke: Color32,
    pub text: Color32,
    pub stroke_width: f32,
    pub dashed: bool,
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            fill: NODE_FILL,
            stroke: NODE_STROKE,
            text: NODE_TEXT,
            stroke_width: 1.5,
            dashed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeBox {
    pub rect: Rect,
    pub label: String,
    pub shape: NodeShape,
    pub style: ResolvedStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterBox {
    pub rect: Rect,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgePath {
    pub points: Vec<Pos2>,
    pub label: Option<TextMark>,
    pub line: LineKind,
    pub head: Option<ArrowHead>,
}

impl EdgePath {
    /// Point halfway along the polyline.
    pub fn midpoint(&self) -> Pos2 {
        let total: f32 = self.points.windows(2).map(|pair| pair[0].distance(pair[1])).sum();
        let mut remaining = total / 2.0;
        for pair in self.points.windows(2) {
            let length = pair[0].distance(pair[1]);
            if length >= remaining && length > 0.0 {
                return pair[0] + (pair[1] - pair[0]) * (remaining / length);
            }
            remaining -= length;
        }
        self.points.first().copied().unwrap_or(Pos2::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteBox {
    pub rect: Rect,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextMark {
    pub pos: Pos2,
    pub text: String,
}

/// Everything needed to paint one diagram, in coordinates relative to its top-left corner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub size: Vec2,
    pub title: Option<TextMark>,
    pub clusters: Vec<ClusterBox>,
    pub lifelines: Vec<[Pos2; 2]>,
    pub edges: Vec<EdgePath>,
    pub nodes: Vec<NodeBox>,
    pub notes: Vec<NoteBox>,
}

/// Approximate rendered width of `text` at [`FONT_SIZE`].
pub fn text_width(text: &str) -> f32 {
    text.lines()
        .map(|line| {
            line.chars()
                .map(|ch| if ch.is_ascii() { 7.2 } else { 14.0 })
                .sum::<f32>()
        })
        .fold(0.0, f32::max)
}

pub fn text_height(text: &str) -> f32 {
    text.lines().count().max(1) as f32 * LINE_HEIGHT
}
