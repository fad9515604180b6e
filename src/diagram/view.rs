use super::grammar::{ArrowHead, LineKind, NodeShape};
use super::scene::{
    EdgePath, NodeBox, Scene, CLUSTER_FILL, CLUSTER_STROKE, FONT_SIZE, LABEL_FILL, LINE_COLOR,
    NODE_STROKE, NODE_TEXT, NOTE_FILL,
};
use super::{
    DiagramBody, DiagramEngine, DiagramError, RenderRequest, RenderedDiagram,
    RENDER_FAILED_MESSAGE,
};
use crate::theme::Theme;
use eframe::egui::{
    self, pos2, vec2, Align2, CornerRadius, FontId, Pos2, Rect, RichText, ScrollArea,
    Sense, Shape, Stroke, StrokeKind, Vec2,
};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use tokio::runtime::Handle;

const DIAGRAM_MIN_HEIGHT: f32 = 200.0;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderState {
    Idle,
    Rendering { target: String },
    Rendered(RenderedDiagram),
    Failed,
}

struct RenderOutcome {
    target: String,
    result: Result<RenderedDiagram, DiagramError>,
}

/// One mounted diagram. Renders whenever its description changes and never caches.
///
/// SVG output is handed to egui under a per-render `bytes://` uri. egui's loaders
/// keep that entry until it is forgotten, so the view releases it when a new
/// description replaces it and when the view itself is dropped.
pub struct DiagramView {
    engine: Arc<dyn DiagramEngine>,
    runtime: Handle,
    chart: Option<String>,
    state: RenderState,
    svg_bytes: Option<Arc<[u8]>>,
    image_uri: Option<String>,
    ctx: Option<egui::Context>,
    tx: Sender<RenderOutcome>,
    rx: Receiver<RenderOutcome>,
}

impl DiagramView {
    pub fn new(engine: Arc<dyn DiagramEngine>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            engine,
            runtime,
            chart: None,
            state: RenderState::Idle,
            svg_bytes: None,
            image_uri: None,
            ctx: None,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    #[cfg(test)]
    pub fn chart(&self) -> Option<&str> {
        self.chart.as_deref()
    }

    #[cfg(test)]
    pub fn is_rendering(&self) -> bool {
        matches!(self.state, RenderState::Rendering { .. })
    }

    pub fn failure_message(&self) -> Option<&'static str> {
        matches!(self.state, RenderState::Failed).then_some(RENDER_FAILED_MESSAGE)
    }

    /// Starts a render when `chart` differs from the current description.
    pub fn set_chart(&mut self, chart: &str, ctx: Option<&egui::Context>) {
        if self.chart.as_deref() == Some(chart) {
            return;
        }
        self.chart = Some(chart.to_string());
        if let Some(ctx) = ctx {
            self.ctx = Some(ctx.clone());
        }
        self.release_image();
        if chart.trim().is_empty() {
            self.state = RenderState::Idle;
            return;
        }

        let request = RenderRequest::new(chart);
        self.state = RenderState::Rendering {
            target: request.target.clone(),
        };
        tracing::debug!(target_id = %request.target, engine = self.engine.name(), "rendering diagram");

        let engine = Arc::clone(&self.engine);
        let tx = self.tx.clone();
        let ctx = ctx.cloned();
        self.runtime.spawn(async move {
            let result = request.run(engine.as_ref()).await;
            let _ = tx.send(RenderOutcome {
                target: request.target,
                result,
            });
            if let Some(ctx) = ctx {
                ctx.request_repaint();
            }
        });
    }

    /// Applies finished renders in arrival order.
    pub fn poll(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(outcome) => self.apply(outcome),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn apply(&mut self, outcome: RenderOutcome) {
        self.release_image();
        match outcome.result {
            Ok(diagram) => {
                if let DiagramBody::Svg { markup } = &diagram.body {
                    self.svg_bytes = Some(Arc::from(markup.as_bytes()));
                    self.image_uri = Some(image_uri(&diagram.target));
                }
                self.state = RenderState::Rendered(diagram);
            }
            Err(err) => {
                tracing::error!(target_id = %outcome.target, error = %err, "diagram render failed");
                self.state = RenderState::Failed;
            }
        }
    }

    /// Drops the current SVG and evicts its uri from egui's image caches.
    fn release_image(&mut self) {
        self.svg_bytes = None;
        let Some(uri) = self.image_uri.take() else {
            return;
        };
        if let Some(ctx) = &self.ctx {
            ctx.forget_image(&uri);
            tracing::trace!(uri = %uri, "released diagram image");
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, theme: &Theme) {
        if self.ctx.is_none() {
            self.ctx = Some(ui.ctx().clone());
        }
        self.poll();

        if let Some(message) = self.failure_message() {
            ui.vertical_centered(|ui| {
                ui.add_space(theme.spacing_16);
                ui.label(RichText::new(message).color(theme.danger));
                ui.add_space(theme.spacing_16);
            });
            return;
        }

        let content_min_height = (DIAGRAM_MIN_HEIGHT - 2.0 * theme.spacing_24).max(0.0);
        theme.diagram_frame().show(ui, |ui| {
            ui.set_min_height(content_min_height);
            ui.set_width(ui.available_width());
            match &self.state {
                RenderState::Idle | RenderState::Failed => {}
                RenderState::Rendering { .. } => {
                    ui.centered_and_justified(|ui| {
                        ui.spinner();
                    });
                }
                RenderState::Rendered(diagram) => {
                    ScrollArea::horizontal()
                        .id_salt(diagram.target.as_str())
                        .show(ui, |ui| match &diagram.body {
                            DiagramBody::Scene(scene) => {
                                ui.vertical_centered(|ui| paint_scene(ui, scene));
                            }
                            DiagramBody::Svg { .. } => {
                                if let (Some(bytes), Some(uri)) = (&self.svg_bytes, &self.image_uri) {
                                    let image = egui::Image::from_bytes(
                                        uri.clone(),
                                        egui::load::Bytes::Shared(Arc::clone(bytes)),
                                    )
                                    .fit_to_original_size(1.0);
                                    ui.vertical_centered(|ui| ui.add(image));
                                }
                            }
                        });
                }
            }
        });
    }
}

impl Drop for DiagramView {
    fn drop(&mut self) {
        self.release_image();
    }
}

fn image_uri(target: &str) -> String {
    format!("bytes://{target}.svg")
}

fn paint_scene(ui: &mut egui::Ui, scene: &Scene) {
    let (response, painter) = ui.allocate_painter(scene.size, Sense::hover());
    let offset = response.rect.min.to_vec2();
    let font = FontId::proportional(FONT_SIZE);

    for cluster in &scene.clusters {
        let rect = cluster.rect.translate(offset);
        painter.rect(
            rect,
            CornerRadius::same(6),
            CLUSTER_FILL,
            Stroke::new(1.0, CLUSTER_STROKE),
            StrokeKind::Inside,
        );
        painter.text(
            rect.left_top() + vec2(10.0, 6.0),
            Align2::LEFT_TOP,
            &cluster.label,
            font.clone(),
            NODE_TEXT,
        );
    }

    for [top, bottom] in &scene.lifelines {
        painter.extend(Shape::dashed_line(
            &[*top + offset, *bottom + offset],
            Stroke::new(1.0, LINE_COLOR),
            4.0,
            4.0,
        ));
    }

    for edge in &scene.edges {
        paint_edge(&painter, edge, offset);
    }

    for node in &scene.nodes {
        paint_node(&painter, node, offset, &font);
    }

    for note in &scene.notes {
        let rect = note.rect.translate(offset);
        painter.rect(
            rect,
            CornerRadius::same(4),
            NOTE_FILL,
            Stroke::new(1.0, NODE_STROKE),
            StrokeKind::Inside,
        );
        painter.text(rect.center(), Align2::CENTER_CENTER, &note.text, font.clone(), NODE_TEXT);
    }

    for label in scene.edges.iter().filter_map(|edge| edge.label.as_ref()) {
        let galley = painter.layout_no_wrap(label.text.clone(), font.clone(), NODE_TEXT);
        let background = Rect::from_center_size(label.pos + offset, galley.size() + vec2(8.0, 4.0));
        painter.rect_filled(background, CornerRadius::same(3), LABEL_FILL);
        painter.galley(background.center() - galley.size() / 2.0, galley, NODE_TEXT);
    }

    if let Some(title) = &scene.title {
        painter.text(
            title.pos + offset,
            Align2::CENTER_CENTER,
            &title.text,
            FontId::proportional(FONT_SIZE + 3.0),
            NODE_TEXT,
        );
    }
}

fn paint_edge(painter: &egui::Painter, edge: &EdgePath, offset: Vec2) {
    let points: Vec<Pos2> = edge.points.iter().map(|point| *point + offset).collect();
    if points.len() < 2 {
        return;
    }
    let stroke = match edge.line {
        LineKind::Thick => Stroke::new(3.0, LINE_COLOR),
        LineKind::Solid | LineKind::Dotted => Stroke::new(1.5, LINE_COLOR),
    };
    match edge.line {
        LineKind::Dotted => painter.extend(Shape::dashed_line(&points, stroke, 3.0, 3.0)),
        LineKind::Solid | LineKind::Thick => {
            painter.add(Shape::line(points.clone(), stroke));
        }
    }

    let (Some(&tip), Some(&before)) = (points.last(), points.get(points.len() - 2)) else {
        return;
    };
    let direction = (tip - before).normalized();
    let normal = vec2(-direction.y, direction.x);
    let head_stroke = Stroke::new(1.5, LINE_COLOR);
    match edge.head {
        Some(ArrowHead::Filled) => {
            let base = tip - direction * 9.0;
            painter.add(Shape::convex_polygon(
                vec![tip, base + normal * 4.5, base - normal * 4.5],
                LINE_COLOR,
                Stroke::NONE,
            ));
        }
        Some(ArrowHead::Cross) => {
            let center = tip - direction * 5.0;
            let (a, b) = ((direction + normal) * 4.0, (direction - normal) * 4.0);
            painter.line_segment([center - a, center + a], head_stroke);
            painter.line_segment([center - b, center + b], head_stroke);
        }
        Some(ArrowHead::Async) => {
            painter.line_segment([tip, tip - direction * 9.0 + normal * 5.0], head_stroke);
        }
        Some(ArrowHead::Open) | None => {}
    }
}

fn paint_node(painter: &egui::Painter, node: &NodeBox, offset: Vec2, font: &FontId) {
    let rect = node.rect.translate(offset);
    let style = node.style;
    let outline = if style.dashed {
        Stroke::NONE
    } else {
        Stroke::new(style.stroke_width, style.stroke)
    };

    let path: Vec<Pos2> = match node.shape {
        NodeShape::Rect | NodeShape::Round | NodeShape::Stadium | NodeShape::Subroutine => {
            let radius = match node.shape {
                NodeShape::Round => 10,
                NodeShape::Stadium => (rect.height() / 2.0).min(255.0) as u8,
                _ => 4,
            };
            painter.rect(rect, CornerRadius::same(radius), style.fill, outline, StrokeKind::Inside);
            if node.shape == NodeShape::Subroutine {
                for x in [rect.left() + 8.0, rect.right() - 8.0] {
                    painter.line_segment(
                        [pos2(x, rect.top()), pos2(x, rect.bottom())],
                        Stroke::new(style.stroke_width, style.stroke),
                    );
                }
            }
            vec![rect.left_top(), rect.right_top(), rect.right_bottom(), rect.left_bottom()]
        }
        NodeShape::Circle => {
            let radius = rect.width().min(rect.height()) / 2.0;
            painter.circle(rect.center(), radius, style.fill, outline);
            ellipse_points(rect.center(), Vec2::splat(radius), 32)
        }
        NodeShape::Diamond => {
            let points = vec![
                rect.center_top(),
                rect.right_center(),
                rect.center_bottom(),
                rect.left_center(),
            ];
            painter.add(Shape::convex_polygon(points.clone(), style.fill, outline));
            points
        }
        NodeShape::Cylinder => {
            let radii = vec2(rect.width() / 2.0, 7.0);
            let top = pos2(rect.center().x, rect.top() + radii.y);
            let bottom = pos2(rect.center().x, rect.bottom() - radii.y);
            let stroke = Stroke::new(style.stroke_width, style.stroke);
            painter.add(Shape::convex_polygon(ellipse_points(bottom, radii, 32), style.fill, outline));
            painter.rect_filled(
                Rect::from_min_max(pos2(rect.left(), top.y), pos2(rect.right(), bottom.y)),
                CornerRadius::ZERO,
                style.fill,
            );
            painter.add(Shape::convex_polygon(ellipse_points(top, radii, 32), style.fill, outline));
            if !style.dashed {
                painter.line_segment([pos2(rect.left(), top.y), pos2(rect.left(), bottom.y)], stroke);
                painter.line_segment([pos2(rect.right(), top.y), pos2(rect.right(), bottom.y)], stroke);
            }
            vec![rect.left_top(), rect.right_top(), rect.right_bottom(), rect.left_bottom()]
        }
        NodeShape::Asymmetric => {
            let notch = pos2(rect.left() + 12.0, rect.center().y);
            let body = Rect::from_min_max(pos2(notch.x, rect.top()), rect.right_bottom());
            painter.rect_filled(body, CornerRadius::ZERO, style.fill);
            painter.add(Shape::convex_polygon(
                vec![rect.left_top(), pos2(notch.x, rect.top()), notch],
                style.fill,
                Stroke::NONE,
            ));
            painter.add(Shape::convex_polygon(
                vec![notch, pos2(notch.x, rect.bottom()), rect.left_bottom()],
                style.fill,
                Stroke::NONE,
            ));
            let points = vec![
                rect.left_top(),
                rect.right_top(),
                rect.right_bottom(),
                rect.left_bottom(),
                notch,
            ];
            if !style.dashed {
                painter.add(Shape::closed_line(
                    points.clone(),
                    Stroke::new(style.stroke_width, style.stroke),
                ));
            }
            points
        }
    };

    if style.dashed {
        let mut closed = path;
        if let Some(&first) = closed.first() {
            closed.push(first);
        }
        painter.extend(Shape::dashed_line(
            &closed,
            Stroke::new(style.stroke_width, style.stroke),
            5.0,
            5.0,
        ));
    }

    painter.text(rect.center(), Align2::CENTER_CENTER, &node.label, font.clone(), style.text);
}

fn ellipse_points(center: Pos2, radii: Vec2, segments: usize) -> Vec<Pos2> {
    (0..segments)
        .map(|step| {
            let angle = step as f32 / segments as f32 * std::f32::consts::TAU;
            center + vec2(angle.cos() * radii.x, angle.sin() * radii.y)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::native::NativeEngine;
    use async_trait::async_trait;
    use eframe::egui::epaint::ClippedShape;
    use eframe::egui::load::BytesLoader;
    use std::time::Duration;

    const SVG_MARKUP: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"8\" height=\"8\"/>";

    /// Answers every render with fixed SVG, or fails when the source says so.
    struct SvgEngine;

    #[async_trait]
    impl DiagramEngine for SvgEngine {
        fn name(&self) -> &'static str {
            "svg"
        }

        async fn render(&self, target: &str, source: &str) -> Result<RenderedDiagram, DiagramError> {
            if source.contains("broken") {
                return Err(DiagramError::EngineFailed("mmdc exited with 1".to_string()));
            }
            Ok(RenderedDiagram {
                target: target.to_string(),
                body: DiagramBody::Svg {
                    markup: SVG_MARKUP.to_string(),
                },
            })
        }
    }

    fn svg_view() -> DiagramView {
        DiagramView::new(Arc::new(SvgEngine), Handle::current())
    }

    fn show_frame(ctx: &egui::Context, view: &mut DiagramView) -> egui::FullOutput {
        let theme = Theme::dark();
        ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| view.show(ui, &theme));
        })
    }

    fn painted_text(shapes: &[ClippedShape]) -> Vec<String> {
        fn collect(shape: &Shape, out: &mut Vec<String>) {
            match shape {
                Shape::Text(text) => out.push(text.galley.text().to_string()),
                Shape::Vec(shapes) => shapes.iter().for_each(|shape| collect(shape, out)),
                _ => {}
            }
        }
        let mut out = Vec::new();
        for clipped in shapes {
            collect(&clipped.shape, &mut out);
        }
        out
    }

    async fn settle(view: &mut DiagramView) {
        for _ in 0..400 {
            view.poll();
            if !view.is_rendering() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("render never finished");
    }

    fn native_view() -> DiagramView {
        DiagramView::new(Arc::new(NativeEngine), Handle::current())
    }

    #[tokio::test]
    async fn invalid_description_shows_the_fixed_failure_text() {
        let mut view = native_view();
        view.set_chart("not a valid graph", None);
        assert!(view.is_rendering());

        settle(&mut view).await;
        assert!(matches!(view.state(), RenderState::Failed));
        assert_eq!(view.failure_message(), Some(RENDER_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn unchanged_description_is_not_rendered_again() {
        let mut view = native_view();
        view.set_chart("graph TD\n  A --> B", None);
        settle(&mut view).await;
        let RenderState::Rendered(first) = view.state().clone() else {
            panic!("expected a rendered diagram");
        };

        view.set_chart("graph TD\n  A --> B", None);
        assert!(!view.is_rendering());

        view.set_chart("graph LR\n  A --> B --> C", None);
        let RenderState::Rendering { target } = view.state().clone() else {
            panic!("a new description restarts the cycle");
        };
        assert_ne!(target, first.target);

        settle(&mut view).await;
        let RenderState::Rendered(second) = view.state() else {
            panic!("expected a rendered diagram");
        };
        assert_eq!(second.target, target);
        assert_eq!(view.failure_message(), None);
    }

    #[tokio::test]
    async fn empty_description_stays_idle() {
        let mut view = native_view();
        view.set_chart("   ", None);
        assert_eq!(view.state(), &RenderState::Idle);
    }

    #[tokio::test]
    async fn svg_output_is_kept_until_a_failed_render_replaces_it() {
        let mut view = svg_view();
        view.set_chart("graph TD\n  A --> B", None);
        settle(&mut view).await;

        let RenderState::Rendered(diagram) = view.state().clone() else {
            panic!("expected a rendered diagram");
        };
        assert_eq!(view.svg_bytes.as_deref(), Some(SVG_MARKUP.as_bytes()));
        assert_eq!(view.image_uri, Some(format!("bytes://{}.svg", diagram.target)));

        view.set_chart("graph TD\n  broken --> B", None);
        assert!(view.svg_bytes.is_none());
        settle(&mut view).await;
        assert!(matches!(view.state(), RenderState::Failed));
        assert!(view.svg_bytes.is_none());
        assert!(view.image_uri.is_none());
    }

    #[tokio::test]
    async fn svg_images_are_evicted_on_replace_and_drop() {
        let ctx = egui::Context::default();
        let mut view = svg_view();
        view.set_chart("graph TD\n  A --> B", Some(&ctx));
        settle(&mut view).await;

        show_frame(&ctx, &mut view);
        let cached = ctx.loaders().include.byte_size();
        assert!(cached >= SVG_MARKUP.len(), "the shown svg is registered with egui");

        view.set_chart("graph LR\n  A --> C", Some(&ctx));
        assert_eq!(ctx.loaders().include.byte_size(), 0);

        settle(&mut view).await;
        show_frame(&ctx, &mut view);
        assert!(ctx.loaders().include.byte_size() >= SVG_MARKUP.len());

        drop(view);
        assert_eq!(ctx.loaders().include.byte_size(), 0);
    }

    #[tokio::test]
    async fn failed_render_draws_the_failure_text() {
        let ctx = egui::Context::default();
        let mut view = native_view();
        view.set_chart("not a valid graph", Some(&ctx));
        settle(&mut view).await;

        let output = show_frame(&ctx, &mut view);
        let text = painted_text(&output.shapes);
        assert!(
            text.iter().any(|line| line == RENDER_FAILED_MESSAGE),
            "painted text was {text:?}"
        );
    }
}
