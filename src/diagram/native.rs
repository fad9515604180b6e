use super::{grammar, layout, DiagramBody, DiagramEngine, DiagramError, RenderedDiagram};
use async_trait::async_trait;

/// Parses and lays out diagrams in-process; the view paints the resulting scene.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

#[async_trait]
impl DiagramEngine for NativeEngine {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn render(&self, target: &str, source: &str) -> Result<RenderedDiagram, DiagramError> {
        let diagram = grammar::parse(source)?;
        let scene = layout::layout(&diagram);
        tracing::debug!(
            target_id = target,
            nodes = scene.nodes.len(),
            edges = scene.edges.len(),
            "laid out diagram"
        );
        Ok(RenderedDiagram {
            target: target.to_string(),
            body: DiagramBody::Scene(scene),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Catalog;
    use crate::diagram::RenderRequest;

    #[tokio::test]
    async fn renders_every_embedded_diagram() {
        let catalog = Catalog::load_builtin().expect("embedded content should be valid");
        let mut rendered = 0;
        for study in &catalog.case_studies {
            for tab in &study.tabs {
                for chart in tab.diagrams() {
                    let request = RenderRequest::new(chart);
                    let result = request.run(&NativeEngine).await;
                    let diagram = result.unwrap_or_else(|err| {
                        panic!("{} / {}: {err}", study.id, tab.id)
                    });
                    let DiagramBody::Scene(scene) = diagram.body else {
                        panic!("native engine always yields a scene");
                    };
                    assert!(!scene.nodes.is_empty());
                    assert!(scene.size.x > 0.0 && scene.size.y > 0.0);
                    rendered += 1;
                }
            }
        }
        assert!(rendered >= 10);
    }

    #[tokio::test]
    async fn invalid_descriptions_are_errors() {
        let request = RenderRequest::new("not a valid graph");
        let error = request.run(&NativeEngine).await.expect_err("should not parse");
        assert!(matches!(error, DiagramError::UnknownDialect { .. }));
    }
}
