//! Diagram rendering: turns a graph description into something the UI can paint.

pub mod cli;
pub mod grammar;
pub mod layout;
pub mod native;
pub mod scene;
pub mod view;

use crate::config::{DiagramConfig, EngineKind};
use async_trait::async_trait;
use scene::Scene;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Shown in place of a diagram whose render failed.
pub const RENDER_FAILED_MESSAGE: &str = "Failed to render diagram";

/// Node classes appended to every non-sequence description.
pub const STYLE_CLASS_BLOCK: &str = "\
classDef primary fill:#4f46e5,stroke:#818cf8,stroke-width:2px,color:#ffffff;
classDef secondary fill:#1e293b,stroke:#475569,stroke-width:2px,color:#e2e8f0;
classDef accent fill:#059669,stroke:#34d399,stroke-width:2px,color:#ffffff;
classDef highlight fill:#d97706,stroke:#fbbf24,stroke-width:2px,color:#ffffff;
classDef danger fill:#dc2626,stroke:#f87171,stroke-width:2px,color:#ffffff;
classDef database fill:#0891b2,stroke:#22d3ee,stroke-width:2px,color:#ffffff;
classDef external fill:#334155,stroke:#94a3b8,stroke-width:2px,stroke-dasharray: 5 5,color:#cbd5e1;
";

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("diagram description is empty")]
    Empty,
    #[error("unsupported diagram type `{header}`")]
    UnknownDialect { header: String },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("diagram engine i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("diagram engine timed out after {0:?}")]
    Timeout(Duration),
    #[error("diagram engine failed: {0}")]
    EngineFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagramBody {
    Scene(Scene),
    Svg { markup: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDiagram {
    pub target: String,
    pub body: DiagramBody,
}

#[async_trait]
pub trait DiagramEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn render(&self, target: &str, source: &str) -> Result<RenderedDiagram, DiagramError>;
}

/// One render call: a fresh target id and the description with its styles appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub target: String,
    pub source: String,
}

impl RenderRequest {
    pub fn new(chart: &str) -> Self {
        Self {
            target: render_target_id(),
            source: prepare_source(chart),
        }
    }

    pub async fn run(&self, engine: &dyn DiagramEngine) -> Result<RenderedDiagram, DiagramError> {
        engine.render(&self.target, &self.source).await
    }
}

pub fn is_sequence(chart: &str) -> bool {
    chart.trim_start().starts_with("sequenceDiagram")
}

/// Sequence diagrams have no node classes, so they pass through untouched.
pub fn prepare_source(chart: &str) -> String {
    if is_sequence(chart) {
        chart.to_string()
    } else {
        format!("{chart}\n{STYLE_CLASS_BLOCK}")
    }
}

pub fn render_target_id() -> String {
    format!("diagram-{}", uuid::Uuid::new_v4())
}

pub fn engine_from_config(config: &DiagramConfig) -> Arc<dyn DiagramEngine> {
    match config.engine {
        EngineKind::Native => Arc::new(native::NativeEngine),
        EngineKind::MermaidCli => Arc::new(cli::MermaidCli::new(
            &config.mmdc_path,
            Duration::from_secs(config.timeout_secs),
        )),
    }
}
