use super::{DiagramBody, DiagramEngine, DiagramError, RenderedDiagram};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Renders through the external `mmdc` binary and returns its SVG.
#[derive(Debug, Clone)]
pub struct MermaidCli {
    program: PathBuf,
    timeout: Duration,
    work_dir: PathBuf,
}

impl MermaidCli {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            work_dir: std::env::temp_dir(),
        }
    }

    #[cfg(test)]
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    async fn run(&self, input: &Path, output: &Path) -> Result<String, DiagramError> {
        let mut command = Command::new(&self.program);
        command
            .arg("--input")
            .arg(input)
            .arg("--output")
            .arg(output)
            .arg("--theme")
            .arg("dark")
            .arg("--backgroundColor")
            .arg("transparent")
            .kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| DiagramError::Timeout(self.timeout))??;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(DiagramError::EngineFailed(format!(
                "{} exited with {}: {}",
                self.program.display(),
                result.status,
                stderr.trim()
            )));
        }

        Ok(tokio::fs::read_to_string(output).await?)
    }
}

#[async_trait]
impl DiagramEngine for MermaidCli {
    fn name(&self) -> &'static str {
        "mermaid-cli"
    }

    async fn render(&self, target: &str, source: &str) -> Result<RenderedDiagram, DiagramError> {
        let input = self.work_dir.join(format!("{target}.mmd"));
        let output = self.work_dir.join(format!("{target}.svg"));
        tokio::fs::write(&input, source).await?;

        let markup = self.run(&input, &output).await;
        for path in [&input, &output] {
            if let Err(err) = tokio::fs::remove_file(path).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %err, "failed to remove diagram scratch file");
                }
            }
        }

        Ok(RenderedDiagram {
            target: target.to_string(),
            body: DiagramBody::Svg { markup: markup? },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_an_io_error_and_leaves_no_scratch_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let engine = MermaidCli::new("folio-test-no-such-mmdc", Duration::from_secs(5))
            .with_work_dir(dir.path());

        let error = engine
            .render("diagram-test", "graph TD\n  A --> B")
            .await
            .expect_err("spawning a missing binary fails");
        assert!(matches!(error, DiagramError::Io(_)));

        let leftovers = std::fs::read_dir(dir.path()).expect("read temp dir").count();
        assert_eq!(leftovers, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_reports_engine_failure() {
        let dir = tempfile::tempdir().expect("temp dir");
        let engine = MermaidCli::new("false", Duration::from_secs(5)).with_work_dir(dir.path());

        let error = engine
            .render("diagram-test", "graph TD\n  A --> B")
            .await
            .expect_err("`false` always fails");
        assert!(matches!(error, DiagramError::EngineFailed(_)));
    }
}
