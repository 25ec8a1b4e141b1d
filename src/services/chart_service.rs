use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartQuestion {
    pub question_number: i32,
    pub is_correct: bool,
}

/// Summary statistics handed to the rendering collaborator. The plotting
/// itself happens out of process and out of scope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub subject: String,
    pub level: i32,
    pub score: i32,
    pub total: i32,
    pub percentage: f64,
    pub passed: bool,
    pub questions: Vec<ChartQuestion>,
    /// Unique stem for the output file, e.g. "python_level3_<user>_<ts>".
    pub file_stem: String,
}

/// Outcome of a render call. Failure is a value, not an error: it must
/// never block or fail the response that requested the chart.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// File name of the rendered image inside the chart output directory.
    Rendered(String),
    Failed,
}

impl RenderOutcome {
    pub fn into_path(self) -> Option<String> {
        match self {
            RenderOutcome::Rendered(path) => Some(path),
            RenderOutcome::Failed => None,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(&self, spec: &ChartSpec) -> RenderOutcome;
}

/// Shells out to a matplotlib script, bounded by a timeout. Any failure
/// mode (spawn error, non-zero exit, timeout, missing output file) folds
/// into `RenderOutcome::Failed`.
pub struct PythonChartRenderer {
    python_bin: String,
    script_path: PathBuf,
    output_dir: PathBuf,
    timeout: Duration,
}

impl PythonChartRenderer {
    pub fn new(
        python_bin: String,
        script_path: PathBuf,
        output_dir: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            python_bin,
            script_path,
            output_dir,
            timeout,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            config.python_bin.clone(),
            PathBuf::from(&config.chart_script_path),
            PathBuf::from(&config.chart_output_dir),
            Duration::from_secs(config.chart_timeout_secs),
        )
    }

    async fn run(&self, spec: &ChartSpec) -> Option<String> {
        let payload = serde_json::to_string(spec).ok()?;
        let file_name = format!("{}.png", sanitize_stem(&spec.file_stem));
        let out_path = self.output_dir.join(&file_name);

        if tokio::fs::create_dir_all(&self.output_dir).await.is_err() {
            return None;
        }

        let child = Command::new(&self.python_bin)
            .arg(&self.script_path)
            .arg(&payload)
            .arg(&out_path)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "chart renderer failed to spawn");
                return None;
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "chart renderer timed out");
                return None;
            }
        };

        if !output.status.success() {
            tracing::warn!(
                status = ?output.status,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "chart renderer exited with failure"
            );
            return None;
        }

        match tokio::fs::try_exists(&out_path).await {
            Ok(true) => Some(file_name),
            _ => {
                tracing::warn!(path = %out_path.display(), "chart renderer produced no file");
                None
            }
        }
    }
}

#[async_trait]
impl ChartRenderer for PythonChartRenderer {
    async fn render(&self, spec: &ChartSpec) -> RenderOutcome {
        match self.run(spec).await {
            Some(file_name) => RenderOutcome::Rendered(file_name),
            None => RenderOutcome::Failed,
        }
    }
}

fn sanitize_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_sanitization_strips_path_characters() {
        assert_eq!(sanitize_stem("python_level3"), "python_level3");
        assert_eq!(sanitize_stem("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_stem("c++ level:2"), "c___level_2");
    }

    #[tokio::test]
    async fn rendered_outcome_carries_the_file_name() {
        let mut renderer = MockChartRenderer::new();
        renderer
            .expect_render()
            .returning(|_| RenderOutcome::Rendered("python_level1.png".to_string()));

        let spec = ChartSpec {
            subject: "python".to_string(),
            level: 1,
            score: 9,
            total: 10,
            percentage: 90.0,
            passed: true,
            questions: vec![],
            file_stem: "python_level1".to_string(),
        };
        let outcome = renderer.render(&spec).await;
        assert_eq!(outcome.into_path(), Some("python_level1.png".to_string()));
        assert_eq!(RenderOutcome::Failed.into_path(), None);
    }

    #[tokio::test]
    async fn missing_python_binary_is_a_failed_outcome() {
        let renderer = PythonChartRenderer::new(
            "definitely-not-a-python".to_string(),
            PathBuf::from("scripts/render_chart.py"),
            std::env::temp_dir().join("quiz-chart-test"),
            Duration::from_secs(1),
        );
        let spec = ChartSpec {
            subject: "python".to_string(),
            level: 1,
            score: 1,
            total: 1,
            percentage: 100.0,
            passed: true,
            questions: vec![ChartQuestion {
                question_number: 1,
                is_correct: true,
            }],
            file_stem: "test".to_string(),
        };
        assert_eq!(renderer.render(&spec).await, RenderOutcome::Failed);
    }
}
