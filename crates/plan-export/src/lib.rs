#![deny(warnings)]

//! Snapshot export of the worksheet.
//!
//! Rendering is delegated to an [`Exporter`]. While it runs, the interactive
//! controls are hidden through a [`ControlsHidden`] guard that restores them
//! when dropped, whether rendering succeeds, fails, times out, or the export
//! future is abandoned. Edits to the worksheet are not blocked meanwhile.

mod text;

pub use text::TextCanvasExporter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plan_core::{ExportSettings, WorksheetState};
use plan_metrics::FunnelMetrics;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("render failed: {0}")]
    Render(String),
    #[error("renderer did not finish within {0:?}")]
    Timeout(Duration),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raster options passed to the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// Upscale factor.
    pub scale: u32,
    /// Background colour, CSS hex.
    pub background: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scale: 2,
            background: "#ffffff".to_string(),
        }
    }
}

/// Everything a renderer needs to draw the canvas.
#[derive(Clone, Debug)]
pub struct ExportRequest<'a> {
    pub state: &'a WorksheetState,
    pub metrics: FunnelMetrics,
    pub options: RenderOptions,
    pub exported_at: DateTime<Utc>,
}

/// Produces the exported file contents.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// File extension without the dot, e.g. `png`.
    fn extension(&self) -> &str;

    async fn render(&self, request: &ExportRequest<'_>) -> Result<Vec<u8>, ExportError>;
}

/// The interactive controls that must not appear in a snapshot.
pub trait ControlSurface {
    fn set_controls_visible(&self, visible: bool);
}

/// For front ends without interactive controls.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoControls;

impl ControlSurface for NoControls {
    fn set_controls_visible(&self, _visible: bool) {}
}

/// Thread-safe visibility flag, counting how often it was hidden.
#[derive(Debug)]
pub struct VisibilityFlag {
    visible: AtomicBool,
    hidden_count: AtomicU32,
}

impl Default for VisibilityFlag {
    fn default() -> Self {
        Self {
            visible: AtomicBool::new(true),
            hidden_count: AtomicU32::new(0),
        }
    }
}

impl VisibilityFlag {
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn hidden_count(&self) -> u32 {
        self.hidden_count.load(Ordering::SeqCst)
    }
}

impl ControlSurface for VisibilityFlag {
    fn set_controls_visible(&self, visible: bool) {
        if !visible {
            self.hidden_count.fetch_add(1, Ordering::SeqCst);
        }
        self.visible.store(visible, Ordering::SeqCst);
    }
}

/// Hides the controls for as long as it lives.
pub struct ControlsHidden<'a> {
    surface: &'a dyn ControlSurface,
}

impl<'a> ControlsHidden<'a> {
    pub fn new(surface: &'a dyn ControlSurface) -> Self {
        surface.set_controls_visible(false);
        Self { surface }
    }
}

impl Drop for ControlsHidden<'_> {
    fn drop(&mut self) {
        self.surface.set_controls_visible(true);
        debug!("controls restored");
    }
}

/// Options for a single export.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub render: RenderOptions,
    /// Give up on the renderer after this long.
    pub timeout: Duration,
    pub file_prefix: String,
    /// Used in the file name when the company is empty.
    pub fallback_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions::from(&ExportSettings::default())
    }
}

impl From<&ExportSettings> for ExportOptions {
    fn from(s: &ExportSettings) -> Self {
        Self {
            render: RenderOptions {
                scale: s.scale,
                background: s.background.clone(),
            },
            timeout: Duration::from_secs(s.timeout_secs),
            file_prefix: s.file_prefix.clone(),
            fallback_name: s.fallback_name.clone(),
        }
    }
}

/// `<prefix>-<company>.<ext>`, with the fallback name for an empty company.
///
/// Path separators, characters reserved on common filesystems, and control
/// characters in the company name are replaced with `-`.
pub fn export_file_name(options: &ExportOptions, company: &str, extension: &str) -> String {
    let name = if company.is_empty() {
        options.fallback_name.as_str()
    } else {
        company
    };
    let safe: String = name
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            {
                '-'
            } else {
                c
            }
        })
        .collect();
    format!("{}-{}.{}", options.file_prefix, safe, extension)
}

/// Render the worksheet and write it into `out_dir`. Returns the file path.
pub async fn export_worksheet(
    exporter: &dyn Exporter,
    controls: &dyn ControlSurface,
    state: &WorksheetState,
    metrics: FunnelMetrics,
    options: &ExportOptions,
    out_dir: &Path,
) -> Result<PathBuf, ExportError> {
    let request = ExportRequest {
        state,
        metrics,
        options: options.render.clone(),
        exported_at: Utc::now(),
    };
    let bytes = {
        let _hidden = ControlsHidden::new(controls);
        match tokio::time::timeout(options.timeout, exporter.render(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout = ?options.timeout, "export renderer timed out");
                return Err(ExportError::Timeout(options.timeout));
            }
        }
    };

    let path = out_dir.join(export_file_name(
        options,
        &state.company,
        exporter.extension(),
    ));
    tokio::fs::create_dir_all(out_dir).await?;
    tokio::fs::write(&path, &bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "worksheet exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    struct FixedExporter(&'static [u8]);

    #[async_trait]
    impl Exporter for FixedExporter {
        fn extension(&self) -> &str {
            "png"
        }
        async fn render(&self, request: &ExportRequest<'_>) -> Result<Vec<u8>, ExportError> {
            assert_eq!(request.options.scale, 2);
            assert_eq!(request.options.background, "#ffffff");
            Ok(self.0.to_vec())
        }
    }

    struct FailingExporter;

    #[async_trait]
    impl Exporter for FailingExporter {
        fn extension(&self) -> &str {
            "png"
        }
        async fn render(&self, _: &ExportRequest<'_>) -> Result<Vec<u8>, ExportError> {
            Err(ExportError::Render("canvas tainted".into()))
        }
    }

    struct HungExporter;

    #[async_trait]
    impl Exporter for HungExporter {
        fn extension(&self) -> &str {
            "png"
        }
        async fn render(&self, _: &ExportRequest<'_>) -> Result<Vec<u8>, ExportError> {
            std::future::pending::<()>().await;
            Ok(Vec::new())
        }
    }

    /// Records visibility as observed by the renderer.
    struct PeekingExporter<'a>(&'a VisibilityFlag);

    #[async_trait]
    impl Exporter for PeekingExporter<'_> {
        fn extension(&self) -> &str {
            "txt"
        }
        async fn render(&self, _: &ExportRequest<'_>) -> Result<Vec<u8>, ExportError> {
            Ok(format!("visible={}", self.0.is_visible()).into_bytes())
        }
    }

    fn state(company: &str) -> WorksheetState {
        WorksheetState {
            company: company.to_string(),
            sales_goal: Decimal::new(10_000, 0),
            ..Default::default()
        }
    }

    #[test]
    fn file_name_uses_company_or_fallback() {
        let o = ExportOptions::default();
        assert_eq!(export_file_name(&o, "Acme", "png"), "plano-prospeccao-Acme.png");
        assert_eq!(export_file_name(&o, "", "png"), "plano-prospeccao-export.png");
        assert_eq!(
            export_file_name(&o, "A/B: C\n", "txt"),
            "plano-prospeccao-A-B- C-.txt"
        );
    }

    #[test]
    fn guard_restores_on_drop() {
        let flag = VisibilityFlag::default();
        {
            let _g = ControlsHidden::new(&flag);
            assert!(!flag.is_visible());
        }
        assert!(flag.is_visible());
        assert_eq!(flag.hidden_count(), 1);
    }

    #[tokio::test]
    async fn writes_file_and_restores_controls() {
        let dir = tempfile::tempdir().unwrap();
        let flag = VisibilityFlag::default();
        let path = export_worksheet(
            &FixedExporter(b"\x89PNG"),
            &flag,
            &state("Acme"),
            FunnelMetrics::default(),
            &ExportOptions::default(),
            dir.path(),
        )
        .await
        .unwrap();
        assert_eq!(path, dir.path().join("plano-prospeccao-Acme.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG");
        assert!(flag.is_visible());
        assert_eq!(flag.hidden_count(), 1);
    }

    #[tokio::test]
    async fn controls_hidden_while_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let flag = VisibilityFlag::default();
        let path = export_worksheet(
            &PeekingExporter(&flag),
            &flag,
            &state(""),
            FunnelMetrics::default(),
            &ExportOptions::default(),
            dir.path(),
        )
        .await
        .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "visible=false");
        assert!(flag.is_visible());
    }

    #[tokio::test]
    async fn render_failure_restores_controls() {
        let dir = tempfile::tempdir().unwrap();
        let flag = VisibilityFlag::default();
        let err = export_worksheet(
            &FailingExporter,
            &flag,
            &state("Acme"),
            FunnelMetrics::default(),
            &ExportOptions::default(),
            dir.path(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExportError::Render(_)));
        assert!(flag.is_visible());
        assert!(!dir.path().join("plano-prospeccao-Acme.png").exists());
    }

    #[tokio::test]
    async fn hung_renderer_times_out_and_restores_controls() {
        let dir = tempfile::tempdir().unwrap();
        let flag = VisibilityFlag::default();
        let options = ExportOptions {
            timeout: Duration::from_millis(20),
            ..ExportOptions::default()
        };
        let err = export_worksheet(
            &HungExporter,
            &flag,
            &state("Acme"),
            FunnelMetrics::default(),
            &options,
            dir.path(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExportError::Timeout(_)));
        assert!(flag.is_visible());
    }

    #[tokio::test]
    async fn abandoned_export_restores_controls() {
        let dir = tempfile::tempdir().unwrap();
        let flag = VisibilityFlag::default();
        let st = state("Acme");
        let options = ExportOptions::default();
        {
            let fut = export_worksheet(
                &HungExporter,
                &flag,
                &st,
                FunnelMetrics::default(),
                &options,
                dir.path(),
            );
            let res = tokio::time::timeout(Duration::from_millis(10), fut).await;
            assert!(res.is_err());
        }
        assert!(flag.is_visible());
        assert_eq!(flag.hidden_count(), 1);
    }
}
