//! HTML-to-PDF backends.
//!
//! The compositor drives any [`PdfBackend`]; this crate ships the styled
//! [`LayoutBackend`] as the primary and [`crate::flow::FlowBackend`] as the
//! fallback.

use std::fmt;
use std::path::Path;

use crate::error::BackendError;
use crate::pipeline::{generate_pdf, PipelineConfig};

/// Role a backend plays in the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Primary,
    Fallback,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Primary => f.write_str("primary"),
            BackendKind::Fallback => f.write_str("fallback"),
        }
    }
}

/// Converts an HTML document into PDF bytes held in memory.
pub trait PdfBackend {
    fn name(&self) -> &'static str;

    fn kind(&self) -> BackendKind;

    /// Whether the backend can run in this environment.
    fn is_available(&self) -> bool {
        true
    }

    /// Whether literal `width`/`height` values must be stripped before
    /// [`render`](Self::render) sees the document.
    fn requires_dimension_sanitizing(&self) -> bool {
        false
    }

    /// Relative asset paths resolve against `base_dir`.
    fn render(&self, html: &str, base_dir: Option<&Path>) -> Result<Vec<u8>, BackendError>;
}

/// The styled pipeline: stylesheet cascade, flexbox layout, pagination.
#[derive(Debug, Clone, Default)]
pub struct LayoutBackend {
    config: PipelineConfig,
}

impl LayoutBackend {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl PdfBackend for LayoutBackend {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Primary
    }

    /// A configured measurement font must exist on disk.
    fn is_available(&self) -> bool {
        self.config
            .font_file
            .as_ref()
            .map_or(true, |path| path.is_file())
    }

    fn requires_dimension_sanitizing(&self) -> bool {
        self.config.strict_lengths
    }

    fn render(&self, html: &str, base_dir: Option<&Path>) -> Result<Vec<u8>, BackendError> {
        if !self.is_available() {
            return Err(BackendError::Unavailable(self.name()));
        }
        let (bytes, layout) = generate_pdf(html, base_dir, &self.config)?;
        log::debug!(
            "{} backend wrote {} page(s), {} bytes",
            self.name(),
            layout.page_count(),
            bytes.len()
        );
        Ok(bytes)
    }
}
