//! Error types for the quotation pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = QuoteError> = std::result::Result<T, E>;

/// Number of HTML characters kept in [`QuoteError::PdfGeneration`] diagnostics.
pub const HTML_EXCERPT_CHARS: usize = 2000;

/// Failures surfaced to callers of the generator.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("template '{name}' not found in {}", dir.display())]
    TemplateNotFound { name: String, dir: PathBuf },

    /// The templating engine rejected the template or its context. `cause`
    /// holds the full engine error chain.
    #[error("failed to render template '{name}': {cause}")]
    Render { name: String, cause: String },

    #[error(
        "PDF generation failed: primary backend: {primary}; fallback backend: {fallback}"
    )]
    PdfGeneration {
        primary: String,
        fallback: String,
        /// First [`HTML_EXCERPT_CHARS`] characters of the HTML that failed.
        html_excerpt: String,
    },

    #[error("invalid quotation: {}", .0.join("; "))]
    InvalidQuotation(Vec<String>),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A single rendering backend failed.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend '{0}' is not available")]
    Unavailable(&'static str),

    #[error("unsupported value '{value}' for `{property}`")]
    UnsupportedLength { property: String, value: String },

    #[error("layout engine error: {0}")]
    Layout(String),

    #[error("PDF serialisation error: {0}")]
    Render(String),

    #[error("backend produced {0} bytes without a PDF header")]
    MalformedOutput(usize),
}

impl From<taffy::TaffyError> for BackendError {
    fn from(err: taffy::TaffyError) -> Self {
        BackendError::Layout(err.to_string())
    }
}

/// Failures of the spreadsheet-backed catalog.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("worksheet '{0}' not found")]
    WorksheetNotFound(String),

    #[error("column '{column}' missing from worksheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },

    #[error("{column} '{value}' already registered")]
    Duplicate { column: &'static str, value: String },

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("workbook is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Render an error together with every `source()` below it, joined by `: `.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

/// Truncate `html` to at most `HTML_EXCERPT_CHARS` characters.
pub fn html_excerpt(html: &str) -> String {
    html.chars().take(HTML_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_is_char_bounded() {
        let html = "á".repeat(HTML_EXCERPT_CHARS + 10);
        assert_eq!(html_excerpt(&html).chars().count(), HTML_EXCERPT_CHARS);
        assert_eq!(html_excerpt("<p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn chain_includes_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = QuoteError::Io(io);
        assert!(error_chain(&err).contains("gone"));
    }
}
