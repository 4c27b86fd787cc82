//! Two-tier HTML-to-PDF compositor.
//!
//! The primary backend gets the document first. Any failure, output without a
//! PDF header, or an unavailable primary sends the original HTML through the
//! aggressive sanitizer to the fallback backend. Only when both attempts fail
//! does the caller see an error, and no partial bytes are ever returned.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::backend::{LayoutBackend, PdfBackend};
use crate::error::{error_chain, html_excerpt, BackendError, QuoteError, Result};
use crate::flow::FlowBackend;
use crate::pipeline::PipelineConfig;
use crate::sanitize::{strip_dimensions, strip_table_styles};

/// Keeps background colours and images in the printed output.
pub const PRINT_COLOR_CSS: &str =
    "html, body { -webkit-print-color-adjust: exact; print-color-adjust: exact; }";

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Primary,
    Fallback,
}

/// Insert the print-colour stylesheet at the end of `<head>`, or at the very
/// start when the document has none.
pub fn inject_print_css(html: &str) -> String {
    let style = format!("<style>{PRINT_COLOR_CSS}</style>");
    match html.to_ascii_lowercase().find("</head>") {
        Some(pos) => format!("{}{style}{}", &html[..pos], &html[pos..]),
        None => format!("{style}{html}"),
    }
}

/// Name, role and availability of one backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub name: &'static str,
    pub kind: String,
    pub available: bool,
}

/// Versions and availability of the rendering stack.
#[derive(Debug, Clone, Serialize)]
pub struct BackendReport {
    pub crate_version: &'static str,
    pub backends: Vec<BackendStatus>,
}

impl fmt::Display for BackendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "quote-forge {}", self.crate_version)?;
        for b in &self.backends {
            let state = if b.available { "available" } else { "unavailable" };
            writeln!(f, "  {:<8} {:<8} {state}", b.name, b.kind)?;
        }
        Ok(())
    }
}

pub struct Compositor {
    primary: Box<dyn PdfBackend>,
    fallback: Box<dyn PdfBackend>,
}

impl Compositor {
    pub fn new(primary: Box<dyn PdfBackend>, fallback: Box<dyn PdfBackend>) -> Self {
        Self { primary, fallback }
    }

    /// Styled layout backend first, flow backend as fallback.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            Box::new(LayoutBackend::new(config.clone())),
            Box::new(FlowBackend::new(config)),
        )
    }

    fn backend(&self, attempt: Attempt) -> &dyn PdfBackend {
        match attempt {
            Attempt::Primary => self.primary.as_ref(),
            Attempt::Fallback => self.fallback.as_ref(),
        }
    }

    fn prepare(&self, attempt: Attempt, html: &str) -> String {
        let backend = self.backend(attempt);
        let cleaned = match attempt {
            Attempt::Fallback => strip_table_styles(html),
            Attempt::Primary if backend.requires_dimension_sanitizing() => strip_dimensions(html),
            Attempt::Primary => html.to_string(),
        };
        inject_print_css(&cleaned)
    }

    fn run(&self, attempt: Attempt, html: &str, base_dir: Option<&Path>) -> Result<Vec<u8>, BackendError> {
        let backend = self.backend(attempt);
        if !backend.is_available() {
            return Err(BackendError::Unavailable(backend.name()));
        }
        let prepared = self.prepare(attempt, html);
        let bytes = backend.render(&prepared, base_dir)?;
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(BackendError::MalformedOutput(bytes.len()));
        }
        Ok(bytes)
    }

    /// Convert `html` into PDF bytes. Relative asset paths resolve against
    /// `base_dir`.
    pub fn compose(&self, html: &str, base_dir: Option<&Path>) -> Result<Vec<u8>> {
        let primary_err = match self.run(Attempt::Primary, html, base_dir) {
            Ok(bytes) => return Ok(bytes),
            Err(e) => e,
        };
        log::warn!(
            "{} backend failed ({}), retrying with {} backend",
            self.primary.name(),
            error_chain(&primary_err),
            self.fallback.name()
        );

        match self.run(Attempt::Fallback, html, base_dir) {
            Ok(bytes) => {
                log::info!("{} backend produced {} bytes", self.fallback.name(), bytes.len());
                Ok(bytes)
            }
            Err(fallback_err) => {
                log::error!("{} backend failed too: {fallback_err}", self.fallback.name());
                Err(QuoteError::PdfGeneration {
                    primary: format!("{}: {}", self.primary.name(), error_chain(&primary_err)),
                    fallback: format!("{}: {}", self.fallback.name(), error_chain(&fallback_err)),
                    html_excerpt: html_excerpt(html),
                })
            }
        }
    }

    pub fn backend_report(&self) -> BackendReport {
        let status = |b: &dyn PdfBackend| BackendStatus {
            name: b.name(),
            kind: b.kind().to_string(),
            available: b.is_available(),
        };
        BackendReport {
            crate_version: env!("CARGO_PKG_VERSION"),
            backends: vec![status(self.primary.as_ref()), status(self.fallback.as_ref())],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::backend::BackendKind;
    use crate::error::HTML_EXCERPT_CHARS;

    /// Scripted backend recording what it was asked to render.
    struct Scripted {
        kind: BackendKind,
        available: bool,
        output: std::result::Result<Vec<u8>, &'static str>,
        calls: Rc<Cell<usize>>,
        seen: Rc<RefCell<Option<String>>>,
    }

    impl Scripted {
        fn new(kind: BackendKind, output: std::result::Result<Vec<u8>, &'static str>) -> Self {
            Self {
                kind,
                available: true,
                output,
                calls: Rc::default(),
                seen: Rc::default(),
            }
        }
    }

    impl PdfBackend for Scripted {
        fn name(&self) -> &'static str {
            match self.kind {
                BackendKind::Primary => "scripted-primary",
                BackendKind::Fallback => "scripted-fallback",
            }
        }

        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn render(&self, html: &str, _base_dir: Option<&Path>) -> Result<Vec<u8>, BackendError> {
            self.calls.set(self.calls.get() + 1);
            *self.seen.borrow_mut() = Some(html.to_string());
            self.output
                .clone()
                .map_err(|msg| BackendError::Render(msg.to_string()))
        }
    }

    const HTML: &str = r#"<html><head></head><body><table style="border:1px"><tr><td style="height:10px;color:red">x</td></tr></table></body></html>"#;

    #[test]
    fn primary_success_skips_fallback() {
        let primary = Scripted::new(BackendKind::Primary, Ok(b"%PDF-1.7 primary".to_vec()));
        let fallback = Scripted::new(BackendKind::Fallback, Ok(b"%PDF-1.7 fallback".to_vec()));
        let fallback_calls = fallback.calls.clone();
        let seen = primary.seen.clone();

        let bytes = Compositor::new(Box::new(primary), Box::new(fallback))
            .compose(HTML, None)
            .unwrap();
        assert_eq!(bytes, b"%PDF-1.7 primary");
        assert_eq!(fallback_calls.get(), 0);
        let seen = seen.borrow().clone().unwrap();
        assert!(seen.contains(PRINT_COLOR_CSS));
        assert!(seen.contains("height:10px"), "no sanitizing requested");
    }

    #[test]
    fn injected_failure_falls_back_with_aggressive_sanitizing() {
        let primary = Scripted::new(BackendKind::Primary, Err("cannot coerce '10px'"));
        let fallback = Scripted::new(BackendKind::Fallback, Ok(b"%PDF-1.4".to_vec()));
        let seen = fallback.seen.clone();

        let bytes = Compositor::new(Box::new(primary), Box::new(fallback))
            .compose(HTML, None)
            .unwrap();
        assert_eq!(bytes, b"%PDF-1.4");
        let seen = seen.borrow().clone().unwrap();
        assert!(seen.contains("<table>"));
        assert!(seen.contains("<td>x</td>"));
        assert!(seen.contains(PRINT_COLOR_CSS));
    }

    #[test]
    fn headerless_output_counts_as_failure() {
        let primary = Scripted::new(BackendKind::Primary, Ok(b"<html>oops".to_vec()));
        let fallback = Scripted::new(BackendKind::Fallback, Ok(b"%PDF-1.4".to_vec()));
        let bytes = Compositor::new(Box::new(primary), Box::new(fallback))
            .compose(HTML, None)
            .unwrap();
        assert_eq!(bytes, b"%PDF-1.4");
    }

    #[test]
    fn unavailable_primary_is_never_invoked() {
        let mut primary = Scripted::new(BackendKind::Primary, Ok(b"%PDF".to_vec()));
        primary.available = false;
        let primary_calls = primary.calls.clone();
        let fallback = Scripted::new(BackendKind::Fallback, Ok(b"%PDF-1.4".to_vec()));

        let compositor = Compositor::new(Box::new(primary), Box::new(fallback));
        assert!(compositor.compose(HTML, None).is_ok());
        assert_eq!(primary_calls.get(), 0);

        let report = compositor.backend_report();
        assert!(!report.backends[0].available);
        assert_eq!(report.backends[1].kind, "fallback");
    }

    #[test]
    fn both_failures_surface_diagnostics_and_excerpt() {
        let primary = Scripted::new(BackendKind::Primary, Err("primary boom"));
        let fallback = Scripted::new(BackendKind::Fallback, Ok(b"garbage".to_vec()));
        let long_html = format!("{HTML}{}", "x".repeat(3000));

        let err = Compositor::new(Box::new(primary), Box::new(fallback))
            .compose(&long_html, None)
            .unwrap_err();
        match err {
            QuoteError::PdfGeneration {
                primary,
                fallback,
                html_excerpt,
            } => {
                assert!(primary.contains("primary boom"));
                assert!(fallback.contains("without a PDF header"));
                assert_eq!(html_excerpt.chars().count(), HTML_EXCERPT_CHARS);
                assert!(html_excerpt.starts_with("<html>"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn relative_lengths_route_real_documents_to_flow_backend() {
        let html = r#"<table><tr><td style="padding: 2em">Filme PEBD</td></tr></table>"#;
        let compositor = Compositor::from_config(&PipelineConfig::default());
        let bytes = compositor.compose(html, None).unwrap();
        assert!(bytes.starts_with(PDF_MAGIC));
    }

    #[test]
    fn print_css_lands_in_head() {
        let out = inject_print_css("<HTML><HEAD><title>t</title></HEAD><body></body></HTML>");
        let style_at = out.find(PRINT_COLOR_CSS).unwrap();
        assert!(style_at < out.find("</HEAD>").unwrap());
        assert!(inject_print_css("<p>x</p>").starts_with("<style>"));
    }
}
