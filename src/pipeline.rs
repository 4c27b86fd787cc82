//! Pipeline – ties together parsing, styling, layout, pagination, and
//! rendering into a single function call.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dom::{body_children, collect_stylesheets, parse_html, DomNode, ElementNode, Tag};
use crate::error::BackendError;
use crate::fonts::FontManager;
use crate::images::ImageStore;
use crate::layout::compute_layout;
use crate::layout_config::LayoutConfig;
use crate::pagination::{page_background, paginate, PageGeometry, PAGE_MARGIN_PT};
use crate::render::render_pdf;
use crate::style::{build_styled_tree, StyleResolver};
use crate::stylesheet::Stylesheet;

/// A4 in points.
pub const A4: (f32, f32) = (595.28, 841.89);
/// US Letter in points.
pub const LETTER: (f32, f32) = (612.0, 792.0);

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    #[default]
    Portrait,
    Landscape,
}

/// Configuration for the layout pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Page width in points (default: A4).
    pub page_width: f32,
    /// Page height in points (default: A4).
    pub page_height: f32,
    pub page_margin: f32,
    /// Swaps effective width/height when `Landscape`.
    pub orientation: PageOrientation,
    /// Reject lengths that cannot be resolved to points (`em`, `vh`,
    /// `calc(...)`) instead of ignoring them.
    pub strict_lengths: bool,
    /// Regular-weight TTF used for text measurement. Builtin Helvetica
    /// metrics apply when absent.
    pub font_file: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: "Orçamento".to_string(),
            page_width: A4.0,
            page_height: A4.1,
            page_margin: PAGE_MARGIN_PT,
            orientation: PageOrientation::Portrait,
            strict_lengths: true,
            font_file: None,
        }
    }
}

impl PipelineConfig {
    pub fn effective_width(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_width,
            PageOrientation::Landscape => self.page_height,
        }
    }

    pub fn effective_height(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_height,
            PageOrientation::Landscape => self.page_width,
        }
    }

    pub fn letter() -> Self {
        Self {
            page_width: LETTER.0,
            page_height: LETTER.1,
            ..Self::default()
        }
    }

    pub fn geometry(&self) -> PageGeometry {
        PageGeometry {
            width: self.effective_width(),
            height: self.effective_height(),
            margin: self.page_margin,
        }
    }

    fn font_manager(&self) -> Result<FontManager, BackendError> {
        let mut fonts = FontManager::new();
        if let Some(path) = &self.font_file {
            let bytes = std::fs::read(path).map_err(|e| {
                BackendError::Layout(format!("cannot read font {}: {e}", path.display()))
            })?;
            fonts.load_font(false, false, bytes)?;
        }
        Ok(fonts)
    }
}

fn find_element<'a>(nodes: &'a [DomNode], tag: &Tag) -> Option<&'a ElementNode> {
    nodes.iter().find_map(|n| match n {
        DomNode::Element(e) if &e.tag == tag => Some(e),
        DomNode::Element(e) if e.tag == Tag::Html => find_element(&e.children, tag),
        _ => None,
    })
}

/// The `<html>` and `<body>` elements of a document. Documents without them
/// get synthesized ones so stylesheet rules on `html, body` still apply.
fn root_elements(dom: &[DomNode]) -> (ElementNode, ElementNode) {
    let root = |tag: Tag| {
        find_element(dom, &tag)
            .map(|e| {
                let mut shell = ElementNode::new(e.tag.clone());
                shell.attributes = e.attributes.clone();
                shell
            })
            .unwrap_or_else(|| ElementNode::new(tag))
    };
    (root(Tag::Html), root(Tag::Body))
}

/// Parse, style, lay out and paginate `html` without writing PDF bytes.
/// Returns the layout together with every image it references.
pub fn compute_layout_config(
    html: &str,
    base_dir: Option<&Path>,
    config: &PipelineConfig,
) -> Result<(LayoutConfig, ImageStore), BackendError> {
    let dom = parse_html(html);
    let stylesheet = Stylesheet::parse(&collect_stylesheets(&dom));
    log::debug!("Parsed {} stylesheet rule(s)", stylesheet.len());
    let resolver = StyleResolver::new(&stylesheet, config.strict_lengths);

    let (html_el, body_el) = root_elements(&dom);
    let html_style = resolver.resolve(&html_el, &[], None)?;
    let body_style = resolver.resolve(&body_el, &[&html_el], Some(&html_style))?;

    let flow = body_children(&dom);
    let mut ancestors = vec![&html_el, &body_el];
    let styled = build_styled_tree(&flow, &resolver, &mut ancestors, &body_style)?;

    let mut images = ImageStore::new(base_dir);
    images.collect(&styled);
    if let Some(src) = &body_style.background_image {
        images.load(src);
    }

    let fonts = config.font_manager()?;
    let geometry = config.geometry();
    let boxes = compute_layout(
        &styled,
        &body_style,
        geometry.content_width(),
        geometry.margin,
        &fonts,
        &images,
    )?;

    let mut layout = paginate(&boxes, geometry, &config.title, &fonts);
    let bg_size = body_style
        .background_image
        .as_deref()
        .and_then(|src| images.intrinsic_size(src));
    layout.page_background = page_background(&body_style, geometry, bg_size);
    Ok((layout, images))
}

/// Full pipeline: HTML string → PDF bytes plus the layout that produced them.
pub fn generate_pdf(
    html: &str,
    base_dir: Option<&Path>,
    config: &PipelineConfig,
) -> Result<(Vec<u8>, LayoutConfig), BackendError> {
    let (layout, images) = compute_layout_config(html, base_dir, config)?;
    log::debug!(
        "Laid out {} page(s), {} image(s)",
        layout.page_count(),
        images.len()
    );
    if log::log_enabled!(log::Level::Trace) {
        log::trace!("Layout: {}", layout.to_json());
    }
    let pdf_bytes = render_pdf(&layout, &images)?;
    Ok((pdf_bytes, layout))
}

/// Convenience: generate a PDF with the default A4 config.
pub fn generate_pdf_from_html(html: &str) -> Result<Vec<u8>, BackendError> {
    let (bytes, _) = generate_pdf(html, None, &PipelineConfig::default())?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_basic() {
        let html = "<h1>Hello</h1><p>World</p>";
        let (bytes, config) = generate_pdf(html, None, &PipelineConfig::default()).unwrap();
        assert!(!config.pages.is_empty());
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn landscape_swaps_dimensions() {
        let config = PipelineConfig {
            orientation: PageOrientation::Landscape,
            ..PipelineConfig::default()
        };
        let (layout, _) = compute_layout_config("<p>x</p>", None, &config).unwrap();
        assert!(layout.page_width_pt > layout.page_height_pt);
    }

    #[test]
    fn strict_mode_rejects_relative_lengths() {
        let html = r#"<table><tr><td style="padding: 2em">x</td></tr></table>"#;
        let strict = PipelineConfig::default();
        assert!(matches!(
            generate_pdf(html, None, &strict),
            Err(BackendError::UnsupportedLength { .. })
        ));

        let lenient = PipelineConfig {
            strict_lengths: false,
            ..PipelineConfig::default()
        };
        assert!(generate_pdf(html, None, &lenient).is_ok());
    }

    #[test]
    fn body_background_becomes_page_background_when_exact() {
        let html = r#"<html><head><style>
            html, body { print-color-adjust: exact; }
            body { background-color: #eeeeee; }
        </style></head><body><p>a</p></body></html>"#;
        let (layout, _) =
            compute_layout_config(html, None, &PipelineConfig::default()).unwrap();
        let bg = layout.page_background.expect("page background");
        assert!(bg.color.is_some());

        let plain = "<body style=\"background-color: #eeeeee\"><p>a</p></body>";
        let (layout, _) =
            compute_layout_config(plain, None, &PipelineConfig::default()).unwrap();
        assert!(layout.page_background.is_none());
    }

    #[test]
    fn deserializes_partial_config() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"orientation": "landscape", "page_margin": 20}"#).unwrap();
        assert_eq!(config.orientation, PageOrientation::Landscape);
        assert_eq!(config.page_margin, 20.0);
        assert_eq!(config.page_width, A4.0);
    }
}
