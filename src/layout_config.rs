//! Layout config – the frozen, page-by-page description of a document that
//! the PDF writer consumes. Coordinates are points from the top-left corner
//! of the physical page.

use serde::Serialize;

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Width of each page in PDF points (1 pt = 1/72 inch).
    pub page_width_pt: f32,
    /// Height of each page in PDF points.
    pub page_height_pt: f32,
    /// Painted on every page before its boxes (propagated `<body>` background).
    pub page_background: Option<PageBackground>,
    /// Ordered list of pages.
    pub pages: Vec<PageLayout>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageBackground {
    /// Fills the whole page.
    pub color: Option<[f32; 4]>,
    /// Centered in the content area, scaled to fit.
    pub image: Option<LayoutBox>,
}

/// One page of content.
#[derive(Debug, Clone, Serialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

/// A positioned rectangle with optional content.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background_color: Option<[f32; 4]>,
    pub background_image: Option<String>,
    pub border: Option<BorderStyle>,
    /// Horizontal rule through the middle of the box.
    pub rule: Option<BorderStyle>,

    pub text: Option<TextContent>,
    pub image: Option<ImageContent>,

    pub children: Vec<LayoutBox>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BorderStyle {
    pub width: f32,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Serialize)]
pub struct TextContent {
    /// Pre-wrapped, pre-aligned lines.
    pub lines: Vec<TextLine>,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: [f32; 4],
    pub line_height: f32,
    pub underline: bool,
    /// List bullet/number drawn left of the box.
    pub list_marker: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextLine {
    pub text: String,
    /// X offset within the layout box (alignment).
    pub x_offset: f32,
    /// Baseline position below the top of the layout box.
    pub y_offset: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageContent {
    pub src: String,
    pub width: f32,
    pub height: f32,
}

impl LayoutConfig {
    pub fn new(title: &str, page_width_pt: f32, page_height_pt: f32) -> Self {
        Self {
            title: title.to_string(),
            page_width_pt,
            page_height_pt,
            page_background: None,
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pretty JSON, for trace logging.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            background_image: None,
            border: None,
            rule: None,
            text: None,
            image: None,
            children: Vec::new(),
        }
    }
}
