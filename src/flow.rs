//! Degraded block-flow renderer.
//!
//! Ignores CSS entirely: the document is flattened into headings, paragraphs,
//! table rows, images and rules, then written top to bottom with the builtin
//! Helvetica faces. Anything the styled pipeline rejects still comes out as a
//! readable document here.

use std::path::Path;

use printpdf::{PdfDocument, PdfPage};

use crate::backend::{BackendKind, PdfBackend};
use crate::dom::{body_children, parse_html, DomNode, ElementNode, Tag};
use crate::error::BackendError;
use crate::fonts::{wrap_text, FontManager};
use crate::images::ImageStore;
use crate::layout_config::BorderStyle;
use crate::pagination::PageGeometry;
use crate::pipeline::PipelineConfig;
use crate::render::{builtin_font, finish, ImageRegistry, Painter};

const BODY_SIZE: f32 = 10.0;
const CELL_SIZE: f32 = 9.0;
const CELL_PADDING: f32 = 3.0;
const LEADING: f32 = 1.3;
const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const GRID: [f32; 4] = [0.6, 0.6, 0.6, 1.0];
const HEADER_FILL: [f32; 4] = [0.9, 0.9, 0.9, 1.0];

/// One unit of flowed content.
#[derive(Debug, Clone, PartialEq)]
enum FlowBlock {
    Text { text: String, size: f32, bold: bool },
    Row { cells: Vec<String>, header: bool },
    Image { src: String },
    Rule,
}

fn heading_size(tag: &Tag) -> Option<f32> {
    match tag {
        Tag::H1 => Some(18.0),
        Tag::H2 => Some(15.0),
        Tag::H3 => Some(13.0),
        Tag::H4 => Some(11.0),
        _ => None,
    }
}

/// Collapse whitespace on each line, dropping empty lines.
fn normalize_text(raw: &str) -> String {
    raw.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn has_block_children(element: &ElementNode) -> bool {
    element.children.iter().any(|child| match child {
        DomNode::Element(e) => !e.tag.is_inline(),
        DomNode::Text(_) => false,
    })
}

fn push_text(out: &mut Vec<FlowBlock>, raw: &str, size: f32, bold: bool) {
    let text = normalize_text(raw);
    if !text.is_empty() {
        out.push(FlowBlock::Text { text, size, bold });
    }
}

fn collect_rows(nodes: &[DomNode], in_head: bool, out: &mut Vec<FlowBlock>) {
    for node in nodes {
        let DomNode::Element(e) = node else { continue };
        match &e.tag {
            Tag::Tr => {
                let mut cells = Vec::new();
                let mut all_th = true;
                for child in &e.children {
                    if let DomNode::Element(cell) = child {
                        if cell.tag.is_cell() {
                            all_th &= cell.tag == Tag::Th;
                            cells.push(normalize_text(&cell.text_content()).replace('\n', " "));
                        }
                    }
                }
                if !cells.is_empty() {
                    out.push(FlowBlock::Row {
                        cells,
                        header: in_head || all_th,
                    });
                }
            }
            tag if tag.is_row_group() => collect_rows(&e.children, *tag == Tag::Thead, out),
            _ => {}
        }
    }
}

fn collect_blocks(nodes: &[DomNode], out: &mut Vec<FlowBlock>) {
    for node in nodes {
        let e = match node {
            DomNode::Text(t) => {
                push_text(out, t, BODY_SIZE, false);
                continue;
            }
            DomNode::Element(e) => e,
        };
        match &e.tag {
            Tag::Head | Tag::Style | Tag::Script | Tag::Title | Tag::Br => {}
            Tag::Table => collect_rows(&e.children, false, out),
            Tag::Img => {
                if let Some(src) = e.src() {
                    out.push(FlowBlock::Image {
                        src: src.to_string(),
                    });
                }
            }
            Tag::Hr => out.push(FlowBlock::Rule),
            Tag::Li if !has_block_children(e) => {
                push_text(out, &format!("• {}", e.text_content()), BODY_SIZE, false)
            }
            tag if tag.is_heading() => {
                push_text(out, &e.text_content(), heading_size(tag).unwrap_or(BODY_SIZE), true)
            }
            Tag::Strong => push_text(out, &e.text_content(), BODY_SIZE, true),
            _ if has_block_children(e) => collect_blocks(&e.children, out),
            _ => push_text(out, &e.text_content(), BODY_SIZE, false),
        }
    }
}

/// Writes blocks onto pages, breaking when the cursor reaches the bottom
/// margin.
struct FlowWriter<'a> {
    geometry: PageGeometry,
    fonts: &'a FontManager,
    store: &'a ImageStore,
    images: &'a ImageRegistry,
    pages: Vec<PdfPage>,
    painter: Painter,
    cursor: f32,
}

impl<'a> FlowWriter<'a> {
    fn bottom(&self) -> f32 {
        self.geometry.height - self.geometry.margin
    }

    fn new_page(&mut self) {
        let done = std::mem::replace(&mut self.painter, Painter::new(self.geometry.height));
        self.pages.push(done.into_page(self.geometry.width));
        self.cursor = self.geometry.margin;
    }

    /// Start a new page unless `height` fits below the cursor. A block
    /// taller than a page is placed at the top of a fresh one and clipped.
    fn ensure(&mut self, height: f32) {
        if self.cursor + height > self.bottom() && self.cursor > self.geometry.margin {
            self.new_page();
        }
    }

    fn write(&mut self, block: &FlowBlock) {
        let left = self.geometry.margin;
        let width = self.geometry.content_width();
        match block {
            FlowBlock::Text { text, size, bold } => {
                let line_height = size * LEADING;
                let font = builtin_font(*bold, false);
                for line in wrap_text(text, *size, *bold, false, width, self.fonts) {
                    self.ensure(line_height);
                    let baseline = self.cursor + self.fonts.ascender_px(*size, *bold, false);
                    self.painter.text(left, baseline, &line, *size, font, BLACK);
                    self.cursor += line_height;
                }
                self.cursor += size * 0.5;
            }
            FlowBlock::Row { cells, header } => {
                let col_width = width / cells.len().max(1) as f32;
                let inner = col_width - 2.0 * CELL_PADDING;
                let wrapped: Vec<Vec<String>> = cells
                    .iter()
                    .map(|c| wrap_text(c, CELL_SIZE, *header, false, inner, self.fonts))
                    .collect();
                let line_height = CELL_SIZE * LEADING;
                let lines = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
                let row_height = lines as f32 * line_height + 2.0 * CELL_PADDING;
                self.ensure(row_height);

                let font = builtin_font(*header, false);
                let grid = BorderStyle {
                    width: 0.5,
                    color: GRID,
                };
                for (i, cell_lines) in wrapped.iter().enumerate() {
                    let x = left + i as f32 * col_width;
                    if *header {
                        self.painter
                            .fill_rect(x, self.cursor, col_width, row_height, HEADER_FILL);
                    }
                    self.painter
                        .stroke_rect(x, self.cursor, col_width, row_height, &grid);
                    let mut baseline = self.cursor
                        + CELL_PADDING
                        + self.fonts.ascender_px(CELL_SIZE, *header, false);
                    for line in cell_lines {
                        self.painter
                            .text(x + CELL_PADDING, baseline, line, CELL_SIZE, font, BLACK);
                        baseline += line_height;
                    }
                }
                self.cursor += row_height;
            }
            FlowBlock::Image { src } => {
                let (Some(res), Some((iw, ih))) = (self.images.get(src), self.store.intrinsic_size(src))
                else {
                    log::debug!("Flow backend skipping unavailable image");
                    return;
                };
                let scale = (width / iw)
                    .min(self.geometry.content_height() / ih)
                    .min(1.0);
                let (w, h) = (iw * scale, ih * scale);
                self.ensure(h);
                self.painter.image(res, left, self.cursor, w, h);
                self.cursor += h + BODY_SIZE * 0.5;
            }
            FlowBlock::Rule => {
                self.ensure(8.0);
                self.painter
                    .hline(left, left + width, self.cursor + 4.0, 0.75, GRID);
                self.cursor += 8.0;
            }
        }
    }
}

/// Fallback backend: CSS-free block flow with builtin fonts.
#[derive(Debug, Clone)]
pub struct FlowBackend {
    title: String,
    geometry: PageGeometry,
}

impl Default for FlowBackend {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl FlowBackend {
    /// Reuses the page setup of the styled pipeline.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            title: config.title.clone(),
            geometry: config.geometry(),
        }
    }
}

impl PdfBackend for FlowBackend {
    fn name(&self) -> &'static str {
        "flow"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Fallback
    }

    fn render(&self, html: &str, base_dir: Option<&Path>) -> Result<Vec<u8>, BackendError> {
        let geometry = self.geometry;
        if geometry.content_width() <= 0.0 || geometry.content_height() <= 0.0 {
            return Err(BackendError::Render(format!(
                "page {}x{} leaves no room inside a {}pt margin",
                geometry.width, geometry.height, geometry.margin
            )));
        }

        let dom = parse_html(html);
        let mut blocks = Vec::new();
        collect_blocks(&body_children(&dom), &mut blocks);

        let mut store = ImageStore::new(base_dir);
        for block in &blocks {
            if let FlowBlock::Image { src } = block {
                store.load(src);
            }
        }

        let mut doc = PdfDocument::new(&self.title);
        let registry = ImageRegistry::register_all(&mut doc, &store);
        let fonts = FontManager::new();
        let mut writer = FlowWriter {
            geometry,
            fonts: &fonts,
            store: &store,
            images: &registry,
            pages: Vec::new(),
            painter: Painter::new(geometry.height),
            cursor: geometry.margin,
        };
        for block in &blocks {
            writer.write(block);
        }
        writer.new_page();
        log::debug!(
            "Flow backend wrote {} block(s) on {} page(s)",
            blocks.len(),
            writer.pages.len()
        );

        Ok(finish(doc, writer.pages, geometry.width, geometry.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(html: &str) -> Vec<FlowBlock> {
        let mut out = Vec::new();
        collect_blocks(&body_children(&parse_html(html)), &mut out);
        out
    }

    #[test]
    fn flattens_document_into_blocks() {
        let out = blocks(
            r#"<body><div><h1>Orçamento</h1><p>Cliente <strong>XYZ</strong></p></div>
            <table><thead><tr><th>Item</th><th>Kg</th></tr></thead>
            <tbody><tr><td>Filme</td><td>50,00</td></tr></tbody></table><hr></body>"#,
        );
        assert_eq!(
            out,
            vec![
                FlowBlock::Text {
                    text: "Orçamento".into(),
                    size: 18.0,
                    bold: true
                },
                FlowBlock::Text {
                    text: "Cliente XYZ".into(),
                    size: BODY_SIZE,
                    bold: false
                },
                FlowBlock::Row {
                    cells: vec!["Item".into(), "Kg".into()],
                    header: true
                },
                FlowBlock::Row {
                    cells: vec!["Filme".into(), "50,00".into()],
                    header: false
                },
                FlowBlock::Rule,
            ]
        );
    }

    #[test]
    fn ignores_css_it_cannot_handle() {
        let html = r#"<style>td { padding: calc(1em + 2px) }</style>
            <table style="width: 50vw"><tr><td style="height: 3em">x</td></tr></table>"#;
        let bytes = FlowBackend::default().render(html, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_documents_span_pages() {
        let rows: String = (0..200)
            .map(|i| format!("<tr><td>linha {i}</td><td>{i},00</td></tr>"))
            .collect();
        let html = format!("<table>{rows}</table>");
        let backend = FlowBackend::default();
        let bytes = backend.render(&html, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn embeds_data_uri_images() {
        let uri = crate::images::encode_data_uri("image/png", &crate::images::tests::tiny_png());
        let html = format!(r#"<img src="{uri}"><p>depois da imagem</p>"#);
        let bytes = FlowBackend::default().render(&html, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
